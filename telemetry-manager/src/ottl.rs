//! OpenTelemetry Transformation Language support: rendering of the fragments the builders emit
//! ([expr]) and validation of user supplied statements and conditions ([validator]).

pub mod expr;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod paths;
pub mod validator;

pub use validator::{OttlError, Signal, ValidationError, Validator};
