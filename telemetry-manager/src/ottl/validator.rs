//! Signal aware validation of the OTTL in `transforms` and `filters` of a pipeline.
//!
//! Every path has to name its context (`log.body`, not `body`), the context has to belong to the
//! signal and the field has to exist in it. Conditions must be boolean expressions, statements
//! must call an editor. Validation is pure and stops at the first problem.
use super::functions::{self, Availability, FunctionKind};
use super::lexer::Position;
use super::parser::{
    Call, Expr, ExprKind, Literal, PathSegment, parse_condition, parse_statement,
};
use super::paths::Context;
use crate::apis::shared::{FilterSpec, TransformSpec};
use tracing::debug;

pub use crate::otelcol::SignalType as Signal;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("`{expression}`: {message} (at position {position})")]
pub struct OttlError {
    pub expression: String,
    pub position: Position,
    pub message: String,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid TransformSpec: {0}")]
    InvalidTransformSpec(#[source] OttlError),

    #[error("invalid FilterSpec: {0}")]
    InvalidFilterSpec(#[source] OttlError),
}

impl ValidationError {
    pub fn ottl_error(&self) -> &OttlError {
        match self {
            Self::InvalidTransformSpec(err) | Self::InvalidFilterSpec(err) => err,
        }
    }
}

/// A problem found in an expression, before the expression text is attached.
struct Issue {
    position: Position,
    message: String,
}

impl Issue {
    fn new(position: Position, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }

    fn into_error(self, expression: &str) -> OttlError {
        OttlError {
            expression: expression.to_string(),
            position: self.position,
            message: self.message,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Transform,
    Filter,
}

#[derive(Debug, Clone, Copy)]
pub struct Validator {
    signal: Signal,
}

impl Validator {
    pub fn new(signal: Signal) -> Self {
        Self { signal }
    }

    pub fn validate_transforms(&self, transforms: &[TransformSpec]) -> Result<(), ValidationError> {
        for transform in transforms {
            for condition in &transform.conditions {
                self.condition(condition, Mode::Transform)
                    .map_err(ValidationError::InvalidTransformSpec)?;
            }
            for statement in &transform.statements {
                self.statement(statement)
                    .map_err(ValidationError::InvalidTransformSpec)?;
            }
        }
        Ok(())
    }

    pub fn validate_filters(&self, filters: &[FilterSpec]) -> Result<(), ValidationError> {
        for filter in filters {
            for condition in &filter.conditions {
                self.condition(condition, Mode::Filter)
                    .map_err(ValidationError::InvalidFilterSpec)?;
            }
        }
        Ok(())
    }

    fn condition(&self, input: &str, mode: Mode) -> Result<(), OttlError> {
        let expr = parse_condition(input).map_err(|err| {
            debug!(expression = input, %err, "OTTL condition does not parse");
            Issue::new(err.position, err.message).into_error(input)
        })?;
        self.boolean(&expr, mode).map_err(|issue| issue.into_error(input))
    }

    fn statement(&self, input: &str) -> Result<(), OttlError> {
        let statement = parse_statement(input).map_err(|err| {
            debug!(expression = input, %err, "OTTL statement does not parse");
            Issue::new(err.position, err.message).into_error(input)
        })?;
        self.editor(&statement.editor)
            .and_then(|_| match &statement.condition {
                Some(condition) => self.boolean(condition, Mode::Transform),
                None => Ok(()),
            })
            .map_err(|issue| issue.into_error(input))
    }

    fn editor(&self, call: &Call) -> Result<(), Issue> {
        match functions::lookup(&call.name) {
            Some(function) if function.kind == FunctionKind::Editor => {}
            Some(_) => {
                return Err(Issue::new(
                    call.position,
                    format!("converter `{}` cannot be used as a statement", call.name),
                ));
            }
            None => {
                return Err(Issue::new(
                    call.position,
                    format!("unknown editor `{}`", call.name),
                ));
            }
        }
        self.arguments(call, Mode::Transform)
    }

    /// Expressions usable as a condition.
    fn boolean(&self, expr: &Expr, mode: Mode) -> Result<(), Issue> {
        match &expr.kind {
            ExprKind::Binary { op, lhs, rhs } if op.is_logical() => {
                self.boolean(lhs, mode)?;
                self.boolean(rhs, mode)
            }
            ExprKind::Binary { op, lhs, rhs } if op.is_comparison() => {
                self.value(lhs, mode)?;
                self.value(rhs, mode)
            }
            ExprKind::Not(inner) => self.boolean(inner, mode),
            ExprKind::Literal(Literal::Bool(_)) => Ok(()),
            ExprKind::Call(call) => self.converter(call, mode),
            _ => Err(Issue::new(
                expr.position,
                "condition must evaluate to a boolean",
            )),
        }
    }

    /// Expressions usable as an argument, operand or key.
    fn value(&self, expr: &Expr, mode: Mode) -> Result<(), Issue> {
        match &expr.kind {
            ExprKind::Literal(_) => Ok(()),
            ExprKind::Path(segments) => self.path(segments, mode),
            ExprKind::Call(call) => self.converter(call, mode),
            ExprKind::Enum(name) => self.enum_value(name, expr.position),
            ExprKind::List(items) => items.iter().try_for_each(|item| self.value(item, mode)),
            ExprKind::Map(entries) => entries
                .iter()
                .try_for_each(|(_, value)| self.value(value, mode)),
            ExprKind::Negate(inner) => self.value(inner, mode),
            ExprKind::Binary { op, lhs, rhs } if !op.is_logical() && !op.is_comparison() => {
                self.value(lhs, mode)?;
                self.value(rhs, mode)
            }
            ExprKind::Binary { .. } | ExprKind::Not(_) => Err(Issue::new(
                expr.position,
                "boolean expression cannot be used as a value",
            )),
        }
    }

    fn converter(&self, call: &Call, mode: Mode) -> Result<(), Issue> {
        let Some(function) = functions::lookup(&call.name) else {
            return Err(Issue::new(
                call.position,
                format!("unknown converter `{}`", call.name),
            ));
        };
        if function.kind == FunctionKind::Editor {
            return Err(Issue::new(
                call.position,
                format!("editor `{}` cannot be used in a condition", call.name),
            ));
        }
        if function.availability == Availability::MetricFilter
            && !(self.signal == Signal::Metric && mode == Mode::Filter)
        {
            return Err(Issue::new(
                call.position,
                format!("`{}` is only available in metric filters", call.name),
            ));
        }
        self.arguments(call, mode)?;
        call.keys.iter().try_for_each(|key| self.value(key, mode))
    }

    fn arguments(&self, call: &Call, mode: Mode) -> Result<(), Issue> {
        if let Some(function) = functions::lookup(&call.name)
            && !function.accepts(call.args.len())
        {
            return Err(Issue::new(
                call.position,
                format!(
                    "`{}` takes {} to {} arguments, got {}",
                    call.name,
                    function.min_args,
                    function.max_args,
                    call.args.len()
                ),
            ));
        }
        call.args.iter().try_for_each(|arg| match &arg.value.kind {
            // functions passed by name, as in `replace_pattern(..., function = SHA256)`
            ExprKind::Enum(name) if arg.name.is_some() && functions::lookup(name).is_some() => {
                Ok(())
            }
            _ => self.value(&arg.value, mode),
        })
    }

    fn enum_value(&self, name: &str, position: Position) -> Result<(), Issue> {
        if functions::is_known_enum(name, self.signal) {
            Ok(())
        } else {
            Err(Issue::new(position, format!("unknown enum `{name}`")))
        }
    }

    fn path(&self, segments: &[PathSegment], mode: Mode) -> Result<(), Issue> {
        let allowed = match mode {
            Mode::Transform => Context::for_signal(self.signal),
            Mode::Filter => Context::for_filter(self.signal),
        };
        let Some((first, rest)) = segments.split_first() else {
            return Ok(());
        };
        let context = Context::from_name(&first.name)
            .filter(|context| allowed.contains(context))
            .ok_or_else(|| {
                Issue::new(
                    first.position,
                    format!(
                        "path `{}` must start with one of the contexts {}",
                        first.name,
                        allowed
                            .iter()
                            .map(Context::as_str)
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                )
            })?;
        if !first.keys.is_empty() {
            return Err(Issue::new(
                first.position,
                format!("context `{}` cannot be indexed", context.as_str()),
            ));
        }

        let Some((field_segment, subfields)) = rest.split_first() else {
            return Err(Issue::new(
                first.position,
                format!("path `{}` is missing a field", context.as_str()),
            ));
        };
        let field = context.field(&field_segment.name).ok_or_else(|| {
            Issue::new(
                field_segment.position,
                format!(
                    "unknown field `{}` in context `{}`",
                    field_segment.name,
                    context.as_str()
                ),
            )
        })?;
        if !field.keyed && !field_segment.keys.is_empty() {
            return Err(Issue::new(
                field_segment.position,
                format!("field `{}` cannot be indexed", field.name),
            ));
        }
        field_segment
            .keys
            .iter()
            .try_for_each(|key| self.value(key, mode))?;

        match subfields {
            [] => Ok(()),
            [subfield] if field.subfields.contains(&subfield.name.as_str()) && subfield.keys.is_empty() => {
                Ok(())
            }
            [subfield, ..] => Err(Issue::new(
                subfield.position,
                format!("unknown field `{}` of `{}`", subfield.name, field.name),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;

    fn transform(conditions: &[&str], statements: &[&str]) -> Vec<TransformSpec> {
        vec![TransformSpec {
            conditions: conditions.iter().map(|s| s.to_string()).collect(),
            statements: statements.iter().map(|s| s.to_string()).collect(),
        }]
    }

    fn filter(conditions: &[&str]) -> Vec<FilterSpec> {
        vec![FilterSpec {
            conditions: conditions.iter().map(|s| s.to_string()).collect(),
        }]
    }

    #[rstest]
    #[case(Signal::Log, r#"IsMatch(resource.attributes["test"], "bar")"#, r#"set(resource.attributes["test"], "foo")"#)]
    #[case(Signal::Metric, r#"IsMatch(scope.name, "opentelemetry")"#, r#"set(scope.attributes["timestamp"], Now())"#)]
    #[case(Signal::Trace, r#"instrumentation_scope.version != nil"#, r#"set(scope.attributes["processed"], "true")"#)]
    #[case(Signal::Log, r#"log.severity_number >= 17"#, r#"replace_pattern(log.body, "password=\\w+", "password=***")"#)]
    #[case(Signal::Log, r#"IsMatch(log.body, "database")"#, r#"set(log.severity_text, "CRITICAL")"#)]
    #[case(Signal::Trace, r#"span.status.code == 2"#, r#"set(span.status.message, "Request failed")"#)]
    #[case(Signal::Trace, r#"IsMatch(spanevent.attributes["exception.type"], ".*Error")"#, r#"set(spanevent.time_unix_nano, Now())"#)]
    #[case(Signal::Metric, r#"metric.type == METRIC_DATA_TYPE_SUM"#, r#"replace_pattern(metric.name, "^kube_", "k8s_")"#)]
    #[case(Signal::Metric, r#"datapoint.value_int > 100"#, r#"set(datapoint.attributes["high_value"], "true") where metric.unit == "ms""#)]
    #[case(Signal::Trace, r#"span.kind == SPAN_KIND_SERVER and not IsRootSpan()"#, r#"set(span.attributes["trace"], span.trace_id.string)"#)]
    fn test_valid_transforms(#[case] signal: Signal, #[case] condition: &str, #[case] statement: &str) {
        assert_eq!(
            Validator::new(signal).validate_transforms(&transform(&[condition], &[statement])),
            Ok(())
        );
    }

    #[rstest]
    #[case::statement_as_condition(r#"set(log.attributes["processed"], "true")"#, "set(log.body, \"x\")", 0)]
    #[case::unknown_context(r#"llog.severity_text == "ERROR""#, "set(log.body, \"x\")", 0)]
    #[case::missing_context(r#"attributes["x"] == "y""#, "set(log.body, \"x\")", 0)]
    #[case::unknown_field(r#"IsMatch(resource.invalid["test"], "bar")"#, "set(log.body, \"x\")", 17)]
    #[case::unterminated_string(r#"log.severity_text == "ERROR"#, "set(log.body, \"x\")", 21)]
    #[case::unknown_converter(r#"IisMatch(log.body, "bar")"#, "set(log.body, \"x\")", 0)]
    #[case::path_as_condition("log.body", "set(log.body, \"x\")", 0)]
    #[case::foreign_context(r#"span.name == "x""#, "set(log.body, \"x\")", 0)]
    fn test_invalid_transform_conditions(
        #[case] condition: &str,
        #[case] statement: &str,
        #[case] position: Position,
    ) {
        let err = Validator::new(Signal::Log)
            .validate_transforms(&transform(&[condition], &[statement]))
            .unwrap_err();

        assert_matches!(&err, ValidationError::InvalidTransformSpec(ottl) => {
            assert_eq!(ottl.expression, condition);
            assert_eq!(ottl.position, position);
        });
        assert!(err.to_string().starts_with("invalid TransformSpec"));
    }

    #[rstest]
    #[case::condition_as_statement(r#"IsMatch(log.body, "bar")"#, "converter `IsMatch` cannot be used as a statement")]
    #[case::unknown_editor(r#"sset(log.attributes["x"], "y")"#, "unknown editor `sset`")]
    #[case::invalid_path(r#"set(log.invalid["x"], "y")"#, "unknown field `invalid` in context `log`")]
    #[case::comparison_as_statement(r#"log.severity_text == "ERROR""#, "statement must start with a function call, found `log`")]
    #[case::wrong_arity(r#"set(log.body)"#, "`set` takes 2 to 2 arguments, got 1")]
    #[case::unkeyed_field(r#"set(log.severity_text["x"], "y")"#, "field `severity_text` cannot be indexed")]
    #[case::bad_subfield(r#"set(log.trace_id.bytes, "y")"#, "unknown field `bytes` of `trace_id`")]
    #[case::unknown_enum(r#"set(log.severity_number, SEVERITY_NUMBER_LOUD)"#, "unknown enum `SEVERITY_NUMBER_LOUD`")]
    #[case::non_boolean_where(r#"set(log.body, "x") where log.body"#, "condition must evaluate to a boolean")]
    fn test_invalid_statements(#[case] statement: &str, #[case] message: &str) {
        let err = Validator::new(Signal::Log)
            .validate_transforms(&transform(&[], &[statement]))
            .unwrap_err();

        assert_eq!(err.ottl_error().message, message);
        assert_eq!(err.ottl_error().expression, statement);
    }

    #[rstest]
    #[case(Signal::Metric, r#"resource.attributes["service.name"] == "auth-service""#)]
    #[case(Signal::Metric, r#"HasAttrOnDatapoint("k8s.pod.name", "x")"#)]
    #[case(Signal::Metric, r#"HasAttrKeyOnDatapoint("k8s.pod.name") or metric.name == "up""#)]
    #[case(Signal::Metric, r#"datapoint.exemplars != nil"#)]
    #[case(Signal::Trace, r#"span.end_time_unix_nano - span.start_time_unix_nano < 1000000"#)]
    #[case(Signal::Log, r#"log.body["level"] == "debug" or log.severity_number < SEVERITY_NUMBER_INFO"#)]
    #[case(Signal::Trace, r#"Len(Split(span.name, "/")) > 2"#)]
    fn test_valid_filters(#[case] signal: Signal, #[case] condition: &str) {
        assert_eq!(Validator::new(signal).validate_filters(&filter(&[condition])), Ok(()));
    }

    #[rstest]
    #[case::missing_context(Signal::Log, r#"attributes["service.name"] == "auth-service""#)]
    #[case::syntax(Signal::Log, r#"resource.attributes["service.name" == "auth-service""#)]
    #[case::lowercase_converter(Signal::Metric, r#"get(metric.name) == "http_requests_total""#)]
    #[case::editor(Signal::Metric, r#"truncate_all(datapoint.attributes, 100)"#)]
    #[case::unknown_function(Signal::Metric, r#"prettify(metric.name) == "x""#)]
    #[case::unknown_datapoint_field(Signal::Metric, r#"datapoint.value > 100"#)]
    #[case::datapoint_helper_outside_metrics(Signal::Trace, r#"HasAttrOnDatapoint("a", "b")"#)]
    #[case::comparison_as_key(Signal::Log, r#"log.attributes["a" == "b"] == "c""#)]
    #[case::spanevent_in_trace_filter(Signal::Trace, r#"spanevent.name == "exception""#)]
    #[case::spanevent_syntax(Signal::Trace, r#"spanevent.name == "exception"#)]
    fn test_invalid_filters(#[case] signal: Signal, #[case] condition: &str) {
        assert_matches!(
            Validator::new(signal).validate_filters(&filter(&[condition])),
            Err(ValidationError::InvalidFilterSpec(err)) => assert_eq!(err.expression, condition)
        );
    }

    #[test]
    fn test_datapoint_helpers_not_in_metric_transforms() {
        let err = Validator::new(Signal::Metric)
            .validate_transforms(&transform(&[r#"HasAttrOnDatapoint("a", "b")"#], &[]))
            .unwrap_err();

        assert_eq!(
            err.ottl_error().message,
            "`HasAttrOnDatapoint` is only available in metric filters"
        );
    }

    #[test]
    fn test_deeply_nested_filter_is_invalid() {
        let condition = format!("{}true{}", "(".repeat(3000), ")".repeat(3000));

        assert_matches!(
            Validator::new(Signal::Log).validate_filters(&filter(&[condition.as_str()])),
            Err(ValidationError::InvalidFilterSpec(err)) => assert_eq!(err.expression, condition)
        );
    }

    #[test]
    fn test_first_error_wins() {
        let filters = vec![
            FilterSpec {
                conditions: vec![r#"log.body == "ok""#.into(), "log.nope == 1".into()],
            },
            FilterSpec {
                conditions: vec!["log.other == 1".into()],
            },
        ];

        let err = Validator::new(Signal::Log).validate_filters(&filters).unwrap_err();

        assert_eq!(err.ottl_error().expression, "log.nope == 1");
        assert_eq!(
            err.to_string(),
            "invalid FilterSpec: `log.nope == 1`: unknown field `nope` in context `log` (at position 4)"
        );
    }

    #[test]
    fn test_empty_specs_are_valid() {
        let validator = Validator::new(Signal::Trace);

        assert_eq!(validator.validate_filters(&[]), Ok(()));
        assert_eq!(validator.validate_transforms(&transform(&[], &[])), Ok(()));
    }
}
