//! Path contexts and the fields each of them exposes.
use crate::otelcol::SignalType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Context {
    Resource,
    Scope,
    Log,
    Metric,
    DataPoint,
    Span,
    SpanEvent,
}

/// A field of a context. Keyed fields accept `[...]` indexing, `subfields` are the names
/// allowed after a further dot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub keyed: bool,
    pub subfields: &'static [&'static str],
}

const fn field(name: &'static str) -> Field {
    Field {
        name,
        keyed: false,
        subfields: &[],
    }
}

const fn keyed(name: &'static str) -> Field {
    Field {
        name,
        keyed: true,
        subfields: &[],
    }
}

const fn nested(name: &'static str, subfields: &'static [&'static str]) -> Field {
    Field {
        name,
        keyed: false,
        subfields,
    }
}

const ID_SUBFIELDS: &[&str] = &["string"];

const RESOURCE_FIELDS: &[Field] = &[
    keyed("attributes"),
    field("dropped_attributes_count"),
    field("schema_url"),
    keyed("cache"),
];

const SCOPE_FIELDS: &[Field] = &[
    field("name"),
    field("version"),
    keyed("attributes"),
    field("dropped_attributes_count"),
    field("schema_url"),
    keyed("cache"),
];

const LOG_FIELDS: &[Field] = &[
    Field {
        name: "body",
        keyed: true,
        subfields: &["string"],
    },
    keyed("attributes"),
    keyed("cache"),
    field("time_unix_nano"),
    field("observed_time_unix_nano"),
    field("time"),
    field("observed_time"),
    field("severity_number"),
    field("severity_text"),
    field("dropped_attributes_count"),
    field("flags"),
    field("event_name"),
    nested("trace_id", ID_SUBFIELDS),
    nested("span_id", ID_SUBFIELDS),
];

const METRIC_FIELDS: &[Field] = &[
    field("name"),
    field("description"),
    field("unit"),
    field("type"),
    field("aggregation_temporality"),
    field("is_monotonic"),
    field("data_points"),
    keyed("metadata"),
    keyed("cache"),
];

const DATAPOINT_FIELDS: &[Field] = &[
    keyed("attributes"),
    field("start_time_unix_nano"),
    field("time_unix_nano"),
    field("start_time"),
    field("time"),
    field("value_double"),
    field("value_int"),
    field("exemplars"),
    field("flags"),
    field("count"),
    field("sum"),
    field("bucket_counts"),
    field("explicit_bounds"),
    field("scale"),
    field("zero_count"),
    nested("positive", &["offset", "bucket_counts"]),
    nested("negative", &["offset", "bucket_counts"]),
    field("quantile_values"),
    keyed("cache"),
];

const SPAN_FIELDS: &[Field] = &[
    nested("trace_id", ID_SUBFIELDS),
    nested("span_id", ID_SUBFIELDS),
    nested("parent_span_id", ID_SUBFIELDS),
    keyed("trace_state"),
    field("name"),
    nested("kind", &["string", "deprecated_string"]),
    field("start_time_unix_nano"),
    field("end_time_unix_nano"),
    field("start_time"),
    field("end_time"),
    keyed("attributes"),
    field("dropped_attributes_count"),
    field("events"),
    field("dropped_events_count"),
    field("links"),
    field("dropped_links_count"),
    nested("status", &["code", "message"]),
    keyed("cache"),
];

const SPAN_EVENT_FIELDS: &[Field] = &[
    field("time_unix_nano"),
    field("time"),
    field("name"),
    keyed("attributes"),
    field("dropped_attributes_count"),
    field("event_index"),
    keyed("cache"),
];

impl Context {
    /// Resolves the first segment of a path. `instrumentation_scope` is an alias of `scope`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "resource" => Some(Self::Resource),
            "scope" | "instrumentation_scope" => Some(Self::Scope),
            "log" => Some(Self::Log),
            "metric" => Some(Self::Metric),
            "datapoint" => Some(Self::DataPoint),
            "span" => Some(Self::Span),
            "spanevent" => Some(Self::SpanEvent),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resource => "resource",
            Self::Scope => "scope",
            Self::Log => "log",
            Self::Metric => "metric",
            Self::DataPoint => "datapoint",
            Self::Span => "span",
            Self::SpanEvent => "spanevent",
        }
    }

    /// Contexts a user expression of the signal may refer to.
    pub fn for_signal(signal: SignalType) -> &'static [Context] {
        match signal {
            SignalType::Log => &[Self::Resource, Self::Scope, Self::Log],
            SignalType::Metric => &[Self::Resource, Self::Scope, Self::Metric, Self::DataPoint],
            SignalType::Trace => &[Self::Resource, Self::Scope, Self::Span, Self::SpanEvent],
        }
    }

    /// Contexts a filter condition of the signal may refer to. Trace filters drop whole spans,
    /// so span events are out of reach.
    pub fn for_filter(signal: SignalType) -> &'static [Context] {
        match signal {
            SignalType::Trace => &[Self::Resource, Self::Scope, Self::Span],
            other => Self::for_signal(other),
        }
    }

    pub fn fields(&self) -> &'static [Field] {
        match self {
            Self::Resource => RESOURCE_FIELDS,
            Self::Scope => SCOPE_FIELDS,
            Self::Log => LOG_FIELDS,
            Self::Metric => METRIC_FIELDS,
            Self::DataPoint => DATAPOINT_FIELDS,
            Self::Span => SPAN_FIELDS,
            Self::SpanEvent => SPAN_EVENT_FIELDS,
        }
    }

    pub fn field(&self, name: &str) -> Option<&'static Field> {
        self.fields().iter().find(|f| f.name == name)
    }
}
