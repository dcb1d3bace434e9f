//! Registry of the OTTL functions available to user transforms and filters.
use crate::otelcol::SignalType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FunctionKind {
    /// Lower case functions mutating telemetry, only valid as a statement.
    Editor,
    /// Capitalized functions returning a value.
    Converter,
}

/// Where a function may be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Everywhere,
    /// Conditions of metric filters only.
    MetricFilter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Function {
    pub name: &'static str,
    pub kind: FunctionKind,
    pub min_args: usize,
    pub max_args: usize,
    pub availability: Availability,
}

impl Function {
    pub fn accepts(&self, args: usize) -> bool {
        (self.min_args..=self.max_args).contains(&args)
    }
}

const fn editor(name: &'static str, min_args: usize, max_args: usize) -> Function {
    Function {
        name,
        kind: FunctionKind::Editor,
        min_args,
        max_args,
        availability: Availability::Everywhere,
    }
}

const fn converter(name: &'static str, min_args: usize, max_args: usize) -> Function {
    Function {
        name,
        kind: FunctionKind::Converter,
        min_args,
        max_args,
        availability: Availability::Everywhere,
    }
}

const fn metric_filter(name: &'static str, args: usize) -> Function {
    Function {
        name,
        kind: FunctionKind::Converter,
        min_args: args,
        max_args: args,
        availability: Availability::MetricFilter,
    }
}

const FUNCTIONS: &[Function] = &[
    editor("append", 1, 3),
    editor("delete_index", 2, 3),
    editor("delete_key", 2, 2),
    editor("delete_matching_keys", 2, 2),
    editor("flatten", 1, 4),
    editor("keep_keys", 2, 2),
    editor("keep_matching_keys", 2, 2),
    editor("limit", 3, 3),
    editor("merge_maps", 3, 3),
    editor("replace_all_matches", 3, 5),
    editor("replace_all_patterns", 4, 6),
    editor("replace_match", 3, 5),
    editor("replace_pattern", 3, 5),
    editor("set", 2, 2),
    editor("truncate_all", 2, 2),
    converter("Base64Decode", 1, 1),
    converter("Concat", 2, 2),
    converter("ContainsValue", 2, 2),
    converter("ConvertCase", 2, 2),
    converter("Day", 1, 1),
    converter("Decode", 2, 2),
    converter("Double", 1, 1),
    converter("Duration", 1, 1),
    converter("ExtractGrokPatterns", 2, 4),
    converter("ExtractPatterns", 2, 2),
    converter("FNV", 1, 1),
    converter("Format", 2, 2),
    converter("FormatTime", 2, 2),
    converter("GetXML", 2, 2),
    converter("Hex", 1, 1),
    converter("Hour", 1, 1),
    converter("Hours", 1, 1),
    converter("Index", 2, 2),
    converter("InsertXML", 3, 3),
    converter("Int", 1, 1),
    converter("IsBool", 1, 1),
    converter("IsDouble", 1, 1),
    converter("IsInt", 1, 1),
    converter("IsList", 1, 1),
    converter("IsMap", 1, 1),
    converter("IsMatch", 2, 2),
    converter("IsRootSpan", 0, 0),
    converter("IsString", 1, 1),
    converter("IsValidLuhn", 1, 1),
    converter("Keys", 1, 1),
    converter("Len", 1, 1),
    converter("Log", 1, 1),
    converter("MD5", 1, 1),
    converter("Microseconds", 1, 1),
    converter("Milliseconds", 1, 1),
    converter("Minute", 1, 1),
    converter("Minutes", 1, 1),
    converter("Month", 1, 1),
    converter("Murmur3Hash", 1, 1),
    converter("Murmur3Hash128", 1, 1),
    converter("Nanosecond", 1, 1),
    converter("Nanoseconds", 1, 1),
    converter("Now", 0, 0),
    converter("ParseCSV", 2, 5),
    converter("ParseJSON", 1, 1),
    converter("ParseKeyValue", 1, 3),
    converter("ParseSimplifiedXML", 1, 1),
    converter("ParseXML", 1, 1),
    converter("RemoveXML", 2, 2),
    converter("SHA1", 1, 1),
    converter("SHA256", 1, 1),
    converter("SHA512", 1, 1),
    converter("Second", 1, 1),
    converter("Seconds", 1, 1),
    converter("SliceToMap", 1, 3),
    converter("Sort", 1, 2),
    converter("SpanID", 1, 1),
    converter("Split", 2, 2),
    converter("String", 1, 1),
    converter("Substring", 3, 3),
    converter("Time", 2, 4),
    converter("ToKeyValueString", 1, 4),
    converter("ToLowerCase", 1, 1),
    converter("ToUpperCase", 1, 1),
    converter("TraceID", 1, 1),
    converter("TruncateTime", 2, 2),
    converter("URL", 1, 1),
    converter("UUID", 0, 0),
    converter("Unix", 1, 2),
    converter("UnixMicro", 1, 1),
    converter("UnixMilli", 1, 1),
    converter("UnixNano", 1, 1),
    converter("UnixSeconds", 1, 1),
    converter("UserAgent", 1, 1),
    converter("Values", 1, 1),
    converter("Weekday", 1, 1),
    converter("Year", 1, 1),
    metric_filter("HasAttrKeyOnDatapoint", 1),
    metric_filter("HasAttrOnDatapoint", 2),
];

/// Enum constants usable as values, by the signal they belong to.
const ENUMS: &[(&str, SignalType)] = &[
    ("SPAN_KIND_UNSPECIFIED", SignalType::Trace),
    ("SPAN_KIND_INTERNAL", SignalType::Trace),
    ("SPAN_KIND_SERVER", SignalType::Trace),
    ("SPAN_KIND_CLIENT", SignalType::Trace),
    ("SPAN_KIND_PRODUCER", SignalType::Trace),
    ("SPAN_KIND_CONSUMER", SignalType::Trace),
    ("STATUS_CODE_UNSET", SignalType::Trace),
    ("STATUS_CODE_OK", SignalType::Trace),
    ("STATUS_CODE_ERROR", SignalType::Trace),
    ("SEVERITY_NUMBER_UNSPECIFIED", SignalType::Log),
    ("SEVERITY_NUMBER_TRACE", SignalType::Log),
    ("SEVERITY_NUMBER_DEBUG", SignalType::Log),
    ("SEVERITY_NUMBER_INFO", SignalType::Log),
    ("SEVERITY_NUMBER_WARN", SignalType::Log),
    ("SEVERITY_NUMBER_ERROR", SignalType::Log),
    ("SEVERITY_NUMBER_FATAL", SignalType::Log),
    ("METRIC_DATA_TYPE_NONE", SignalType::Metric),
    ("METRIC_DATA_TYPE_GAUGE", SignalType::Metric),
    ("METRIC_DATA_TYPE_SUM", SignalType::Metric),
    ("METRIC_DATA_TYPE_HISTOGRAM", SignalType::Metric),
    ("METRIC_DATA_TYPE_EXPONENTIAL_HISTOGRAM", SignalType::Metric),
    ("METRIC_DATA_TYPE_SUMMARY", SignalType::Metric),
    ("AGGREGATION_TEMPORALITY_UNSPECIFIED", SignalType::Metric),
    ("AGGREGATION_TEMPORALITY_DELTA", SignalType::Metric),
    ("AGGREGATION_TEMPORALITY_CUMULATIVE", SignalType::Metric),
    ("FLAG_NONE", SignalType::Metric),
    ("FLAG_NO_RECORDED_VALUE", SignalType::Metric),
];

pub fn lookup(name: &str) -> Option<&'static Function> {
    FUNCTIONS.iter().find(|f| f.name == name)
}

/// Severity numbers come in levels 1 to 4 (`SEVERITY_NUMBER_WARN3`), the base name is level 1.
pub fn is_known_enum(name: &str, signal: SignalType) -> bool {
    let base = name
        .strip_prefix("SEVERITY_NUMBER_")
        .map(|level| level.trim_end_matches(['2', '3', '4']))
        .map_or(name.to_string(), |level| format!("SEVERITY_NUMBER_{level}"));
    ENUMS
        .iter()
        .any(|&(known, owner)| known == base && owner == signal)
}
