use nu_protocol::{LabeledError, ListStream, PipelineData, Record, Signals, Span, Value};
use serde_json::{Map, Number, Value as Json};

/// Collect pipeline input into JSON rows for the `ops` layer.
///
/// Handles:
///   - Table (list of records) → one row per record
///   - Single record → [record]
///   - Empty/Nothing → []
///
/// Non-record items are passed through and normalize to all-unknown rows.
pub fn input_rows(input: PipelineData) -> Vec<Json> {
    match input {
        PipelineData::Value(Value::List { vals, .. }, _) => vals.iter().map(to_json).collect(),
        PipelineData::Value(Value::Nothing { .. }, _) => Vec::new(),
        PipelineData::Value(value, _) => vec![to_json(&value)],
        other => other.into_iter().map(|v| to_json(&v)).collect(),
    }
}

/// nu value → JSON. Dates become RFC 3339 strings; values with no JSON
/// form (closures, ranges, errors) become null.
pub fn to_json(value: &Value) -> Json {
    match value {
        Value::Bool { val, .. } => Json::Bool(*val),
        Value::Int { val, .. } => Json::Number((*val).into()),
        Value::Float { val, .. } => Number::from_f64(*val).map_or(Json::Null, Json::Number),
        Value::String { val, .. } | Value::Glob { val, .. } => Json::String(val.clone()),
        Value::Date { val, .. } => Json::String(val.to_rfc3339()),
        Value::Record { val, .. } => {
            let map: Map<String, Json> = val.iter().map(|(k, v)| (k.clone(), to_json(v))).collect();
            Json::Object(map)
        }
        Value::List { vals, .. } => Json::Array(vals.iter().map(to_json).collect()),
        _ => Json::Null,
    }
}

/// JSON → nu value, every node tagged with `span`.
pub fn from_json(value: &Json, span: Span) -> Value {
    match value {
        Json::Null => Value::nothing(span),
        Json::Bool(b) => Value::bool(*b, span),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Value::int(i, span),
            None => Value::float(n.as_f64().unwrap_or_default(), span),
        },
        Json::String(s) => Value::string(s.clone(), span),
        Json::Array(items) => Value::list(items.iter().map(|v| from_json(v, span)).collect(), span),
        Json::Object(map) => {
            let mut record = Record::new();
            for (k, v) in map {
                record.push(k.clone(), from_json(v, span));
            }
            Value::record(record, span)
        }
    }
}

/// Convert an op result into pipeline output. Arrays are streamed as a
/// table; anything else is a single value.
pub fn to_pipeline(result: crate::Result<Json>, span: Span) -> Result<PipelineData, LabeledError> {
    let value = result.map_err(|e| to_labeled(e, span))?;
    Ok(match value {
        Json::Array(items) => {
            let vals: Vec<Value> = items.iter().map(|v| from_json(v, span)).collect();
            ListStream::new(vals.into_iter(), span, Signals::empty()).into()
        }
        other => PipelineData::Value(from_json(&other, span), None),
    })
}

pub fn to_labeled(e: crate::Error, span: Span) -> LabeledError {
    LabeledError::new(e.to_string()).with_label("invalid argument", span)
}
