use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key every raw datapoint carries its timestamp under.
pub const DATE_KEY: &str = "date";

#[derive(Debug, Deserialize)]
pub struct IngestBody {
    pub data: Option<ExportData>,
}

#[derive(Debug, Deserialize)]
pub struct ExportData {
    pub metrics: Option<Vec<MetricSeries>>,
    pub workouts: Option<Vec<Workout>>,
}

#[derive(Debug, Deserialize)]
pub struct MetricSeries {
    pub name: String,
    pub data: Option<Vec<RawDatapoint>>,
}

pub type RawDatapoint = BTreeMap<String, RawValue>;

#[derive(Debug, Deserialize)]
pub struct Workout {
    pub name: String,
    pub start: String,
    pub end: String,
    pub route: Option<Vec<RouteSample>>,
}

impl Workout {
    /// Tag shared by every route point of this workout.
    pub fn identity(&self) -> String {
        format!("{}-{}-{}", self.name, self.start, self.end)
    }
}

#[derive(Debug, Deserialize)]
pub struct RouteSample {
    pub timestamp: String,
    pub lat: f64,
    pub lon: f64,
}

/// A datapoint value, decoded from JSON into a closed set of shapes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "serde_json::Value")]
pub enum RawValue {
    Integer(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    Null,
}

impl From<serde_json::Value> for RawValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => RawValue::Null,
            Value::Bool(b) => RawValue::Boolean(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => RawValue::Integer(i),
                // u64 above i64::MAX still has an f64 form
                None => n.as_f64().map_or(RawValue::Null, RawValue::Float),
            },
            Value::String(s) => RawValue::String(s),
            nested @ (Value::Array(_) | Value::Object(_)) => RawValue::String(nested.to_string()),
        }
    }
}

impl RawValue {
    pub fn kind(&self) -> &'static str {
        match self {
            RawValue::Integer(_) => "integer",
            RawValue::Float(_) => "float",
            RawValue::String(_) => "string",
            RawValue::Boolean(_) => "boolean",
            RawValue::Null => "null",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushSummary {
    pub ingested_health_datapoints: usize,
    pub ingested_workout_datapoints: usize,
}
