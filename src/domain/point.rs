use std::collections::BTreeMap;

/// Value stored under a point's field key.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Float(f64),
    String(String),
}

/// One time-series point, ready for the sink.
///
/// `time` is carried exactly as it arrived; the sink parses it.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub measurement: String,
    pub time: String,
    pub tags: BTreeMap<String, String>,
    pub fields: BTreeMap<String, FieldValue>,
}

impl Point {
    pub fn new(measurement: impl Into<String>, time: impl Into<String>) -> Self {
        Self {
            measurement: measurement.into(),
            time: time.into(),
            tags: BTreeMap::new(),
            fields: BTreeMap::new(),
        }
    }

    pub fn has_fields(&self) -> bool {
        !self.fields.is_empty()
    }
}
