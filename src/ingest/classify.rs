use crate::config::BooleanFields;
use crate::domain::{FieldValue, Point};
use crate::error::IngestError;
use crate::ingest::types::{RawDatapoint, RawValue, DATE_KEY};

/// Field names of one datapoint, split by how they are stored.
#[derive(Debug, PartialEq)]
pub struct Classified<'a> {
    pub time: &'a str,
    pub numeric: Vec<&'a str>,
    pub tags: Vec<&'a str>,
}

/// Split the non-`date` fields of `datapoint` into numeric fields and tags.
///
/// Integers and floats are numeric, strings are tags, booleans follow
/// `booleans`. Nulls carry nothing and are left out of both sets.
pub fn classify(
    datapoint: &RawDatapoint,
    booleans: BooleanFields,
) -> Result<Classified<'_>, IngestError> {
    let time = match datapoint.get(DATE_KEY) {
        Some(RawValue::String(date)) => date.as_str(),
        Some(other) => {
            return Err(IngestError::malformed(format!(
                "`{DATE_KEY}` must be a string, got {}",
                other.kind()
            )))
        }
        None => return Err(IngestError::malformed(format!("datapoint is missing `{DATE_KEY}`"))),
    };

    let mut classified = Classified {
        time,
        numeric: Vec::new(),
        tags: Vec::new(),
    };
    let mut nulls = 0usize;
    for (name, value) in datapoint.iter().filter(|(k, _)| k.as_str() != DATE_KEY) {
        match (value, booleans) {
            (RawValue::Integer(_) | RawValue::Float(_), _)
            | (RawValue::Boolean(_), BooleanFields::Numeric) => classified.numeric.push(name),
            (RawValue::String(_), _) | (RawValue::Boolean(_), BooleanFields::Tag) => {
                classified.tags.push(name)
            }
            (RawValue::Null, _) => nulls += 1,
        }
    }
    if nulls > 0 {
        tracing::debug!(time, nulls, "null datapoint values dropped");
    }
    Ok(classified)
}

/// Build the point for one classified datapoint.
pub fn build_point(
    measurement: &str,
    datapoint: &RawDatapoint,
    classified: &Classified<'_>,
) -> Result<Point, IngestError> {
    let mut point = Point::new(measurement, classified.time);

    for &name in &classified.tags {
        let tag = match field(datapoint, name)? {
            RawValue::String(s) => s.clone(),
            RawValue::Boolean(b) => b.to_string(),
            RawValue::Integer(i) => i.to_string(),
            RawValue::Float(f) => f.to_string(),
            RawValue::Null => continue,
        };
        point.tags.insert(name.to_string(), tag);
    }

    for &name in &classified.numeric {
        let value = as_float(name, field(datapoint, name)?)?;
        point.fields.insert(name.to_string(), FieldValue::Float(value));
    }

    Ok(point)
}

fn field<'a>(datapoint: &'a RawDatapoint, name: &str) -> Result<&'a RawValue, IngestError> {
    datapoint
        .get(name)
        .ok_or_else(|| IngestError::malformed(format!("datapoint has no field `{name}`")))
}

fn as_float(name: &str, value: &RawValue) -> Result<f64, IngestError> {
    let v = match value {
        RawValue::Integer(i) => *i as f64,
        RawValue::Float(f) => *f,
        RawValue::Boolean(b) => f64::from(u8::from(*b)),
        other => {
            return Err(IngestError::FieldCoercion {
                field: name.to_string(),
                reason: format!("{} is not numeric", other.kind()),
            })
        }
    };
    if !v.is_finite() {
        return Err(IngestError::FieldCoercion {
            field: name.to_string(),
            reason: format!("{v} is not finite"),
        });
    }
    Ok(v)
}
