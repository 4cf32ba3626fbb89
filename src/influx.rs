//! InfluxDB 1.x HTTP client and line protocol encoding.
//!
//! ```text
//! measurement,tag1=val1,tag2=val2 field1=val1,field2="str" timestamp_ns
//! ```

use axum::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::OffsetDateTime;

use crate::config::DbCfg;
use crate::domain::{FieldValue, Point};
use crate::sink::{PointSink, SinkError};

pub struct InfluxSink {
    client: Client,
    base_url: String,
    db: String,
    username: Option<String>,
    password: Option<String>,
}

impl InfluxSink {
    pub fn new(cfg: &DbCfg) -> Result<Self, SinkError> {
        let client = Client::builder()
            .timeout(cfg.timeout())
            .build()
            .map_err(transport)?;
        Ok(Self {
            client,
            base_url: cfg.base_url(),
            db: cfg.name.clone(),
            username: cfg.username.clone(),
            password: cfg.password.clone(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let req = self
            .client
            .request(method, format!("{}{}", self.base_url, path));
        match &self.username {
            Some(user) => req.basic_auth(user, self.password.as_ref()),
            None => req,
        }
    }
}

#[async_trait]
impl PointSink for InfluxSink {
    async fn write_points(&self, points: &[Point]) -> Result<(), SinkError> {
        let body = encode_lines(points)?;
        if body.is_empty() {
            return Ok(());
        }
        let resp = self
            .request(Method::POST, "/write")
            .query(&[("db", self.db.as_str()), ("precision", "ns")])
            .body(body)
            .send()
            .await
            .map_err(transport)?;
        check(resp).await
    }

    async fn ping(&self) -> Result<(), SinkError> {
        let resp = self
            .request(Method::GET, "/ping")
            .send()
            .await
            .map_err(transport)?;
        check(resp).await
    }

    async fn ensure_database(&self) -> Result<(), SinkError> {
        let stmt = format!("CREATE DATABASE \"{}\"", self.db.replace('"', "\\\""));
        let resp = self
            .request(Method::POST, "/query")
            .form(&[("q", stmt.as_str())])
            .send()
            .await
            .map_err(transport)?;
        check(resp).await
    }
}

fn transport(err: reqwest::Error) -> SinkError {
    SinkError::Transport(err.to_string())
}

async fn check(resp: Response) -> Result<(), SinkError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(());
    }
    let body = resp.text().await.unwrap_or_default();
    Err(SinkError::Rejected {
        status: status.as_u16(),
        body,
    })
}

/// Encode points as newline-separated line protocol.
///
/// Points without fields are skipped; InfluxDB refuses field-less lines.
pub fn encode_lines(points: &[Point]) -> Result<String, SinkError> {
    let mut out = String::new();
    let mut skipped = 0usize;
    for point in points {
        if !point.has_fields() {
            skipped += 1;
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        encode_point(point, &mut out)?;
    }
    if skipped > 0 {
        tracing::debug!(skipped, "points without fields left out of write");
    }
    Ok(out)
}

fn encode_point(point: &Point, line: &mut String) -> Result<(), SinkError> {
    let ts = timestamp_nanos(&point.time)?;

    line.push_str(&escape_measurement(&point.measurement));
    for (key, value) in &point.tags {
        let key = escape_key(key);
        let value = escape_tag_value(value);
        // InfluxDB refuses empty tag keys and values
        if key.is_empty() || value.is_empty() {
            continue;
        }
        line.push(',');
        line.push_str(&key);
        line.push('=');
        line.push_str(&value);
    }

    line.push(' ');
    for (i, (key, value)) in point.fields.iter().enumerate() {
        if i > 0 {
            line.push(',');
        }
        line.push_str(&escape_key(key));
        line.push('=');
        match value {
            FieldValue::Float(v) => line.push_str(&v.to_string()),
            FieldValue::String(s) => {
                line.push('"');
                line.push_str(
                    &s.replace('\\', "\\\\")
                        .replace('"', "\\\"")
                        .replace('\n', "\\n"),
                );
                line.push('"');
            }
        }
    }

    line.push(' ');
    line.push_str(&ts.to_string());
    Ok(())
}

/// Parse a point time as RFC 3339 or the export format `2024-01-01 00:00:00 -0800`.
pub fn timestamp_nanos(raw: &str) -> Result<i128, SinkError> {
    let export = format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second] [offset_hour sign:mandatory][offset_minute]"
    );
    OffsetDateTime::parse(raw, &Rfc3339)
        .or_else(|_| OffsetDateTime::parse(raw, export))
        .map(OffsetDateTime::unix_timestamp_nanos)
        .map_err(|_| SinkError::Timestamp(raw.to_string()))
}

fn escape_measurement(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace(',', "\\,")
        .replace(' ', "\\ ")
}

// Tag keys, tag values and field keys share the same rules.
fn escape_key(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('\n', "\\n")
        .replace(',', "\\,")
        .replace('=', "\\=")
        .replace(' ', "\\ ")
}

// A trailing backslash would escape the separating space.
fn escape_tag_value(s: &str) -> String {
    let mut escaped = escape_key(s);
    if escaped.ends_with('\\') {
        escaped.push(' ');
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(measurement: &str, time: &str) -> Point {
        Point::new(measurement, time)
    }

    #[test]
    fn parses_rfc3339_and_export_timestamps() {
        assert_eq!(timestamp_nanos("1970-01-01T00:00:01Z").unwrap(), 1_000_000_000);
        assert_eq!(
            timestamp_nanos("1970-01-01 01:00:01 +0100").unwrap(),
            1_000_000_000
        );
        assert!(matches!(
            timestamp_nanos("S"),
            Err(SinkError::Timestamp(raw)) if raw == "S"
        ));
    }

    #[test]
    fn encodes_fields_only() {
        let mut p = point("heart_rate", "1970-01-01T00:00:01Z");
        p.fields.insert("value".into(), FieldValue::Float(72.0));
        assert_eq!(encode_lines(&[p]).unwrap(), "heart_rate value=72 1000000000");
    }

    #[test]
    fn encodes_tags_sorted_and_string_fields_quoted() {
        let mut p = point("workouts", "1970-01-01T00:00:02Z");
        p.tags.insert("id".into(), "run-S-E".into());
        p.tags.insert("device".into(), "Apple Watch".into());
        p.fields.insert("lat".into(), FieldValue::Float(1.5));
        p.fields.insert("geohash".into(), FieldValue::String("s01mtw0".into()));

        assert_eq!(
            encode_lines(&[p]).unwrap(),
            "workouts,device=Apple\\ Watch,id=run-S-E geohash=\"s01mtw0\",lat=1.5 2000000000"
        );
    }

    #[test]
    fn escapes_special_characters() {
        let mut p = point("step count", "1970-01-01T00:00:00Z");
        p.tags.insert("unit,kind".into(), "a=b".into());
        p.fields
            .insert("note".into(), FieldValue::String("say \"hi\"".into()));

        assert_eq!(
            encode_lines(&[p]).unwrap(),
            "step\\ count,unit\\,kind=a\\=b note=\"say \\\"hi\\\"\" 0"
        );
    }

    fn heart_rate_with_tag(key: &str, value: &str) -> Point {
        let mut p = point("heart_rate", "1970-01-01T00:00:01Z");
        p.tags.insert(key.into(), value.into());
        p.fields.insert("value".into(), FieldValue::Float(72.0));
        p
    }

    #[test]
    fn empty_tag_values_and_keys_are_dropped() {
        assert_eq!(
            encode_lines(&[heart_rate_with_tag("source", "")]).unwrap(),
            "heart_rate value=72 1000000000"
        );
        assert_eq!(
            encode_lines(&[heart_rate_with_tag("", "Watch")]).unwrap(),
            "heart_rate value=72 1000000000"
        );
    }

    #[test]
    fn newlines_stay_inside_one_line() {
        let mut p = heart_rate_with_tag("note", "line1\nline2");
        p.measurement = "heart\nrate".into();
        p.fields
            .insert("text".into(), FieldValue::String("a\nb".into()));

        let encoded = encode_lines(&[p]).unwrap();
        assert_eq!(encoded.lines().count(), 1);
        assert_eq!(
            encoded,
            "heart\\nrate,note=line1\\nline2 text=\"a\\nb\",value=72 1000000000"
        );
    }

    #[test]
    fn trailing_backslash_does_not_swallow_separator() {
        let encoded = encode_lines(&[heart_rate_with_tag("dir", "C:\\")]).unwrap();
        assert_eq!(encoded, "heart_rate,dir=C:\\\\  value=72 1000000000");
    }

    #[test]
    fn skips_points_without_fields() {
        let empty = point("sleep", "1970-01-01T00:00:00Z");
        let mut full = point("sleep", "1970-01-01T00:00:01Z");
        full.fields.insert("asleep".into(), FieldValue::Float(7.5));

        assert_eq!(
            encode_lines(&[empty.clone(), full]).unwrap(),
            "sleep asleep=7.5 1000000000"
        );
        assert_eq!(encode_lines(&[empty]).unwrap(), "");
    }

    #[test]
    fn bad_timestamp_fails_whole_chunk() {
        let mut p = point("m", "not a time");
        p.fields.insert("v".into(), FieldValue::Float(1.0));
        assert!(encode_lines(&[p]).is_err());
    }
}
