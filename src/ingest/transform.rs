use geohash::Coord;

use crate::config::{AbsentCollections, BooleanFields};
use crate::domain::{FieldValue, Point};
use crate::error::IngestError;
use crate::ingest::classify::{build_point, classify};
use crate::ingest::types::{ExportData, MetricSeries, Workout};

pub const WORKOUT_MEASUREMENT: &str = "workouts";
pub const GEOHASH_PRECISION: usize = 7;

/// Resolve an optional collection under the absent-collection policy.
pub fn collection<'a, T>(
    items: Option<&'a [T]>,
    key: &str,
    policy: AbsentCollections,
) -> Result<&'a [T], IngestError> {
    match (items, policy) {
        (Some(items), _) => Ok(items),
        (None, AbsentCollections::Empty) => Ok(&[]),
        (None, AbsentCollections::Reject) => Err(IngestError::malformed(format!("missing `{key}`"))),
    }
}

/// One point per datapoint of every series, in input order.
pub fn transform_metrics(
    data: Option<&ExportData>,
    booleans: BooleanFields,
    policy: AbsentCollections,
) -> Result<Vec<Point>, IngestError> {
    let metrics: &[MetricSeries] = match data {
        Some(data) => collection(data.metrics.as_deref(), "data.metrics", policy)?,
        None => collection::<MetricSeries>(None, "data", policy)?,
    };

    let mut points = Vec::new();
    for series in metrics {
        let datapoints = collection(series.data.as_deref(), "data", policy)
            .map_err(|_| IngestError::malformed(format!("metric `{}` is missing `data`", series.name)))?;
        for datapoint in datapoints {
            let classified = classify(datapoint, booleans)?;
            points.push(build_point(&series.name, datapoint, &classified)?);
        }
    }
    Ok(points)
}

/// One point per route sample of every workout, tagged with the workout identity.
pub fn transform_workouts(
    data: Option<&ExportData>,
    policy: AbsentCollections,
) -> Result<Vec<Point>, IngestError> {
    let workouts: &[Workout] = match data {
        Some(data) => collection(data.workouts.as_deref(), "data.workouts", policy)?,
        None => collection::<Workout>(None, "data", policy)?,
    };

    let mut points = Vec::new();
    for workout in workouts {
        let id = workout.identity();
        let route = collection(workout.route.as_deref(), "route", policy)
            .map_err(|_| IngestError::malformed(format!("workout `{id}` is missing `route`")))?;
        for sample in route {
            if !(sample.lat.is_finite() && sample.lon.is_finite()) {
                return Err(IngestError::malformed(format!(
                    "workout `{id}` sample at {} has non-finite coordinates",
                    sample.timestamp
                )));
            }
            let hash = geohash::encode(
                Coord {
                    x: sample.lon,
                    y: sample.lat,
                },
                GEOHASH_PRECISION,
            )
            .map_err(|e| {
                IngestError::malformed(format!(
                    "workout `{id}` sample at {} has bad coordinates: {e}",
                    sample.timestamp
                ))
            })?;

            let mut point = Point::new(WORKOUT_MEASUREMENT, sample.timestamp.as_str());
            point.tags.insert("id".into(), id.clone());
            point.fields.insert("lat".into(), FieldValue::Float(sample.lat));
            point.fields.insert("lng".into(), FieldValue::Float(sample.lon));
            point.fields.insert("geohash".into(), FieldValue::String(hash));
            points.push(point);
        }
    }
    Ok(points)
}
