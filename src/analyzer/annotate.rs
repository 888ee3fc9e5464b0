use log::error;
use serde_json::{Map, Value};

use super::temporal::DateBucket;
use crate::error::{DashError, Result};

/// Key of the date string on a chart point.
pub const POINT_KEY: &str = "x";
/// Key the bucket range is attached under.
pub const BUCKET_KEY: &str = "date";

/// Attaches `{"startDate", "endDate"}` to every point whose `x` equals a
/// bucket's start date, so the chart can drill into that sub-range.
///
/// `chart_data` is an array of series objects, each with a `data` array of
/// points. Any shape mismatch fails the whole call and nothing is annotated.
/// Empty series lists and empty bucket lists are rejected too.
pub fn annotate_series(chart_data: &Value, buckets: &[DateBucket]) -> Result<Value> {
    if buckets.is_empty() {
        return Err(invalid("aucun intervalle de dates à appliquer"));
    }

    let mut annotated = chart_data.clone();
    let series_list = annotated
        .as_array_mut()
        .ok_or_else(|| invalid("les données du graphique doivent être un tableau de séries"))?;
    if series_list.is_empty() {
        return Err(invalid("aucune série dans les données du graphique"));
    }

    let keyed: Vec<(String, Value)> = buckets
        .iter()
        .map(|b| -> Result<(String, Value)> { Ok((b.start_key(), serde_json::to_value(b)?)) })
        .collect::<Result<_>>()?;

    for (s, series) in series_list.iter_mut().enumerate() {
        let points = series_points(series, s)?;

        for (p, point) in points.iter_mut().enumerate() {
            let point = point
                .as_object_mut()
                .ok_or_else(|| invalid(format!("series[{}].data[{}] n'est pas un objet", s, p)))?;
            let x = point_key(point, s, p)?;

            if let Some((_, range)) = keyed.iter().find(|(start, _)| *start == x) {
                point.insert(BUCKET_KEY.to_string(), range.clone());
            }
        }
    }

    Ok(annotated)
}

/// String-in, string-out variant of [`annotate_series`].
pub fn annotate_series_json(chart_data: &str, buckets: &[DateBucket]) -> Result<String> {
    let parsed: Value = serde_json::from_str(chart_data)?;
    let annotated = annotate_series(&parsed, buckets)?;
    Ok(serde_json::to_string(&annotated)?)
}

fn series_points(series: &mut Value, s: usize) -> Result<&mut Vec<Value>> {
    let series = series
        .as_object_mut()
        .ok_or_else(|| invalid(format!("series[{}] n'est pas un objet", s)))?;
    match series.get_mut("data") {
        Some(Value::Array(points)) => Ok(points),
        Some(_) => Err(invalid(format!("series[{}].data n'est pas un tableau", s))),
        None => Err(invalid(format!("series[{}] sans champ data", s))),
    }
}

fn point_key(point: &Map<String, Value>, s: usize, p: usize) -> Result<String> {
    match point.get(POINT_KEY) {
        Some(Value::String(x)) => Ok(x.clone()),
        _ => Err(invalid(format!(
            "series[{}].data[{}]: champ \"{}\" texte manquant",
            s, p, POINT_KEY
        ))),
    }
}

fn invalid(message: impl Into<String>) -> DashError {
    let message = message.into();
    error!("annotation du graphique: {}", message);
    DashError::InvalidParameter(message)
}
