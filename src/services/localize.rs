//! Forecast ingestion: raw backend JSON → localized forecast records.
//!
//! Each record's UTC timestamp is projected into the spot's own IANA timezone
//! once, here, and the resulting `HH:MM` / `DD/MM/YYYY, HH:MM` strings travel
//! with the record from then on.

use chrono::{DateTime, NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde_json::Value;

use crate::errors::AppError;
use crate::models::forecast::{ForecastRecord, LocalizedForecastRecord};

const LOCAL_TIME_FORMAT: &str = "%H:%M";
const LOCAL_DATE_TIME_FORMAT: &str = "%d/%m/%Y, %H:%M";

/// Formats accepted for timezone-less timestamps, read as UTC.
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// HTTP-date variants (Flask's default JSON datetime encoding is the first).
const HTTP_DATE_FORMATS: [&str; 3] = [
    "%a, %d %b %Y %H:%M:%S GMT",
    "%A, %d-%b-%y %H:%M:%S GMT",
    "%a %b %e %H:%M:%S %Y",
];

/// Parse a backend timestamp into a UTC instant.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    HTTP_DATE_FORMATS
        .iter()
        .chain(NAIVE_FORMATS.iter())
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
}

/// Resolve an IANA timezone name, falling back to UTC.
pub fn resolve_timezone(name: &str) -> Tz {
    match name.trim().parse::<Tz>() {
        Ok(tz) => tz,
        Err(_) => {
            tracing::warn!("Unknown timezone '{}', using UTC", name);
            Tz::UTC
        }
    }
}

/// `(HH:MM, DD/MM/YYYY, HH:MM)` for an instant in the given zone.
pub fn local_labels(instant: DateTime<Utc>, tz: Tz) -> (String, String) {
    let local = instant.with_timezone(&tz);
    (
        local.format(LOCAL_TIME_FORMAT).to_string(),
        local.format(LOCAL_DATE_TIME_FORMAT).to_string(),
    )
}

/// Localize one record, or `None` when its timestamp does not parse.
pub fn localize_record(mut record: ForecastRecord) -> Option<LocalizedForecastRecord> {
    let Some(instant) = parse_timestamp(&record.timestamp_utc) else {
        tracing::warn!(
            "Dropping forecast record for spot {}: unparseable timestamp '{}'",
            record.spot_id,
            record.timestamp_utc
        );
        return None;
    };

    // Derived here only; a backend-sent copy would shadow ours when serialized
    record.measurements.remove("local_time");
    record.measurements.remove("local_date_time");

    let tz = resolve_timezone(&record.timezone);
    let (local_time, local_date_time) = local_labels(instant, tz);

    Some(LocalizedForecastRecord {
        record,
        instant,
        local_time,
        local_date_time,
    })
}

/// Turn a `POST /forecasts` body into localized records.
///
/// The body must be a JSON array. Entries that are not valid forecast records
/// are skipped with a warning; the rest of the batch is kept in order.
pub fn ingest_forecasts(body: Value) -> Result<Vec<LocalizedForecastRecord>, AppError> {
    let Value::Array(items) = body else {
        return Err(AppError::DataShape(
            "expected a JSON array of forecast records".to_string(),
        ));
    };

    let total = items.len();
    let records: Vec<LocalizedForecastRecord> = items
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| match serde_json::from_value::<ForecastRecord>(item) {
            Ok(record) => localize_record(record),
            Err(e) => {
                tracing::warn!("Dropping malformed forecast record #{}: {}", i, e);
                None
            }
        })
        .collect();

    if records.len() < total {
        tracing::warn!("Kept {} of {} forecast records", records.len(), total);
    }
    Ok(records)
}

/// All records of one spot, in arrival order.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SpotSeries {
    pub spot_id: i64,
    pub spot_name: String,
    pub records: Vec<LocalizedForecastRecord>,
}

/// Split a mixed batch into one series per spot, in order of first appearance.
pub fn group_by_spot(records: Vec<LocalizedForecastRecord>) -> Vec<SpotSeries> {
    let mut groups: Vec<SpotSeries> = Vec::new();
    for record in records {
        match groups.iter_mut().find(|g| g.spot_id == record.record.spot_id) {
            Some(group) => group.records.push(record),
            None => groups.push(SpotSeries {
                spot_id: record.record.spot_id,
                spot_name: record.record.spot_name.clone(),
                records: vec![record],
            }),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_timestamp_rfc3339() {
        let dt = parse_timestamp("2024-06-01T08:00:00Z").unwrap();
        assert_eq!(dt.timestamp(), 1717228800);
        let offset = parse_timestamp("2024-06-01T05:00:00-03:00").unwrap();
        assert_eq!(offset, dt);
    }

    #[test]
    fn test_parse_timestamp_http_date() {
        let dt = parse_timestamp("Sat, 01 Jun 2024 08:00:00 GMT").unwrap();
        assert_eq!(dt.timestamp(), 1717228800);
    }

    #[test]
    fn test_parse_timestamp_naive_is_utc() {
        assert_eq!(
            parse_timestamp("2024-06-01 08:00:00").unwrap().timestamp(),
            1717228800
        );
        assert_eq!(
            parse_timestamp("2024-06-01T08:00").unwrap().timestamp(),
            1717228800
        );
    }

    #[test]
    fn test_parse_timestamp_rejects_junk() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp("2024-13-01T00:00:00Z"), None);
    }

    #[test]
    fn test_local_labels_sao_paulo() {
        let instant = parse_timestamp("2024-06-01T02:00:00Z").unwrap();
        let (time, date_time) = local_labels(instant, resolve_timezone("America/Sao_Paulo"));
        assert_eq!(time, "23:00");
        assert_eq!(date_time, "31/05/2024, 23:00");
    }

    #[test]
    fn test_unknown_timezone_falls_back_to_utc() {
        assert_eq!(resolve_timezone("Mars/Olympus"), Tz::UTC);
    }

    #[test]
    fn test_ingest_drops_bad_records_keeps_rest() {
        let body = json!([
            {"spot_id": 1, "spot_name": "A", "timestamp_utc": "2024-06-01T08:00:00Z",
             "timezone": "America/Sao_Paulo", "wave_height_sg": 1.2,
             "local_time": "stale"},
            {"spot_id": 1, "spot_name": "A", "timestamp_utc": "garbage",
             "timezone": "America/Sao_Paulo"},
            {"spot_name": "no id", "timestamp_utc": "2024-06-01T08:00:00Z"},
            "not even an object",
            {"spot_id": 2, "spot_name": "B", "timestamp_utc": "2024-06-01T09:00:00Z",
             "timezone": "UTC"}
        ]);

        let records = ingest_forecasts(body).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].local_date_time, "01/06/2024, 05:00");
        assert_eq!(records[0].local_time, "05:00");
        assert!(!records[0].record.measurements.contains_key("local_time"));
        assert_eq!(records[1].local_date_time, "01/06/2024, 09:00");
    }

    #[test]
    fn test_ingest_rejects_non_array() {
        let result = ingest_forecasts(json!({"error": "nope"}));
        assert!(matches!(result, Err(AppError::DataShape(_))));
    }

    #[test]
    fn test_group_by_spot_first_appearance_order() {
        let body = json!([
            {"spot_id": 2, "spot_name": "B", "timestamp_utc": "2024-06-01T08:00:00Z"},
            {"spot_id": 1, "spot_name": "A", "timestamp_utc": "2024-06-01T08:00:00Z"},
            {"spot_id": 2, "spot_name": "B", "timestamp_utc": "2024-06-01T09:00:00Z"}
        ]);
        let groups = group_by_spot(ingest_forecasts(body).unwrap());
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].spot_name, "B");
        assert_eq!(groups[0].records.len(), 2);
        assert_eq!(groups[1].spot_id, 1);
    }
}
