// src/augment/records.rs
//! Record types and the row-indexed JSON table format
//! (`{"0": {...}, "1": {...}}`) shared with the scraper pipelines.

use serde::Serialize;
use serde_json::{Map, Value};
use std::path::Path;

use crate::error::{AugmentError, Result};

pub const PLACEHOLDER: &str = "n/a";

type Row = Map<String, Value>;

/// Read a row-indexed table, rows ordered by their numeric index.
pub fn read_row_indexed(path: &Path) -> Result<Vec<Row>> {
    let invalid = |reason: String| AugmentError::InvalidTable {
        path: path.to_path_buf(),
        reason,
    };

    let content = std::fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&content)?;
    let Value::Object(table) = value else {
        return Err(invalid("expected an object keyed by row index".into()));
    };

    let mut rows = Vec::with_capacity(table.len());
    for (key, row) in table {
        let index: usize = key
            .trim()
            .parse()
            .map_err(|_| invalid(format!("row key '{key}' is not an index")))?;
        let Value::Object(row) = row else {
            return Err(invalid(format!("row {key} is not an object")));
        };
        rows.push((index, row));
    }
    rows.sort_by_key(|(i, _)| *i);
    Ok(rows.into_iter().map(|(_, r)| r).collect())
}

/// Write `rows` as a row-indexed table with 4-space indentation.
pub fn write_row_indexed<T: Serialize>(rows: &[T], path: &Path) -> Result<()> {
    let mut table = Map::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        table.insert(i.to_string(), serde_json::to_value(row)?);
    }

    let mut buf = Vec::new();
    let fmt = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, fmt);
    Value::Object(table).serialize(&mut ser)?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, buf)?;
    Ok(())
}

fn text(row: &Row, column: &str) -> Option<String> {
    match row.get(column)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn float(row: &Row, column: &str) -> Option<f64> {
    match row.get(column)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// Scrapers export year/day as ints, floats (15.0) or strings depending on gaps.
fn integer(row: &Row, column: &str) -> Option<i64> {
    match row.get(column)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// One satellite detection row. The date lives in the file name.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionRecord {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub status: Option<String>,
}

impl DetectionRecord {
    pub fn from_row(row: &Row) -> Self {
        Self {
            latitude: float(row, "latitude"),
            longitude: float(row, "longitude"),
            status: text(row, "status"),
        }
    }
}

pub fn load_detections(path: &Path) -> Result<Vec<DetectionRecord>> {
    Ok(read_row_indexed(path)?
        .iter()
        .map(DetectionRecord::from_row)
        .collect())
}

/// Social feed family a post table came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocialSource {
    Twitter,
    Telegram,
}

impl SocialSource {
    /// Column holding the post body.
    pub fn body_column(&self) -> &'static str {
        match self {
            SocialSource::Twitter => "Tweet",
            SocialSource::Telegram => "Telegram",
        }
    }

    pub fn status_label(&self, disaster_type: &str) -> String {
        match self {
            SocialSource::Twitter => format!("tweet about {disaster_type}"),
            SocialSource::Telegram => format!("telegram post about {disaster_type}"),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SocialSource::Twitter => "twitter",
            SocialSource::Telegram => "telegram",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SocialPost {
    /// `None` when the row lacks a usable date; such rows never match.
    pub year: Option<i64>,
    pub month: Option<String>,
    pub day: Option<i64>,
    pub title: Option<String>,
    pub body_text: Option<String>,
    pub extracted_location: Option<String>,
    pub resolved_latitude: Option<f64>,
    pub resolved_longitude: Option<f64>,
    pub disaster_type: String,
}

impl SocialPost {
    pub fn from_row(row: &Row, source: SocialSource) -> Self {
        Self {
            year: integer(row, "Year"),
            month: text(row, "Month"),
            day: integer(row, "Day"),
            title: text(row, "Title"),
            body_text: text(row, source.body_column()),
            extracted_location: text(row, "Extracted_Location"),
            resolved_latitude: float(row, "Resolved_Latitude"),
            resolved_longitude: float(row, "Resolved_Longitude"),
            disaster_type: text(row, "Disaster_Type").unwrap_or_else(|| "unknown".to_string()),
        }
    }
}

/// All posts of one social source, in table order. Read-only once loaded.
#[derive(Debug, Clone)]
pub struct SocialTable {
    pub source: SocialSource,
    pub posts: Vec<SocialPost>,
}

impl SocialTable {
    pub fn load(path: &Path, source: SocialSource) -> Result<Self> {
        let posts = read_row_indexed(path)?
            .iter()
            .map(|row| SocialPost::from_row(row, source))
            .collect();
        Ok(Self { source, posts })
    }
}

/// One output row. Column names follow the downstream tabular export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelatedRecord {
    #[serde(rename = "Status")]
    pub status_label: Option<String>,
    #[serde(rename = "Lattitude")]
    pub latitude: Option<f64>,
    #[serde(rename = "Longitude")]
    pub longitude: Option<f64>,
    #[serde(rename = "Title")]
    pub title: Option<String>,
    #[serde(rename = "Text")]
    pub body_text: Option<String>,
    #[serde(rename = "Location")]
    pub location: Option<String>,
}

impl CorrelatedRecord {
    pub fn from_detection(d: &DetectionRecord) -> Self {
        Self {
            status_label: d.status.clone(),
            latitude: d.latitude,
            longitude: d.longitude,
            title: Some(PLACEHOLDER.to_string()),
            body_text: Some(PLACEHOLDER.to_string()),
            location: Some(PLACEHOLDER.to_string()),
        }
    }

    pub fn from_post(p: &SocialPost, source: SocialSource) -> Self {
        Self {
            status_label: Some(source.status_label(&p.disaster_type)),
            latitude: p.resolved_latitude,
            longitude: p.resolved_longitude,
            title: p.title.clone(),
            body_text: p.body_text.clone(),
            location: p.extracted_location.clone(),
        }
    }
}
