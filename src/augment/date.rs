// src/augment/date.rs
//! Capture dates encoded in detection file names, and "latest snapshot"
//! selection for accumulated social-post files.
//!
//! Detection files are named `<2 chars><year>_<MM>_<DD>[_...]____<rest>`,
//! e.g. `0_2021_08_15____wildfire_coords.json`. The convention is a
//! compatibility contract with the satellite pipeline.

use std::path::{Path, PathBuf};

use crate::error::{AugmentError, Result};

const PREFIX_CHARS: usize = 2;
const DATE_TERMINATOR: &str = "____";

const MONTHS: [(&str, &str); 12] = [
    ("01", "January"),
    ("02", "February"),
    ("03", "March"),
    ("04", "April"),
    ("05", "May"),
    ("06", "June"),
    ("07", "July"),
    ("08", "August"),
    ("09", "September"),
    ("10", "October"),
    ("11", "November"),
    ("12", "December"),
];

/// Two-digit month number to its English name.
pub fn month_name(number: &str) -> Option<&'static str> {
    MONTHS
        .iter()
        .find(|(n, _)| *n == number)
        .map(|(_, name)| *name)
}

/// Calendar date of one satellite capture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureDate {
    pub year: i64,
    pub month: &'static str,
    pub day: i64,
    // Tokens as written in the file name; output names reuse them verbatim.
    year_token: String,
    day_token: String,
}

impl CaptureDate {
    /// `{year}_{MonthName}_{day}`, the prefix of every output artifact name.
    pub fn label(&self) -> String {
        format!("{}_{}_{}", self.year_token, self.month, self.day_token)
    }

    /// Exact equality on year, month name and day.
    pub fn matches(&self, year: i64, month: &str, day: i64) -> bool {
        self.year == year && self.month == month && self.day == day
    }
}

/// Parse the capture date out of a detection file name.
pub fn parse_capture_date(file_name: &str) -> Result<CaptureDate> {
    let fail = |reason: &str| AugmentError::DateParse {
        file_name: file_name.to_string(),
        reason: reason.to_string(),
    };

    let body: String = file_name.chars().skip(PREFIX_CHARS).collect();
    if body.is_empty() {
        return Err(fail("name is shorter than the two-character prefix"));
    }
    let end = body
        .find(DATE_TERMINATOR)
        .ok_or_else(|| fail("missing '____' date terminator"))?;

    let tokens: Vec<&str> = body[..end].split('_').collect();
    if tokens.len() < 3 {
        return Err(fail("expected year_month_day before the terminator"));
    }
    let (year_tok, month_tok, day_tok) = (tokens[0], tokens[1], tokens[2]);

    let year = parse_digits(year_tok).ok_or_else(|| fail("year is not numeric"))?;
    let month = month_name(month_tok).ok_or_else(|| fail("month must be 01..12"))?;
    let day = parse_digits(day_tok)
        .filter(|d| (1..=31).contains(d))
        .ok_or_else(|| fail("day must be 1..31"))?;

    Ok(CaptureDate {
        year,
        month,
        day,
        year_token: year_tok.to_string(),
        day_token: day_tok.to_string(),
    })
}

fn parse_digits(s: &str) -> Option<i64> {
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Ordering key for snapshot files: characters 5..20 of the file name.
pub fn snapshot_key(file_name: &str) -> String {
    file_name.chars().skip(5).take(15).collect()
}

/// The file whose name sorts last under [`snapshot_key`]; ties go to the full name.
pub fn latest_snapshot(files: &[PathBuf]) -> Option<&PathBuf> {
    files.iter().max_by(|a, b| {
        let (na, nb) = (file_name_of(a), file_name_of(b));
        snapshot_key(&na)
            .cmp(&snapshot_key(&nb))
            .then_with(|| na.cmp(&nb))
    })
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
