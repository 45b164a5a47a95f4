// src/augment/classify.rs
//! Source classification by relative path.

use once_cell::sync::Lazy;
use regex::Regex;

/// What a registered source holds, as far as correlation is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// Satellite wildfire detections for one capture.
    Detection,
    /// Accumulated twitter posts about disasters.
    TwitterPost,
    /// Accumulated telegram posts about disasters.
    TelegramPost,
    Unrecognized,
}

struct Matcher {
    kind: SourceKind,
    path: &'static Lazy<Regex>,
    file_name: &'static Lazy<Regex>,
}

static SENTINEL_PATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"sentinel").expect("sentinel regex"));
static TWITTER_PATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"twitter").expect("twitter regex"));
static TELEGRAM_PATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"telegram").expect("telegram regex"));
static JSON_FILE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.json$").expect("json regex"));
static DATA_JSON_FILE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"data.*\.json$").expect("data json regex"));

// Order matters: the first matcher wins, which keeps the kinds disjoint.
static MATCHERS: [Matcher; 3] = [
    Matcher {
        kind: SourceKind::Detection,
        path: &SENTINEL_PATH,
        file_name: &JSON_FILE,
    },
    Matcher {
        kind: SourceKind::TwitterPost,
        path: &TWITTER_PATH,
        file_name: &DATA_JSON_FILE,
    },
    Matcher {
        kind: SourceKind::TelegramPost,
        path: &TELEGRAM_PATH,
        file_name: &DATA_JSON_FILE,
    },
];

impl SourceKind {
    /// Total classifier over relative paths.
    pub fn classify(relative_path: &str) -> SourceKind {
        let file_name = relative_path.rsplit('/').next().unwrap_or(relative_path);
        MATCHERS
            .iter()
            .find(|m| m.path.is_match(relative_path) && m.file_name.is_match(file_name))
            .map(|m| m.kind)
            .unwrap_or(SourceKind::Unrecognized)
    }

    /// Working subdirectory the source is downloaded into.
    pub fn work_subdir(&self) -> Option<&'static str> {
        match self {
            SourceKind::Detection => Some("wildfire_coords"),
            SourceKind::TwitterPost => Some("twitter_augment"),
            SourceKind::TelegramPost => Some("telegram_augment"),
            SourceKind::Unrecognized => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Detection => "detection",
            SourceKind::TwitterPost => "twitter",
            SourceKind::TelegramPost => "telegram",
            SourceKind::Unrecognized => "unrecognized",
        }
    }
}
