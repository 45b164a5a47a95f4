// src/augment/clock.rs
use chrono::{Local, NaiveDateTime};

/// Wall-clock source for output artifact names.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    /// `YYYYMMDD_HHMMSS`
    fn timestamp(&self) -> String {
        self.now().format("%Y%m%d_%H%M%S").to_string()
    }
}

/// Local time of the host, matching the scrapers' naming.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    struct Frozen(NaiveDateTime);

    impl Clock for Frozen {
        fn now(&self) -> NaiveDateTime {
            self.0
        }
    }

    #[test]
    fn timestamp_format() {
        let t = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(9, 5, 7)
            .unwrap();
        assert_eq!(Frozen(t).timestamp(), "20240301_090507");
    }
}
