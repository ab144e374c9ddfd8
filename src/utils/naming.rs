use chrono::{DateTime, Datelike, Local};

/// Builds the archive name for one backup job.
///
/// Format: `<db>_<year>_<month>_<day>_<epoch millis>.tar.gz`, month and day
/// 1-based without zero padding. Existing buckets hold years of archives
/// named this way, so the format must not change. The millisecond component
/// keeps names from colliding across repeated runs on the same day.
pub fn archive_name(database: &str, at: DateTime<Local>) -> String {
    format!(
        "{}_{}_{}_{}_{}.tar.gz",
        database,
        at.year(),
        at.month(),
        at.day(),
        at.timestamp_millis()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn exact_format() {
        let at = Local.with_ymd_and_hms(2024, 3, 7, 1, 2, 3).unwrap();
        let name = archive_name("orders", at);
        assert_eq!(
            name,
            format!("orders_2024_3_7_{}.tar.gz", at.timestamp_millis())
        );
    }

    #[test]
    fn distinct_instants_give_distinct_names() {
        let first = Local.with_ymd_and_hms(2024, 3, 7, 1, 2, 3).unwrap();
        let second = first + chrono::Duration::milliseconds(1);
        assert_ne!(archive_name("orders", first), archive_name("orders", second));
    }

    #[test]
    fn month_and_day_are_not_zero_padded() {
        let at = Local.with_ymd_and_hms(2025, 1, 9, 0, 0, 0).unwrap();
        assert!(archive_name("all", at).starts_with("all_2025_1_9_"));
    }
}
