use chrono::{Datelike, NaiveDate, Weekday};

fn is_working_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Counts Monday-to-Friday days between `start` and `end`, both ends
/// inclusive. A reversed range counts as zero.
pub fn working_days_inclusive(start: NaiveDate, end: NaiveDate) -> u32 {
    if end < start {
        return 0;
    }
    start
        .iter_days()
        .take_while(|d| *d <= end)
        .filter(|d| is_working_day(*d))
        .count() as u32
}

/// Working-day age of an item: Monday-to-Friday days after `created`,
/// up to and including `today`. The creation day itself never counts,
/// so an item created today (or dated in the future) has age zero.
pub fn working_days_since(created: NaiveDate, today: NaiveDate) -> u32 {
    if today <= created {
        return 0;
    }
    working_days_inclusive(created.succ_opt().unwrap_or(today), today)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_working_days_inclusive_counts_both_ends() {
        // 2024-03-04 is a Monday
        assert_eq!(working_days_inclusive(date(2024, 3, 4), date(2024, 3, 8)), 5);
        // Monday through Sunday still five working days
        assert_eq!(
            working_days_inclusive(date(2024, 3, 4), date(2024, 3, 10)),
            5
        );
        // Two full calendar weeks
        assert_eq!(
            working_days_inclusive(date(2024, 3, 4), date(2024, 3, 15)),
            10
        );
    }

    #[test]
    fn test_working_days_inclusive_single_days() {
        // A lone weekday counts once, a weekend day not at all
        assert_eq!(working_days_inclusive(date(2024, 3, 6), date(2024, 3, 6)), 1);
        assert_eq!(working_days_inclusive(date(2024, 3, 9), date(2024, 3, 9)), 0);
    }

    #[test]
    fn test_working_days_inclusive_reversed_range() {
        assert_eq!(working_days_inclusive(date(2024, 3, 8), date(2024, 3, 4)), 0);
    }

    #[test]
    fn test_working_days_since_excludes_creation_day() {
        // Created Wednesday, aged on Friday: Thursday + Friday
        assert_eq!(working_days_since(date(2024, 3, 6), date(2024, 3, 8)), 2);
    }

    #[test]
    fn test_working_days_since_friday_to_monday_is_one() {
        // 2024-03-08 is a Friday, 2024-03-11 the following Monday
        assert_eq!(working_days_since(date(2024, 3, 8), date(2024, 3, 11)), 1);
    }

    #[test]
    fn test_working_days_since_same_day_and_future() {
        assert_eq!(working_days_since(date(2024, 3, 6), date(2024, 3, 6)), 0);
        assert_eq!(working_days_since(date(2024, 3, 8), date(2024, 3, 6)), 0);
    }

    #[test]
    fn test_working_days_since_weekend_creation() {
        // Created Saturday, aged on Monday: only Monday counts
        assert_eq!(working_days_since(date(2024, 3, 9), date(2024, 3, 11)), 1);
    }
}
