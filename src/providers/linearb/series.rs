use chrono::NaiveDate;
use std::collections::HashMap;

use crate::report::{CycleBreakdown, DaySeries};

use super::types::DailyCycleRow;

const MINUTES_PER_HOUR: f64 = 60.0;

/// Zero-fills sparse per-day values over an inclusive date range and
/// converts minutes to hours. Days absent from the input read as zero;
/// "no data" and "no activity" are deliberately indistinguishable in
/// the rendered series.
fn zero_filled_hours(
    by_date: &HashMap<NaiveDate, f64>,
    start: NaiveDate,
    end: NaiveDate,
) -> DaySeries {
    let dates: Vec<NaiveDate> = start.iter_days().take_while(|d| *d <= end).collect();
    let values = dates
        .iter()
        .map(|d| by_date.get(d).copied().unwrap_or(0.0) / MINUTES_PER_HOUR)
        .collect();
    DaySeries { dates, values }
}

fn phase_series(
    rows: &[DailyCycleRow],
    start: NaiveDate,
    end: NaiveDate,
    select: impl Fn(&DailyCycleRow) -> Option<f64>,
) -> DaySeries {
    let by_date: HashMap<NaiveDate, f64> = rows
        .iter()
        .filter_map(|row| select(row).map(|v| (row.date, v)))
        .collect();
    zero_filled_hours(&by_date, start, end)
}

/// Day-wise sum of the three sub-phase series. All inputs must share the
/// date axis the sub-phases were built over.
fn composite_cycle(coding: &DaySeries, pickup: &DaySeries, review: &DaySeries) -> DaySeries {
    let values = coding
        .values
        .iter()
        .zip(&pickup.values)
        .zip(&review.values)
        .map(|((c, p), r)| c + p + r)
        .collect();
    DaySeries {
        dates: coding.dates.clone(),
        values,
    }
}

/// Builds the four cycle-time day series from raw measurement rows: the
/// three sub-phases zero-filled over the identical range, plus the
/// composite cycle as their day-wise sum.
pub fn build_cycle_breakdown(
    rows: &[DailyCycleRow],
    start: NaiveDate,
    end: NaiveDate,
) -> CycleBreakdown {
    let coding = phase_series(rows, start, end, |r| r.coding_min);
    let pickup = phase_series(rows, start, end, |r| r.pickup_min);
    let review = phase_series(rows, start, end, |r| r.review_min);
    let cycle = composite_cycle(&coding, &pickup, &review);

    CycleBreakdown {
        coding,
        pickup,
        review,
        cycle,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Days;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn row(
        d: NaiveDate,
        coding: Option<f64>,
        pickup: Option<f64>,
        review: Option<f64>,
    ) -> DailyCycleRow {
        DailyCycleRow {
            date: d,
            coding_min: coding,
            pickup_min: pickup,
            review_min: review,
        }
    }

    #[test]
    fn test_zero_fill_covers_every_day_in_range() {
        let rows = vec![row(date(2024, 3, 6), Some(120.0), None, None)];
        let breakdown = build_cycle_breakdown(&rows, date(2024, 3, 4), date(2024, 3, 13));

        assert_eq!(breakdown.coding.dates.len(), 10);
        assert_eq!(breakdown.coding.values.len(), 10);
        for pair in breakdown.coding.dates.windows(2) {
            assert_eq!(pair[1], pair[0] + Days::new(1));
        }
        // 120 minutes on March 6, zero everywhere else
        assert_eq!(breakdown.coding.values[2], 2.0);
        let sum: f64 = breakdown.coding.values.iter().sum();
        assert_eq!(sum, 2.0);
    }

    #[test]
    fn test_null_metric_reads_as_zero() {
        let rows = vec![row(date(2024, 3, 4), None, Some(30.0), None)];
        let breakdown = build_cycle_breakdown(&rows, date(2024, 3, 4), date(2024, 3, 5));

        assert_eq!(breakdown.coding.values[0], 0.0);
        assert_eq!(breakdown.pickup.values[0], 0.5);
        assert_eq!(breakdown.review.values[0], 0.0);
    }

    #[test]
    fn test_composite_is_elementwise_sum() {
        let rows = vec![
            row(date(2024, 3, 4), Some(60.0), Some(30.0), Some(90.0)),
            row(date(2024, 3, 6), Some(120.0), None, Some(30.0)),
        ];
        let breakdown = build_cycle_breakdown(&rows, date(2024, 3, 4), date(2024, 3, 8));

        for i in 0..breakdown.cycle.values.len() {
            let expected = breakdown.coding.values[i]
                + breakdown.pickup.values[i]
                + breakdown.review.values[i];
            assert!((breakdown.cycle.values[i] - expected).abs() < 1e-9);
        }
        assert_eq!(breakdown.cycle.values[0], 3.0);
        assert_eq!(breakdown.cycle.dates, breakdown.coding.dates);
    }

    #[test]
    fn test_empty_rows_yield_zero_series() {
        let breakdown = build_cycle_breakdown(&[], date(2024, 3, 4), date(2024, 3, 8));

        assert_eq!(breakdown.cycle.dates.len(), 5);
        assert!(breakdown.cycle.values.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_single_day_range() {
        let rows = vec![row(date(2024, 3, 4), Some(60.0), Some(60.0), Some(60.0))];
        let breakdown = build_cycle_breakdown(&rows, date(2024, 3, 4), date(2024, 3, 4));

        assert_eq!(breakdown.cycle.dates.len(), 1);
        assert_eq!(breakdown.cycle.values[0], 3.0);
    }

    #[test]
    fn test_out_of_range_rows_ignored() {
        let rows = vec![row(date(2024, 2, 1), Some(600.0), None, None)];
        let breakdown = build_cycle_breakdown(&rows, date(2024, 3, 4), date(2024, 3, 8));

        assert!(breakdown.coding.values.iter().all(|v| *v == 0.0));
    }
}
