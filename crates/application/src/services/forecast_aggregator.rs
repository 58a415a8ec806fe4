//! Forecast aggregation
//!
//! Collapses the provider's flat list of 3-hour samples into at most five
//! daily summaries. Pure and synchronous.
//!
//! Per UTC calendar day:
//! - `temp_min` / `temp_max`: rounded min and max sample temperature
//! - `humidity`: rounded mean
//! - `condition`: most frequent `main` group; ties go to the group that
//!   appeared first in the day's samples
//! - `icon`: first icon ending in `d`, otherwise the day's first icon
//! - `pop`: rounded maximum probability, as a percentage

use chrono::NaiveDate;
use domain::{DailySummary, ForecastSample};

/// Maximum number of days emitted
pub const MAX_FORECAST_DAYS: usize = 5;

/// Stateless daily forecast aggregator
#[derive(Debug, Clone, Copy, Default)]
pub struct ForecastAggregator;

impl ForecastAggregator {
    /// Aggregate samples into daily summaries, ascending by date
    ///
    /// Days beyond the fifth are dropped, never merged into earlier days.
    #[must_use]
    pub fn aggregate(samples: &[ForecastSample]) -> Vec<DailySummary> {
        let mut buckets = Self::bucket_by_day(samples);
        buckets.sort_by_key(|(date, _)| *date);
        buckets.truncate(MAX_FORECAST_DAYS);

        buckets
            .into_iter()
            .filter_map(|(date, day)| Self::summarize_day(date, &day))
            .collect()
    }

    /// Group samples by UTC date, keeping first-seen day order and
    /// the original sample order inside each day
    fn bucket_by_day(samples: &[ForecastSample]) -> Vec<(NaiveDate, Vec<&ForecastSample>)> {
        let mut buckets: Vec<(NaiveDate, Vec<&ForecastSample>)> = Vec::new();
        for sample in samples {
            let date = sample.timestamp.date_naive();
            match buckets.iter_mut().find(|(d, _)| *d == date) {
                Some((_, day)) => day.push(sample),
                None => buckets.push((date, vec![sample])),
            }
        }
        buckets
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )]
    fn summarize_day(date: NaiveDate, day: &[&ForecastSample]) -> Option<DailySummary> {
        let first = day.first()?;

        let temp_min = day.iter().map(|s| s.temp).fold(f64::INFINITY, f64::min);
        let temp_max = day.iter().map(|s| s.temp).fold(f64::NEG_INFINITY, f64::max);
        let humidity_sum: u32 = day.iter().map(|s| u32::from(s.humidity)).sum();
        let humidity = (f64::from(humidity_sum) / day.len() as f64).round();
        let pop = day.iter().map(|s| s.pop).fold(0.0_f64, f64::max);

        let dominant = Self::dominant_condition(day).unwrap_or(first);
        let icon = day
            .iter()
            .find(|s| s.icon.ends_with('d'))
            .map_or_else(|| first.icon.clone(), |s| s.icon.clone());

        Some(DailySummary {
            date,
            temp_min: temp_min.round() as i32,
            temp_max: temp_max.round() as i32,
            humidity: humidity.clamp(0.0, 100.0) as u8,
            condition: dominant.condition.main.clone(),
            condition_id: dominant.condition.id,
            description: dominant.condition.description.clone(),
            icon,
            pop: (pop * 100.0).round().clamp(0.0, 100.0) as u8,
        })
    }

    /// First sample of the most frequent `main` group
    ///
    /// Groups are tallied in first-appearance order and only a strictly
    /// higher count replaces the leader, so ties keep the earliest group.
    fn dominant_condition<'a>(day: &[&'a ForecastSample]) -> Option<&'a ForecastSample> {
        let mut tally: Vec<(&'a ForecastSample, usize)> = Vec::new();
        for sample in day {
            match tally
                .iter_mut()
                .find(|(seen, _)| seen.condition.main == sample.condition.main)
            {
                Some((_, count)) => *count += 1,
                None => tally.push((sample, 1)),
            }
        }

        let mut best: Option<(&'a ForecastSample, usize)> = None;
        for (sample, count) in tally {
            if best.is_none_or(|(_, best_count)| count > best_count) {
                best = Some((sample, count));
            }
        }
        best.map(|(sample, _)| sample)
    }
}
