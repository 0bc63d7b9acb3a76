//! Session activity histograms
//!
//! Buckets session timestamps (unix seconds, UTC) by weekday and hour for
//! the player activity view.

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::Serialize;

/// Weekday and hour-of-day histograms for one player's sessions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityHistograms {
    /// Counts per weekday, index 0 = Sunday .. 6 = Saturday
    pub by_weekday: [u32; 7],
    /// Counts per hour of day, index 0..23
    pub by_hour: [u32; 24],
}

/// Bucket unix-second timestamps into weekday/hour histograms
///
/// Out-of-range values are skipped rather than counted.
pub fn activity_histograms(timestamps: &[i64]) -> ActivityHistograms {
    let mut by_weekday = [0u32; 7];
    let mut by_hour = [0u32; 24];

    for &t in timestamps {
        let Some(dt) = DateTime::<Utc>::from_timestamp(t, 0) else {
            continue;
        };
        by_weekday[dt.weekday().num_days_from_sunday() as usize] += 1;
        by_hour[dt.hour() as usize] += 1;
    }

    ActivityHistograms { by_weekday, by_hour }
}

/// Normalized view of a histogram: max, sum, and percent-of-max per bucket
#[derive(Debug, Clone, Serialize)]
pub struct NormalizedHistogram {
    pub max: u32,
    pub sum: u64,
    pub percents: Vec<f64>,
}

pub fn normalize(values: &[u32]) -> NormalizedHistogram {
    let max = values.iter().copied().max().unwrap_or(0);
    let sum = values.iter().map(|&v| u64::from(v)).sum();
    let percents = values
        .iter()
        .map(|&v| if max > 0 { f64::from(v) / f64::from(max) * 100.0 } else { 0.0 })
        .collect();
    NormalizedHistogram { max, sum, percents }
}

/// Reorder a Sunday-first weekday histogram to Monday-first for display
pub fn weekday_monday_first(values: &[u32; 7]) -> [u32; 7] {
    [
        values[1], values[2], values[3], values[4], values[5], values[6], values[0],
    ]
}
