//! Fill and drain rate estimation.
//!
//! Each gap-free segment is cut into rolling windows of `rate_window`
//! consecutive readings.  A window's slope is the **median** of its
//! consecutive-pair slopes, so one spiking sample cannot move it.  The fill
//! rate is the median of the positive window slopes and the drain rate the
//! median magnitude of the negative ones.
//!
//! The drain rate measured this way is the observed level decline while a
//! courier is draining, i.e. extraction net of concurrent inflow.

use cw_core::{minutes_between, DetectorConfig};

use crate::{LevelSeries, Reading};

/// Rates in volume/minute.  `None` when no window of that sign was seen.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
pub struct RateEstimate {
    pub fill_rate: Option<f64>,
    pub drain_rate: Option<f64>,
    pub fill_windows: usize,
    pub drain_windows: usize,
}

pub fn estimate_rates(series: &LevelSeries, cfg: &DetectorConfig) -> RateEstimate {
    let mut rising = Vec::new();
    let mut falling = Vec::new();

    for segment in series.segments(cfg.gap_threshold_minutes) {
        if segment.len() < 2 {
            continue;
        }
        let w = cfg.rate_window.max(2).min(segment.len());
        for window in segment.windows(w) {
            let Some(slope) = window_slope(window) else { continue };
            if slope > 0.0 {
                rising.push(slope);
            } else if slope < 0.0 {
                falling.push(-slope);
            }
        }
    }

    RateEstimate {
        fill_windows: rising.len(),
        drain_windows: falling.len(),
        fill_rate: median(&mut rising),
        drain_rate: median(&mut falling),
    }
}

fn window_slope(window: &[Reading]) -> Option<f64> {
    let mut slopes: Vec<f64> = window
        .windows(2)
        .filter_map(|pair| {
            let dt = minutes_between(pair[0].at, pair[1].at);
            (dt > 0.0).then(|| (pair[1].volume - pair[0].volume) / dt)
        })
        .collect();
    median(&mut slopes)
}

/// Median of `values` (mean of the middle two for even lengths).
pub(crate) fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    })
}
