//! Decoding temperature fallback plan.
//!
//! The engine decodes at the first temperature and moves to the next one
//! whenever the output fails a quality gate (compression ratio, average
//! log-probability). Building the plan performs no decoding.

use crate::error::{Error, Result};

/// Slack that keeps float drift from dropping the 1.0 rung.
pub const SCHEDULE_EPSILON: f64 = 1e-6;

/// Upper bound for generated temperatures.
const MAX_TEMPERATURE: f64 = 1.0;

/// Longest schedule accepted; a smaller increment is rejected.
pub const MAX_RUNGS: usize = 1000;

/// Ordered, non-decreasing, never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct TemperatureSchedule(Vec<f32>);

impl TemperatureSchedule {
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The temperature decoding starts at.
    pub fn first(&self) -> f32 {
        self.0[0]
    }

    pub fn last(&self) -> f32 {
        self.0[self.0.len() - 1]
    }

    /// Step between rungs, or `None` for a single-rung schedule.
    pub fn increment(&self) -> Option<f32> {
        match self.0.as_slice() {
            [a, b, ..] => Some(b - a),
            _ => None,
        }
    }
}

/// Build `[base, base + d, base + 2d, ...]` up to `1.0` (inclusive, within
/// [`SCHEDULE_EPSILON`]). Without an increment the schedule is just `[base]`.
pub fn build_schedule(base: f32, increment: Option<f32>) -> Result<TemperatureSchedule> {
    if !base.is_finite() || base < 0.0 {
        return Err(Error::validation(
            "temperature",
            format!("must be a finite value >= 0, got {base}"),
        ));
    }

    let Some(step) = increment else {
        return Ok(TemperatureSchedule(vec![base]));
    };

    if !step.is_finite() || step <= 0.0 {
        return Err(Error::validation(
            "temperature_increment_on_fallback",
            format!("must be greater than 0, got {step}"),
        ));
    }

    let base = f64::from(base);
    let step = f64::from(step);
    let stop = MAX_TEMPERATURE + SCHEDULE_EPSILON;

    // base + i * step rather than repeated addition, so rounding does not accumulate.
    let rungs = ((stop - base) / step).ceil().max(1.0);
    if rungs > MAX_RUNGS as f64 {
        return Err(Error::validation(
            "temperature_increment_on_fallback",
            format!("{step} yields more than {MAX_RUNGS} fallback temperatures"),
        ));
    }
    let rungs = rungs as usize;
    let temperatures = (0..rungs)
        .map(|i| (base + i as f64 * step) as f32)
        .collect();

    Ok(TemperatureSchedule(temperatures))
}
