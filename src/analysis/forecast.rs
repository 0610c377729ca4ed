//! Linear-trend forecasting.
//!
//! Fits an ordinary-least-squares line to two numeric columns and
//! extrapolates a few steps past the last observed x.

use super::stats::{self, LinearFit};
use crate::config::ForecastConfig;
use crate::error::{EngineError, EngineResult};
use crate::models::{ForecastPoint, ForecastResult, ModelInfo, ObservedSummary, TrendDirection};
use crate::table::Table;
use tracing::debug;

/// Accepted forecast horizons.
pub const HORIZONS: std::ops::RangeInclusive<usize> = 3..=5;

/// Extrapolation step heuristic.
///
/// Narrow x ranges (below `unit_step_range`, e.g. years) advance one unit
/// per step; wider ranges advance by the average spacing `range / count`.
/// This is a heuristic and assumes roughly evenly spaced x values.
pub fn step_size(min_x: f64, max_x: f64, count: usize, unit_step_range: f64) -> f64 {
    let range = max_x - min_x;
    if range < unit_step_range || count == 0 {
        1.0
    } else {
        range / count as f64
    }
}

/// Forecasts `horizon` points of `y` against `x`.
pub fn forecast(
    table: &Table,
    x: &str,
    y: &str,
    horizon: usize,
    cfg: &ForecastConfig,
) -> EngineResult<ForecastResult> {
    let x_values = table
        .numeric_column(x)?
        .numbers()
        .unwrap_or_default();
    let y_values = table
        .numeric_column(y)?
        .numbers()
        .unwrap_or_default();

    if !HORIZONS.contains(&horizon) {
        return Err(EngineError::invalid_parameter(
            "horizon",
            horizon,
            "one of 3, 4 or 5",
        ));
    }

    let (xs, ys): (Vec<f64>, Vec<f64>) = x_values
        .iter()
        .zip(y_values)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .unzip();

    let context = format!("forecast of '{}' against '{}'", y, x);
    if xs.len() < 2 {
        return Err(EngineError::insufficient(context, 2, xs.len()));
    }

    let fit = LinearFit::fit(&xs, &ys).ok_or_else(|| {
        EngineError::insufficient(format!("{} (distinct x values)", context), 2, 1)
    })?;

    let min_x = stats::min(&xs).unwrap_or_default();
    let max_x = stats::max(&xs).unwrap_or_default();
    let step = step_size(min_x, max_x, xs.len(), cfg.unit_step_range);

    let predictions = (1..=horizon)
        .map(|i| {
            let future_x = max_x + i as f64 * step;
            ForecastPoint {
                x: future_x,
                y: fit.predict(future_x),
                step: i,
            }
        })
        .collect();

    let r_squared = fit.r_squared(&xs, &ys);
    debug!(
        "Fitted {} ~ {}: slope={:.4} intercept={:.4} r2={:.4}",
        y, x, fit.slope, fit.intercept, r_squared
    );

    Ok(ForecastResult {
        x_column: x.to_string(),
        y_column: y.to_string(),
        step_size: step,
        predictions,
        model: ModelInfo {
            r_squared,
            slope: fit.slope,
            intercept: fit.intercept,
            trend: TrendDirection::from_slope(fit.slope),
        },
        observed: ObservedSummary {
            min_x,
            max_x,
            min_y: stats::min(&ys).unwrap_or_default(),
            max_y: stats::max(&ys).unwrap_or_default(),
            count: xs.len(),
        },
    })
}
