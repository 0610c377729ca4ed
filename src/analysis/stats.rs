//! Descriptive statistics and least-squares fitting over `f64` slices.
//!
//! Every function that could divide by zero or run over an empty slice
//! returns `Option`, so callers decide how an undefined value is reported.

use std::cmp::Ordering;
use std::collections::HashMap;

/// Arithmetic mean.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation (divides by `n`).
pub fn std_dev(values: &[f64]) -> Option<f64> {
    let avg = mean(values)?;
    let variance =
        values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

pub fn min(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::min)
}

pub fn max(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::max)
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    out.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    out
}

/// Percentile `p` in `[0, 1]` with linear interpolation between closest
/// ranks. `sorted_values` must be sorted ascending.
pub fn percentile_sorted(sorted_values: &[f64], p: f64) -> Option<f64> {
    if sorted_values.is_empty() {
        return None;
    }
    let rank = p.clamp(0.0, 1.0) * (sorted_values.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let frac = rank - lower as f64;
    Some(sorted_values[lower] + (sorted_values[upper] - sorted_values[lower]) * frac)
}

pub fn median(values: &[f64]) -> Option<f64> {
    percentile_sorted(&sorted(values), 0.5)
}

/// First, second and third quartiles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quartiles {
    pub q1: f64,
    pub q2: f64,
    pub q3: f64,
}

impl Quartiles {
    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }
}

pub fn quartiles(values: &[f64]) -> Option<Quartiles> {
    let sorted_values = sorted(values);
    Some(Quartiles {
        q1: percentile_sorted(&sorted_values, 0.25)?,
        q2: percentile_sorted(&sorted_values, 0.5)?,
        q3: percentile_sorted(&sorted_values, 0.75)?,
    })
}

/// Most frequent value; the smallest one when several tie.
pub fn mode(values: &[f64]) -> Option<f64> {
    let mut counts: HashMap<u64, (f64, usize)> = HashMap::new();
    for v in values {
        let v = if *v == 0.0 { 0.0 } else { *v };
        counts.entry(v.to_bits()).or_insert((v, 0)).1 += 1;
    }

    counts
        .into_values()
        .max_by(|(va, ca), (vb, cb)| {
            ca.cmp(cb)
                .then_with(|| vb.partial_cmp(va).unwrap_or(Ordering::Equal))
        })
        .map(|(v, _)| v)
}

/// Number of values outside `[Q1 - k*IQR, Q3 + k*IQR]`.
pub fn iqr_outlier_count(values: &[f64], multiplier: f64) -> usize {
    let Some(q) = quartiles(values) else {
        return 0;
    };
    let lower = q.q1 - multiplier * q.iqr();
    let upper = q.q3 + multiplier * q.iqr();
    values.iter().filter(|&&v| v < lower || v > upper).count()
}

/// `numerator / denominator`, undefined when the denominator is zero.
pub fn ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if denominator == 0.0 {
        return None;
    }
    let value = numerator / denominator;
    value.is_finite().then_some(value)
}

/// Coefficient of variation in percent.
pub fn coefficient_of_variation(values: &[f64]) -> Option<f64> {
    ratio(std_dev(values)?, mean(values)?).map(|cv| cv * 100.0)
}

/// Ordinary least-squares line `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    /// Fits a line through paired points. Undefined for fewer than two
    /// points or when every x is equal.
    pub fn fit(xs: &[f64], ys: &[f64]) -> Option<Self> {
        if xs.len() != ys.len() || xs.len() < 2 {
            return None;
        }
        let mean_x = mean(xs)?;
        let mean_y = mean(ys)?;

        let sxx: f64 = xs.iter().map(|x| (x - mean_x).powi(2)).sum();
        let sxy: f64 = xs
            .iter()
            .zip(ys)
            .map(|(x, y)| (x - mean_x) * (y - mean_y))
            .sum();

        let slope = ratio(sxy, sxx)?;
        Some(Self {
            slope,
            intercept: mean_y - slope * mean_x,
        })
    }

    /// Fits a line to a sequence indexed `0..n`.
    pub fn fit_indexed(ys: &[f64]) -> Option<Self> {
        let xs: Vec<f64> = (0..ys.len()).map(|i| i as f64).collect();
        Self::fit(&xs, ys)
    }

    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }

    /// Coefficient of determination over the given points. A constant `y`
    /// that the line reproduces exactly scores 1.0.
    pub fn r_squared(&self, xs: &[f64], ys: &[f64]) -> f64 {
        let Some(mean_y) = mean(ys) else {
            return 0.0;
        };
        let ss_tot: f64 = ys.iter().map(|y| (y - mean_y).powi(2)).sum();
        let ss_res: f64 = xs
            .iter()
            .zip(ys)
            .map(|(x, y)| (y - self.predict(*x)).powi(2))
            .sum();

        match ratio(ss_res, ss_tot) {
            Some(unexplained) => 1.0 - unexplained,
            None if ss_res == 0.0 => 1.0,
            None => 0.0,
        }
    }
}
