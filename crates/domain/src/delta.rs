//! Classification of two consecutive cumulative counter samples.

/// Number of decimal places kept on a computed delta.
///
/// Counter values arrive as scaled integers (hundredths of a kWh), so six
/// places keep every real digit while dropping binary floating point noise
/// such as `1500.1 - 1500.0 = 0.100000000000023`.
pub const DELTA_DECIMALS: i32 = 6;

/// How a new cumulative sample relates to the previous one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeltaClass {
    /// The counter moved forward by this (strictly positive) amount.
    Increase(f64),
    /// The counter did not move.
    Unchanged,
    /// The counter moved backwards by this (strictly negative) amount,
    /// most likely a physical reset or replacement.
    Decrease(f64),
}

impl DeltaClass {
    /// Compare `current` against `prior`.
    #[must_use]
    pub fn classify(prior: f64, current: f64) -> Self {
        let delta = round_delta(current - prior);
        if delta > 0.0 {
            Self::Increase(delta)
        } else if delta < 0.0 {
            Self::Decrease(delta)
        } else {
            Self::Unchanged
        }
    }
}

/// Round a raw difference to [`DELTA_DECIMALS`] places.
#[must_use]
pub fn round_delta(delta: f64) -> f64 {
    let factor = 10_f64.powi(DELTA_DECIMALS);
    let rounded = (delta * factor).round() / factor;
    // Normalise `-0.0` so callers can compare against zero naively.
    if rounded == 0.0 { 0.0 } else { rounded }
}
