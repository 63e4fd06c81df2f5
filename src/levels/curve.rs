use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Amount of xp needed to go from a level to the next one.
///
/// The bot awarding xp computes levels with its own copy of this formula,
/// so the configured curve must be the same as the bot's. Any difference
/// makes the cumulative xp shown by the dashboard disagree with the levels
/// stored by the bot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LevelCurve {
    /// `coefficient * level^exponent`
    Power { coefficient: f64, exponent: f64 },
    /// `a * level^2 + b * level + c`
    Polynomial { a: f64, b: f64, c: f64 },
}

impl Default for LevelCurve {
    fn default() -> Self {
        Self::Power {
            coefficient: 100.0,
            exponent: 1.8,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum CurveError {
    #[error("curve parameter `{0}` is not a finite number")]
    NotFinite(&'static str),
    #[error("curve gives no xp to complete level 1")]
    NotPositive,
    #[error("curve is not strictly increasing")]
    NotIncreasing,
    #[error("total xp overflows before level {0}")]
    Overflow(i64),
}

/// Highest level whose total xp must be representable.
pub const MAX_SUPPORTED_LEVEL: i64 = 1_000_000;

impl LevelCurve {
    /// Xp needed to complete `level`. Always 0 for `level <= 0`.
    pub fn xp_to_complete(&self, level: i64) -> f64 {
        if level <= 0 {
            return 0.0;
        }

        let level = level as f64;
        match *self {
            Self::Power {
                coefficient,
                exponent,
            } => coefficient * level.powf(exponent),
            Self::Polynomial { a, b, c } => a * level.powi(2) + b * level + c,
        }
    }

    /// Check the curve is strictly positive and strictly increasing for every level >= 1.
    pub fn validate(&self) -> Result<(), CurveError> {
        match *self {
            Self::Power {
                coefficient,
                exponent,
            } => {
                finite("coefficient", coefficient)?;
                finite("exponent", exponent)?;
                if coefficient <= 0.0 {
                    return Err(CurveError::NotPositive);
                }
                if exponent <= 0.0 {
                    return Err(CurveError::NotIncreasing);
                }
            }
            Self::Polynomial { a, b, c } => {
                finite("a", a)?;
                finite("b", b)?;
                finite("c", c)?;
                if a + b + c <= 0.0 {
                    return Err(CurveError::NotPositive);
                }
                // f(n + 1) - f(n) = a(2n + 1) + b, smallest at n = 1 when a >= 0
                if a < 0.0 || 3.0 * a + b <= 0.0 {
                    return Err(CurveError::NotIncreasing);
                }
            }
        }

        // Increasing, so the total up to the bound is at most this product
        let bound = self.xp_to_complete(MAX_SUPPORTED_LEVEL) * MAX_SUPPORTED_LEVEL as f64;
        if !bound.is_finite() {
            return Err(CurveError::Overflow(MAX_SUPPORTED_LEVEL));
        }

        Ok(())
    }
}

fn finite(name: &'static str, value: f64) -> Result<(), CurveError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(CurveError::NotFinite(name))
    }
}
