//! Ordered numeric transforms applied to an extracted value.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Largest scale a `Decimal` can carry.
const MAX_DECIMAL_PLACES: u32 = 28;

/// One step of a transform chain.
///
/// Serialized in the builder's shape: `{"type": "multiply", "value": 2}`,
/// `{"type": "round", "decimals": 2}`, `{"type": "floor"}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TransformStep {
    Multiply {
        #[serde(rename = "value", default = "unit")]
        factor: f64,
    },
    Divide {
        #[serde(rename = "value", default = "unit")]
        divisor: f64,
    },
    Round {
        #[serde(default)]
        decimals: u32,
    },
    Floor,
    Ceil,
    Abs,
    Percentage,
    None,
}

fn unit() -> f64 {
    1.0
}

impl TransformStep {
    /// Applies this single step.
    ///
    /// Division by zero follows IEEE semantics and yields an infinity or NaN.
    pub fn apply(&self, value: f64) -> f64 {
        match *self {
            TransformStep::Multiply { factor } => value * factor,
            TransformStep::Divide { divisor } => value / divisor,
            TransformStep::Round { decimals } => round_half_away_from_zero(value, decimals),
            TransformStep::Floor => value.floor(),
            TransformStep::Ceil => value.ceil(),
            TransformStep::Abs => value.abs(),
            TransformStep::Percentage => value * 100.0,
            TransformStep::None => value,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TransformStep::Multiply { .. } => "multiply",
            TransformStep::Divide { .. } => "divide",
            TransformStep::Round { .. } => "round",
            TransformStep::Floor => "floor",
            TransformStep::Ceil => "ceil",
            TransformStep::Abs => "abs",
            TransformStep::Percentage => "percentage",
            TransformStep::None => "none",
        }
    }
}

impl FromStr for TransformStep {
    type Err = String;

    /// Parses the command-line spelling: `multiply:2`, `divide:1e8`, `round:2`,
    /// `floor`, `ceil`, `abs`, `percentage`, `none`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, arg) = match s.split_once(':') {
            Some((name, arg)) => (name.trim(), Some(arg.trim())),
            None => (s.trim(), None),
        };

        let number = |arg: Option<&str>| -> Result<f64, String> {
            let arg = arg.ok_or_else(|| format!("'{name}' needs a value, e.g. {name}:2"))?;
            arg.parse::<f64>()
                .map_err(|_| format!("'{arg}' is not a number"))
        };

        match name.to_ascii_lowercase().as_str() {
            "multiply" => Ok(TransformStep::Multiply {
                factor: number(arg)?,
            }),
            "divide" => Ok(TransformStep::Divide {
                divisor: number(arg)?,
            }),
            "round" => {
                let decimals = match arg {
                    Some(a) => a
                        .parse::<u32>()
                        .map_err(|_| format!("'{a}' is not a decimal count"))?,
                    None => 0,
                };
                Ok(TransformStep::Round { decimals })
            }
            "floor" => Ok(TransformStep::Floor),
            "ceil" => Ok(TransformStep::Ceil),
            "abs" => Ok(TransformStep::Abs),
            "percentage" => Ok(TransformStep::Percentage),
            "none" => Ok(TransformStep::None),
            other => Err(format!("unknown transform '{other}'")),
        }
    }
}

/// Folds `steps` over `value` strictly left to right. An empty chain is the identity.
pub fn apply_transforms(value: f64, steps: &[TransformStep]) -> f64 {
    steps.iter().fold(value, |acc, step| step.apply(acc))
}

/// Rounds half away from zero at `decimals` places.
///
/// Works on the shortest decimal representation of `value`, so `2.345`
/// rounds to `2.35` even though its binary value sits just below the midpoint.
fn round_half_away_from_zero(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let decimals = decimals.min(MAX_DECIMAL_PLACES);

    match Decimal::from_str(&value.to_string()) {
        Ok(d) => d
            .round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero)
            .to_string()
            .parse::<f64>()
            .unwrap_or(value),
        // outside Decimal's range; binary rounding is the best we can do
        Err(_) => {
            let factor = 10f64.powi(decimals as i32);
            let scaled = value * factor;
            if scaled.is_finite() {
                scaled.round() / factor
            } else {
                value
            }
        }
    }
}
