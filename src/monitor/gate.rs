//! Change gate
//!
//! Decides which polled samples are worth emitting.

use crate::error::{DlcError, Result};
use crate::protocol::Value;

/// Suppresses samples that did not change enough since the last emission
///
/// - The first sample is always emitted.
/// - Without a threshold, a sample is emitted when it differs from the last
///   emitted one.
/// - With a threshold, a sample is emitted when `|sample - last| >= threshold`.
///   Integer samples against an integer threshold use exact integer
///   arithmetic; any float involved switches to `f64`.
#[derive(Debug, Clone)]
pub struct ChangeGate {
    threshold: Option<Value>,
    last: Option<Value>,
}

impl ChangeGate {
    /// Thresholds must be non-negative finite numbers
    pub fn new(threshold: Option<Value>) -> Result<Self> {
        if let Some(t) = &threshold {
            let valid = match t {
                Value::Integer(i) => *i >= 0,
                Value::Float(x) => x.is_finite() && *x >= 0.0,
                _ => false,
            };
            if !valid {
                return Err(DlcError::ThresholdType(format!(
                    "threshold must be a non-negative number, got {} {}",
                    t.type_name(),
                    t
                )));
            }
        }
        Ok(Self {
            threshold,
            last: None,
        })
    }

    /// Offer a sample; `Some` if it should be emitted
    pub fn offer(&mut self, sample: Value) -> Result<Option<Value>> {
        if let Some(threshold) = &self.threshold {
            if !sample.is_numeric() {
                return Err(DlcError::ThresholdType(format!(
                    "cannot apply threshold {} to {} sample {}",
                    threshold,
                    sample.type_name(),
                    sample
                )));
            }
        }

        let emit = match (&self.last, &self.threshold) {
            (None, _) => true,
            (Some(last), None) => *last != sample,
            (Some(last), Some(threshold)) => meets_threshold(last, &sample, threshold),
        };

        if emit {
            self.last = Some(sample.clone());
            Ok(Some(sample))
        } else {
            Ok(None)
        }
    }

    /// The most recently emitted sample
    pub fn last(&self) -> Option<&Value> {
        self.last.as_ref()
    }
}

fn meets_threshold(last: &Value, sample: &Value, threshold: &Value) -> bool {
    if let (Value::Integer(a), Value::Integer(b), Value::Integer(t)) = (last, sample, threshold) {
        return a.abs_diff(*b) >= t.unsigned_abs();
    }
    match (last.as_f64(), sample.as_f64(), threshold.as_f64()) {
        (Some(a), Some(b), Some(t)) => (b - a).abs() >= t,
        _ => false,
    }
}
