//! Piecewise-linear sampling curves for height shaping and edge falloff.

use serde::{Deserialize, Serialize};

/// One keyframe of a [`HeightCurve`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveKey {
    /// Sample position, normally in [0, 1].
    pub t: f32,
    /// Curve value at `t`.
    pub value: f32,
}

/// Piecewise-linear curve over [0, 1].
///
/// Stand-in for an authored animation curve: a sorted key list with linear
/// interpolation between neighbours and clamping outside the key range.
/// `Clone` is cheap on purpose — background workers evaluate a private copy
/// rather than sharing one across threads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeightCurve {
    keys: Vec<CurveKey>,
}

impl HeightCurve {
    /// Build a curve from `(t, value)` pairs. Keys are sorted by `t`.
    pub fn new(keys: impl IntoIterator<Item = (f32, f32)>) -> Self {
        let mut keys: Vec<CurveKey> =
            keys.into_iter().map(|(t, value)| CurveKey { t, value }).collect();
        keys.sort_by(|a, b| a.t.total_cmp(&b.t));
        Self { keys }
    }

    /// The identity curve: height values pass through unchanged.
    pub fn linear() -> Self {
        Self::new([(0.0, 0.0), (1.0, 1.0)])
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Evaluate the curve at `t`.
    ///
    /// Outside the key range the nearest key value is returned. An empty
    /// curve (rejected by settings validation) evaluates to `t` itself so a
    /// misconfigured caller degrades to the identity mapping.
    pub fn evaluate(&self, t: f32) -> f32 {
        let (first, last) = match (self.keys.first(), self.keys.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return t,
        };
        if t <= first.t {
            return first.value;
        }
        if t >= last.t {
            return last.value;
        }
        // Key counts are tiny (a handful of authored points); a linear scan
        // beats binary search bookkeeping here.
        for pair in self.keys.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if t <= b.t {
                let span = b.t - a.t;
                if span <= f32::EPSILON {
                    return b.value;
                }
                let s = (t - a.t) / span;
                return a.value + (b.value - a.value) * s;
            }
        }
        last.value
    }
}
