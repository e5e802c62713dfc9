//! Low-dimensional interval signatures and the distance used to compare them.
//!
//! A [`Signature`] is what survives of an interval after projection (and,
//! normally, quantization): `E` integer elements plus a magnitude
//! accumulator. Phase matching compares signatures by Manhattan distance
//! normalized by the probe's magnitude, so one threshold works across
//! intervals of very different total activity.

use alloc::vec::Vec;
use core::fmt;

use crate::error::PhaseError;

/// Projected (and optionally quantized) summary of one interval.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Signature {
    elements: Vec<i64>,
    magnitude: u64,
}

impl Signature {
    /// Build a signature whose magnitude is the sum of absolute element values.
    pub fn new(elements: Vec<i64>) -> Self {
        let magnitude = elements.iter().map(|e| e.unsigned_abs()).sum();
        Self { elements, magnitude }
    }

    /// Build a signature with an explicit magnitude accumulator.
    pub fn with_magnitude(elements: Vec<i64>, magnitude: u64) -> Self {
        Self { elements, magnitude }
    }

    /// Signature elements in dimension order.
    pub fn elements(&self) -> &[i64] {
        &self.elements
    }

    /// Number of dimensions (`E`).
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// `true` for a zero-dimensional signature.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Magnitude accumulator; divisor for normalized distance.
    pub fn magnitude(&self) -> u64 {
        self.magnitude
    }

    /// `true` when every element is zero.
    pub fn is_zero(&self) -> bool {
        self.elements.iter().all(|&e| e == 0)
    }
}

impl fmt::Display for Signature {
    /// Elements as decimal integers separated by single spaces.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.elements.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

/// Sum of absolute per-element differences.
pub fn manhattan(a: &Signature, b: &Signature) -> Result<u64, PhaseError> {
    if a.len() != b.len() {
        return Err(PhaseError::LengthMismatch {
            expected: a.len(),
            found: b.len(),
        });
    }
    Ok(a.elements
        .iter()
        .zip(b.elements.iter())
        .map(|(x, y)| x.abs_diff(*y))
        .sum())
}

/// Manhattan distance between a stored signature and a probe, divided by the
/// probe's magnitude.
///
/// A probe with zero magnitude has nothing to normalize against; the raw
/// Manhattan sum is returned instead of NaN or infinity.
pub fn normalized_distance(stored: &Signature, probe: &Signature) -> Result<f64, PhaseError> {
    let raw = manhattan(stored, probe)?;
    if probe.magnitude == 0 {
        return Ok(raw as f64);
    }
    Ok(raw as f64 / probe.magnitude as f64)
}
