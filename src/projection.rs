/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Random linear projection from a frequency vector to a signature.
//!
//! The projection matrix is generated offline and loaded as a constant input;
//! it is never mutated at run time and can be shared by every stream.
//!
//! ```text
//! s[i] = Σ_j round(v[j] · M[i][j])        i in 0..E, j in 0..B
//! ```
//!
//! Each product is rounded to the nearest integer (half away from zero)
//! before summing, so signatures are integer-valued from the start.
//!
//! # Invariants
//!
//! - **PRJ-001**: the zero vector projects to the zero signature for any matrix.
//! - **PRJ-002**: the signature magnitude is `Σ|s[i]|`, independent of the
//!   vector's sample count.

use alloc::vec::Vec;

use crate::error::PhaseError;
use crate::signature::Signature;
use crate::vector::FrequencyVector;

/// Immutable `E × B` projection matrix, stored row-major.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "RawProjectionMatrix")
)]
pub struct ProjectionMatrix {
    rows: usize,
    cols: usize,
    weights: Vec<f64>,
}

/// Wire form of [`ProjectionMatrix`]; loading goes through the same shape
/// checks as [`ProjectionMatrix::new`].
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawProjectionMatrix {
    rows: usize,
    cols: usize,
    weights: Vec<f64>,
}

#[cfg(feature = "serde")]
impl TryFrom<RawProjectionMatrix> for ProjectionMatrix {
    type Error = PhaseError;

    fn try_from(raw: RawProjectionMatrix) -> Result<Self, Self::Error> {
        Self::new(raw.rows, raw.cols, raw.weights)
    }
}

impl ProjectionMatrix {
    /// Wrap a row-major weight buffer of `rows × cols` entries.
    pub fn new(rows: usize, cols: usize, weights: Vec<f64>) -> Result<Self, PhaseError> {
        if rows == 0 || cols == 0 {
            return Err(PhaseError::InvalidConfig("projection matrix has an empty dimension"));
        }
        let expected = rows * cols;
        if weights.len() != expected {
            return Err(PhaseError::LengthMismatch {
                expected,
                found: weights.len(),
            });
        }
        Ok(Self { rows, cols, weights })
    }

    /// Build from a slice of equally long rows.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self, PhaseError> {
        let cols = rows.first().map_or(0, |r| r.as_ref().len());
        let mut weights = Vec::with_capacity(rows.len() * cols);
        for row in rows {
            let row = row.as_ref();
            if row.len() != cols {
                return Err(PhaseError::LengthMismatch {
                    expected: cols,
                    found: row.len(),
                });
            }
            weights.extend_from_slice(row);
        }
        Self::new(rows.len(), cols, weights)
    }

    /// Signature dimensionality `E`.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Source histogram length `B`.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Weights of one output dimension, or `None` when out of range.
    pub fn row(&self, i: usize) -> Option<&[f64]> {
        if i >= self.rows {
            return None;
        }
        Some(&self.weights[i * self.cols..(i + 1) * self.cols])
    }

    /// Project `vector` down to an `E`-dimensional raw signature.
    ///
    /// The vector length must equal the matrix column count.
    pub fn project(&self, vector: &FrequencyVector) -> Result<Signature, PhaseError> {
        if vector.len() != self.cols {
            return Err(PhaseError::LengthMismatch {
                expected: self.cols,
                found: vector.len(),
            });
        }
        let bins = vector.bins();
        let elements = self
            .weights
            .chunks_exact(self.cols)
            .map(|row| {
                row.iter()
                    .zip(bins.iter())
                    .filter(|&(_, &count)| count != 0)
                    .map(|(&w, &count)| round_half_away(count as f64 * w))
                    .fold(0i64, i64::saturating_add)
            })
            .collect();
        Ok(Signature::new(elements))
    }
}

/// Round to the nearest integer, ties away from zero.
///
/// Written out by hand because `f64::round` lives in `std`.
fn round_half_away(x: f64) -> i64 {
    if x >= 0.0 {
        (x + 0.5) as i64
    } else {
        (x - 0.5) as i64
    }
}
