/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Magnitude-adaptive 6-bit quantization of projected signatures.
//!
//! Each element keeps a 6-bit code: the two bits around the most significant
//! bit of the interval's average magnitude plus four bits of finer detail.
//!
//! ```text
//! avg   = Σ|s[i]| / E
//! shift = msb_index(avg)                         (bit-scan-reverse)
//! q[i]  = 63                                     if |s[i]| > 2·avg
//!       = (|s[i]| >> (shift − 4)) & 0x3f         otherwise
//! magnitude' = Σ q[i]
//! ```
//!
//! Because `|s[i]| ≤ 2·avg < 2^(shift+2)`, the shifted value always fits in six
//! bits and the mask never discards significant bits of an unclamped element.
//!
//! # Low-activity intervals
//!
//! When `avg` is zero or its MSB sits below bit 4 there is not enough dynamic
//! range to keep the fine bits. [`quantize`] reports this as
//! [`PhaseError::InsufficientRange`]; [`Quantizer`] applies the configured
//! [`LowActivityPolicy`] instead of failing the whole run.

use alloc::vec::Vec;

use crate::error::PhaseError;
use crate::signature::Signature;

/// Bits kept per quantized element.
pub const CODE_BITS: u32 = 6;

/// Largest representable code; also the saturation value for hot elements.
pub const MAX_CODE: i64 = (1 << CODE_BITS) - 1;

/// Fine-detail bits kept below the average's MSB.
pub const FINE_BITS: u32 = 4;

/// What to do with an interval whose average magnitude is too small to
/// quantize.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LowActivityPolicy {
    /// Keep the unquantized element magnitudes. Raw values in this regime are
    /// small (the average is below 16), so they stay comparable to 6-bit codes.
    #[default]
    RetainRaw,
    /// Fail the interval with [`PhaseError::InsufficientRange`].
    Reject,
}

/// Outcome of quantizing one interval.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Quantized {
    /// Elements are 6-bit codes in `[0, MAX_CODE]`.
    Coded(Signature),
    /// Low-activity fallback: elements are raw magnitudes.
    Raw(Signature),
}

impl Quantized {
    /// Signature to classify, regardless of how it was produced.
    pub fn into_signature(self) -> Signature {
        match self {
            Quantized::Coded(s) | Quantized::Raw(s) => s,
        }
    }

    /// `true` when the 6-bit encoding was applied.
    pub fn is_coded(&self) -> bool {
        matches!(self, Quantized::Coded(_))
    }
}

/// Index of the most significant set bit, or `None` for zero.
pub fn msb_index(x: u64) -> Option<u32> {
    if x == 0 {
        None
    } else {
        Some(63 - x.leading_zeros())
    }
}

/// Average element magnitude `Σ|s[i]| / E` (integer division).
pub fn average_magnitude(raw: &Signature) -> u64 {
    if raw.is_empty() {
        return 0;
    }
    raw.magnitude() / raw.len() as u64
}

/// Quantize `raw` against its own average magnitude.
pub fn quantize(raw: &Signature) -> Result<Signature, PhaseError> {
    quantize_with_average(raw, average_magnitude(raw))
}

/// Quantize `raw` against an explicit average magnitude.
///
/// Returns [`PhaseError::InsufficientRange`] when `avg` is zero or its MSB is
/// below [`FINE_BITS`].
pub fn quantize_with_average(raw: &Signature, avg: u64) -> Result<Signature, PhaseError> {
    let shift = match msb_index(avg) {
        Some(shift) if shift >= FINE_BITS => shift,
        other => {
            return Err(PhaseError::InsufficientRange {
                shift: other.unwrap_or(0),
            })
        }
    };
    let down = shift - FINE_BITS;
    let ceiling = avg.saturating_mul(2);

    let elements: Vec<i64> = raw
        .elements()
        .iter()
        .map(|e| {
            let m = e.unsigned_abs();
            if m > ceiling {
                MAX_CODE
            } else {
                ((m >> down) as i64) & MAX_CODE
            }
        })
        .collect();
    let magnitude = elements.iter().map(|&q| q as u64).sum();
    Ok(Signature::with_magnitude(elements, magnitude))
}

/// Applies 6-bit quantization with a low-activity fallback.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Quantizer {
    policy: LowActivityPolicy,
}

impl Quantizer {
    /// Construct a quantizer with the given fallback policy.
    pub fn new(policy: LowActivityPolicy) -> Self {
        Self { policy }
    }

    /// Configured fallback policy.
    pub fn policy(&self) -> LowActivityPolicy {
        self.policy
    }

    /// Quantize one projected signature.
    pub fn apply(&self, raw: &Signature) -> Result<Quantized, PhaseError> {
        match quantize(raw) {
            Ok(coded) => Ok(Quantized::Coded(coded)),
            Err(PhaseError::InsufficientRange { shift })
                if self.policy == LowActivityPolicy::RetainRaw =>
            {
                tracing::warn!(
                    shift,
                    magnitude = raw.magnitude(),
                    "low-activity interval, keeping raw signature"
                );
                let magnitudes = raw
                    .elements()
                    .iter()
                    .map(|e| e.unsigned_abs().min(i64::MAX as u64) as i64)
                    .collect();
                Ok(Quantized::Raw(Signature::new(magnitudes)))
            }
            Err(e) => Err(e),
        }
    }
}
