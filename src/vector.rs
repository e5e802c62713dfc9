/*
 * This source code is licensed under the Business Source License 1.1.
 * See LICENSE in the root directory for full details.
 */

//! Per-interval code-location histogram (basic block vector).
//!
//! A [`FrequencyVector`] counts how much straight-line execution landed in each
//! code-location bucket during one interval. Buckets are addresses folded into
//! range with a mask, so the length is always a power of two.
//!
//! # Invariants
//!
//! - **FV-001**: `len()` is a non-zero power of two and only changes through
//!   [`FrequencyVector::set_size`], which discards all content.
//! - **FV-002**: `samples()` counts calls to `sample`, not accumulated weight.
//! - **FV-003**: `clear()` restores the state of a freshly constructed vector of
//!   the same length.

use alloc::vec;
use alloc::vec::Vec;

use crate::error::PhaseError;

/// Histogram of execution weight per code-location bucket.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "RawFrequencyVector")
)]
pub struct FrequencyVector {
    bins: Vec<u64>,
    samples: u64,
}

impl FrequencyVector {
    /// Construct an all-zero vector with `len` buckets.
    ///
    /// `len` must be a non-zero power of two.
    pub fn new(len: usize) -> Result<Self, PhaseError> {
        check_len(len)?;
        Ok(Self {
            bins: vec![0; len],
            samples: 0,
        })
    }

    /// Number of buckets.
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    /// Always `false`: a vector has at least one bucket (FV-001).
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Number of `sample` calls since construction or the last `clear`.
    pub fn samples(&self) -> u64 {
        self.samples
    }

    /// Bucket counters in index order.
    pub fn bins(&self) -> &[u64] {
        &self.bins
    }

    /// Counter for one bucket, or `None` when out of range.
    pub fn get(&self, bucket: usize) -> Option<u64> {
        self.bins.get(bucket).copied()
    }

    /// Fold an address into this vector's bucket range: `address & (len - 1)`.
    pub fn bucket_for(&self, address: u64) -> usize {
        (address & (self.bins.len() as u64 - 1)) as usize
    }

    /// Add `weight` to `bins[bucket]` and count one sample.
    ///
    /// An out-of-range bucket means the caller's mask is wrong; it is reported
    /// rather than silently folded.
    pub fn sample(&mut self, bucket: usize, weight: u64) -> Result<(), PhaseError> {
        let len = self.bins.len();
        let bin = self
            .bins
            .get_mut(bucket)
            .ok_or(PhaseError::BucketOutOfRange { bucket, len })?;
        *bin = bin.saturating_add(weight);
        self.samples += 1;
        Ok(())
    }

    /// Zero every bucket and the sample count. Length is unchanged.
    pub fn clear(&mut self) {
        self.bins.iter_mut().for_each(|b| *b = 0);
        self.samples = 0;
    }

    /// Reinitialise to `len` zeroed buckets, discarding all content.
    pub fn set_size(&mut self, len: usize) -> Result<(), PhaseError> {
        check_len(len)?;
        self.bins = vec![0; len];
        self.samples = 0;
        Ok(())
    }

    /// Divide every bucket by the sample count in place (integer division).
    ///
    /// Returns [`PhaseError::EmptyVector`] and leaves the bins untouched when
    /// no samples have been taken.
    pub fn normalize(&mut self) -> Result<(), PhaseError> {
        if self.samples == 0 {
            return Err(PhaseError::EmptyVector);
        }
        let n = self.samples;
        self.bins.iter_mut().for_each(|b| *b /= n);
        Ok(())
    }

    /// Element-wise add `other` into `self`, summing sample counts too.
    ///
    /// Used when intervals are merged. Lengths must match.
    pub fn accumulate(&mut self, other: &FrequencyVector) -> Result<(), PhaseError> {
        if other.len() != self.len() {
            return Err(PhaseError::LengthMismatch {
                expected: self.len(),
                found: other.len(),
            });
        }
        for (a, b) in self.bins.iter_mut().zip(other.bins.iter()) {
            *a = a.saturating_add(*b);
        }
        self.samples += other.samples;
        Ok(())
    }

    /// Copy out the current contents and clear `self`, so accumulation can
    /// resume immediately while the copy is projected.
    pub fn take_snapshot(&mut self) -> FrequencyVector {
        let snapshot = self.clone();
        self.clear();
        snapshot
    }
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawFrequencyVector {
    bins: Vec<u64>,
    samples: u64,
}

#[cfg(feature = "serde")]
impl TryFrom<RawFrequencyVector> for FrequencyVector {
    type Error = PhaseError;

    fn try_from(raw: RawFrequencyVector) -> Result<Self, Self::Error> {
        check_len(raw.bins.len())?;
        Ok(Self {
            bins: raw.bins,
            samples: raw.samples,
        })
    }
}

fn check_len(len: usize) -> Result<(), PhaseError> {
    if len.is_power_of_two() {
        Ok(())
    } else {
        Err(PhaseError::NotPowerOfTwo { len })
    }
}
