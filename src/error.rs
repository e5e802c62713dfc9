//! Crate error type.
//!
//! Violated pipeline preconditions are returned as [`PhaseError`]; nothing in
//! the crate aborts on bad input.

/// Errors raised by the phase classification pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PhaseError {
    /// A sample targeted a bucket outside the frequency vector.
    #[error("bucket {bucket} out of range for vector of length {len}")]
    BucketOutOfRange {
        /// Offending bucket index.
        bucket: usize,
        /// Length of the vector that was sampled.
        len: usize,
    },

    /// Two vectors or signatures that must share a length do not.
    #[error("length mismatch: expected {expected}, found {found}")]
    LengthMismatch {
        /// Length required by the receiver.
        expected: usize,
        /// Length actually supplied.
        found: usize,
    },

    /// Frequency vector lengths must be powers of two so `address & (len - 1)`
    /// folds every address into range.
    #[error("vector length {len} is not a non-zero power of two")]
    NotPowerOfTwo {
        /// Rejected length.
        len: usize,
    },

    /// The interval's average magnitude leaves fewer than 4 bits below its
    /// most significant bit, so 6-bit quantization cannot be applied.
    #[error("quantization shift {shift} below the 4-bit minimum")]
    InsufficientRange {
        /// Most-significant-bit index of the average magnitude (0 when the
        /// average is zero).
        shift: u32,
    },

    /// `normalize` was called on a vector with no samples.
    #[error("cannot normalize a vector with zero samples")]
    EmptyVector,

    /// A configuration value is outside its accepted domain.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// Every phase id has been handed out; ids are never reused.
    #[error("phase id space exhausted")]
    PhaseIdsExhausted,

    /// The output destination could not be opened or written.
    #[cfg(feature = "std")]
    #[error("output sink: {0}")]
    Io(#[from] std::io::Error),
}
