//! Error taxonomy for capacity rounding and segment allocation.

/// Errors reported by this crate.
///
/// Teardown failures (`shmdt`/`shmctl` during release) are deliberately not
/// represented here: cleanup has no safe path to report or retry, so the
/// release sequence swallows them and always runs to completion.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Power-of-two ceiling requested for zero
    #[error("not a natural number")]
    NotNatural,
    /// No power of two greater than or equal to the request fits in `usize`
    #[error("no representable power of two >= {0}")]
    Pow2Overflow(usize),
    /// `shmget` refused to create the segment
    #[error("failed to create shared memory segment")]
    SegmentCreate(#[source] std::io::Error),
    /// `shmat` refused to map the segment
    #[error("failed to map shared memory segment")]
    SegmentMap(#[source] std::io::Error),
}

/// Result type for hugering operations.
pub type Result<T> = std::result::Result<T, Error>;
