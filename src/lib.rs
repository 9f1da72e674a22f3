//! Fixed-capacity ring storage on Linux huge pages.
//!
//! This crate provides the allocation side of a ring buffer for
//! latency-sensitive workloads that want large contiguous memory with
//! minimal TLB pressure: a power-of-two capacity rounding function usable
//! in const context ([`pow2_ceil`]), a huge-page allocation policy yielding
//! exclusively-owning handles ([`HugeBox`]), and a storage type composed
//! from the two ([`Ring`], via the [`ring!`] macro).
//!
//! Huge pages are obtained through SysV shared memory (`SHM_HUGETLB`), one
//! dedicated segment per allocation. The host must have huge pages
//! pre-reserved and the caller's group authorized via the `vm.nr_hugepages`
//! and `vm.hugetlb_shm_group` kernel parameters; see
//! <https://www.kernel.org/doc/Documentation/vm/hugetlbpage.txt>. This
//! precondition is not verified beyond propagating the kernel's own errors.
//!
//! What this crate deliberately does not provide: circular read/write
//! semantics (no push/pop, no head/tail indices), cross-process sharing and
//! NUMA-aware placement. [`Ring`] is fixed storage only; the access
//! discipline on top of it is the caller's.

#![warn(missing_docs)]

mod error;
mod hugebox;
mod hugepage;
mod pow2;
mod ring;

pub use error::{Error, Result};
pub use hugebox::HugeBox;
pub use hugepage::hugepage_size;
pub use pow2::{checked_pow2_ceil, pow2_ceil};
pub use ring::Ring;
