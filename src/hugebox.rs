//! Huge-page allocation policy.
//!
//! [`HugeBox`] allocates a dedicated SysV shared memory segment backed by
//! huge pages (`SHM_HUGETLB`), constructs exactly one value inside it and
//! owns both until dropped. Acquisition is a three-step chain (create the
//! segment, map it, construct the value); every step before the last arms a
//! rollback that fires on early exit, so a failure never leaks a kernel
//! resource.

use crate::error::{Error, Result};
use crate::hugepage::hugepage_size;
use libc::{IPC_CREAT, IPC_PRIVATE, IPC_RMID, SHM_HUGETLB, SHM_R, SHM_W};
use log::{debug, trace};
use scopeguard::ScopeGuard;
use std::mem::MaybeUninit;
use std::ops::{Deref, DerefMut};
use std::ptr::{self, NonNull, null_mut};

/// Exclusively owning handle to a value constructed inside its own
/// huge-page segment.
///
/// Not clonable: the segment id must remain singular. Moving the handle
/// transfers ownership; the release sequence (drop the value, detach the
/// mapping, remove the segment, in that order) runs exactly once, when the
/// sole owner is dropped. Teardown is best-effort and never reports.
pub struct HugeBox<T> {
    ptr: NonNull<T>,
    shmid: libc::c_int,
}

unsafe impl<T: Send> Send for HugeBox<T> {}

impl<T> std::fmt::Debug for HugeBox<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HugeBox")
            .field("shmid", &self.shmid)
            .field("ptr", &self.ptr)
            .finish()
    }
}

impl<T> HugeBox<T> {
    /// Allocates a huge-page segment sized to exactly one `T` and
    /// default-constructs the value in it.
    ///
    /// Requires pre-reserved huge pages; see the [crate docs](crate).
    ///
    /// # Errors
    ///
    /// [`Error::SegmentCreate`] or [`Error::SegmentMap`], each carrying the
    /// originating OS error. Whether a failure is transient (no free huge
    /// pages) or permanent (missing group authorization) is not
    /// distinguished here; retrying is the caller's decision. Nothing is
    /// left behind on failure.
    pub fn new() -> Result<Self>
    where
        T: Default,
    {
        Self::with(T::default)
    }

    /// Like [`HugeBox::new`], but the value is produced by `init` and
    /// written into the mapped segment.
    ///
    /// The produced value passes through the caller's stack on its way into
    /// the segment. For payloads approaching the thread's stack size use
    /// [`HugeBox::new_in_place`], which never materialises the value
    /// outside the mapping.
    pub fn with(init: impl FnOnce() -> T) -> Result<Self> {
        Self::alloc(SHM_HUGETLB, init)
    }

    /// Allocates the segment and hands the mapped, uninitialised storage to
    /// `init`, so huge-page-scale payloads are constructed directly in
    /// place and never touch the stack.
    ///
    /// # Safety
    ///
    /// `init` must leave `slot` fully initialised when it returns; the
    /// handle assumes a live `T` from then on and drops it on release.
    pub unsafe fn new_in_place(init: impl FnOnce(&mut MaybeUninit<T>)) -> Result<Self> {
        unsafe { Self::alloc_in_place(SHM_HUGETLB, init) }
    }

    pub(crate) fn alloc(extra_flags: libc::c_int, init: impl FnOnce() -> T) -> Result<Self> {
        // the closure fully initialises the slot, so the contract holds
        unsafe { Self::alloc_in_place(extra_flags, |slot| { slot.write(init()); }) }
    }

    // Flags other than SHM_HUGETLB exist only so the test suite can run the
    // identical acquisition/release chain on plain SysV segments, which
    // need no reserved huge pages.
    //
    // Safety: as for new_in_place.
    pub(crate) unsafe fn alloc_in_place(
        extra_flags: libc::c_int,
        init: impl FnOnce(&mut MaybeUninit<T>),
    ) -> Result<Self> {
        let shmid = unsafe {
            libc::shmget(
                IPC_PRIVATE,
                size_of::<T>(),
                extra_flags | IPC_CREAT | SHM_R | SHM_W,
            )
        };
        if shmid < 0 {
            return Err(Error::SegmentCreate(std::io::Error::last_os_error()));
        }
        let segment = scopeguard::guard(shmid, |shmid| {
            unsafe { libc::shmctl(shmid, IPC_RMID, null_mut()) };
        });
        trace!("created segment {} ({} bytes)", shmid, size_of::<T>());

        let addr = unsafe { libc::shmat(shmid, null_mut(), 0) };
        if addr as isize == -1 {
            return Err(Error::SegmentMap(std::io::Error::last_os_error()));
        }
        let mapping = scopeguard::guard(addr, |addr| {
            unsafe { libc::shmdt(addr) };
        });
        trace!("mapped segment {} at {:p}", shmid, addr);

        // shmat addresses are SHMLBA (page) aligned, which satisfies T.
        let ptr = addr as *mut T;
        init(unsafe { &mut *ptr.cast::<MaybeUninit<T>>() });

        let handle = HugeBox {
            // addr is non-null: shmat returns a mapped address or -1
            ptr: unsafe { NonNull::new_unchecked(ptr) },
            shmid,
        };
        // The whole chain succeeded; defuse the rollbacks. Up to this point
        // an early exit detaches the mapping first, then removes the
        // segment (guards drop in reverse declaration order).
        ScopeGuard::into_inner(mapping);
        ScopeGuard::into_inner(segment);
        debug!(
            "allocated {} bytes in segment {} (host huge-page size: {:?})",
            size_of::<T>(),
            shmid,
            hugepage_size(),
        );
        Ok(handle)
    }
}

impl<T> Deref for HugeBox<T> {
    type Target = T;
    fn deref(&self) -> &T {
        unsafe { self.ptr.as_ref() }
    }
}

impl<T> DerefMut for HugeBox<T> {
    fn deref_mut(&mut self) -> &mut T {
        unsafe { self.ptr.as_mut() }
    }
}

impl<T> Drop for HugeBox<T> {
    fn drop(&mut self) {
        trace!("releasing segment {}", self.shmid);
        // Best effort: teardown has no safe path to report or retry, so
        // return codes are ignored and the sequence always runs through.
        unsafe {
            ptr::drop_in_place(self.ptr.as_ptr());
            libc::shmdt(self.ptr.as_ptr() as *const libc::c_void);
            libc::shmctl(self.shmid, IPC_RMID, null_mut());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn plain<T: Default>() -> Result<HugeBox<T>> {
        HugeBox::alloc(0, T::default)
    }

    fn segment_exists(shmid: libc::c_int) -> bool {
        let mut ds = unsafe { std::mem::zeroed::<libc::shmid_ds>() };
        unsafe { libc::shmctl(shmid, libc::IPC_STAT, &mut ds) == 0 }
    }

    // Counts registered segments of an exact size, so concurrent tests
    // allocating differently-sized segments cannot interfere.
    fn segments_of_size(size: usize) -> usize {
        let size = size.to_string();
        std::fs::read_to_string("/proc/sysvipc/shm")
            .map(|s| {
                s.lines()
                    .skip(1)
                    .filter(|line| line.split_whitespace().nth(3) == Some(size.as_str()))
                    .count()
            })
            .unwrap_or(0)
    }

    #[test]
    fn lifecycle_and_access() {
        let mut b = plain::<u64>().expect("plain segment");
        assert_eq!(*b, 0);
        *b = 42;
        assert_eq!(*b, 42);
        let shmid = b.shmid;
        assert!(segment_exists(shmid));
        drop(b);
        assert!(!segment_exists(shmid));
    }

    #[test]
    fn payload_dropped_exactly_once_across_moves() {
        static DROPS: AtomicUsize = AtomicUsize::new(0);

        #[derive(Default)]
        struct Probe {
            _pad: u64,
        }
        impl Drop for Probe {
            fn drop(&mut self) {
                DROPS.fetch_add(1, Ordering::SeqCst);
            }
        }

        let b = plain::<Probe>().expect("plain segment");
        let moved = b;
        let moved = std::thread::spawn(move || moved).join().unwrap();
        assert_eq!(DROPS.load(Ordering::SeqCst), 0);
        drop(moved);
        assert_eq!(DROPS.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_creation_reports_os_error() {
        // size 0 is below SHMMIN, shmget fails before any resource exists
        struct Empty;
        let err = HugeBox::alloc(0, || Empty).unwrap_err();
        match err {
            Error::SegmentCreate(io) => assert!(io.raw_os_error().is_some()),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn rollback_on_constructor_panic() {
        const SIZE: usize = 12345;
        let before = segments_of_size(SIZE);
        let panicked = std::panic::catch_unwind(|| {
            let _ = HugeBox::<[u8; SIZE]>::alloc(0, || panic!("constructor failure"));
        });
        assert!(panicked.is_err());
        // both guards fired during unwinding, nothing stayed registered
        assert_eq!(segments_of_size(SIZE), before);
    }
}
