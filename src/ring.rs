//! Fixed-capacity ring storage.

use crate::error::Result;
use crate::hugebox::HugeBox;
use std::mem::MaybeUninit;

/// Expands to the [`Ring`] type whose capacity is the power-of-two ceiling
/// of the requested size. The rounding happens in const context.
///
/// ```
/// use hugering::ring;
///
/// type Samples = ring!(u32, 100);
/// assert_eq!(Samples::capacity(), 128);
/// ```
#[macro_export]
macro_rules! ring {
    ($elem:ty, $n:expr) => {
        $crate::Ring<$elem, { $crate::pow2_ceil($n) }>
    };
}

/// Fixed-length element storage for a ring buffer.
///
/// The element array is embedded in the object itself, so the segment size
/// computed by the allocation policy covers it automatically; a `Ring`
/// never owns a separate buffer and never touches the ordinary heap. `CAP`
/// must be a power of two — use [`ring!`] to round a requested size up.
///
/// There is no public constructor: [`Ring::allocate`] is the only way to
/// obtain an instance, so every live `Ring` sits in its own huge-page
/// segment. The type defines no element access or push/pop semantics;
/// head/tail indices and overwrite policy belong to whatever structure is
/// built on top of this storage.
pub struct Ring<T, const CAP: usize> {
    // storage only; nothing in here reads it back
    #[allow(dead_code)]
    elems: [T; CAP],
}

impl<T, const CAP: usize> Ring<T, CAP> {
    const CAP_IS_POW2: () = assert!(
        CAP.is_power_of_two(),
        "ring capacity must be a power of two"
    );

    /// Number of element slots. Always a power of two.
    pub const fn capacity() -> usize {
        let _ = Self::CAP_IS_POW2;
        CAP
    }

    /// Allocates a ring in a dedicated huge-page segment, every slot
    /// default-initialised. The slots are written through the mapped
    /// pointer one at a time, so the array never materialises on the
    /// stack regardless of capacity.
    ///
    /// # Errors
    ///
    /// See [`HugeBox::new_in_place`]; the handle releases the segment when
    /// dropped.
    pub fn allocate() -> Result<HugeBox<Self>>
    where
        T: Copy + Default,
    {
        let _ = Self::CAP_IS_POW2;
        unsafe { HugeBox::new_in_place(Self::init_slots) }
    }

    // Fully initialises `slot`, as HugeBox's in-place contract requires.
    fn init_slots(slot: &mut MaybeUninit<Self>)
    where
        T: Copy + Default,
    {
        let elems = unsafe { &raw mut (*slot.as_mut_ptr()).elems }.cast::<T>();
        for i in 0..CAP {
            unsafe { elems.add(i).write(T::default()) };
        }
    }
}
