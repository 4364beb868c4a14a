use alloc::alloc::{alloc, handle_alloc_error, Layout};
use core::ptr::{self, NonNull};
use std::mem::ManuallyDrop;

#[cold]
fn capacity_overflow() -> ! {
    panic!("capacity overflow");
}

pub(crate) struct SetLenOnDrop<'a> {
    len: &'a mut usize,
    local_len: usize,
}

impl<'a> SetLenOnDrop<'a> {
    #[inline]
    pub(crate) fn new(len: &'a mut usize) -> Self {
        SetLenOnDrop {
            local_len: *len,
            len,
        }
    }

    #[inline]
    pub(crate) fn increment_len(&mut self, increment: usize) {
        self.local_len += increment;
    }
}

impl Drop for SetLenOnDrop<'_> {
    #[inline]
    fn drop(&mut self) {
        *self.len = self.local_len;
    }
}

/// Uniquely-owned heap allocation backing one matrix. Allocated up front to
/// the full element count, filled incrementally, freed exactly once on drop.
pub(crate) struct RawBuf<P> {
    ptr: NonNull<P>,
    len: usize,
    cap: usize,
}

impl<P> RawBuf<P> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        if capacity == 0 {
            return Self {
                ptr: NonNull::<P>::dangling(),
                len: 0,
                cap: 0,
            };
        }
        let layout = match Layout::array::<P>(capacity) {
            Ok(layout) => layout,
            Err(_) => capacity_overflow(),
        };
        let ptr = if layout.size() == 0 {
            NonNull::<P>::dangling()
        } else {
            let ptr = unsafe { alloc(layout) } as *mut P;
            if ptr.is_null() {
                handle_alloc_error(layout)
            } else {
                unsafe { NonNull::<P>::new_unchecked(ptr) }
            }
        };
        Self {
            ptr,
            len: 0,
            cap: capacity,
        }
    }

    pub(crate) fn from_vec(v: Vec<P>) -> Self {
        let mut v = ManuallyDrop::new(v);
        let len = v.len();
        let cap = v.capacity();
        let ptr = unsafe { NonNull::new_unchecked(v.as_mut_ptr()) };
        Self { ptr, len, cap }
    }

    pub(crate) fn as_ptr_mut(&self) -> *mut P {
        self.ptr.as_ptr()
    }

    pub(crate) fn as_nonnull(&self) -> NonNull<P> {
        self.ptr
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn as_slice(&self) -> &[P] {
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr() as *const P, self.len) }
    }

    pub(crate) fn as_slice_mut(&mut self) -> &mut [P] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    /// Marks `len` elements as initialized.
    ///
    /// # Safety
    ///
    /// The first `len` elements must have been written and `len` must not
    /// exceed the allocated capacity.
    pub(crate) unsafe fn set_len(&mut self, len: usize) {
        debug_assert!(len <= self.cap);
        self.len = len;
    }

    /// Appends `n` clones of `elem` to the initialized prefix.
    pub(crate) fn fill(&mut self, elem: P, n: usize)
    where
        P: Clone,
    {
        assert!(self.len + n <= self.cap);
        unsafe {
            let mut ptr = self.as_ptr_mut().add(self.len);
            let mut local_len = SetLenOnDrop::new(&mut self.len);

            // Write all elements except the last one
            for _ in 1..n {
                ptr::write(ptr, elem.clone());
                ptr = ptr.add(1);
                // Increment the length in every step in case clone() panics
                local_len.increment_len(1);
            }

            if n > 0 {
                // We can write the last element directly without cloning needlessly
                ptr::write(ptr, elem);
                local_len.increment_len(1);
            }

            // len set by scope guard
        }
    }

    /// Appends clones of every element of `src`.
    pub(crate) fn extend_cloned(&mut self, src: &[P])
    where
        P: Clone,
    {
        assert!(self.len + src.len() <= self.cap);
        unsafe {
            let mut ptr = self.as_ptr_mut().add(self.len);
            let mut local_len = SetLenOnDrop::new(&mut self.len);
            for elem in src {
                ptr::write(ptr, elem.clone());
                ptr = ptr.add(1);
                local_len.increment_len(1);
            }
        }
    }

    pub(crate) fn take_as_vec(&mut self) -> Vec<P> {
        let capacity = self.cap;
        let len = self.len;
        self.len = 0;
        self.cap = 0;
        unsafe { Vec::from_raw_parts(self.ptr.as_ptr(), len, capacity) }
    }
}

impl<P> Drop for RawBuf<P> {
    fn drop(&mut self) {
        if self.cap != 0 {
            // Vec handles both the element drops and the deallocation.
            unsafe { drop(Vec::from_raw_parts(self.ptr.as_ptr(), self.len, self.cap)) };
        }
    }
}
