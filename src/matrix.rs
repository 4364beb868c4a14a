use num_traits::{One, Zero};
use std::ops::{Index, IndexMut};

use crate::buffer::RawBuf;
use crate::error::MatResult;
use crate::kernel::StorageKernel;

/// A dense row-major matrix with compile-time dimensions.
///
/// `R` and `C` select a distinct type per shape; matrices of different
/// shapes never interconvert except through [`transpose`](Self::transpose)
/// and matrix multiplication, which produce a new shape. `C` defaults to
/// `R`, so `FixedMatrix<f64, 3>` is square.
///
/// The matrix exclusively owns a heap buffer of exactly `R * C` elements,
/// element `(r, c)` at offset `r * C + c`, and composes a [`StorageKernel`]
/// bound to that buffer; all numeric work routes through the kernel. The
/// buffer address is stable across moves, so the kernel's handle stays
/// valid wherever the owner goes, and a moved-from matrix is unreachable by
/// the borrow checker.
pub struct FixedMatrix<T, const R: usize, const C: usize = R> {
    buf: RawBuf<T>,
    kernel: StorageKernel<T>,
}

// A matrix shares nothing with other instances; the raw handle inside the
// kernel only ever points at the owned buffer.
unsafe impl<T: Send, const R: usize, const C: usize> Send for FixedMatrix<T, R, C> {}
unsafe impl<T: Sync, const R: usize, const C: usize> Sync for FixedMatrix<T, R, C> {}

impl<T, const R: usize, const C: usize> FixedMatrix<T, R, C> {
    const DIMS_OK: () = assert!(R > 0 && C > 0, "matrix dimensions must be non-zero");

    pub(crate) fn from_buf(buf: RawBuf<T>) -> Self {
        let _ = Self::DIMS_OK;
        debug_assert_eq!(buf.len(), R * C);
        let mut kernel = StorageKernel::new(R, C);
        unsafe { kernel.bind(buf.as_nonnull()) };
        Self { buf, kernel }
    }

    pub(crate) fn kernel(&self) -> &StorageKernel<T> {
        &self.kernel
    }

    pub(crate) fn kernel_mut(&mut self) -> &mut StorageKernel<T> {
        &mut self.kernel
    }

    pub(crate) fn buf(&self) -> &RawBuf<T> {
        &self.buf
    }

    /// Copies up to `R * C` values from `values` into row-major storage, in
    /// sequence order. Any excess is silently truncated; a short slice
    /// zero-fills the remaining cells.
    pub fn from_slice(values: &[T]) -> Self
    where
        T: Clone + Zero,
    {
        let mut buf = RawBuf::with_capacity(R * C);
        let take = values.len().min(R * C);
        buf.extend_cloned(&values[..take]);
        buf.fill(T::zero(), R * C - take);
        Self::from_buf(buf)
    }

    /// Shape-exact construction from nested row arrays.
    pub fn from_rows(rows: [[T; C]; R]) -> Self {
        let mut v = Vec::with_capacity(R * C);
        for row in rows {
            v.extend(row);
        }
        Self::from_buf(RawBuf::from_vec(v))
    }

    pub fn zeros() -> Self
    where
        T: Clone + Zero,
    {
        let mut buf = RawBuf::with_capacity(R * C);
        buf.fill(T::zero(), R * C);
        Self::from_buf(buf)
    }

    pub fn ones() -> Self
    where
        T: Clone + One,
    {
        let mut buf = RawBuf::with_capacity(R * C);
        buf.fill(T::one(), R * C);
        Self::from_buf(buf)
    }

    /// Checked element access; out-of-range indexes report the violated
    /// axis.
    pub fn at(&self, row: usize, col: usize) -> MatResult<&T> {
        self.kernel.element_at(row, col)
    }

    pub fn at_mut(&mut self, row: usize, col: usize) -> MatResult<&mut T> {
        self.kernel.element_at_mut(row, col)
    }

    pub fn size(&self) -> usize {
        self.kernel.size()
    }

    pub const fn rows(&self) -> usize {
        R
    }

    pub const fn cols(&self) -> usize {
        C
    }

    pub fn as_slice(&self) -> &[T] {
        self.buf.as_slice()
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.buf.as_slice_mut()
    }

    pub fn fill(&mut self, value: T)
    where
        T: Clone,
    {
        self.kernel.fill(&value);
    }

    /// The transpose as a new `C x R` matrix.
    pub fn transpose(&self) -> FixedMatrix<T, C, R>
    where
        T: Clone,
    {
        let mut buf = RawBuf::with_capacity(R * C);
        unsafe {
            self.kernel.transpose_to(buf.as_ptr_mut());
            buf.set_len(R * C);
        }
        FixedMatrix::from_buf(buf)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.as_mut_slice().iter_mut()
    }
}

impl<T: Clone + Zero, const R: usize, const C: usize> Default for FixedMatrix<T, R, C> {
    fn default() -> Self {
        Self::zeros()
    }
}

impl<T: Clone, const R: usize, const C: usize> Clone for FixedMatrix<T, R, C> {
    fn clone(&self) -> Self {
        let mut buf = RawBuf::with_capacity(R * C);
        buf.extend_cloned(self.as_slice());
        Self::from_buf(buf)
    }

    // Deep copy into the existing allocation.
    fn clone_from(&mut self, source: &Self) {
        for (dst, src) in self.as_mut_slice().iter_mut().zip(source.as_slice()) {
            dst.clone_from(src);
        }
    }
}

/// Unchecked row indexing: `m[r]` is the row as a borrowed slice, so
/// `m[r][c]` reads one cell. This is the fast path — an overrun surfaces as
/// a slice panic, not the axis-reporting error of [`at`](FixedMatrix::at).
/// The row view lives only as long as the borrow of the matrix.
impl<T, const R: usize, const C: usize> Index<usize> for FixedMatrix<T, R, C> {
    type Output = [T];

    fn index(&self, row: usize) -> &[T] {
        let start = row * C;
        &self.as_slice()[start..start + C]
    }
}

impl<T, const R: usize, const C: usize> IndexMut<usize> for FixedMatrix<T, R, C> {
    fn index_mut(&mut self, row: usize) -> &mut [T] {
        let start = row * C;
        &mut self.as_mut_slice()[start..start + C]
    }
}

impl<'a, T, const R: usize, const C: usize> IntoIterator for &'a FixedMatrix<T, R, C> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T, const R: usize, const C: usize> IntoIterator for &'a mut FixedMatrix<T, R, C> {
    type Item = &'a mut T;
    type IntoIter = std::slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl<T, const R: usize, const C: usize> IntoIterator for FixedMatrix<T, R, C> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    // Drains the buffer; the kernel is unbound first so the husk holds no
    // dangling handle.
    fn into_iter(mut self) -> Self::IntoIter {
        self.kernel.unbind();
        self.buf.take_as_vec().into_iter()
    }
}
