use core::ptr::{self, NonNull};
use rawpointer::PointerExt;
use std::fmt;
use std::ops::{Add, Mul};

use crate::error::{MatError, MatResult};

/// The size-erased arithmetic core shared by every matrix shape.
///
/// A kernel knows its row/column counts as runtime fields and holds a
/// non-owning handle to a contiguous row-major buffer supplied by its owner.
/// It never allocates or frees; the owner binds the buffer and keeps it
/// alive. Because the kernel is not generic over the dimensions, each
/// arithmetic loop is compiled once per element type rather than once per
/// shape pair.
pub struct StorageKernel<T> {
    rows: usize,
    cols: usize,
    data: Option<NonNull<T>>,
}

impl<T> StorageKernel<T> {
    /// A kernel with fixed dimensions and no buffer bound yet.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: None,
        }
    }

    /// Hands the kernel the buffer it operates on.
    ///
    /// # Safety
    ///
    /// `data` must point to `rows * cols` initialized elements that stay
    /// valid (and unaliased for the mutating operations) for as long as the
    /// kernel is bound to them.
    pub unsafe fn bind(&mut self, data: NonNull<T>) {
        self.data = Some(data);
    }

    pub fn unbind(&mut self) {
        self.data = None;
    }

    pub fn is_bound(&self) -> bool {
        self.data.is_some()
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn size(&self) -> usize {
        self.rows * self.cols
    }

    #[inline]
    fn bound(&self) -> NonNull<T> {
        match self.data {
            Some(ptr) => ptr,
            None => panic!("storage kernel is not bound to a buffer"),
        }
    }

    #[inline]
    fn slice(&self) -> &[T] {
        unsafe { std::slice::from_raw_parts(self.bound().as_ptr() as *const T, self.size()) }
    }

    #[inline]
    fn slice_mut(&mut self) -> &mut [T] {
        unsafe { std::slice::from_raw_parts_mut(self.bound().as_ptr(), self.size()) }
    }

    /// Checked element lookup at offset `row * cols + col`.
    ///
    /// Indexes are unsigned, so only the upper bounds need checking; the
    /// lower-bound ("negative index") case is unreachable.
    pub fn element_at(&self, row: usize, col: usize) -> MatResult<&T> {
        if row >= self.rows {
            return Err(MatError::RowOutOfRange {
                row,
                rows: self.rows,
            });
        }
        if col >= self.cols {
            return Err(MatError::ColOutOfRange {
                col,
                cols: self.cols,
            });
        }
        Ok(&self.slice()[row * self.cols + col])
    }

    pub fn element_at_mut(&mut self, row: usize, col: usize) -> MatResult<&mut T> {
        if row >= self.rows {
            return Err(MatError::RowOutOfRange {
                row,
                rows: self.rows,
            });
        }
        if col >= self.cols {
            return Err(MatError::ColOutOfRange {
                col,
                cols: self.cols,
            });
        }
        let offset = row * self.cols + col;
        Ok(&mut self.slice_mut()[offset])
    }

    pub fn fill(&mut self, value: &T)
    where
        T: Clone,
    {
        for elem in self.slice_mut() {
            *elem = value.clone();
        }
    }

    /// Element-wise in-place addition with a second buffer.
    ///
    /// # Safety
    ///
    /// `other` must point to at least `size()` initialized elements laid out
    /// row-major with this kernel's shape, and must not alias the bound
    /// buffer. The kernel performs no shape validation of its own; shape
    /// agreement is the caller's contract (normally discharged at compile
    /// time by the typed wrapper).
    pub unsafe fn add(&mut self, other: NonNull<T>)
    where
        T: Add<Output = T> + Clone,
    {
        let n = self.size();
        let src = std::slice::from_raw_parts(other.as_ptr() as *const T, n);
        for (dst, rhs) in self.slice_mut().iter_mut().zip(src) {
            *dst = dst.clone() + rhs.clone();
        }
    }

    /// In-place element-wise scalar multiplication.
    pub fn multiply_by_scalar(&mut self, scalar: &T)
    where
        T: Mul<Output = T> + Clone,
    {
        for elem in self.slice_mut() {
            *elem = elem.clone() * scalar.clone();
        }
    }

    // Seeds the accumulator with the first product so the element type does
    // not need a zero value.
    fn inner_product(a: &[T], b: &[T]) -> T
    where
        T: Add<Output = T> + Mul<Output = T> + Clone,
    {
        let mut acc = a[0].clone() * b[0].clone();
        for (x, y) in a[1..].iter().zip(&b[1..]) {
            acc = acc + x.clone() * y.clone();
        }
        acc
    }

    /// Writes `self × rhs` into `dest`, given rhs already transposed.
    ///
    /// `transposed` holds the transpose of the right operand, row-major with
    /// `transposed_rows` rows (the right operand's original column count).
    /// Each result cell is the inner product of one row of `self` with one
    /// row of the transposed buffer, written to `dest` in row-major order of
    /// the `rows() × transposed_rows` result.
    ///
    /// # Safety
    ///
    /// `transposed` must point to `cols() * transposed_rows` initialized
    /// elements and `dest` to writable (possibly uninitialized) storage for
    /// `rows() * transposed_rows` elements, none of it aliasing the bound
    /// buffer. The column count must be nonzero. Dimension agreement (this
    /// kernel's column count equals the right operand's row count) is the
    /// caller's contract.
    pub unsafe fn multiply_to(&self, dest: *mut T, transposed: NonNull<T>, transposed_rows: usize)
    where
        T: Add<Output = T> + Mul<Output = T> + Clone,
    {
        let lhs = self.slice();
        let rhs = std::slice::from_raw_parts(
            transposed.as_ptr() as *const T,
            self.cols * transposed_rows,
        );
        let mut dst = dest;
        let mut i = 0;
        while i < self.size() {
            let mut j = 0;
            while j < self.cols * transposed_rows {
                let cell = Self::inner_product(&lhs[i..i + self.cols], &rhs[j..j + self.cols]);
                ptr::write(dst.post_inc(), cell);
                j += self.cols;
            }
            i += self.cols;
        }
    }

    /// Writes the transpose of the bound buffer into `dest`.
    ///
    /// The walk indexes the destination: `dest[i]` lands at destination
    /// position `(i / rows, i % rows)` — the destination has `cols` rows of
    /// `rows` elements — and reads source position `(i % rows, i / rows)`.
    ///
    /// # Safety
    ///
    /// `dest` must be writable (possibly uninitialized) storage for
    /// `size()` elements not aliasing the bound buffer.
    pub unsafe fn transpose_to(&self, dest: *mut T)
    where
        T: Clone,
    {
        let src = self.slice();
        let mut dst = dest;
        for i in 0..self.rows * self.cols {
            let row = i / self.rows;
            let col = i % self.rows;
            ptr::write(dst.post_inc(), src[col * self.cols + row].clone());
        }
    }

    /// Space-terminated elements, newline-separated rows, no trailing
    /// newline. An unbound kernel renders nothing.
    pub fn format(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    where
        T: fmt::Display,
    {
        if self.data.is_none() {
            return Ok(());
        }
        let elems = self.slice();
        for row in 0..self.rows {
            for col in 0..self.cols {
                write!(f, "{} ", elems[row * self.cols + col])?;
            }
            if row < self.rows - 1 {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kernel_over<T>(buf: &mut [T], rows: usize, cols: usize) -> StorageKernel<T> {
        assert_eq!(buf.len(), rows * cols);
        let mut kernel = StorageKernel::new(rows, cols);
        unsafe { kernel.bind(NonNull::new(buf.as_mut_ptr()).unwrap()) };
        kernel
    }

    struct Rendered<T>(StorageKernel<T>);

    impl<T: fmt::Display> fmt::Display for Rendered<T> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            self.0.format(f)
        }
    }

    #[test]
    fn test_element_at() {
        let mut buf = vec![1, 2, 3, 4, 5, 6];
        let kernel = kernel_over(&mut buf, 2, 3);
        assert_eq!(*kernel.element_at(0, 0).unwrap(), 1);
        assert_eq!(*kernel.element_at(1, 2).unwrap(), 6);
        assert_eq!(
            kernel.element_at(2, 0),
            Err(MatError::RowOutOfRange { row: 2, rows: 2 })
        );
        assert_eq!(
            kernel.element_at(0, 3),
            Err(MatError::ColOutOfRange { col: 3, cols: 3 })
        );
    }

    #[test]
    fn test_fill_and_scalar_multiply() {
        let mut buf = vec![0; 9];
        let mut kernel = kernel_over(&mut buf, 3, 3);
        kernel.fill(&5);
        kernel.multiply_by_scalar(&2);
        assert_eq!(buf, vec![10; 9]);
    }

    #[test]
    fn test_add() {
        let mut buf = vec![1, 2, 3, 4];
        let mut other = vec![10, 20, 30, 40];
        let mut kernel = kernel_over(&mut buf, 2, 2);
        unsafe { kernel.add(NonNull::new(other.as_mut_ptr()).unwrap()) };
        assert_eq!(buf, vec![11, 22, 33, 44]);
    }

    #[test]
    fn test_transpose_square() {
        let mut buf = vec![1, 2, 3, 4];
        let kernel = kernel_over(&mut buf, 2, 2);
        let mut dest = Vec::with_capacity(4);
        unsafe {
            kernel.transpose_to(dest.as_mut_ptr());
            dest.set_len(4);
        }
        assert_eq!(dest, vec![1, 3, 2, 4]);
    }

    #[test]
    fn test_transpose_rectangular() {
        // 2x3 -> 3x2
        let mut buf = vec![1, 2, 3, 4, 5, 6];
        let kernel = kernel_over(&mut buf, 2, 3);
        let mut dest = Vec::with_capacity(6);
        unsafe {
            kernel.transpose_to(dest.as_mut_ptr());
            dest.set_len(6);
        }
        assert_eq!(dest, vec![1, 4, 2, 5, 3, 6]);
    }

    #[test]
    fn test_multiply_to() {
        // [1 2; 3 4] x [5 6; 7 8] = [19 22; 43 50]
        let mut lhs = vec![1, 2, 3, 4];
        // rhs pre-transposed: [5 7; 6 8]
        let mut rhs_t = vec![5, 7, 6, 8];
        let kernel = kernel_over(&mut lhs, 2, 2);
        let mut dest = Vec::with_capacity(4);
        unsafe {
            kernel.multiply_to(dest.as_mut_ptr(), NonNull::new(rhs_t.as_mut_ptr()).unwrap(), 2);
            dest.set_len(4);
        }
        assert_eq!(dest, vec![19, 22, 43, 50]);
    }

    #[test]
    fn test_multiply_to_rectangular() {
        // [1 2 3; 4 5 6] (2x3) x [1 0; 0 1; 1 1] (3x2) = [4 5; 10 11]
        let mut lhs = vec![1, 2, 3, 4, 5, 6];
        // rhs transposed row-major, 2 rows: [1 0 1; 0 1 1]
        let mut rhs_t = vec![1, 0, 1, 0, 1, 1];
        let kernel = kernel_over(&mut lhs, 2, 3);
        let mut dest = Vec::with_capacity(4);
        unsafe {
            kernel.multiply_to(dest.as_mut_ptr(), NonNull::new(rhs_t.as_mut_ptr()).unwrap(), 2);
            dest.set_len(4);
        }
        assert_eq!(dest, vec![4, 5, 10, 11]);
    }

    #[test]
    fn test_format() {
        let mut buf = vec![1, 2, 3, 4, 5, 6];
        let kernel = kernel_over(&mut buf, 2, 3);
        assert_eq!(format!("{}", Rendered(kernel)), "1 2 3 \n4 5 6 ");
    }

    #[test]
    fn test_format_unbound() {
        let kernel = StorageKernel::<i32>::new(2, 2);
        assert_eq!(format!("{}", Rendered(kernel)), "");
    }
}
