//! Dense matrices with compile-time dimensions.
//!
//! The crate is split along a storage/algorithm seam: [`StorageKernel`]
//! holds runtime row/column counts plus a borrowed buffer handle and
//! implements every arithmetic loop once per element type, while
//! [`FixedMatrix`] owns the heap buffer, carries the shape in its type, and
//! delegates all numeric work to the kernel it binds over its own storage.
//!
//! ```
//! use fixmat::{matrix, FixedMatrix};
//!
//! let a = matrix![[1, 2], [3, 4]];
//! let b = FixedMatrix::<i32, 2, 2>::ones();
//! let sum = &a + &b;
//! assert_eq!(*sum.at(0, 0).unwrap(), 2);
//!
//! let p = &a * &a.transpose();
//! assert_eq!(p[0], [5, 11]);
//! assert_eq!(p[1], [11, 25]);
//! ```
extern crate alloc;

mod buffer;
mod error;
mod kernel;
mod matrix;
mod ops;

pub use error::{MatError, MatResult};
pub use kernel::StorageKernel;
pub use matrix::FixedMatrix;

/// Builds a [`FixedMatrix`] from nested row lists, the shape inferred from
/// the literal.
///
/// ```
/// let m = fixmat::matrix![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
/// assert_eq!(m.rows(), 2);
/// assert_eq!(m.cols(), 3);
/// ```
#[macro_export]
macro_rules! matrix {
    ($([$($x:expr),* $(,)*]),+ $(,)*) => {{
        $crate::FixedMatrix::from_rows([$([$($x,)*],)*])
    }};
}
