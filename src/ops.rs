use half::f16;
use std::fmt;
use std::ops::{Add, AddAssign, Mul, MulAssign};

use crate::buffer::RawBuf;
use crate::matrix::FixedMatrix;

// Addition. Both operands must be the exact same instantiated type; a shape
// mismatch is a type error, never a runtime check.

impl<T, const R: usize, const C: usize> AddAssign<&FixedMatrix<T, R, C>> for FixedMatrix<T, R, C>
where
    T: Add<Output = T> + Clone,
{
    fn add_assign(&mut self, rhs: &FixedMatrix<T, R, C>) {
        // Same instantiated type, so the kernel's shape-agreement contract
        // holds; &mut self rules out aliasing with rhs.
        unsafe { self.kernel_mut().add(rhs.buf().as_nonnull()) };
    }
}

impl<T, const R: usize, const C: usize> AddAssign for FixedMatrix<T, R, C>
where
    T: Add<Output = T> + Clone,
{
    fn add_assign(&mut self, rhs: FixedMatrix<T, R, C>) {
        *self += &rhs;
    }
}

impl<T, const R: usize, const C: usize> Add<&FixedMatrix<T, R, C>> for FixedMatrix<T, R, C>
where
    T: Add<Output = T> + Clone,
{
    type Output = FixedMatrix<T, R, C>;

    fn add(mut self, rhs: &FixedMatrix<T, R, C>) -> Self::Output {
        self += rhs;
        self
    }
}

impl<T, const R: usize, const C: usize> Add for FixedMatrix<T, R, C>
where
    T: Add<Output = T> + Clone,
{
    type Output = FixedMatrix<T, R, C>;

    fn add(self, rhs: FixedMatrix<T, R, C>) -> Self::Output {
        self + &rhs
    }
}

impl<T, const R: usize, const C: usize> Add<&FixedMatrix<T, R, C>> for &FixedMatrix<T, R, C>
where
    T: Add<Output = T> + Clone,
{
    type Output = FixedMatrix<T, R, C>;

    fn add(self, rhs: &FixedMatrix<T, R, C>) -> Self::Output {
        self.clone() + rhs
    }
}

impl<T, const R: usize, const C: usize> Add<FixedMatrix<T, R, C>> for &FixedMatrix<T, R, C>
where
    T: Add<Output = T> + Clone,
{
    type Output = FixedMatrix<T, R, C>;

    fn add(self, rhs: FixedMatrix<T, R, C>) -> Self::Output {
        self.clone() + &rhs
    }
}

// Scalar multiplication, scalar on the right.

impl<T, const R: usize, const C: usize> MulAssign<T> for FixedMatrix<T, R, C>
where
    T: Mul<Output = T> + Clone,
{
    fn mul_assign(&mut self, scalar: T) {
        self.kernel_mut().multiply_by_scalar(&scalar);
    }
}

impl<T, const R: usize, const C: usize> Mul<T> for FixedMatrix<T, R, C>
where
    T: Mul<Output = T> + Clone,
{
    type Output = FixedMatrix<T, R, C>;

    fn mul(mut self, scalar: T) -> Self::Output {
        self *= scalar;
        self
    }
}

impl<T, const R: usize, const C: usize> Mul<T> for &FixedMatrix<T, R, C>
where
    T: Mul<Output = T> + Clone,
{
    type Output = FixedMatrix<T, R, C>;

    fn mul(self, scalar: T) -> Self::Output {
        self.clone() * scalar
    }
}

// Scalar on the left. A blanket impl over every scalar is ruled out by
// coherence, so the supported element types are enumerated.
macro_rules! impl_scalar_lhs_mul {
    ($($t:ident),*) => {
        $(
            impl<const R: usize, const C: usize> Mul<FixedMatrix<$t, R, C>> for $t {
                type Output = FixedMatrix<$t, R, C>;

                fn mul(self, rhs: FixedMatrix<$t, R, C>) -> Self::Output {
                    rhs * self
                }
            }

            impl<const R: usize, const C: usize> Mul<&FixedMatrix<$t, R, C>> for $t {
                type Output = FixedMatrix<$t, R, C>;

                fn mul(self, rhs: &FixedMatrix<$t, R, C>) -> Self::Output {
                    rhs * self
                }
            }
        )*
    };
}

impl_scalar_lhs_mul!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64, f16);

// Matrix product. The shared parameter K is the compile-time dimension
// check: an R x K matrix multiplies only a K x C one. The right operand is
// transposed first so the kernel can take row-against-row inner products.

fn mat_mul<T, const R: usize, const K: usize, const C: usize>(
    lhs: &FixedMatrix<T, R, K>,
    rhs: &FixedMatrix<T, K, C>,
) -> FixedMatrix<T, R, C>
where
    T: Add<Output = T> + Mul<Output = T> + Clone,
{
    let rhs_t = rhs.transpose();
    let mut buf = RawBuf::with_capacity(R * C);
    unsafe {
        lhs.kernel()
            .multiply_to(buf.as_ptr_mut(), rhs_t.buf().as_nonnull(), C);
        buf.set_len(R * C);
    }
    FixedMatrix::from_buf(buf)
}

impl<T, const R: usize, const K: usize, const C: usize> Mul<&FixedMatrix<T, K, C>>
    for &FixedMatrix<T, R, K>
where
    T: Add<Output = T> + Mul<Output = T> + Clone,
{
    type Output = FixedMatrix<T, R, C>;

    fn mul(self, rhs: &FixedMatrix<T, K, C>) -> Self::Output {
        mat_mul(self, rhs)
    }
}

impl<T, const R: usize, const K: usize, const C: usize> Mul<FixedMatrix<T, K, C>>
    for &FixedMatrix<T, R, K>
where
    T: Add<Output = T> + Mul<Output = T> + Clone,
{
    type Output = FixedMatrix<T, R, C>;

    fn mul(self, rhs: FixedMatrix<T, K, C>) -> Self::Output {
        mat_mul(self, &rhs)
    }
}

impl<T, const R: usize, const K: usize, const C: usize> Mul<&FixedMatrix<T, K, C>>
    for FixedMatrix<T, R, K>
where
    T: Add<Output = T> + Mul<Output = T> + Clone,
{
    type Output = FixedMatrix<T, R, C>;

    fn mul(self, rhs: &FixedMatrix<T, K, C>) -> Self::Output {
        mat_mul(&self, rhs)
    }
}

impl<T, const R: usize, const K: usize, const C: usize> Mul<FixedMatrix<T, K, C>>
    for FixedMatrix<T, R, K>
where
    T: Add<Output = T> + Mul<Output = T> + Clone,
{
    type Output = FixedMatrix<T, R, C>;

    fn mul(self, rhs: FixedMatrix<T, K, C>) -> Self::Output {
        mat_mul(&self, &rhs)
    }
}

// Element-wise comparison in sequence order; same-shaped types only.

impl<T: PartialEq, const R: usize, const C: usize> PartialEq for FixedMatrix<T, R, C> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Eq, const R: usize, const C: usize> Eq for FixedMatrix<T, R, C> {}

impl<T: fmt::Display, const R: usize, const C: usize> fmt::Display for FixedMatrix<T, R, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kernel().format(f)
    }
}

impl<T: fmt::Debug, const R: usize, const C: usize> fmt::Debug for FixedMatrix<T, R, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FixedMatrix<{}x{}> ", R, C)?;
        f.debug_list().entries((0..R).map(|row| &self[row])).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_add_commutes() {
        let a = FixedMatrix::<i32, 2, 3>::from_slice(&[1, 2, 3, 4, 5, 6]);
        let b = FixedMatrix::<i32, 2, 3>::from_slice(&[10, 20, 30, 40, 50, 60]);
        assert_eq!(&a + &b, &b + &a);
        assert_eq!((&a + &b).as_slice(), &[11, 22, 33, 44, 55, 66]);
    }

    #[test]
    fn test_add_assign() {
        let mut a = FixedMatrix::<i32, 2, 2>::from_slice(&[1, 2, 3, 4]);
        let b = FixedMatrix::<i32, 2, 2>::ones();
        a += &b;
        assert_eq!(a.as_slice(), &[2, 3, 4, 5]);
        a += b;
        assert_eq!(a.as_slice(), &[3, 4, 5, 6]);
    }

    #[test]
    fn test_scalar_multiply_both_sides() {
        let a = FixedMatrix::<i32, 2, 2>::from_slice(&[1, 2, 3, 4]);
        assert_eq!((&a * 2).as_slice(), &[2, 4, 6, 8]);
        assert_eq!(2 * &a, &a * 2);
        let mut b = a.clone();
        b *= 10;
        assert_eq!(b, 10 * a);
    }

    #[test]
    fn test_scalar_multiply_f16() {
        let a = FixedMatrix::<f16, 1, 2>::ones();
        let doubled = f16::from_f32(2.0) * &a;
        assert_eq!(doubled.as_slice(), &[f16::from_f32(2.0); 2]);
    }

    #[test]
    fn test_scalar_round_trip_within_epsilon() {
        let a = FixedMatrix::<f64, 2, 3>::from_slice(&[1.5, -2.25, 3.0, 0.125, 7.5, -9.0]);
        let round = (&a * 3.7) * (1.0 / 3.7);
        for (x, y) in round.iter().zip(a.iter()) {
            assert!((x - y).abs() < 1e-12, "{} != {}", x, y);
        }
    }

    #[test]
    fn test_multiply_by_identity() {
        let a = FixedMatrix::<i32, 2, 2>::from_slice(&[1, 2, 3, 4]);
        let identity = FixedMatrix::<i32, 2, 2>::from_slice(&[1, 0, 0, 1]);
        assert_eq!(&a * &identity, a);
        assert_eq!(&identity * &a, a);
    }

    #[test]
    fn test_multiply_square() {
        let a = FixedMatrix::<i32, 2, 2>::from_slice(&[1, 2, 3, 4]);
        let b = FixedMatrix::<i32, 2, 2>::from_slice(&[5, 6, 7, 8]);
        let p = &a * &b;
        assert_eq!(p.as_slice(), &[19, 22, 43, 50]);
    }

    #[test]
    fn test_multiply_rectangular() {
        // (2x3) x (3x2) -> (2x2)
        let a = FixedMatrix::<i32, 2, 3>::from_slice(&[1, 2, 3, 4, 5, 6]);
        let b = FixedMatrix::<i32, 3, 2>::from_slice(&[7, 8, 9, 10, 11, 12]);
        let p: FixedMatrix<i32, 2, 2> = &a * &b;
        assert_eq!(p.as_slice(), &[58, 64, 139, 154]);
        // (3x2) x (2x3) -> (3x3)
        let q: FixedMatrix<i32, 3, 3> = b * a;
        assert_eq!(q.as_slice(), &[39, 54, 69, 49, 68, 87, 59, 82, 105]);
    }

    #[test]
    fn test_equality() {
        let a = FixedMatrix::<i32, 2, 2>::from_slice(&[1, 2, 3, 4]);
        let b = a.clone();
        let c = FixedMatrix::<i32, 2, 2>::from_slice(&[1, 2, 3, 5]);
        assert_eq!(a, b);
        assert!(a != c);
    }

    #[test]
    fn test_display() {
        let m = FixedMatrix::<i32, 2, 2>::from_slice(&[1, 2, 3, 4]);
        assert_eq!(format!("{}", m), "1 2 \n3 4 ");
        let single = FixedMatrix::<i32, 1, 3>::from_slice(&[7, 8, 9]);
        assert_eq!(format!("{}", single), "7 8 9 ");
    }

    #[test]
    fn test_debug() {
        let m = FixedMatrix::<i32, 2, 2>::from_slice(&[1, 2, 3, 4]);
        assert_eq!(format!("{:?}", m), "FixedMatrix<2x2> [[1, 2], [3, 4]]");
    }
}
