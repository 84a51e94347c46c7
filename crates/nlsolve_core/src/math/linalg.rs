//! Dense linear-algebra adapter over `nalgebra`.
//!
//! The solvers own their scratch storage and work in place, so this module
//! provides fallible allocation plus in-place factorisations that reuse
//! caller buffers instead of allocating on every iteration:
//!
//! - [`try_vector`], [`try_matrix`], [`Permutation::try_new`]: allocation that
//!   reports [`SolverError::OutOfMemory`] instead of aborting
//! - [`lu_decomp`], [`lu_solve`], [`lu_invert`]: LU with partial pivoting
//! - [`cholesky_decomp_lower`], [`cholesky_solve_lower`]: Cholesky on the lower triangle
//! - [`syrk_lower`], [`gemv_t`], [`enorm`]: normal-equation building blocks

use nalgebra::{DMatrix, DVector};

use crate::types::SolverError;

/// Square root of the machine epsilon for `f64`.
pub const SQRT_DBL_EPSILON: f64 = 1.490_116_119_384_765_6e-8;

fn try_zeroed(len: usize, what: &str) -> Result<Vec<f64>, SolverError> {
    let mut storage = Vec::new();
    storage
        .try_reserve_exact(len)
        .map_err(|_| SolverError::out_of_memory(what, len))?;
    storage.resize(len, 0.0);
    Ok(storage)
}

/// Allocate a zeroed vector of length `n`.
///
/// # Errors
///
/// Returns `OutOfMemory` naming `what` if the storage cannot be reserved.
pub fn try_vector(n: usize, what: &str) -> Result<DVector<f64>, SolverError> {
    Ok(DVector::from_vec(try_zeroed(n, what)?))
}

/// Allocate a zeroed `rows × cols` matrix.
///
/// # Errors
///
/// Returns `OutOfMemory` naming `what` if the element count overflows or
/// the storage cannot be reserved.
///
/// # Example
///
/// ```
/// use nlsolve_core::math::linalg::try_matrix;
///
/// let m = try_matrix(2, 3, "scratch").unwrap();
/// assert_eq!(m.shape(), (2, 3));
/// assert!(try_matrix(usize::MAX, 2, "huge").is_err());
/// ```
pub fn try_matrix(rows: usize, cols: usize, what: &str) -> Result<DMatrix<f64>, SolverError> {
    let len = rows
        .checked_mul(cols)
        .ok_or_else(|| SolverError::out_of_memory(what, usize::MAX))?;
    Ok(DMatrix::from_vec(rows, cols, try_zeroed(len, what)?))
}

/// Row permutation produced by [`lu_decomp`].
///
/// `perm[i]` is the index of the original row that ended up at position `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permutation {
    data: Vec<usize>,
}

impl Permutation {
    /// Allocate the identity permutation of size `n`.
    pub fn try_new(n: usize) -> Result<Self, SolverError> {
        let mut data = Vec::new();
        data.try_reserve_exact(n)
            .map_err(|_| SolverError::out_of_memory("permutation", n))?;
        data.extend(0..n);
        Ok(Self { data })
    }

    /// Reset to the identity.
    pub fn init(&mut self) {
        for (i, p) in self.data.iter_mut().enumerate() {
            *p = i;
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` for the empty permutation.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Exchange positions `i` and `j`.
    pub fn swap(&mut self, i: usize, j: usize) {
        self.data.swap(i, j);
    }

    /// Permutation as a slice.
    pub fn as_slice(&self) -> &[usize] {
        &self.data
    }
}

fn check_square(a: &DMatrix<f64>) -> Result<usize, SolverError> {
    if !a.is_square() {
        return Err(SolverError::DimensionMismatch {
            expected: a.nrows(),
            got: a.ncols(),
        });
    }
    Ok(a.nrows())
}

fn check_len(expected: usize, got: usize) -> Result<(), SolverError> {
    if expected != got {
        return Err(SolverError::DimensionMismatch { expected, got });
    }
    Ok(())
}

/// Factorise `a = P⁻¹ L U` in place using Gaussian elimination with partial pivoting.
///
/// On return the strictly lower triangle of `a` holds `L` (unit diagonal
/// implied) and the upper triangle holds `U`. A zero pivot does not fail
/// here; it is reported by [`lu_solve`] and [`lu_invert`].
///
/// # Returns
///
/// The sign of the permutation (`+1` or `-1`).
pub fn lu_decomp(a: &mut DMatrix<f64>, perm: &mut Permutation) -> Result<i32, SolverError> {
    let n = check_square(a)?;
    check_len(n, perm.len())?;

    perm.init();
    let mut signum = 1;

    for j in 0..n {
        let mut max = a[(j, j)].abs();
        let mut i_pivot = j;
        for i in (j + 1)..n {
            let aij = a[(i, j)].abs();
            if aij > max {
                max = aij;
                i_pivot = i;
            }
        }

        if i_pivot != j {
            a.swap_rows(j, i_pivot);
            perm.swap(j, i_pivot);
            signum = -signum;
        }

        let ajj = a[(j, j)];
        if ajj != 0.0 {
            for i in (j + 1)..n {
                let aij = a[(i, j)] / ajj;
                a[(i, j)] = aij;
                for k in (j + 1)..n {
                    a[(i, k)] -= aij * a[(j, k)];
                }
            }
        }
    }

    Ok(signum)
}

fn check_nonsingular(lu: &DMatrix<f64>) -> Result<(), SolverError> {
    if (0..lu.nrows()).any(|i| lu[(i, i)] == 0.0) {
        return Err(SolverError::SingularMatrix);
    }
    Ok(())
}

/// Forward then backward substitution on an already permuted right-hand side.
fn lu_substitute(lu: &DMatrix<f64>, x: &mut [f64]) {
    let n = x.len();

    for i in 0..n {
        let mut sum = x[i];
        for k in 0..i {
            sum -= lu[(i, k)] * x[k];
        }
        x[i] = sum;
    }

    for i in (0..n).rev() {
        let mut sum = x[i];
        for k in (i + 1)..n {
            sum -= lu[(i, k)] * x[k];
        }
        x[i] = sum / lu[(i, i)];
    }
}

/// Solve `A x = b` given the factorisation from [`lu_decomp`].
///
/// # Errors
///
/// - `SingularMatrix` if `U` has a zero on its diagonal
/// - `DimensionMismatch` if `b` or `x` do not match the factorisation
pub fn lu_solve(
    lu: &DMatrix<f64>,
    perm: &Permutation,
    b: &DVector<f64>,
    x: &mut DVector<f64>,
) -> Result<(), SolverError> {
    let n = check_square(lu)?;
    check_len(n, perm.len())?;
    check_len(n, b.len())?;
    check_len(n, x.len())?;
    check_nonsingular(lu)?;

    for (i, &p) in perm.as_slice().iter().enumerate() {
        x[i] = b[p];
    }
    lu_substitute(lu, x.as_mut_slice());
    Ok(())
}

/// Compute `A⁻¹` into `inverse` given the factorisation from [`lu_decomp`].
///
/// # Errors
///
/// - `SingularMatrix` if `U` has a zero on its diagonal
/// - `DimensionMismatch` if `inverse` does not match the factorisation
pub fn lu_invert(
    lu: &DMatrix<f64>,
    perm: &Permutation,
    inverse: &mut DMatrix<f64>,
) -> Result<(), SolverError> {
    let n = check_square(lu)?;
    check_len(n, perm.len())?;
    check_len(n, inverse.nrows())?;
    check_len(n, inverse.ncols())?;
    check_nonsingular(lu)?;

    let storage = inverse.as_mut_slice();
    for j in 0..n {
        // DMatrix storage is column-major.
        let column = &mut storage[j * n..(j + 1) * n];
        for (i, &p) in perm.as_slice().iter().enumerate() {
            column[i] = if p == j { 1.0 } else { 0.0 };
        }
        lu_substitute(lu, column);
    }
    Ok(())
}

/// Factorise the symmetric matrix stored in the lower triangle of `a` as `L Lᵗ`, in place.
///
/// Only the lower triangle is read and written.
///
/// # Errors
///
/// `NotPositiveDefinite` if a pivot is not strictly positive (or is NaN).
pub fn cholesky_decomp_lower(a: &mut DMatrix<f64>) -> Result<(), SolverError> {
    let n = check_square(a)?;

    for j in 0..n {
        let mut d = a[(j, j)];
        for k in 0..j {
            d -= a[(j, k)] * a[(j, k)];
        }
        if !(d > 0.0) {
            return Err(SolverError::NotPositiveDefinite);
        }
        let ljj = d.sqrt();
        a[(j, j)] = ljj;

        for i in (j + 1)..n {
            let mut sum = a[(i, j)];
            for k in 0..j {
                sum -= a[(i, k)] * a[(j, k)];
            }
            a[(i, j)] = sum / ljj;
        }
    }
    Ok(())
}

/// Solve `L Lᵗ x = b` with the factor from [`cholesky_decomp_lower`].
pub fn cholesky_solve_lower(
    l: &DMatrix<f64>,
    b: &DVector<f64>,
    x: &mut DVector<f64>,
) -> Result<(), SolverError> {
    let n = check_square(l)?;
    check_len(n, b.len())?;
    check_len(n, x.len())?;

    for i in 0..n {
        let mut sum = b[i];
        for k in 0..i {
            sum -= l[(i, k)] * x[k];
        }
        x[i] = sum / l[(i, i)];
    }

    for i in (0..n).rev() {
        let mut sum = x[i];
        for k in (i + 1)..n {
            sum -= l[(k, i)] * x[k];
        }
        x[i] = sum / l[(i, i)];
    }
    Ok(())
}

/// Symmetric rank-k update `C = Aᵗ A`, writing only the lower triangle of `C`.
pub fn syrk_lower(a: &DMatrix<f64>, c: &mut DMatrix<f64>) -> Result<(), SolverError> {
    let p = a.ncols();
    check_len(p, c.nrows())?;
    check_len(p, c.ncols())?;

    for j in 0..p {
        for i in j..p {
            c[(i, j)] = a.column(i).dot(&a.column(j));
        }
    }
    Ok(())
}

/// Transposed matrix-vector product `y = Aᵗ x`.
pub fn gemv_t(a: &DMatrix<f64>, x: &DVector<f64>, y: &mut DVector<f64>) -> Result<(), SolverError> {
    check_len(a.nrows(), x.len())?;
    check_len(a.ncols(), y.len())?;
    y.gemv_tr(1.0, a, x, 0.0);
    Ok(())
}

/// Euclidean norm.
#[inline]
pub fn enorm(v: &DVector<f64>) -> f64 {
    v.norm()
}

/// Returns `true` if every component is finite.
#[inline]
pub fn all_finite(v: &DVector<f64>) -> bool {
    v.iter().all(|x| x.is_finite())
}
