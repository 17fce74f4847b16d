//! Small dense matrix products used by the sparse convolution kernels

use crate::dtype::Element;

/// Which operands of [`gemm`] are read transposed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transpose {
    /// `C = A · B`
    None,
    /// `C = A · Bᵀ`, B stored `n × k`
    B,
    /// `C = Aᵀ · B`, A stored `k × m`
    A,
}

/// Scalar row-major GEMM: `C (m × n) (+)= op(A) · op(B)` with inner size `k`.
///
/// When `accumulate` is false `c` is overwritten.
#[allow(clippy::too_many_arguments)]
pub fn gemm<T: Element>(
    a: &[T],
    b: &[T],
    c: &mut [T],
    m: usize,
    n: usize,
    k: usize,
    trans: Transpose,
    accumulate: bool,
) {
    debug_assert_eq!(c.len(), m * n);
    if !accumulate {
        c.fill(T::zero());
    }
    match trans {
        Transpose::None => {
            for i in 0..m {
                let c_row = &mut c[i * n..(i + 1) * n];
                for p in 0..k {
                    let a_ip = a[i * k + p];
                    let b_row = &b[p * n..(p + 1) * n];
                    for (cv, &bv) in c_row.iter_mut().zip(b_row) {
                        *cv = *cv + a_ip * bv;
                    }
                }
            }
        }
        Transpose::B => {
            for i in 0..m {
                let a_row = &a[i * k..(i + 1) * k];
                for j in 0..n {
                    let b_row = &b[j * k..(j + 1) * k];
                    let dot = a_row
                        .iter()
                        .zip(b_row)
                        .fold(T::zero(), |acc, (&x, &y)| acc + x * y);
                    c[i * n + j] = c[i * n + j] + dot;
                }
            }
        }
        Transpose::A => {
            for p in 0..k {
                let a_row = &a[p * m..(p + 1) * m];
                let b_row = &b[p * n..(p + 1) * n];
                for (i, &a_pi) in a_row.iter().enumerate() {
                    let c_row = &mut c[i * n..(i + 1) * n];
                    for (cv, &bv) in c_row.iter_mut().zip(b_row) {
                        *cv = *cv + a_pi * bv;
                    }
                }
            }
        }
    }
}

/// Copy rows `rows` of `src` (row width `width`) into consecutive rows of `dst`.
#[inline]
pub fn gather_rows<T: Element>(src: &[T], rows: &[usize], width: usize, dst: &mut Vec<T>) {
    dst.clear();
    dst.reserve(rows.len() * width);
    for &r in rows {
        dst.extend_from_slice(&src[r * width..(r + 1) * width]);
    }
}

/// Add consecutive rows of `src` into rows `rows` of `dst`.
#[inline]
pub fn scatter_add_rows<T: Element>(src: &[T], rows: &[usize], width: usize, dst: &mut [T]) {
    for (chunk, &r) in src.chunks_exact(width).zip(rows) {
        for (d, &s) in dst[r * width..(r + 1) * width].iter_mut().zip(chunk) {
            *d = *d + s;
        }
    }
}
