//! SIMD-accelerated distance metrics for vector comparison.
//!
//! # Performance Strategy
//!
//! Uses 4-way accumulator unrolling to break FMA dependency chains:
//! - FMA latency: ~4 cycles
//! - FMA throughput: 0.5 cycles (2 ops/cycle)
//! - Single accumulator: Pipeline stalls, limited by latency
//! - Four accumulators: Pipeline stays full, limited by throughput
//!
//! Expected speedup: 4-6x on high-dimensional vectors (768-1536D)
//!
//! `squared_l2` intentionally never takes a square root — both index structures
//! compare distances against each other far more often than they need the true
//! Euclidean value, and the final `sqrt` is cheap enough to defer to the few call
//! sites (sphere containment) that need it.

use crate::error::BallastError;

/// Distance metric selectable at index construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// Squared Euclidean distance. Never negative, never takes a square root.
    SquaredEuclidean,
    /// `1 - dot(a, b)`, assuming both inputs are already L2-normalized.
    Cosine,
}

impl Metric {
    /// Dispatches to the metric's kernel. Returns `DimensionMismatch` if `a` and
    /// `b` differ in length.
    #[inline]
    pub fn distance(self, a: &[f32], b: &[f32]) -> Result<f32, BallastError> {
        check_dims(a, b)?;
        Ok(match self {
            Metric::SquaredEuclidean => squared_l2(a, b),
            Metric::Cosine => cosine_distance(a, b),
        })
    }
}

#[inline]
fn check_dims(a: &[f32], b: &[f32]) -> Result<(), BallastError> {
    if a.len() != b.len() {
        return Err(BallastError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }
    Ok(())
}

/// Compute squared L2 distance between two equal-length vectors with SIMD
/// acceleration.
///
/// # Architecture Dispatch
///
/// - x86_64 + AVX2: Uses AVX2 intrinsics (runtime detection)
/// - aarch64: Uses NEON intrinsics (always available)
/// - Fallback: Portable scalar implementation
///
/// Callers are responsible for matching lengths; use [`Metric::distance`] for a
/// checked entry point. `debug_assert_eq!` catches mismatches in debug builds,
/// the release build reads past the shorter slice's scalar tail like any other
/// unchecked index would.
#[inline]
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());

    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("avx2") {
            return unsafe { squared_l2_avx2(a, b) };
        }
    }

    #[cfg(target_arch = "aarch64")]
    {
        return unsafe { squared_l2_neon(a, b) };
    }

    squared_l2_scalar(a, b)
}

/// Scalar implementation (portable fallback).
#[inline]
pub fn squared_l2_scalar(a: &[f32], b: &[f32]) -> f32 {
    let mut sum = 0.0_f32;

    for i in 0..a.len() {
        let diff = a[i] - b[i];
        sum += diff * diff;
    }

    sum
}

/// AVX2 implementation with 4-way accumulator unrolling (x86_64 only).
///
/// Four independent accumulators keep the FMA pipeline full instead of
/// latency-bound on a single dependency chain.
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2", enable = "fma")]
unsafe fn squared_l2_avx2(a: &[f32], b: &[f32]) -> f32 {
    use std::arch::x86_64::*;

    let len = a.len();
    let mut i = 0;

    let mut sum0 = _mm256_setzero_ps();
    let mut sum1 = _mm256_setzero_ps();
    let mut sum2 = _mm256_setzero_ps();
    let mut sum3 = _mm256_setzero_ps();

    while i + 32 <= len {
        let va0 = unsafe { _mm256_loadu_ps(a.as_ptr().add(i)) };
        let vb0 = unsafe { _mm256_loadu_ps(b.as_ptr().add(i)) };
        let diff0 = _mm256_sub_ps(va0, vb0);

        let va1 = unsafe { _mm256_loadu_ps(a.as_ptr().add(i + 8)) };
        let vb1 = unsafe { _mm256_loadu_ps(b.as_ptr().add(i + 8)) };
        let diff1 = _mm256_sub_ps(va1, vb1);

        let va2 = unsafe { _mm256_loadu_ps(a.as_ptr().add(i + 16)) };
        let vb2 = unsafe { _mm256_loadu_ps(b.as_ptr().add(i + 16)) };
        let diff2 = _mm256_sub_ps(va2, vb2);

        let va3 = unsafe { _mm256_loadu_ps(a.as_ptr().add(i + 24)) };
        let vb3 = unsafe { _mm256_loadu_ps(b.as_ptr().add(i + 24)) };
        let diff3 = _mm256_sub_ps(va3, vb3);

        sum0 = _mm256_fmadd_ps(diff0, diff0, sum0);
        sum1 = _mm256_fmadd_ps(diff1, diff1, sum1);
        sum2 = _mm256_fmadd_ps(diff2, diff2, sum2);
        sum3 = _mm256_fmadd_ps(diff3, diff3, sum3);

        i += 32;
    }

    while i + 8 <= len {
        let va = unsafe { _mm256_loadu_ps(a.as_ptr().add(i)) };
        let vb = unsafe { _mm256_loadu_ps(b.as_ptr().add(i)) };
        let diff = _mm256_sub_ps(va, vb);
        sum0 = _mm256_fmadd_ps(diff, diff, sum0);
        i += 8;
    }

    let sum_combined = _mm256_add_ps(_mm256_add_ps(sum0, sum1), _mm256_add_ps(sum2, sum3));

    let sum_high = _mm256_extractf128_ps(sum_combined, 1);
    let sum_low = _mm256_castps256_ps128(sum_combined);
    let sum128 = _mm_add_ps(sum_low, sum_high);

    let sum64 = _mm_add_ps(sum128, _mm_movehl_ps(sum128, sum128));
    let sum32 = _mm_add_ss(sum64, _mm_shuffle_ps(sum64, sum64, 0x55));

    let mut total = _mm_cvtss_f32(sum32);

    while i < len {
        let diff = a[i] - b[i];
        total += diff * diff;
        i += 1;
    }

    total
}

/// NEON implementation with 4-way accumulator unrolling (aarch64).
#[cfg(target_arch = "aarch64")]
#[target_feature(enable = "neon")]
unsafe fn squared_l2_neon(a: &[f32], b: &[f32]) -> f32 {
    use std::arch::aarch64::*;

    let len = a.len();
    let mut i = 0;

    let mut sum0 = vdupq_n_f32(0.0);
    let mut sum1 = vdupq_n_f32(0.0);
    let mut sum2 = vdupq_n_f32(0.0);
    let mut sum3 = vdupq_n_f32(0.0);

    while i + 16 <= len {
        let va0 = vld1q_f32(a.as_ptr().add(i));
        let vb0 = vld1q_f32(b.as_ptr().add(i));
        let diff0 = vsubq_f32(va0, vb0);

        let va1 = vld1q_f32(a.as_ptr().add(i + 4));
        let vb1 = vld1q_f32(b.as_ptr().add(i + 4));
        let diff1 = vsubq_f32(va1, vb1);

        let va2 = vld1q_f32(a.as_ptr().add(i + 8));
        let vb2 = vld1q_f32(b.as_ptr().add(i + 8));
        let diff2 = vsubq_f32(va2, vb2);

        let va3 = vld1q_f32(a.as_ptr().add(i + 12));
        let vb3 = vld1q_f32(b.as_ptr().add(i + 12));
        let diff3 = vsubq_f32(va3, vb3);

        sum0 = vfmaq_f32(sum0, diff0, diff0);
        sum1 = vfmaq_f32(sum1, diff1, diff1);
        sum2 = vfmaq_f32(sum2, diff2, diff2);
        sum3 = vfmaq_f32(sum3, diff3, diff3);

        i += 16;
    }

    while i + 4 <= len {
        let va = vld1q_f32(a.as_ptr().add(i));
        let vb = vld1q_f32(b.as_ptr().add(i));
        let diff = vsubq_f32(va, vb);
        sum0 = vfmaq_f32(sum0, diff, diff);
        i += 4;
    }

    let sum_combined = vaddq_f32(vaddq_f32(sum0, sum1), vaddq_f32(sum2, sum3));

    let sum_pair = vpadd_f32(vget_low_f32(sum_combined), vget_high_f32(sum_combined));
    let sum_total = vpadd_f32(sum_pair, sum_pair);

    let mut total = vget_lane_f32(sum_total, 0);

    while i < len {
        let diff = a[i] - b[i];
        total += diff * diff;
        i += 1;
    }

    total
}

/// Dot product of two equal-length vectors.
#[inline]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// L2 norm of a vector.
#[inline]
pub fn norm(v: &[f32]) -> f32 {
    dot(v, v).sqrt()
}

/// Normalize `v` in place to unit L2 norm. If `known_norm` is provided it is
/// used instead of recomputing; a zero norm leaves `v` untouched.
#[inline]
pub fn normalize(v: &mut [f32], known_norm: Option<f32>) {
    let n = known_norm.unwrap_or_else(|| norm(v));
    if n == 0.0 {
        return;
    }
    for x in v.iter_mut() {
        *x /= n;
    }
}

/// `a - scale * b`, written into `out`. Used by neighbor-list maintenance math
/// that needs a displacement vector rather than just a scalar distance.
#[inline]
pub fn subtract_scaled(a: &[f32], b: &[f32], scale: f32, out: &mut [f32]) {
    debug_assert_eq!(a.len(), b.len());
    debug_assert_eq!(a.len(), out.len());
    for i in 0..a.len() {
        out[i] = a[i] - scale * b[i];
    }
}

/// Cosine distance assuming both inputs are already L2-normalized: `1 - dot(a, b)`.
#[inline]
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    1.0 - dot(a, b)
}
