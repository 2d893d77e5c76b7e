// Dot product kernels for cosine scoring.
// Runtime feature detection picks AVX2/FMA on x86_64 and NEON on aarch64;
// everything else goes through the unrolled scalar path.

#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

#[cfg(target_arch = "aarch64")]
use std::arch::aarch64::*;

// Below these sizes the setup cost outweighs the wide loads.
#[cfg(target_arch = "x86_64")]
const MIN_DIM_SIZE_AVX: usize = 32;

#[cfg(target_arch = "aarch64")]
const MIN_DIM_SIZE_NEON: usize = 16;

/// Dot product of two equal-length slices.
///
/// Returns `0.0` when the lengths differ; callers that care check
/// dimensions before scoring.
#[inline]
pub fn dot_product_simd(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("avx2")
            && is_x86_feature_detected!("fma")
            && a.len() >= MIN_DIM_SIZE_AVX
        {
            return unsafe { dot_product_avx2(a, b) };
        }
    }

    #[cfg(target_arch = "aarch64")]
    {
        if std::arch::is_aarch64_feature_detected!("neon") && a.len() >= MIN_DIM_SIZE_NEON {
            return unsafe { dot_product_neon(a, b) };
        }
    }

    dot_product_scalar(a, b)
}

/// AVX2 dot product, 16 lanes per iteration across two accumulators.
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2", enable = "fma")]
#[inline]
unsafe fn dot_product_avx2(a: &[f32], b: &[f32]) -> f32 {
    let dim = a.len();
    let mut i = 0;

    let mut acc_lo = _mm256_setzero_ps();
    let mut acc_hi = _mm256_setzero_ps();

    while i + 16 <= dim {
        let a_lo = _mm256_loadu_ps(a.as_ptr().add(i));
        let b_lo = _mm256_loadu_ps(b.as_ptr().add(i));
        let a_hi = _mm256_loadu_ps(a.as_ptr().add(i + 8));
        let b_hi = _mm256_loadu_ps(b.as_ptr().add(i + 8));

        acc_lo = _mm256_fmadd_ps(a_lo, b_lo, acc_lo);
        acc_hi = _mm256_fmadd_ps(a_hi, b_hi, acc_hi);

        i += 16;
    }

    let acc = _mm256_add_ps(acc_lo, acc_hi);
    let upper = _mm256_extractf128_ps(acc, 1);
    let lower = _mm256_castps256_ps128(acc);
    let mut folded = _mm_add_ps(upper, lower);
    folded = _mm_hadd_ps(folded, folded);
    folded = _mm_hadd_ps(folded, folded);

    let mut dot = _mm_cvtss_f32(folded);
    while i < dim {
        dot += a[i] * b[i];
        i += 1;
    }
    dot
}

/// NEON dot product, 8 lanes per iteration across two accumulators.
#[cfg(target_arch = "aarch64")]
#[target_feature(enable = "neon")]
#[inline]
unsafe fn dot_product_neon(a: &[f32], b: &[f32]) -> f32 {
    let dim = a.len();
    let mut i = 0;

    let mut acc_lo = vdupq_n_f32(0.0);
    let mut acc_hi = vdupq_n_f32(0.0);

    while i + 8 <= dim {
        let a_lo = vld1q_f32(a.as_ptr().add(i));
        let b_lo = vld1q_f32(b.as_ptr().add(i));
        let a_hi = vld1q_f32(a.as_ptr().add(i + 4));
        let b_hi = vld1q_f32(b.as_ptr().add(i + 4));

        acc_lo = vfmaq_f32(acc_lo, a_lo, b_lo);
        acc_hi = vfmaq_f32(acc_hi, a_hi, b_hi);

        i += 8;
    }

    let mut dot = vaddvq_f32(vaddq_f32(acc_lo, acc_hi));
    while i < dim {
        dot += a[i] * b[i];
        i += 1;
    }
    dot
}

/// Scalar fallback with two accumulators so the adds can pipeline.
#[inline]
fn dot_product_scalar(a: &[f32], b: &[f32]) -> f32 {
    let mut even = 0.0f32;
    let mut odd = 0.0f32;

    let a_chunks = a.chunks_exact(8);
    let b_chunks = b.chunks_exact(8);
    let tail = a_chunks.remainder().len();

    for (x, y) in a_chunks.zip(b_chunks) {
        even += x[0] * y[0] + x[1] * y[1] + x[2] * y[2] + x[3] * y[3];
        odd += x[4] * y[4] + x[5] * y[5] + x[6] * y[6] + x[7] * y[7];
    }

    for i in (a.len() - tail)..a.len() {
        even += a[i] * b[i];
    }

    even + odd
}

/// Squared L2 norm.
#[inline]
pub fn norm_squared_simd(v: &[f32]) -> f32 {
    dot_product_simd(v, v)
}

/// L2 norm.
#[inline]
pub fn norm_simd(v: &[f32]) -> f32 {
    norm_squared_simd(v).sqrt()
}
