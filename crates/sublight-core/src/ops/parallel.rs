//! Threshold-dispatched parallel helpers.
//!
//! Small images stay on one thread; large ones fan out through rayon. The
//! cutover is [`PARALLEL_THRESHOLD`] pixels.

use rayon::prelude::*;

use super::PARALLEL_THRESHOLD;

/// Fold/reduce over fixed-size chunks (e.g. 3 for RGB pixels), parallel when
/// the element count crosses the threshold.
pub fn parallel_fold_reduce<T, A, I, F, R>(
    data: &[T],
    chunk_size: usize,
    init: I,
    fold_fn: F,
    reduce_fn: R,
) -> A
where
    T: Sync,
    A: Send + Clone,
    I: Fn() -> A + Sync,
    F: Fn(A, &[T]) -> A + Sync,
    R: Fn(A, A) -> A + Sync,
{
    let num_elements = data.len() / chunk_size;

    if num_elements >= PARALLEL_THRESHOLD {
        data.par_chunks_exact(chunk_size)
            .fold(&init, &fold_fn)
            .reduce(&init, &reduce_fn)
    } else {
        let mut acc = init();
        for chunk in data.chunks_exact(chunk_size) {
            acc = fold_fn(acc, chunk);
        }
        acc
    }
}

/// Mutate interleaved pixels in place, parallel for large images.
pub fn parallel_for_each_pixel_mut<F>(data: &mut [f32], f: F)
where
    F: Fn(&mut [f32]) + Sync,
{
    let num_pixels = data.len() / 3;

    if num_pixels >= PARALLEL_THRESHOLD {
        data.par_chunks_exact_mut(3).for_each(&f);
    } else {
        for pixel in data.chunks_exact_mut(3) {
            f(pixel);
        }
    }
}
