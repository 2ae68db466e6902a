//! Frame-parallel processing of exposure cubes
//!
//! Frames of a cube are independent, so each one is handed to a rayon worker
//! as a disjoint mutable view. Serial execution goes through the same closure
//! so results do not depend on the thread count.

use ndarray::{Array3, ArrayViewMut2, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;

use crate::error::Result;

/// Apply a fallible `processor` to every frame of `cube`, stopping at the first error.
///
/// # Arguments
/// * `cube` - Cube of shape `[frame, row, column]`
/// * `parallel` - Spread frames over the rayon thread pool
/// * `processor` - Closure receiving the frame index and a mutable frame view
pub fn try_for_each_frame<F>(cube: &mut Array3<f64>, parallel: bool, processor: F) -> Result<()>
where
    F: Fn(usize, ArrayViewMut2<f64>) -> Result<()> + Send + Sync,
{
    if parallel {
        cube.axis_iter_mut(Axis(0))
            .into_par_iter()
            .enumerate()
            .try_for_each(|(index, frame)| processor(index, frame))
    } else {
        cube.axis_iter_mut(Axis(0))
            .enumerate()
            .try_for_each(|(index, frame)| processor(index, frame))
    }
}

/// Process frames in parallel with deterministic seeding
///
/// Each frame gets its own RNG seeded from the base seed plus the frame
/// index, so the output is reproducible regardless of scheduling.
pub fn try_for_each_frame_seeded<F>(cube: &mut Array3<f64>, seed: u64, processor: F) -> Result<()>
where
    F: Fn(usize, ArrayViewMut2<f64>, &mut StdRng) -> Result<()> + Send + Sync,
{
    cube.axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .try_for_each(|(index, frame)| {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(index as u64));
            processor(index, frame, &mut rng)
        })
}
