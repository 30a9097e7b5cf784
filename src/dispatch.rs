use rayon::prelude::*;

use crate::frame::FrameBuffers;
use crate::geometry::{Vec3f, Vec4f};

/// One image row, exclusively owned by the task processing it.
pub struct RowMut<'a> {
    pub y: usize,
    pub accumulation: &'a mut [Vec4f],
    pub normal: &'a mut [Vec3f],
    pub albedo: &'a mut [Vec3f],
}

/// Fans `task` out over every row on the rayon pool and returns once all rows are done.
///
/// Rows run in no particular order, so `task` must not depend on other rows.
pub fn for_each_row<F>(buffers: &mut FrameBuffers, task: F)
where
    F: Fn(RowMut<'_>) + Sync + Send,
{
    let width = buffers.width() as usize;
    if width == 0 {
        return;
    }
    buffers
        .accumulation
        .par_chunks_mut(width)
        .zip(buffers.normal.par_chunks_mut(width))
        .zip(buffers.albedo.par_chunks_mut(width))
        .enumerate()
        .for_each(|(y, ((accumulation, normal), albedo))| {
            task(RowMut {
                y,
                accumulation,
                normal,
                albedo,
            })
        });
}
