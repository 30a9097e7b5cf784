use std::collections::TryReserveError;

use rayon::prelude::*;

use crate::error::RenderError;
use crate::geometry::{Fp, Vec3f, Vec4f};

/// Clamps to `[0, 1]` and packs as `0xAABBGGRR`.
pub fn to_packed_rgba(color: &Vec4f) -> u32 {
    let c = color.map(|v| v.clamp(0.0, 1.0));
    let r = (c.x * 255.0) as u8;
    let g = (c.y * 255.0) as u8;
    let b = (c.z * 255.0) as u8;
    let a = (c.w * 255.0) as u8;
    ((a as u32) << 24) | ((b as u32) << 16) | ((g as u32) << 8) | r as u32
}

fn zeroed<T: Clone>(len: usize, value: T) -> Result<Vec<T>, TryReserveError> {
    let mut buffer = Vec::new();
    buffer.try_reserve_exact(len)?;
    buffer.resize(len, value);
    Ok(buffer)
}

/// Every per-pixel buffer of one viewport size. Built and dropped as a group, so
/// the buffers can never disagree about their dimensions.
#[derive(Debug)]
pub struct FrameBuffers {
    width: u32,
    height: u32,
    /// Running radiance sum, alpha counts covered samples.
    pub accumulation: Vec<Vec4f>,
    /// Normal of the last bounce that touched each pixel.
    pub normal: Vec<Vec3f>,
    /// Albedo of the last bounce that touched each pixel.
    pub albedo: Vec<Vec3f>,
    /// Working copy of the mean image for the filter pipeline.
    pub resolved: Vec<Vec4f>,
    pub image: Vec<u32>,
}

impl FrameBuffers {
    pub fn allocate(width: u32, height: u32) -> Result<FrameBuffers, RenderError> {
        let len = width as usize * height as usize;
        let build = || -> Result<FrameBuffers, TryReserveError> {
            Ok(FrameBuffers {
                width,
                height,
                accumulation: zeroed(len, Vec4f::zeros())?,
                normal: zeroed(len, Vec3f::zeros())?,
                albedo: zeroed(len, Vec3f::zeros())?,
                resolved: zeroed(len, Vec4f::zeros())?,
                image: zeroed(len, 0u32)?,
            })
        };
        build().map_err(|_| RenderError::Allocation { width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn clear_history(&mut self) {
        self.accumulation.fill(Vec4f::zeros());
        self.normal.fill(Vec3f::zeros());
        self.albedo.fill(Vec3f::zeros());
    }

    /// Writes `accumulation / frame_index` straight into the display image.
    pub fn publish_mean(&mut self, frame_index: u32) {
        let scale = 1.0 / frame_index.max(1) as Fp;
        self.image
            .par_iter_mut()
            .zip(self.accumulation.par_iter())
            .for_each(|(pixel, sum)| *pixel = to_packed_rgba(&(sum * scale)));
    }

    /// Copies `accumulation / frame_index` into the filter working buffer.
    pub fn resolve_mean(&mut self, frame_index: u32) {
        let scale = 1.0 / frame_index.max(1) as Fp;
        self.resolved
            .par_iter_mut()
            .zip(self.accumulation.par_iter())
            .for_each(|(mean, sum)| *mean = sum * scale);
    }

    pub fn publish_resolved(&mut self) {
        self.image
            .par_iter_mut()
            .zip(self.resolved.par_iter())
            .for_each(|(pixel, color)| *pixel = to_packed_rgba(color));
    }

    /// Display image as tightly packed RGBA8 bytes.
    pub fn image_bytes(&self) -> Vec<u8> {
        self.image.iter().flat_map(|p| p.to_le_bytes()).collect()
    }
}

/// Observational counters, never read by the renderer itself.
#[derive(Clone, Debug, Default)]
pub struct RenderStatistics {
    pub frame_index: u32,
    pub last_render_ms: f64,
    pub average_render_ms: f64,
    pub fps: f64,
    pub cumulative_ms: f64,
    pub timed_frames: u32,
    pub denoise_ms: f64,
}

impl RenderStatistics {
    pub fn reset(&mut self) {
        *self = RenderStatistics::default();
    }

    pub fn record_frame(&mut self, elapsed_ms: f64) {
        self.last_render_ms = elapsed_ms;
        self.cumulative_ms += elapsed_ms;
        self.timed_frames += 1;
        self.average_render_ms = self.cumulative_ms / self.timed_frames as f64;
        self.fps = if self.average_render_ms > 0.0 {
            1000.0 / self.average_render_ms
        } else {
            0.0
        };
    }
}
