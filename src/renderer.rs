use std::time::Instant;

use image::RgbaImage;

use crate::camera::Camera;
use crate::dispatch::for_each_row;
use crate::error::RenderError;
use crate::filters::{AuxBuffers, FilterPipeline};
use crate::frame::{FrameBuffers, RenderStatistics};
use crate::scene::Scene;
use crate::settings::{FilterSettings, Settings};
use crate::tracer::trace_row;

/// Progressive renderer: accumulates one path-traced sample per pixel per call and
/// runs the filter pipeline once the sample budget is reached.
#[derive(Debug, Default)]
pub struct Renderer {
    buffers: Option<FrameBuffers>,
    /// Samples accumulated so far; `0` means the next frame starts from scratch.
    frame_index: u32,
    denoised: bool,
    settings: Settings,
    filter_settings: FilterSettings,
    statistics: RenderStatistics,
}

impl Renderer {
    pub fn new(settings: Settings, filter_settings: FilterSettings) -> Renderer {
        Renderer {
            settings,
            filter_settings,
            ..Default::default()
        }
    }

    /// Reallocates every frame buffer when the size changes, otherwise does nothing.
    ///
    /// On allocation failure the previous buffers are kept.
    pub fn on_resize(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        if let Some(buffers) = &self.buffers {
            if buffers.width() == width && buffers.height() == height {
                return Ok(());
            }
        }
        self.buffers = Some(FrameBuffers::allocate(width, height)?);
        self.reset_frame_index();
        self.statistics.reset();
        log::info!("frame buffers resized to {width}x{height}");
        Ok(())
    }

    /// One progressive step, or the one-off filter pass once converged.
    ///
    /// The scene and camera must not change during the call. Errors are reported
    /// before any buffer is touched.
    pub fn render<C: Camera + ?Sized>(&mut self, scene: &Scene, camera: &C) -> Result<(), RenderError> {
        let start = Instant::now();
        let Some(buffers) = self.buffers.as_mut() else {
            return Err(RenderError::NotSized);
        };
        scene.validate()?;
        let directions = camera.ray_directions();
        if directions.len() != buffers.pixel_count() {
            return Err(RenderError::CameraMismatch {
                expected: buffers.pixel_count(),
                actual: directions.len(),
            });
        }

        if self.settings.max_samples > 0 && self.frame_index >= self.settings.max_samples {
            if self.settings.denoise && !self.denoised {
                let pipeline = FilterPipeline::from_settings(&self.filter_settings);
                apply_filters(buffers, &pipeline, self.frame_index);
                self.denoised = true;
                self.statistics.denoise_ms = start.elapsed().as_secs_f64() * 1000.0;
                log::info!(
                    "denoised frame {} with {} filters in {:.3}ms",
                    self.frame_index,
                    pipeline.stages().len(),
                    self.statistics.denoise_ms
                );
            }
            return Ok(());
        }

        self.frame_index = if self.settings.accumulate {
            self.frame_index + 1
        } else {
            1
        };
        self.denoised = false;
        if self.frame_index == 1 {
            buffers.clear_history();
            self.statistics.reset();
        }

        let width = buffers.width() as usize;
        let origin = camera.position();
        let frame_index = self.frame_index;
        let settings = &self.settings;
        for_each_row(buffers, |row| {
            let row_directions = &directions[row.y * width..(row.y + 1) * width];
            trace_row(scene, settings, origin, row_directions, frame_index, row);
        });
        buffers.publish_mean(frame_index);

        self.statistics.frame_index = frame_index;
        self.statistics
            .record_frame(start.elapsed().as_secs_f64() * 1000.0);
        log::debug!(
            "frame {} rendered in {:.3}ms (avg {:.3}ms)",
            frame_index,
            self.statistics.last_render_ms,
            self.statistics.average_render_ms
        );
        if self.is_converged() {
            log::info!("converged after {frame_index} samples");
        }
        Ok(())
    }

    /// Makes the next `render` restart accumulation from empty buffers.
    pub fn reset_frame_index(&mut self) {
        self.frame_index = 0;
        self.denoised = false;
    }

    /// Packed `0xAABBGGRR` pixels, row-major from the top row. Empty before the
    /// first resize.
    pub fn final_image(&self) -> &[u32] {
        self.buffers
            .as_ref()
            .map(|b| b.image.as_slice())
            .unwrap_or(&[])
    }

    pub fn to_rgba_image(&self) -> Option<RgbaImage> {
        let buffers = self.buffers.as_ref()?;
        RgbaImage::from_raw(buffers.width(), buffers.height(), buffers.image_bytes())
    }

    pub fn buffers(&self) -> Option<&FrameBuffers> {
        self.buffers.as_ref()
    }

    pub fn frame_index(&self) -> u32 {
        self.frame_index
    }

    pub fn is_converged(&self) -> bool {
        self.settings.max_samples > 0 && self.frame_index >= self.settings.max_samples
    }

    pub fn is_denoised(&self) -> bool {
        self.denoised
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn filter_settings(&self) -> &FilterSettings {
        &self.filter_settings
    }

    pub fn filter_settings_mut(&mut self) -> &mut FilterSettings {
        &mut self.filter_settings
    }

    pub fn statistics(&self) -> &RenderStatistics {
        &self.statistics
    }
}

/// Filters the current mean image and publishes it. The accumulation sums are left
/// as they are.
fn apply_filters(buffers: &mut FrameBuffers, pipeline: &FilterPipeline, frame_index: u32) {
    let width = buffers.width() as usize;
    let height = buffers.height() as usize;
    buffers.resolve_mean(frame_index);
    let aux = AuxBuffers {
        albedo: &buffers.albedo,
        normal: &buffers.normal,
    };
    pipeline.apply(&mut buffers.resolved, aux, width, height);
    buffers.publish_resolved();
}
