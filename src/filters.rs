//! Image-space post filters run on the converged mean image.
//!
//! Every filter works in place on a `width * height` slice of linear RGBA colors and
//! receives all of its parameters explicitly. `FilterPipeline` chains the enabled
//! ones in a fixed order.

use arrayvec::ArrayVec;
use rayon::prelude::*;

use crate::error::DenoiseError;
use crate::geometry::{Fp, Vec3f, Vec4f};
use crate::settings::FilterSettings;

/// Taps of the à-trous scaling function, `[1, 4, 6, 4, 1] / 16`.
pub static ATROUS_KERNEL: [Fp; 5] = [1.0 / 16.0, 4.0 / 16.0, 6.0 / 16.0, 4.0 / 16.0, 1.0 / 16.0];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Axis {
    Horizontal,
    Vertical,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Edge {
    /// Drop out-of-image taps and renormalize by the remaining weight.
    Renormalize,
    /// Repeat the border pixel.
    Clamp,
}

/// Normalized 1-D Gaussian of radius `ceil(3 * sigma)`.
pub fn gaussian_kernel(sigma: Fp) -> Vec<Fp> {
    if sigma <= 0.0 {
        return vec![1.0];
    }
    let radius = (3.0 * sigma).ceil() as i32;
    let coef = -0.5 / (sigma * sigma);
    let mut kernel = (-radius..=radius)
        .map(|i| (coef * (i * i) as Fp).exp())
        .collect::<Vec<_>>();
    let sum: Fp = kernel.iter().sum();
    kernel.iter_mut().for_each(|w| *w /= sum);
    kernel
}

/// One 1-D pass of `kernel` (odd length, centered) with taps `step` pixels apart.
fn convolve_axis(
    src: &[Vec4f],
    dst: &mut [Vec4f],
    width: usize,
    height: usize,
    kernel: &[Fp],
    step: usize,
    axis: Axis,
    edge: Edge,
) {
    let radius = (kernel.len() / 2) as isize;
    let step = step as isize;
    dst.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
        for (x, out) in row.iter_mut().enumerate() {
            let (center, extent) = match axis {
                Axis::Horizontal => (x as isize, width as isize),
                Axis::Vertical => (y as isize, height as isize),
            };
            let mut sum = Vec4f::zeros();
            let mut weight_sum = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                let mut coord = center + (k as isize - radius) * step;
                if coord < 0 || coord >= extent {
                    match edge {
                        Edge::Renormalize => continue,
                        Edge::Clamp => coord = coord.clamp(0, extent - 1),
                    }
                }
                let index = match axis {
                    Axis::Horizontal => y * width + coord as usize,
                    Axis::Vertical => coord as usize * width + x,
                };
                sum += src[index] * *weight;
                weight_sum += weight;
            }
            *out = if weight_sum > 0.0 {
                sum / weight_sum
            } else {
                src[y * width + x]
            };
        }
    });
}

fn convolve_separable(
    image: &mut [Vec4f],
    width: usize,
    height: usize,
    kernel: &[Fp],
    step: usize,
    edge: Edge,
) {
    if width == 0 || height == 0 {
        return;
    }
    let mut scratch = image.to_vec();
    convolve_axis(image, &mut scratch, width, height, kernel, step, Axis::Horizontal, edge);
    convolve_axis(&scratch, image, width, height, kernel, step, Axis::Vertical, edge);
}

/// Separable Gaussian blur; kernel weights falling outside the image are dropped
/// and the rest renormalized.
pub fn gaussian_blur(image: &mut [Vec4f], width: usize, height: usize, sigma: Fp) {
    let kernel = gaussian_kernel(sigma);
    convolve_separable(image, width, height, &kernel, 1, Edge::Renormalize);
}

/// À-trous wavelet smoothing: `passes` rounds of the B3-spline kernel with the tap
/// spacing doubling every round, borders clamped.
pub fn atrous_wavelet(image: &mut [Vec4f], width: usize, height: usize, passes: u32) {
    for pass in 0..passes {
        let step = 1usize << pass;
        convolve_separable(image, width, height, &ATROUS_KERNEL, step, Edge::Clamp);
    }
}

/// `image + amount * (image - blurred)`.
pub fn unsharp_mask(image: &mut [Vec4f], width: usize, height: usize, sigma: Fp, amount: Fp) {
    let mut blurred = image.to_vec();
    gaussian_blur(&mut blurred, width, height, sigma);
    image
        .par_iter_mut()
        .zip(blurred.par_iter())
        .for_each(|(color, blur)| *color += (*color - blur) * amount);
}

fn bilateral_with_guide<G>(
    image: &mut [Vec4f],
    width: usize,
    height: usize,
    spatial_sigma: Fp,
    range_sigma: Fp,
    guide: G,
) where
    G: Fn(&[Vec4f], usize) -> Vec3f + Sync,
{
    if width == 0 || height == 0 || spatial_sigma <= 0.0 || range_sigma <= 0.0 {
        return;
    }
    let radius = (2.0 * spatial_sigma).ceil() as isize;
    let spatial_coef = -0.5 / (spatial_sigma * spatial_sigma);
    let range_coef = -0.5 / (range_sigma * range_sigma);
    let source: &[Vec4f] = image;

    let filtered = (0..width * height)
        .into_par_iter()
        .map(|center| {
            let cx = (center % width) as isize;
            let cy = (center / width) as isize;
            let center_guide = guide(source, center);
            let mut sum = Vec4f::zeros();
            let mut weight_sum = 0.0;
            for dy in -radius..=radius {
                for dx in -radius..=radius {
                    let (nx, ny) = (cx + dx, cy + dy);
                    if nx < 0 || ny < 0 || nx >= width as isize || ny >= height as isize {
                        continue;
                    }
                    let neighbor = ny as usize * width + nx as usize;
                    let spatial = (spatial_coef * (dx * dx + dy * dy) as Fp).exp();
                    let range_dist = (guide(source, neighbor) - center_guide).norm_squared();
                    let weight = spatial * (range_coef * range_dist).exp();
                    sum += source[neighbor] * weight;
                    weight_sum += weight;
                }
            }
            if weight_sum > 0.0 {
                sum / weight_sum
            } else {
                source[center]
            }
        })
        .collect::<Vec<_>>();

    image.copy_from_slice(&filtered);
}

/// Edge-preserving smoothing weighted by spatial distance and color difference.
pub fn bilateral(image: &mut [Vec4f], width: usize, height: usize, spatial_sigma: Fp, range_sigma: Fp) {
    bilateral_with_guide(image, width, height, spatial_sigma, range_sigma, |img, i| {
        img[i].xyz()
    });
}

/// Bilateral filter whose range term compares `guide` instead of the image itself.
pub fn joint_bilateral(
    image: &mut [Vec4f],
    guide: &[Vec3f],
    width: usize,
    height: usize,
    spatial_sigma: Fp,
    range_sigma: Fp,
) {
    bilateral_with_guide(image, width, height, spatial_sigma, range_sigma, |_, i| guide[i]);
}

/// Runs Intel Open Image Denoise over the RGB channels, optionally guided by albedo
/// and normal buffers. Alpha is kept. On error the image is left untouched.
#[cfg(feature = "oidn")]
pub fn learned_denoise(
    image: &mut [Vec4f],
    aux: Option<AuxBuffers<'_>>,
    width: usize,
    height: usize,
) -> Result<(), DenoiseError> {
    let flatten = |v: &[Vec3f]| v.iter().flat_map(|c| [c.x, c.y, c.z]).collect::<Vec<Fp>>();
    let color = image.iter().flat_map(|c| [c.x, c.y, c.z]).collect::<Vec<Fp>>();
    let albedo = aux.as_ref().map(|a| flatten(a.albedo));
    let normal = aux.as_ref().map(|a| flatten(a.normal));
    let mut output = vec![0.0; color.len()];

    let device = oidn::Device::new();
    let mut filter = oidn::RayTracing::new(&device);
    filter.srgb(false).hdr(true).image_dimensions(width, height);
    if let (Some(albedo), Some(normal)) = (albedo.as_deref(), normal.as_deref()) {
        filter.albedo_normal(albedo, normal);
    }
    filter
        .filter(&color, &mut output)
        .map_err(|e| DenoiseError::Device(format!("{e:?}")))?;
    if let Err((_, message)) = device.get_error() {
        return Err(DenoiseError::Device(message));
    }

    for (pixel, rgb) in image.iter_mut().zip(output.chunks_exact(3)) {
        pixel.x = rgb[0];
        pixel.y = rgb[1];
        pixel.z = rgb[2];
    }
    Ok(())
}

#[cfg(not(feature = "oidn"))]
pub fn learned_denoise(
    _image: &mut [Vec4f],
    _aux: Option<AuxBuffers<'_>>,
    _width: usize,
    _height: usize,
) -> Result<(), DenoiseError> {
    Err(DenoiseError::Unavailable)
}

#[derive(Clone, Copy, Debug)]
pub struct AuxBuffers<'a> {
    pub albedo: &'a [Vec3f],
    pub normal: &'a [Vec3f],
}

#[derive(Clone, Debug, PartialEq)]
pub enum FilterStage {
    Bilateral { spatial_sigma: Fp, range_sigma: Fp },
    JointBilateral { spatial_sigma: Fp, range_sigma: Fp },
    Gaussian { sigma: Fp },
    Wavelet { passes: u32 },
    UnsharpMask { sigma: Fp, amount: Fp },
    Learned { use_aux: bool },
}

/// Enabled filters in application order.
#[derive(Clone, Debug, Default)]
pub struct FilterPipeline {
    stages: ArrayVec<FilterStage, 6>,
}

impl FilterPipeline {
    pub fn from_settings(settings: &FilterSettings) -> FilterPipeline {
        let mut stages = ArrayVec::new();
        if settings.bilateral {
            stages.push(FilterStage::Bilateral {
                spatial_sigma: settings.bilateral_spatial_sigma,
                range_sigma: settings.bilateral_range_sigma,
            });
        }
        if settings.joint_bilateral {
            stages.push(FilterStage::JointBilateral {
                spatial_sigma: settings.joint_bilateral_spatial_sigma,
                range_sigma: settings.joint_bilateral_range_sigma,
            });
        }
        if settings.gaussian {
            stages.push(FilterStage::Gaussian {
                sigma: settings.gaussian_sigma,
            });
        }
        if settings.wavelet {
            stages.push(FilterStage::Wavelet {
                passes: settings.wavelet_passes,
            });
        }
        if settings.unsharp_mask {
            stages.push(FilterStage::UnsharpMask {
                sigma: settings.unsharp_sigma,
                amount: settings.unsharp_amount,
            });
        }
        if settings.oidn {
            stages.push(FilterStage::Learned {
                use_aux: settings.oidn_aux,
            });
        }
        FilterPipeline { stages }
    }

    pub fn stages(&self) -> &[FilterStage] {
        &self.stages
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Applies every stage to `image` in turn, each one seeing the previous output.
    pub fn apply(&self, image: &mut [Vec4f], aux: AuxBuffers<'_>, width: usize, height: usize) {
        for stage in &self.stages {
            log::debug!("applying {stage:?}");
            match *stage {
                FilterStage::Bilateral {
                    spatial_sigma,
                    range_sigma,
                } => bilateral(image, width, height, spatial_sigma, range_sigma),
                FilterStage::JointBilateral {
                    spatial_sigma,
                    range_sigma,
                } => joint_bilateral(image, aux.albedo, width, height, spatial_sigma, range_sigma),
                FilterStage::Gaussian { sigma } => gaussian_blur(image, width, height, sigma),
                FilterStage::Wavelet { passes } => atrous_wavelet(image, width, height, passes),
                FilterStage::UnsharpMask { sigma, amount } => {
                    unsharp_mask(image, width, height, sigma, amount)
                }
                FilterStage::Learned { use_aux } => {
                    let aux = use_aux.then_some(aux);
                    if let Err(e) = learned_denoise(image, aux, width, height) {
                        log::error!("learned denoiser failed, keeping previous output: {e}");
                    }
                }
            }
        }
    }
}
