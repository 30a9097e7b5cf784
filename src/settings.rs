use crate::geometry::{Fp, Vec3f};

/// Render configuration, read at the start of every frame.
#[derive(Clone, Debug)]
pub struct Settings {
    /// Progressive sample budget; `0` refines forever.
    pub max_samples: u32,
    pub max_bounces: u32,
    pub accumulate: bool,
    pub sky: bool,
    pub sky_color: Vec3f,
    /// Run the filter pipeline once the sample budget is reached.
    pub denoise: bool,
    /// Base seed of the per-row random streams.
    pub seed: u64,
    /// Metallic surfaces bounce as perfect mirrors instead of diffusely.
    pub mirror_metals: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            max_samples: 4,
            max_bounces: 2,
            accumulate: true,
            sky: true,
            sky_color: Vec3f::new(0.6, 0.7, 0.9),
            denoise: false,
            seed: 0,
            mirror_metals: false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct FilterSettings {
    pub bilateral: bool,
    pub bilateral_spatial_sigma: Fp,
    pub bilateral_range_sigma: Fp,

    /// Bilateral filter guided by the albedo buffer.
    pub joint_bilateral: bool,
    pub joint_bilateral_spatial_sigma: Fp,
    pub joint_bilateral_range_sigma: Fp,

    pub gaussian: bool,
    pub gaussian_sigma: Fp,

    pub wavelet: bool,
    pub wavelet_passes: u32,

    pub unsharp_mask: bool,
    pub unsharp_sigma: Fp,
    pub unsharp_amount: Fp,

    pub oidn: bool,
    /// Feed albedo and normal buffers to the learned denoiser.
    pub oidn_aux: bool,
}

impl Default for FilterSettings {
    fn default() -> Self {
        FilterSettings {
            bilateral: false,
            bilateral_spatial_sigma: 2.0,
            bilateral_range_sigma: 0.1,
            joint_bilateral: false,
            joint_bilateral_spatial_sigma: 2.0,
            joint_bilateral_range_sigma: 0.1,
            gaussian: false,
            gaussian_sigma: 1.0,
            wavelet: false,
            wavelet_passes: 3,
            unsharp_mask: false,
            unsharp_sigma: 1.0,
            unsharp_amount: 0.5,
            oidn: false,
            oidn_aux: true,
        }
    }
}
