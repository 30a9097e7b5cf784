use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, UnitBall};
use rand_xoshiro::Xoshiro256PlusPlus;

use crate::dispatch::RowMut;
use crate::geometry::{
    get_reflection_ray, trace_ray, Fp, Ray, Vec3f, Vec4f, SURFACE_OFFSET,
};
use crate::scene::Scene;
use crate::settings::Settings;

/// One path's radiance estimate plus the auxiliary data of its last bounce.
#[derive(Clone, Debug)]
pub struct PixelSample {
    pub radiance: Vec4f,
    pub normal: Option<Vec3f>,
    pub albedo: Option<Vec3f>,
}

/// Random stream for one row of one frame, independent of which thread runs it.
pub fn row_rng(seed: u64, frame_index: u32, y: usize) -> Xoshiro256PlusPlus {
    Xoshiro256PlusPlus::seed_from_u64(seed ^ ((frame_index as u64) << 32) ^ y as u64)
}

/// Traces a single path for one pixel (the ray-generation step).
pub fn per_pixel<R: Rng + ?Sized>(
    scene: &Scene,
    settings: &Settings,
    origin: Vec3f,
    direction: Vec3f,
    rng: &mut R,
) -> PixelSample {
    let mut ray = Ray { origin, direction };
    let mut light = Vec3f::zeros();
    let mut throughput = Vec3f::repeat(1.0);
    let mut normal = None;
    let mut albedo = None;

    for _ in 0..settings.max_bounces {
        let payload = trace_ray(&ray, scene);
        if payload.is_miss() {
            if settings.sky {
                light += throughput.component_mul(&settings.sky_color);
            }
            break;
        }
        let Some(material) = scene.material_for(payload.object) else {
            break;
        };
        normal = Some(payload.world_normal);
        albedo = Some(material.albedo);

        throughput.component_mul_assign(&material.albedo);
        light += material.emission();

        let scatter: [Fp; 3] = UnitBall.sample(rng);
        let reflected = get_reflection_ray(&ray.direction, &payload.world_normal);
        ray.origin = payload.world_position + payload.world_normal * SURFACE_OFFSET;
        ray.direction = if settings.mirror_metals && material.metallic > 0.0 {
            reflected
        } else {
            (payload.world_normal + Vec3f::from(scatter)).normalize()
        };
    }

    PixelSample {
        radiance: Vec4f::new(light.x, light.y, light.z, 1.0),
        normal,
        albedo,
    }
}

/// Adds one sample per pixel of `row` into its accumulation cells.
pub fn trace_row(
    scene: &Scene,
    settings: &Settings,
    origin: Vec3f,
    directions: &[Vec3f],
    frame_index: u32,
    row: RowMut<'_>,
) {
    let mut rng = row_rng(settings.seed, frame_index, row.y);
    let cells = row
        .accumulation
        .iter_mut()
        .zip(row.normal.iter_mut())
        .zip(row.albedo.iter_mut());
    for (((sum, normal), albedo), direction) in cells.zip(directions) {
        let sample = per_pixel(scene, settings, origin, *direction, &mut rng);
        *sum += sample.radiance;
        if let Some(n) = sample.normal {
            *normal = n;
        }
        if let Some(a) = sample.albedo {
            *albedo = a;
        }
    }
}
