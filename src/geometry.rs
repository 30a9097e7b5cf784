use nalgebra::{Vector3, Vector4};

use crate::scene::{Cuboid, Plane, Scene, Sphere};

pub type Fp = f32;
pub type Vec3f = Vector3<Fp>;
pub type Vec4f = Vector4<Fp>;

/// Minimum `normal · direction` for a plane to count as hit.
pub static PLANE_FACING_EPS: Fp = 1e-6;
/// Distance a bounced ray origin is pushed along the surface normal.
pub static SURFACE_OFFSET: Fp = 1e-4;

#[derive(Clone, Debug)]
pub struct Ray {
    pub origin: Vec3f,
    /// Not required to be unit length.
    pub direction: Vec3f,
}

/// What a ray struck, with the index into the matching scene list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HitObject {
    #[default]
    None,
    Sphere(usize),
    Plane(usize),
    Cuboid(usize),
}

#[derive(Clone, Debug)]
pub struct HitPayload {
    /// Negative for a miss.
    pub hit_distance: Fp,
    pub world_position: Vec3f,
    pub world_normal: Vec3f,
    pub object: HitObject,
}

impl HitPayload {
    pub fn miss() -> HitPayload {
        HitPayload {
            hit_distance: -1.0,
            world_position: Vec3f::zeros(),
            world_normal: Vec3f::zeros(),
            object: HitObject::None,
        }
    }

    pub fn is_miss(&self) -> bool {
        self.hit_distance < 0.0
    }
}

pub fn get_reflection_ray(ray: &Vec3f, normal: &Vec3f) -> Vec3f {
    let projection = -ray.dot(normal);
    ray + normal * projection * 2.0
}

/// Nearer root of the ray/sphere quadratic, if it lies in front of the origin.
///
/// Only the smaller root is considered, so a ray starting inside the sphere misses it.
pub fn intersect_sphere(ray: &Ray, sphere: &Sphere) -> Option<Fp> {
    let origin = ray.origin - sphere.position;
    let a = ray.direction.dot(&ray.direction);
    if a == 0.0 {
        return None;
    }
    let b = 2.0 * origin.dot(&ray.direction);
    let c = origin.dot(&origin) - sphere.radius * sphere.radius;
    let discr = b * b - 4.0 * a * c;
    if discr < 0.0 {
        return None;
    }
    let closest_t = (-b - discr.sqrt()) / (2.0 * a);
    if closest_t.is_finite() && closest_t > 0.0 {
        Some(closest_t)
    } else {
        None
    }
}

/// Only rays travelling along the plane normal (`n · d > PLANE_FACING_EPS`) can hit;
/// parallel and opposing rays never do.
pub fn intersect_plane(ray: &Ray, plane: &Plane) -> Option<Fp> {
    let denom = plane.normal.dot(&ray.direction);
    if denom <= PLANE_FACING_EPS {
        return None;
    }
    let t = (plane.position - ray.origin).dot(&plane.normal) / denom;
    if t >= 0.0 {
        Some(t)
    } else {
        None
    }
}

/// Slab test against the box spanned by `position ± dimensions / 2`.
///
/// The cuboid rotation is not applied here, it only orients the recovered normal.
/// Returns the entry distance, or the exit distance when the origin is inside.
pub fn intersect_cuboid(ray: &Ray, cuboid: &Cuboid) -> Option<Fp> {
    let half = cuboid.dimensions * 0.5;
    let low = cuboid.position - half;
    let high = cuboid.position + half;
    let t0 = (low - ray.origin).component_div(&ray.direction);
    let t1 = (high - ray.origin).component_div(&ray.direction);
    let t_near = t0.inf(&t1).max();
    let t_far = t0.sup(&t1).min();
    if t_near <= t_far && t_far > 0.0 {
        Some(if t_near > 0.0 { t_near } else { t_far })
    } else {
        None
    }
}

/// Face normal of a cuboid at `hit_point`, picked by the smallest face-distance
/// residual in the cuboid's rotated frame and rotated back to world space.
pub fn cuboid_normal(cuboid: &Cuboid, hit_point: &Vec3f) -> Vec3f {
    let local_point = cuboid
        .rotation
        .inverse_transform_vector(&(hit_point - cuboid.position));
    let half = cuboid.dimensions * 0.5;
    let diff = (local_point.abs() - half).abs();
    let sign = |c: Fp| if c > 0.0 { 1.0 } else { -1.0 };
    let local_normal = if diff.x < diff.y && diff.x < diff.z {
        Vec3f::new(sign(local_point.x), 0.0, 0.0)
    } else if diff.y < diff.z {
        Vec3f::new(0.0, sign(local_point.y), 0.0)
    } else {
        Vec3f::new(0.0, 0.0, sign(local_point.z))
    };
    cuboid.rotation.transform_vector(&local_normal).normalize()
}

/// Closest hit over the whole scene.
///
/// Candidates are visited spheres, then planes, then cuboids, each in list order; a
/// candidate only wins when strictly closer, so ties go to the earlier one.
pub fn trace_ray(ray: &Ray, scene: &Scene) -> HitPayload {
    if ray.direction.norm_squared() == 0.0 {
        return HitPayload::miss();
    }

    let mut hit_distance = Fp::MAX;
    let mut closest = HitObject::None;

    for (i, sphere) in scene.spheres.iter().enumerate() {
        if let Some(t) = intersect_sphere(ray, sphere) {
            if t < hit_distance {
                hit_distance = t;
                closest = HitObject::Sphere(i);
            }
        }
    }
    for (i, plane) in scene.planes.iter().enumerate() {
        if let Some(t) = intersect_plane(ray, plane) {
            if t < hit_distance {
                hit_distance = t;
                closest = HitObject::Plane(i);
            }
        }
    }
    for (i, cuboid) in scene.cuboids.iter().enumerate() {
        if let Some(t) = intersect_cuboid(ray, cuboid) {
            if t < hit_distance {
                hit_distance = t;
                closest = HitObject::Cuboid(i);
            }
        }
    }

    match closest {
        HitObject::None => HitPayload::miss(),
        object => closest_hit(ray, hit_distance, object, scene),
    }
}

fn closest_hit(ray: &Ray, hit_distance: Fp, object: HitObject, scene: &Scene) -> HitPayload {
    let (world_position, world_normal) = match object {
        HitObject::Sphere(i) => {
            let sphere = &scene.spheres[i];
            let local = ray.origin - sphere.position + ray.direction * hit_distance;
            (local + sphere.position, local.normalize())
        }
        HitObject::Plane(i) => (
            ray.origin + ray.direction * hit_distance,
            scene.planes[i].normal,
        ),
        HitObject::Cuboid(i) => {
            let hit_point = ray.origin + ray.direction * hit_distance;
            (hit_point, cuboid_normal(&scene.cuboids[i], &hit_point))
        }
        HitObject::None => return HitPayload::miss(),
    };
    HitPayload {
        hit_distance,
        world_position,
        world_normal,
        object,
    }
}
