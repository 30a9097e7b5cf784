use nalgebra::UnitQuaternion;

use crate::error::SceneError;
use crate::geometry::{Fp, HitObject, Vec3f};

#[derive(Clone, Debug)]
pub struct Material {
    pub albedo: Vec3f,
    pub roughness: Fp,
    pub metallic: Fp,
    pub emission_color: Vec3f,
    pub emission_power: Fp,
}

impl Default for Material {
    fn default() -> Self {
        Material {
            albedo: Vec3f::repeat(1.0),
            roughness: 1.0,
            metallic: 0.0,
            emission_color: Vec3f::zeros(),
            emission_power: 0.0,
        }
    }
}

impl Material {
    pub fn emission(&self) -> Vec3f {
        self.emission_color * self.emission_power
    }
}

#[derive(Clone, Debug)]
pub struct Sphere {
    pub position: Vec3f,
    pub radius: Fp,
    pub material_index: usize,
}

impl Default for Sphere {
    fn default() -> Self {
        Sphere {
            position: Vec3f::zeros(),
            radius: 0.5,
            material_index: 0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Plane {
    pub position: Vec3f,
    /// Used as-is for shading, expected to be unit length.
    pub normal: Vec3f,
    pub material_index: usize,
}

impl Default for Plane {
    fn default() -> Self {
        Plane {
            position: Vec3f::zeros(),
            normal: Vec3f::y(),
            material_index: 0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Cuboid {
    /// Center of the box.
    pub position: Vec3f,
    /// Full edge lengths.
    pub dimensions: Vec3f,
    pub rotation: UnitQuaternion<Fp>,
    pub material_index: usize,
}

impl Default for Cuboid {
    fn default() -> Self {
        Cuboid {
            position: Vec3f::zeros(),
            dimensions: Vec3f::repeat(1.0),
            rotation: UnitQuaternion::identity(),
            material_index: 0,
        }
    }
}

/// Primitive lists are scanned in order; insertion order is also the tie-break order.
#[derive(Clone, Debug, Default)]
pub struct Scene {
    pub spheres: Vec<Sphere>,
    pub planes: Vec<Plane>,
    pub cuboids: Vec<Cuboid>,
    pub materials: Vec<Material>,
}

impl Scene {
    pub fn material_index(&self, object: HitObject) -> Option<usize> {
        match object {
            HitObject::None => None,
            HitObject::Sphere(i) => self.spheres.get(i).map(|s| s.material_index),
            HitObject::Plane(i) => self.planes.get(i).map(|p| p.material_index),
            HitObject::Cuboid(i) => self.cuboids.get(i).map(|c| c.material_index),
        }
    }

    pub fn material_for(&self, object: HitObject) -> Option<&Material> {
        self.material_index(object)
            .and_then(|index| self.materials.get(index))
    }

    /// Checks that every primitive points at an existing material.
    pub fn validate(&self) -> Result<(), SceneError> {
        let objects = (0..self.spheres.len())
            .map(HitObject::Sphere)
            .chain((0..self.planes.len()).map(HitObject::Plane))
            .chain((0..self.cuboids.len()).map(HitObject::Cuboid));
        for object in objects {
            if let Some(index) = self.material_index(object) {
                if index >= self.materials.len() {
                    return Err(SceneError::InvalidMaterial {
                        object,
                        index,
                        available: self.materials.len(),
                    });
                }
            }
        }
        Ok(())
    }
}
