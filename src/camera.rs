use crate::geometry::{Fp, Vec3f};

/// Read-only view of a camera as consumed by the renderer.
///
/// `ray_directions` is indexed `x + y * width` and must cover the whole viewport.
pub trait Camera {
    fn position(&self) -> Vec3f;
    fn ray_directions(&self) -> &[Vec3f];
}

/// Pinhole camera with a precomputed per-pixel direction table.
#[derive(Clone, Debug)]
pub struct PerspectiveCamera {
    pub position: Vec3f,
    pub forward: Vec3f,
    pub right: Vec3f,
    pub up: Vec3f,
    /// Horizontal field of view in radians.
    pub fov_x: Fp,
    width: u32,
    height: u32,
    ray_directions: Vec<Vec3f>,
}

impl Default for PerspectiveCamera {
    fn default() -> Self {
        PerspectiveCamera::new(
            Vec3f::new(0.0, 0.0, 6.0),
            -Vec3f::z(),
            Vec3f::x(),
            Vec3f::y(),
            (45.0 as Fp).to_radians(),
        )
    }
}

impl PerspectiveCamera {
    pub fn new(position: Vec3f, forward: Vec3f, right: Vec3f, up: Vec3f, fov_x: Fp) -> Self {
        PerspectiveCamera {
            position,
            forward,
            right,
            up,
            fov_x,
            width: 0,
            height: 0,
            ray_directions: vec![],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn fov_y(&self) -> Fp {
        if self.width == 0 {
            return self.fov_x;
        }
        ((self.fov_x / 2.0).tan() * self.height as Fp / self.width as Fp).atan() * 2.0
    }

    /// Rebuilds the direction table when the viewport size changes.
    pub fn on_resize(&mut self, width: u32, height: u32) {
        if width == self.width && height == self.height && !self.ray_directions.is_empty() {
            return;
        }
        self.width = width;
        self.height = height;
        self.recalculate_ray_directions();
    }

    /// Call after moving or turning the camera.
    pub fn recalculate_ray_directions(&mut self) {
        let w = self.width as Fp;
        let h = self.height as Fp;
        let tan_x = (self.fov_x * 0.5).tan();
        let tan_y = (self.fov_y() * 0.5).tan();
        self.ray_directions.clear();
        self.ray_directions
            .reserve(self.width as usize * self.height as usize);
        for y in 0..self.height {
            for x in 0..self.width {
                let real_x = x as Fp + 0.5;
                let real_y = y as Fp + 0.5;
                let px = (2.0 * real_x / w - 1.0) * tan_x;
                let py = -(2.0 * real_y / h - 1.0) * tan_y;
                let direction = px * self.right + py * self.up + self.forward;
                self.ray_directions.push(direction.normalize());
            }
        }
    }
}

impl Camera for PerspectiveCamera {
    fn position(&self) -> Vec3f {
        self.position
    }

    fn ray_directions(&self) -> &[Vec3f] {
        &self.ray_directions
    }
}
