//! Interactive CPU path tracer: analytic spheres, planes and cuboids, progressive
//! per-pixel accumulation across frames and an image-space denoising pipeline.

extern crate nalgebra as na;

pub mod camera;
pub mod dispatch;
pub mod error;
pub mod filters;
pub mod frame;
pub mod geometry;
pub mod renderer;
pub mod scene;
pub mod scene_file;
pub mod settings;
pub mod tracer;


pub use camera::{Camera, PerspectiveCamera};
pub use error::{DenoiseError, RenderError, SceneError};
pub use renderer::Renderer;
pub use scene::{Cuboid, Material, Plane, Scene, Sphere};
pub use settings::{FilterSettings, Settings};
