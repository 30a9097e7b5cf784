use thiserror::Error;

use crate::geometry::HitObject;

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("{object:?} uses material {index}, but the scene has {available} materials")]
    InvalidMaterial {
        object: HitObject,
        index: usize,
        available: usize,
    },
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("render called before the viewport was sized")]
    NotSized,
    #[error("failed to allocate frame buffers for {width}x{height}")]
    Allocation { width: u32, height: u32 },
    #[error("camera provides {actual} ray directions, viewport needs {expected}")]
    CameraMismatch { expected: usize, actual: usize },
    #[error(transparent)]
    Scene(#[from] SceneError),
}

#[derive(Debug, Error)]
pub enum DenoiseError {
    #[error("learned denoiser not compiled in (enable the `oidn` feature)")]
    Unavailable,
    #[error("denoiser device error: {0}")]
    Device(String),
}
