//! Line-oriented scene description format.
//!
//! One command per line, tokens separated by whitespace, `#` starts a comment line.
//! Material and primitive attributes apply to the most recent `NEW_MATERIAL` /
//! `NEW_PRIMITIVE`. Colors are three floats or a `#rrggbb` literal.

use std::str::FromStr;

use na::{Quaternion, UnitQuaternion};

use crate::camera::PerspectiveCamera;
use crate::error::SceneError;
use crate::geometry::{Fp, Vec3f};
use crate::scene::{Cuboid, Material, Plane, Scene, Sphere};
use crate::settings::{FilterSettings, Settings};

#[derive(Clone, Debug)]
pub struct SceneDescription {
    pub width: u32,
    pub height: u32,
    pub scene: Scene,
    /// Already sized to `width` x `height`.
    pub camera: PerspectiveCamera,
    pub settings: Settings,
    pub filter_settings: FilterSettings,
}

#[derive(Clone, Debug)]
enum Shape {
    Sphere { radius: Fp },
    Plane { normal: Vec3f },
    Cuboid { dimensions: Vec3f },
}

#[derive(Clone, Debug)]
struct PendingPrimitive {
    line: usize,
    shape: Option<Shape>,
    position: Vec3f,
    rotation: UnitQuaternion<Fp>,
    material_index: usize,
}

impl PendingPrimitive {
    fn new(line: usize) -> Self {
        PendingPrimitive {
            line,
            shape: None,
            position: Vec3f::zeros(),
            rotation: UnitQuaternion::identity(),
            material_index: 0,
        }
    }

    fn push_into(self, scene: &mut Scene) -> Result<(), SceneError> {
        match self.shape {
            None => Err(SceneError::Parse {
                line: self.line,
                message: "primitive has no SPHERE, PLANE or CUBOID shape".to_string(),
            }),
            Some(Shape::Sphere { radius }) => {
                scene.spheres.push(Sphere {
                    position: self.position,
                    radius,
                    material_index: self.material_index,
                });
                Ok(())
            }
            Some(Shape::Plane { normal }) => {
                scene.planes.push(Plane {
                    position: self.position,
                    normal,
                    material_index: self.material_index,
                });
                Ok(())
            }
            Some(Shape::Cuboid { dimensions }) => {
                scene.cuboids.push(Cuboid {
                    position: self.position,
                    dimensions,
                    rotation: self.rotation,
                    material_index: self.material_index,
                });
                Ok(())
            }
        }
    }
}

/// `#rrggbb` to linear `[0, 1]` RGB.
pub fn parse_hex_color(hex: &str) -> Option<Vec3f> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if digits.len() != 6 || !digits.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    Some(Vec3f::new(
        channel(0)? as Fp / 255.0,
        channel(2)? as Fp / 255.0,
        channel(4)? as Fp / 255.0,
    ))
}

struct Line<'a> {
    number: usize,
    tokens: Vec<&'a str>,
}

impl<'a> Line<'a> {
    fn error(&self, message: impl Into<String>) -> SceneError {
        SceneError::Parse {
            line: self.number,
            message: message.into(),
        }
    }

    fn parse<T: FromStr>(&self, index: usize) -> Result<T, SceneError> {
        let token = self
            .tokens
            .get(index)
            .ok_or_else(|| self.error(format!("{} expects more arguments", self.tokens[0])))?;
        token
            .parse()
            .map_err(|_| self.error(format!("invalid value `{token}` for {}", self.tokens[0])))
    }

    fn vector(&self) -> Result<Vec3f, SceneError> {
        Ok(Vec3f::new(self.parse(1)?, self.parse(2)?, self.parse(3)?))
    }

    fn color(&self) -> Result<Vec3f, SceneError> {
        match self.tokens.get(1) {
            Some(token) if token.starts_with('#') => parse_hex_color(token)
                .ok_or_else(|| self.error(format!("invalid hex color `{token}`"))),
            _ => self.vector(),
        }
    }

    fn flag(&self) -> Result<bool, SceneError> {
        Ok(self.parse::<u32>(1)? != 0)
    }
}

pub fn parse_scene_file(content: &str) -> Result<SceneDescription, SceneError> {
    let mut width = 640;
    let mut height = 360;
    let mut scene = Scene::default();
    let mut camera = PerspectiveCamera::default();
    let mut settings = Settings::default();
    let mut filters = FilterSettings::default();
    let mut current_primitive: Option<PendingPrimitive> = None;

    for (index, raw) in content.lines().enumerate() {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let line = Line {
            number: index + 1,
            tokens: trimmed.split_whitespace().collect(),
        };

        macro_rules! material {
            () => {
                scene
                    .materials
                    .last_mut()
                    .ok_or_else(|| line.error("material attribute before NEW_MATERIAL"))?
            };
        }
        macro_rules! primitive {
            () => {
                current_primitive
                    .as_mut()
                    .ok_or_else(|| line.error("primitive attribute before NEW_PRIMITIVE"))?
            };
        }

        match line.tokens[0] {
            "DIMENSIONS" => {
                width = line.parse(1)?;
                height = line.parse(2)?;
            }
            "CAMERA_POSITION" => camera.position = line.vector()?,
            "CAMERA_FORWARD" => camera.forward = line.vector()?,
            "CAMERA_RIGHT" => camera.right = line.vector()?,
            "CAMERA_UP" => camera.up = line.vector()?,
            "CAMERA_FOV_X" => camera.fov_x = line.parse(1)?,

            "NEW_MATERIAL" => scene.materials.push(Material::default()),
            "ALBEDO" => material!().albedo = line.color()?,
            "ROUGHNESS" => material!().roughness = line.parse(1)?,
            "METALLIC" => material!().metallic = line.parse(1)?,
            "EMISSION_COLOR" => material!().emission_color = line.color()?,
            "EMISSION_POWER" => material!().emission_power = line.parse(1)?,

            "NEW_PRIMITIVE" => {
                if let Some(done) = current_primitive.replace(PendingPrimitive::new(line.number)) {
                    done.push_into(&mut scene)?;
                }
            }
            "SPHERE" => {
                primitive!().shape = Some(Shape::Sphere {
                    radius: line.parse(1)?,
                })
            }
            "PLANE" => {
                primitive!().shape = Some(Shape::Plane {
                    normal: line.vector()?,
                })
            }
            "CUBOID" => {
                primitive!().shape = Some(Shape::Cuboid {
                    dimensions: line.vector()?,
                })
            }
            "POSITION" => primitive!().position = line.vector()?,
            "ROTATION" => {
                primitive!().rotation = UnitQuaternion::new_normalize(Quaternion::new(
                    line.parse(4)?,
                    line.parse(1)?,
                    line.parse(2)?,
                    line.parse(3)?,
                ))
            }
            "MATERIAL" => primitive!().material_index = line.parse(1)?,

            "MAX_SAMPLES" => settings.max_samples = line.parse(1)?,
            "MAX_BOUNCES" => settings.max_bounces = line.parse(1)?,
            "ACCUMULATE" => settings.accumulate = line.flag()?,
            "SKY_COLOR" => {
                settings.sky = true;
                settings.sky_color = line.color()?;
            }
            "NO_SKY" => settings.sky = false,
            "DENOISE" => settings.denoise = true,
            "SEED" => settings.seed = line.parse(1)?,
            "MIRROR_METALS" => settings.mirror_metals = true,

            "BILATERAL" => {
                filters.bilateral = true;
                filters.bilateral_spatial_sigma = line.parse(1)?;
                filters.bilateral_range_sigma = line.parse(2)?;
            }
            "JOINT_BILATERAL" => {
                filters.joint_bilateral = true;
                filters.joint_bilateral_spatial_sigma = line.parse(1)?;
                filters.joint_bilateral_range_sigma = line.parse(2)?;
            }
            "GAUSSIAN" => {
                filters.gaussian = true;
                filters.gaussian_sigma = line.parse(1)?;
            }
            "WAVELET" => {
                filters.wavelet = true;
                filters.wavelet_passes = line.parse(1)?;
            }
            "UNSHARP" => {
                filters.unsharp_mask = true;
                filters.unsharp_sigma = line.parse(1)?;
                filters.unsharp_amount = line.parse(2)?;
            }
            "OIDN" => {
                filters.oidn = true;
                filters.oidn_aux = line.tokens.get(1) != Some(&"NO_AUX");
            }
            unknown => log::warn!("line {}: ignoring unknown command {unknown}", line.number),
        }
    }
    if let Some(done) = current_primitive {
        done.push_into(&mut scene)?;
    }
    scene.validate()?;
    camera.on_resize(width, height);

    Ok(SceneDescription {
        width,
        height,
        scene,
        camera,
        settings,
        filter_settings: filters,
    })
}
