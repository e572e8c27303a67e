/// Light sets for the two viewers and image-based environment light
use serde::{Deserialize, Serialize};

use crate::hdr::HdrImage;
use crate::scene::hex_to_rgb;

pub const STUDIO_HDR_URL: &str =
    "https://dl.polyhaven.org/file/ph-assets/HDRIs/hdr/1k/studio_small_03_1k.hdr";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmbientLight {
    pub color: [f32; 3],
    pub intensity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectionalLight {
    pub color: [f32; 3],
    pub intensity: f32,
    /// Shines from here toward the origin
    pub position: [f32; 3],
    #[serde(default)]
    pub cast_shadow: bool,
    #[serde(default = "default_shadow_map_size")]
    pub shadow_map_size: u32,
}

fn default_shadow_map_size() -> u32 {
    512
}

impl DirectionalLight {
    pub fn white(intensity: f32, position: [f32; 3]) -> Self {
        Self {
            color: hex_to_rgb(0xffffff),
            intensity,
            position,
            cast_shadow: false,
            shadow_map_size: default_shadow_map_size(),
        }
    }

    pub fn with_shadow(mut self, map_size: u32) -> Self {
        self.cast_shadow = true;
        self.shadow_map_size = map_size;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToneMapping {
    None,
    AcesFilmic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingProfile {
    pub ambient: AmbientLight,
    pub directional: Vec<DirectionalLight>,
    pub shadows: bool,
    pub tone_mapping: ToneMapping,
    /// Encode the final color as sRGB instead of writing linear values
    pub output_srgb: bool,
    /// Equirectangular HDR image used for hemisphere lighting
    pub environment_url: Option<String>,
    /// `None` leaves the canvas transparent
    pub clear_color: Option<[f32; 4]>,
}

impl LightingProfile {
    /// Business card: bright ambient, shadowed key light and a fill from below
    pub fn card() -> Self {
        Self {
            ambient: AmbientLight {
                color: [1.0; 3],
                intensity: 0.8,
            },
            directional: vec![
                DirectionalLight::white(1.2, [5.0, 5.0, 5.0]).with_shadow(2048),
                DirectionalLight::white(0.6, [-5.0, -5.0, 5.0]),
            ],
            shadows: true,
            tone_mapping: ToneMapping::None,
            output_srgb: false,
            environment_url: None,
            clear_color: Some([0.0, 0.0, 0.0, 1.0]),
        }
    }

    /// Gallery: studio environment map with filmic tone mapping
    pub fn gallery() -> Self {
        Self {
            ambient: AmbientLight {
                color: [1.0; 3],
                intensity: 0.7,
            },
            directional: vec![
                DirectionalLight::white(1.2, [5.0, 10.0, 5.0]),
                DirectionalLight::white(0.5, [-5.0, -5.0, 5.0]),
            ],
            shadows: false,
            tone_mapping: ToneMapping::AcesFilmic,
            output_srgb: true,
            environment_url: Some(STUDIO_HDR_URL.to_string()),
            clear_color: None,
        }
    }

    /// First light that should render a shadow map, if shadows are on
    pub fn shadow_caster(&self) -> Option<&DirectionalLight> {
        if !self.shadows {
            return None;
        }
        self.directional.iter().find(|light| light.cast_shadow)
    }
}

impl Default for LightingProfile {
    fn default() -> Self {
        Self::card()
    }
}

/// Environment map reduced to a sky and a ground color
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvironmentLight {
    pub sky: [f32; 3],
    pub ground: [f32; 3],
    pub intensity: f32,
}

impl EnvironmentLight {
    /// Solid-angle weighted mean radiance of the upper and lower hemispheres
    pub fn from_equirect(image: &HdrImage) -> Self {
        let mut sky = [0.0f64; 3];
        let mut ground = [0.0f64; 3];
        let mut sky_weight = 0.0f64;
        let mut ground_weight = 0.0f64;

        for (y, row) in image.pixels.chunks(image.width.max(1)).enumerate() {
            let latitude = std::f64::consts::FRAC_PI_2
                - (y as f64 + 0.5) / image.height as f64 * std::f64::consts::PI;
            let weight = latitude.cos().max(0.0);

            let (sum, total) = if latitude >= 0.0 {
                (&mut sky, &mut sky_weight)
            } else {
                (&mut ground, &mut ground_weight)
            };
            for pixel in row {
                for (acc, &value) in sum.iter_mut().zip(pixel) {
                    *acc += f64::from(value) * weight;
                }
                *total += weight;
            }
        }

        let mean = |sum: [f64; 3], weight: f64| {
            if weight > 0.0 {
                sum.map(|c| (c / weight) as f32)
            } else {
                [0.0; 3]
            }
        };

        Self {
            sky: mean(sky, sky_weight),
            ground: mean(ground, ground_weight),
            intensity: 1.0,
        }
    }
}
