/// Viewer configuration with the page defaults baked in
use std::f32::consts::FRAC_PI_2;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::animation::{CardAnimation, Spin};
use crate::error::ConfigError;
use crate::lighting::LightingProfile;
use crate::scene::SurfacePolicy;
use crate::transform::RotationState;

/// What a viewport does with its object once it is in the scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PostLoad {
    /// Rise from below, then tilt with the page scroll
    CardRise { start_height: f32, rest_height: f32 },
    /// Fixed initial rotation, then spin forever
    Spin {
        initial_rotation: RotationState,
        spin: Spin,
    },
}

/// How the drawing surface is sized
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Sizing {
    /// Fill the browser window
    Window,
    /// Match the container's client size, with a fallback for zero-sized containers
    Container { default_width: u32, default_height: u32 },
}

impl Sizing {
    /// Resolve reported client dimensions to a drawable size
    pub fn resolve(&self, width: u32, height: u32) -> (u32, u32) {
        match *self {
            Sizing::Window => (width.max(1), height.max(1)),
            Sizing::Container {
                default_width,
                default_height,
            } => (
                if width == 0 { default_width } else { width },
                if height == 0 { default_height } else { height },
            ),
        }
    }
}

/// Fields omitted in JSON keep the card viewport's values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub container_id: String,
    pub asset_path: String,
    pub lighting: LightingProfile,
    pub behavior: PostLoad,
    pub target_size: f32,
    pub sizing: Sizing,
    /// Per-mesh adjustments; `None` leaves loaded materials untouched
    pub surfaces: Option<SurfacePolicy>,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            container_id: "container3D".to_string(),
            asset_path: "/models/Card.glb".to_string(),
            lighting: LightingProfile::card(),
            behavior: PostLoad::CardRise {
                start_height: CardAnimation::START_HEIGHT,
                rest_height: CardAnimation::REST_HEIGHT,
            },
            target_size: 10.0,
            sizing: Sizing::Window,
            surfaces: Some(SurfacePolicy::card()),
        }
    }
}

impl ViewportConfig {
    /// File name of the asset, for status messages
    pub fn asset_name(&self) -> &str {
        self.asset_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.asset_path)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.target_size.is_finite() && self.target_size > 0.0) {
            return Err(ConfigError::TargetSize(self.target_size));
        }
        Ok(())
    }

    /// One spinning gallery entry
    pub fn gallery_entry(container_id: &str, asset_path: &str) -> Self {
        Self {
            container_id: container_id.to_string(),
            asset_path: asset_path.to_string(),
            lighting: LightingProfile::gallery(),
            behavior: PostLoad::Spin {
                initial_rotation: RotationState::new(FRAC_PI_2, 0.0, 0.0),
                spin: Spin::default(),
            },
            target_size: 15.0,
            sizing: Sizing::Container {
                default_width: 200,
                default_height: 200,
            },
            surfaces: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardConfig {
    pub viewport: ViewportConfig,
    /// Opened in a new tab when the card is clicked
    pub link_url: String,
    pub loading_text_id: String,
    pub preload_text_id: String,
}

impl CardConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.viewport.validate()?;
        Ok(config)
    }
}

impl Default for CardConfig {
    fn default() -> Self {
        Self {
            viewport: ViewportConfig::default(),
            link_url: "https://cal.com/andrew-asante-dwtrqr/".to_string(),
            loading_text_id: "loadingText".to_string(),
            preload_text_id: "preloadText".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GalleryConfig {
    /// Each entry starts from `ViewportConfig::gallery_entry`
    #[serde(deserialize_with = "gallery_entries")]
    pub entries: Vec<ViewportConfig>,
}

/// Lay each JSON entry over the gallery defaults, one top-level field at a time
fn gallery_entries<'de, D>(deserializer: D) -> Result<Vec<ViewportConfig>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let base = serde_json::to_value(ViewportConfig::gallery_entry("", "")).map_err(D::Error::custom)?;
    Vec::<Map<String, Value>>::deserialize(deserializer)?
        .into_iter()
        .map(|overrides| {
            let mut entry = base.clone();
            if let Value::Object(fields) = &mut entry {
                fields.extend(overrides);
            }
            serde_json::from_value(entry).map_err(D::Error::custom)
        })
        .collect()
}

impl GalleryConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        if config.entries.is_empty() {
            return Err(ConfigError::NoEntries);
        }
        for entry in &config.entries {
            entry.validate()?;
        }
        Ok(config)
    }
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            entries: vec![
                ViewportConfig::gallery_entry("container3D-GREEN", "/models/green.glb"),
                ViewportConfig::gallery_entry("container3D-BLUE", "/models/blue.glb"),
                ViewportConfig::gallery_entry("container3D-RED", "/models/red.glb"),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::Axis;

    #[test]
    fn test_card_defaults() {
        let config = CardConfig::default();
        assert_eq!(config.viewport.container_id, "container3D");
        assert_eq!(config.viewport.asset_name(), "Card.glb");
        assert_eq!(config.viewport.target_size, 10.0);
        assert!(matches!(
            config.viewport.behavior,
            PostLoad::CardRise { start_height, rest_height } if start_height == -30.0 && rest_height == 0.0
        ));
    }

    #[test]
    fn test_gallery_defaults() {
        let config = GalleryConfig::default();
        let ids: Vec<&str> = config.entries.iter().map(|e| e.container_id.as_str()).collect();
        assert_eq!(ids, ["container3D-GREEN", "container3D-BLUE", "container3D-RED"]);

        let entry = &config.entries[0];
        assert_eq!(entry.target_size, 15.0);
        match entry.behavior {
            PostLoad::Spin { initial_rotation, spin } => {
                assert_eq!(initial_rotation.x, FRAC_PI_2);
                assert_eq!(spin.axis, Axis::Z);
                assert_eq!(spin.step, 0.01);
            }
            PostLoad::CardRise { .. } => panic!("gallery entries spin"),
        }
    }

    #[test]
    fn test_container_sizing_falls_back() {
        let sizing = Sizing::Container {
            default_width: 200,
            default_height: 200,
        };
        assert_eq!(sizing.resolve(0, 0), (200, 200));
        assert_eq!(sizing.resolve(320, 0), (320, 200));
        assert_eq!(sizing.resolve(320, 240), (320, 240));
        assert_eq!(Sizing::Window.resolve(0, 0), (1, 1));
    }

    #[test]
    fn test_card_json_override() {
        let config = CardConfig::from_json(r#"{ "link_url": "https://example.com/" }"#).unwrap();
        assert_eq!(config.link_url, "https://example.com/");
        assert_eq!(config.viewport.container_id, "container3D");
    }

    #[test]
    fn test_card_json_overrides_one_viewport_field() {
        let config =
            CardConfig::from_json(r#"{ "viewport": { "asset_path": "/models/Other.glb" } }"#).unwrap();
        assert_eq!(config.viewport.asset_name(), "Other.glb");
        assert_eq!(config.viewport.container_id, "container3D");
        assert_eq!(config.viewport.target_size, 10.0);
        assert_eq!(config.viewport.sizing, Sizing::Window);
        assert_eq!(config.viewport.surfaces, Some(SurfacePolicy::card()));
        assert!(matches!(config.viewport.behavior, PostLoad::CardRise { .. }));
    }

    #[test]
    fn test_gallery_entry_defaults_to_spinning() {
        let config = GalleryConfig::from_json(
            r#"{ "entries": [ { "container_id": "solo", "asset_path": "/models/solo.glb" } ] }"#,
        )
        .unwrap();
        assert_eq!(
            config.entries,
            vec![ViewportConfig::gallery_entry("solo", "/models/solo.glb")]
        );
    }

    #[test]
    fn test_gallery_json_round_trip_of_one_entry() {
        let json = r#"{ "entries": [ {
            "container_id": "solo",
            "asset_path": "/models/solo.stl",
            "behavior": {
                "kind": "spin",
                "initial_rotation": { "x": 0.0, "y": 0.0, "z": 0.0 },
                "spin": { "axis": "Y", "step": 0.02 }
            },
            "target_size": 8.0,
            "sizing": { "kind": "container", "default_width": 100, "default_height": 100 }
        } ] }"#;
        let config = GalleryConfig::from_json(json).unwrap();
        assert_eq!(config.entries.len(), 1);
        assert!(matches!(
            config.entries[0].behavior,
            PostLoad::Spin { spin: Spin { axis: Axis::Y, .. }, .. }
        ));
    }

    #[test]
    fn test_invalid_json_configs() {
        assert!(matches!(
            GalleryConfig::from_json(r#"{ "entries": [] }"#),
            Err(ConfigError::NoEntries)
        ));
        assert!(matches!(CardConfig::from_json("nope"), Err(ConfigError::Json(_))));

        let mut config = CardConfig::default();
        config.viewport.target_size = -1.0;
        let json = serde_json::to_string(&config).unwrap();
        assert!(matches!(CardConfig::from_json(&json), Err(ConfigError::TargetSize(_))));
    }
}
