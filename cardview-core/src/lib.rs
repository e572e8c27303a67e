/// Cardview Core Library - platform-free model of the card and gallery viewers
///
/// This library holds everything that does not touch a browser or a terminal:
/// asset decoding (glTF/GLB, STL, Radiance HDR), normalization, the fallback
/// card, picking, camera math, animation state machines and configuration.

pub mod animation;
pub mod config;
pub mod error;
pub mod fallback;
pub mod geometry;
pub mod hdr;
pub mod lighting;
pub mod model;
pub mod picking;
pub mod projection;
pub mod scene;
pub mod stl;
pub mod transform;

// Re-export commonly used types
pub use animation::{CardAnimation, CardPhase, Motion, Spin};
pub use config::{CardConfig, GalleryConfig, PostLoad, Sizing, ViewportConfig};
pub use error::{ConfigError, HdrError, ModelError, NormalizeError, PhaseError, StlError};
pub use geometry::{Aabb, Mesh, Triangle, Vertex};
pub use lighting::{EnvironmentLight, LightingProfile};
pub use picking::{Hit, Pointer, Ray};
pub use projection::Camera;
pub use scene::{DisplayedObject, Material, MeshPart, SurfacePolicy};
pub use transform::{Pose, RotationState, Transform};
