/// Displayed objects: mesh parts, materials and normalization
use nalgebra::{Matrix4, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::NormalizeError;
use crate::geometry::{Aabb, Mesh};
use crate::transform::Pose;

/// Shading model of a material, mirroring the glTF/PBR split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaterialKind {
    /// Metal/rough PBR
    Standard,
    /// Diffuse only
    Lambert,
    /// Unlit
    Basic,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Linear RGB
    pub color: [f32; 3],
    pub metalness: f32,
    pub roughness: f32,
    pub opacity: f32,
    pub transparent: bool,
    pub kind: MaterialKind,
}

impl Material {
    /// Standard material from a `0xRRGGBB` color
    pub fn standard(hex: u32) -> Self {
        Self {
            color: hex_to_rgb(hex),
            metalness: 0.0,
            roughness: 1.0,
            opacity: 1.0,
            transparent: false,
            kind: MaterialKind::Standard,
        }
    }

    pub fn with_metal_rough(mut self, metalness: f32, roughness: f32) -> Self {
        self.metalness = metalness;
        self.roughness = roughness;
        self
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::standard(0xffffff)
    }
}

/// `0xRRGGBB` to linear RGB
pub fn hex_to_rgb(hex: u32) -> [f32; 3] {
    let channel = |shift: u32| srgb_to_linear(((hex >> shift) & 0xff) as f32 / 255.0);
    [channel(16), channel(8), channel(0)]
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// One drawable mesh of a displayed object
#[derive(Debug, Clone, PartialEq)]
pub struct MeshPart {
    pub mesh: Mesh,
    pub material: Option<Material>,
    /// Placement inside the object (accumulated node transforms)
    pub local: Matrix4<f32>,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

impl MeshPart {
    pub fn new(mesh: Mesh) -> Self {
        Self {
            mesh,
            material: None,
            local: Matrix4::identity(),
            cast_shadow: false,
            receive_shadow: false,
        }
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = Some(material);
        self
    }

    pub fn with_local(mut self, local: Matrix4<f32>) -> Self {
        self.local = local;
        self
    }

    pub fn with_shadows(mut self, cast: bool, receive: bool) -> Self {
        self.cast_shadow = cast;
        self.receive_shadow = receive;
        self
    }
}

/// Per-mesh adjustments applied to a freshly loaded asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfacePolicy {
    pub cast_shadow: bool,
    pub receive_shadow: bool,
    /// Overrides for Standard and Lambert materials
    pub metalness: f32,
    pub roughness: f32,
    /// Transparent materials below this opacity are made opaque
    pub min_opacity: f32,
    /// Assigned to parts that carry no material
    pub default_material: Material,
}

impl SurfacePolicy {
    /// The business card: shadows everywhere, slightly glossy
    pub fn card() -> Self {
        Self {
            cast_shadow: true,
            receive_shadow: true,
            metalness: 0.1,
            roughness: 0.3,
            min_opacity: 0.1,
            default_material: Material::standard(0xff6b6b).with_metal_rough(0.1, 0.3),
        }
    }
}

impl Default for SurfacePolicy {
    fn default() -> Self {
        Self::card()
    }
}

/// The single loaded or procedural asset a viewport shows
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayedObject {
    pub parts: Vec<MeshPart>,
    /// Animated placement in the scene
    pub pose: Pose,
    /// Uniform normalization scale, applied before the pose
    pub scale: f32,
    /// Normalization offset, applied before the scale
    pub offset: Vector3<f32>,
}

impl DisplayedObject {
    pub fn new(parts: Vec<MeshPart>) -> Self {
        Self {
            parts,
            pose: Pose::identity(),
            scale: 1.0,
            offset: Vector3::zeros(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.parts.iter().all(|part| part.mesh.is_empty())
    }

    pub fn mesh_count(&self) -> usize {
        self.parts.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.parts.iter().map(|part| part.mesh.triangles.len()).sum()
    }

    /// Normalization only: scale after re-centering
    pub fn normalization_matrix(&self) -> Matrix4<f32> {
        Matrix4::new_scaling(self.scale) * Matrix4::new_translation(&self.offset)
    }

    pub fn model_matrix(&self) -> Matrix4<f32> {
        self.pose.matrix() * self.normalization_matrix()
    }

    /// World matrix of one part
    pub fn part_matrix(&self, index: usize) -> Matrix4<f32> {
        let local = self
            .parts
            .get(index)
            .map_or_else(Matrix4::identity, |part| part.local);
        self.model_matrix() * local
    }

    /// Bounds of the raw parts, before normalization and pose
    pub fn raw_bounds(&self) -> Aabb {
        self.bounds_with(&Matrix4::identity())
    }

    /// Bounds after normalization, pose ignored
    pub fn content_bounds(&self) -> Aabb {
        self.bounds_with(&self.normalization_matrix())
    }

    /// Bounds in the scene
    pub fn world_bounds(&self) -> Aabb {
        self.bounds_with(&self.model_matrix())
    }

    fn bounds_with(&self, matrix: &Matrix4<f32>) -> Aabb {
        self.parts.iter().fold(Aabb::empty(), |bounds, part| {
            bounds.union(&part.mesh.bounds().transformed(&(matrix * part.local)))
        })
    }

    /// Scale so the largest dimension equals `target_size` and move the center to the origin.
    ///
    /// The pose is left alone, so rotations keep turning about the center.
    pub fn normalize(&mut self, target_size: f32) -> Result<(), NormalizeError> {
        if !(target_size.is_finite() && target_size > 0.0) {
            return Err(NormalizeError::InvalidTarget(target_size));
        }

        let bounds = self.raw_bounds();
        if bounds.is_empty() {
            return Err(NormalizeError::Empty);
        }

        let max_dimension = bounds.max_dimension();
        if !(max_dimension.is_finite() && max_dimension > f32::EPSILON) {
            return Err(NormalizeError::Degenerate(max_dimension));
        }

        self.scale = target_size / max_dimension;
        self.offset = -bounds.center().coords;

        tracing::debug!(
            max_dimension,
            scale = self.scale,
            "normalized displayed object"
        );
        Ok(())
    }

    /// Apply `policy` to every part
    pub fn prepare_surfaces(&mut self, policy: &SurfacePolicy) {
        for part in &mut self.parts {
            part.cast_shadow = policy.cast_shadow;
            part.receive_shadow = policy.receive_shadow;

            match part.material.as_mut() {
                Some(material) => {
                    if matches!(material.kind, MaterialKind::Standard | MaterialKind::Lambert) {
                        material.metalness = policy.metalness;
                        material.roughness = policy.roughness;
                    }
                    if material.transparent && material.opacity < policy.min_opacity {
                        material.opacity = 1.0;
                        material.transparent = false;
                    }
                }
                None => part.material = Some(policy.default_material),
            }
        }
    }
}
