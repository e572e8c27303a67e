/// Asset decoding: glTF/GLB scenes and STL meshes into displayed objects
use gltf::{buffer, material::AlphaMode, mesh::Mode, Gltf};
use nalgebra::{Matrix4, Point3, Vector3};

use crate::error::ModelError;
use crate::geometry::{Mesh, Triangle, Vertex};
use crate::scene::{DisplayedObject, Material, MaterialKind, MeshPart};
use crate::stl;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetFormat {
    Glb,
    GltfJson,
    Stl,
}

impl AssetFormat {
    pub fn detect(data: &[u8]) -> Option<Self> {
        if data.starts_with(b"glTF") {
            return Some(Self::Glb);
        }
        let first = data.iter().find(|b| !b.is_ascii_whitespace());
        if first == Some(&b'{') {
            return Some(Self::GltfJson);
        }
        if data.starts_with(b"solid") || data.len() >= 84 {
            return Some(Self::Stl);
        }
        None
    }
}

/// Decode an asset of any supported format
pub fn load_model(data: &[u8]) -> Result<DisplayedObject, ModelError> {
    let format = AssetFormat::detect(data).ok_or(ModelError::UnknownFormat)?;
    tracing::debug!(?format, bytes = data.len(), "decoding asset");

    let object = match format {
        AssetFormat::Glb | AssetFormat::GltfJson => load_gltf(data)?,
        AssetFormat::Stl => DisplayedObject::new(vec![MeshPart::new(stl::parse_stl(data)?)]),
    };

    if object.is_empty() {
        return Err(ModelError::Empty);
    }

    tracing::info!(
        meshes = object.mesh_count(),
        triangles = object.triangle_count(),
        "asset decoded"
    );
    Ok(object)
}

fn load_gltf(data: &[u8]) -> Result<DisplayedObject, ModelError> {
    let gltf = Gltf::from_slice(data)?;

    // Only the GLB binary chunk can back a buffer here
    for buffer in gltf.buffers() {
        match buffer.source() {
            buffer::Source::Bin => {
                if gltf.blob.is_none() {
                    return Err(ModelError::MissingBinary(buffer.index()));
                }
            }
            buffer::Source::Uri(uri) => {
                return Err(ModelError::ExternalBuffer {
                    index: buffer.index(),
                    uri: uri.to_string(),
                });
            }
        }
    }
    let blob = gltf.blob.as_deref();

    let mut parts = Vec::new();
    let scene = gltf.default_scene().or_else(|| gltf.scenes().next());
    match scene {
        Some(scene) => {
            for node in scene.nodes() {
                collect_node(&node, &Matrix4::identity(), blob, &mut parts);
            }
        }
        // No scene graph: take the meshes as they are
        None => {
            for mesh in gltf.meshes() {
                collect_mesh(&mesh, &Matrix4::identity(), blob, &mut parts);
            }
        }
    }

    Ok(DisplayedObject::new(parts))
}

fn collect_node(
    node: &gltf::Node<'_>,
    parent: &Matrix4<f32>,
    blob: Option<&[u8]>,
    parts: &mut Vec<MeshPart>,
) {
    let local = parent * Matrix4::from(node.transform().matrix());

    if let Some(mesh) = node.mesh() {
        collect_mesh(&mesh, &local, blob, parts);
    }
    for child in node.children() {
        collect_node(&child, &local, blob, parts);
    }
}

fn collect_mesh(
    mesh: &gltf::Mesh<'_>,
    local: &Matrix4<f32>,
    blob: Option<&[u8]>,
    parts: &mut Vec<MeshPart>,
) {
    for primitive in mesh.primitives() {
        if primitive.mode() != Mode::Triangles {
            tracing::warn!(mesh = ?mesh.name(), mode = ?primitive.mode(), "skipping non-triangle primitive");
            continue;
        }

        let reader = primitive.reader(|_| blob);
        let Some(positions) = reader.read_positions() else {
            continue;
        };
        let positions: Vec<Point3<f32>> = positions.map(Point3::from).collect();
        let normals: Option<Vec<Vector3<f32>>> = reader
            .read_normals()
            .map(|normals| normals.map(Vector3::from).collect());
        let indices: Vec<u32> = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect(),
            None => (0..positions.len() as u32).collect(),
        };

        let mut triangles = Mesh::with_capacity(indices.len() / 3);
        for corner in indices.chunks_exact(3) {
            let vertex = |i: u32| -> Option<Vertex> {
                let position = *positions.get(i as usize)?;
                let normal = normals
                    .as_ref()
                    .and_then(|n| n.get(i as usize).copied())
                    .unwrap_or_else(Vector3::zeros);
                Some(Vertex { position, normal })
            };
            let (Some(a), Some(b), Some(c)) = (vertex(corner[0]), vertex(corner[1]), vertex(corner[2])) else {
                tracing::warn!(mesh = ?mesh.name(), "index out of range, dropping triangle");
                continue;
            };

            let mut triangle = Triangle::new(a, b, c);
            if normals.is_none() {
                let normal = triangle.calculate_normal();
                for vertex in &mut triangle.vertices {
                    vertex.normal = normal;
                }
            }
            triangles.add_triangle(triangle);
        }

        if triangles.is_empty() {
            continue;
        }

        let mut part = MeshPart::new(triangles).with_local(*local);
        part.material = convert_material(&primitive.material());
        parts.push(part);
    }
}

/// `None` for the glTF default material, so the surface pass can pick one
fn convert_material(material: &gltf::Material<'_>) -> Option<Material> {
    material.index()?;

    let pbr = material.pbr_metallic_roughness();
    let [r, g, b, a] = pbr.base_color_factor();
    let transparent = material.alpha_mode() == AlphaMode::Blend;

    Some(Material {
        color: [r, g, b],
        metalness: pbr.metallic_factor(),
        roughness: pbr.roughness_factor(),
        opacity: if transparent { a } else { 1.0 },
        transparent,
        kind: MaterialKind::Standard,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// One node holding a right triangle, translated by (10, 0, 0)
    fn triangle_glb(material: bool, alpha: Option<f32>) -> Vec<u8> {
        mesh_glb(4, material, alpha)
    }

    /// The same three vertices drawn with glTF primitive `mode`
    fn mesh_glb(mode: u32, material: bool, alpha: Option<f32>) -> Vec<u8> {
        let mut bin = Vec::new();
        for value in [0.0f32, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 4.0, 0.0] {
            bin.extend_from_slice(&value.to_le_bytes());
        }
        for index in [0u16, 1, 2, 0] {
            bin.extend_from_slice(&index.to_le_bytes());
        }

        let mut primitive = json!({ "attributes": { "POSITION": 0 }, "indices": 1, "mode": mode });
        let mut document = json!({
            "asset": { "version": "2.0" },
            "scene": 0,
            "scenes": [{ "nodes": [0] }],
            "nodes": [{ "mesh": 0, "translation": [10.0, 0.0, 0.0] }],
            "buffers": [{ "byteLength": bin.len() }],
            "bufferViews": [
                { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
                { "buffer": 0, "byteOffset": 36, "byteLength": 6 }
            ],
            "accessors": [
                { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                  "min": [0.0, 0.0, 0.0], "max": [2.0, 4.0, 0.0] },
                { "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }
            ]
        });
        if material {
            primitive["material"] = json!(0);
            let mut mat = json!({
                "pbrMetallicRoughness": {
                    "baseColorFactor": [1.0, 0.5, 0.25, alpha.unwrap_or(1.0)],
                    "metallicFactor": 0.8,
                    "roughnessFactor": 0.6
                }
            });
            if alpha.is_some() {
                mat["alphaMode"] = json!("BLEND");
            }
            document["materials"] = json!([mat]);
        }
        document["meshes"] = json!([{ "name": "Card", "primitives": [primitive] }]);

        glb(&document.to_string(), &bin)
    }

    fn glb(json: &str, bin: &[u8]) -> Vec<u8> {
        let mut json = json.as_bytes().to_vec();
        while json.len() % 4 != 0 {
            json.push(b' ');
        }
        let mut bin = bin.to_vec();
        while bin.len() % 4 != 0 {
            bin.push(0);
        }

        let total = 12 + 8 + json.len() + 8 + bin.len();
        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(b"glTF");
        out.extend_from_slice(&2u32.to_le_bytes());
        out.extend_from_slice(&(total as u32).to_le_bytes());
        out.extend_from_slice(&(json.len() as u32).to_le_bytes());
        out.extend_from_slice(b"JSON");
        out.extend_from_slice(&json);
        out.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        out.extend_from_slice(b"BIN\0");
        out.extend_from_slice(&bin);
        out
    }

    #[test]
    fn test_detect_formats() {
        assert_eq!(AssetFormat::detect(b"glTF\x02\0\0\0"), Some(AssetFormat::Glb));
        assert_eq!(AssetFormat::detect(b"  {\"asset\":{}}"), Some(AssetFormat::GltfJson));
        assert_eq!(AssetFormat::detect(b"solid x\nendsolid x"), Some(AssetFormat::Stl));
        assert_eq!(AssetFormat::detect(b"<html>"), None);
    }

    #[test]
    fn test_load_glb_applies_node_transform() {
        let object = load_model(&triangle_glb(false, None)).unwrap();
        assert_eq!(object.mesh_count(), 1);
        assert_eq!(object.triangle_count(), 1);

        let bounds = object.raw_bounds();
        assert!((bounds.min.x - 10.0).abs() < 1e-6);
        assert!((bounds.max.y - 4.0).abs() < 1e-6);

        // No normals in the file: face normal from the winding
        let normal = object.parts[0].mesh.triangles[0].vertices[0].normal;
        assert!((normal - Vector3::new(0.0, 0.0, 1.0)).norm() < 1e-6);
        assert!(object.parts[0].material.is_none());
    }

    #[test]
    fn test_loaded_glb_normalizes() {
        let mut object = load_model(&triangle_glb(false, None)).unwrap();
        object.normalize(10.0).unwrap();
        let bounds = object.content_bounds();
        assert!((bounds.max_dimension() - 10.0).abs() < 1e-4);
        assert!(bounds.center().coords.norm() < 1e-4);
    }

    #[test]
    fn test_glb_materials() {
        let object = load_model(&triangle_glb(true, None)).unwrap();
        let material = object.parts[0].material.unwrap();
        assert_eq!(material.color, [1.0, 0.5, 0.25]);
        assert_eq!((material.metalness, material.roughness), (0.8, 0.6));
        assert!(!material.transparent);

        let object = load_model(&triangle_glb(true, Some(0.05))).unwrap();
        let material = object.parts[0].material.unwrap();
        assert!(material.transparent);
        assert_eq!(material.opacity, 0.05);
    }

    #[test]
    fn test_non_triangle_primitives_are_skipped() {
        // POINTS
        assert!(matches!(
            load_model(&mesh_glb(0, false, None)),
            Err(ModelError::Empty)
        ));
    }

    #[test]
    fn test_external_buffers_are_rejected() {
        let document = json!({
            "asset": { "version": "2.0" },
            "buffers": [{ "byteLength": 4, "uri": "card.bin" }]
        });
        let result = load_model(document.to_string().as_bytes());
        assert!(matches!(result, Err(ModelError::ExternalBuffer { index: 0, .. })));
    }

    #[test]
    fn test_garbage_and_empty_assets() {
        assert!(matches!(load_model(b"<html>"), Err(ModelError::UnknownFormat)));
        assert!(matches!(load_model(b"{ not json"), Err(ModelError::Gltf(_))));

        let empty = json!({ "asset": { "version": "2.0" }, "scenes": [{ "nodes": [] }] });
        assert!(matches!(
            load_model(empty.to_string().as_bytes()),
            Err(ModelError::Empty)
        ));
    }
}
