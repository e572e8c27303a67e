/// Procedural business card shown when the card asset cannot be loaded
use nalgebra::{Matrix4, Vector3};

use crate::geometry::Mesh;
use crate::scene::{DisplayedObject, Material, MeshPart};

const PANEL: (f32, f32, f32) = (6.0, 3.5, 0.1);
/// Raised elements sit just proud of the panel's front face
const INLAY_Z: f32 = 0.06;
const INLAY_DEPTH: f32 = 0.02;

fn inlay(width: f32, height: f32, x: f32, y: f32, material: Material) -> MeshPart {
    MeshPart::new(Mesh::cuboid(width, height, INLAY_DEPTH))
        .with_material(material)
        .with_local(Matrix4::new_translation(&Vector3::new(x, y, INLAY_Z)))
}

/// White panel with dark bars standing in for text and a blue logo block
pub fn business_card() -> DisplayedObject {
    let text = Material::standard(0x333333);
    let logo = Material::standard(0x007acc);

    let mut parts = vec![
        MeshPart::new(Mesh::cuboid(PANEL.0, PANEL.1, PANEL.2))
            .with_material(Material::standard(0xffffff).with_metal_rough(0.1, 0.2))
            .with_shadows(true, true),
        // Company name
        inlay(4.0, 0.5, 0.0, 0.8, text),
        // Person name
        inlay(3.0, 0.3, 0.0, 0.2, text),
    ];

    // Contact lines
    parts.extend((0..3).map(|i| inlay(2.5, 0.15, 0.0, -0.3 - i as f32 * 0.3, text)));

    parts.push(inlay(0.8, 0.8, 2.0, 0.8, logo));

    tracing::info!(parts = parts.len(), "created fallback business card");
    DisplayedObject::new(parts)
}
