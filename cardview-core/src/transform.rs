/// 3D transformation matrices, rotation state and object pose
use nalgebra::{Matrix4, Vector3};
use serde::{Deserialize, Serialize};

/// Rotation state around three axes (in radians)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotationState {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl RotationState {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }
}

impl Default for RotationState {
    fn default() -> Self {
        Self::zero()
    }
}

/// Transform builder for 3D transformations
pub struct Transform;

impl Transform {
    /// Create a rotation matrix from a rotation state.
    ///
    /// Intrinsic X, Y, Z order: the object turns about its own X axis first.
    pub fn rotation_matrix(rotation: &RotationState) -> Matrix4<f32> {
        let rx = Matrix4::new_rotation(Vector3::new(rotation.x, 0.0, 0.0));
        let ry = Matrix4::new_rotation(Vector3::new(0.0, rotation.y, 0.0));
        let rz = Matrix4::new_rotation(Vector3::new(0.0, 0.0, rotation.z));

        rx * ry * rz
    }
}

/// Position and orientation of a displayed object in the scene
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vector3<f32>,
    pub rotation: RotationState,
}

impl Pose {
    pub fn identity() -> Self {
        Self {
            position: Vector3::zeros(),
            rotation: RotationState::zero(),
        }
    }

    pub fn matrix(&self) -> Matrix4<f32> {
        Matrix4::new_translation(&self.position) * Transform::rotation_matrix(&self.rotation)
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_rotation_state_from_json() {
        let state: RotationState = serde_json::from_str(r#"{ "x": 1.5, "y": 0.0, "z": -0.25 }"#).unwrap();
        assert_eq!(state, RotationState::new(1.5, 0.0, -0.25));
        assert_eq!(RotationState::default(), RotationState::zero());
    }

    #[test]
    fn test_identity_rotation() {
        let rotation = RotationState::zero();
        let matrix = Transform::rotation_matrix(&rotation);
        assert!((matrix - Matrix4::identity()).norm() < 1e-6);
    }

    #[test]
    fn test_quarter_turn_about_x() {
        let matrix = Transform::rotation_matrix(&RotationState::new(FRAC_PI_2, 0.0, 0.0));
        let p = matrix.transform_point(&Point3::new(0.0, 1.0, 0.0));
        assert!((p - Point3::new(0.0, 0.0, 1.0)).norm() < 1e-6);
    }

    #[test]
    fn test_spin_happens_in_object_space() {
        // Tipped onto its back, spinning about local Z turns the object about world Y
        let matrix = Transform::rotation_matrix(&RotationState::new(FRAC_PI_2, 0.0, FRAC_PI_2));
        let p = matrix.transform_point(&Point3::new(1.0, 0.0, 0.0));
        assert!((p - Point3::new(0.0, 0.0, 1.0)).norm() < 1e-6);
    }

    #[test]
    fn test_pose_translates_after_rotating() {
        let pose = Pose {
            position: Vector3::new(0.0, -30.0, 0.0),
            rotation: RotationState::new(FRAC_PI_2, 0.0, 0.0),
        };
        let p = pose.matrix().transform_point(&Point3::new(0.0, 1.0, 0.0));
        assert!((p - Point3::new(0.0, -30.0, 1.0)).norm() < 1e-5);
    }
}
