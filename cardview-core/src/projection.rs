/// Camera and projection utilities
use nalgebra::{Matrix4, Point2, Point3, Vector3};

use crate::picking::Ray;

/// Perspective camera looking at the scene origin
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            position: Point3::new(0.0, 0.0, 5.0),
            target: Point3::new(0.0, 0.0, 0.0),
            up: Vector3::new(0.0, 1.0, 0.0),
            fov: std::f32::consts::PI / 4.0, // 45 degrees
            aspect: aspect_ratio(width, height),
            near: 0.1,
            far: 100.0,
        }
    }

    /// The camera every viewer on the page uses: 45 degrees, 20 units back on +Z
    pub fn page(width: u32, height: u32) -> Self {
        Self {
            position: Point3::new(0.0, 0.0, 20.0),
            far: 1000.0,
            ..Self::new(width, height)
        }
    }

    /// Follow a resized drawing surface. Only the aspect ratio changes.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.aspect = aspect_ratio(width, height);
    }

    /// Create the view matrix (camera transformation)
    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(&self.position, &self.target, &self.up)
    }

    /// Create the projection matrix
    pub fn projection_matrix(&self) -> Matrix4<f32> {
        Matrix4::new_perspective(self.aspect, self.fov, self.near, self.far)
    }

    pub fn view_projection(&self) -> Matrix4<f32> {
        self.projection_matrix() * self.view_matrix()
    }

    /// Project a 3D point to 2D screen space
    pub fn project_to_screen(
        &self,
        point: &Point3<f32>,
        model_matrix: &Matrix4<f32>,
        width: u32,
        height: u32,
    ) -> Option<(f32, f32, f32)> {
        let mvp = self.view_projection() * model_matrix;

        // transform_point performs the perspective divide
        let ndc = mvp.transform_point(point);
        if !ndc.coords.iter().all(|c| c.is_finite()) {
            return None;
        }

        // Depth clip test; x/y outside the screen are left to the rasterizer
        if ndc.z < -1.0 || ndc.z > 1.0 {
            return None;
        }

        // Convert to screen space
        let screen_x = (ndc.x + 1.0) * 0.5 * width as f32;
        let screen_y = (1.0 - ndc.y) * 0.5 * height as f32;

        Some((screen_x, screen_y, ndc.z))
    }

    /// Pick ray leaving the camera through a normalized device coordinate
    pub fn ray_through(&self, ndc: &Point2<f32>) -> Option<Ray> {
        let inverse = self.view_projection().try_inverse()?;
        let near = inverse.transform_point(&Point3::new(ndc.x, ndc.y, -1.0));
        let far = inverse.transform_point(&Point3::new(ndc.x, ndc.y, 1.0));
        let direction = (far - near).try_normalize(f32::EPSILON)?;

        Some(Ray::new(near, direction))
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

fn aspect_ratio(width: u32, height: u32) -> f32 {
    width.max(1) as f32 / height.max(1) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_creation() {
        let camera = Camera::new(800, 600);
        assert!((camera.aspect - 800.0 / 600.0).abs() < 1e-6);
    }

    #[test]
    fn test_page_camera_sees_a_card_sized_object() {
        let camera = Camera::page(800, 600);
        let (_, y, _) = camera
            .project_to_screen(&Point3::new(0.0, 5.0, 0.0), &Matrix4::identity(), 800, 600)
            .unwrap();
        assert!(y > 0.0 && y < 300.0);

        // Thirty units below is out of view
        let (_, y, _) = camera
            .project_to_screen(&Point3::new(0.0, -30.0, 0.0), &Matrix4::identity(), 800, 600)
            .unwrap();
        assert!(y > 600.0);
    }

    #[test]
    fn test_resize_changes_aspect_only() {
        let mut camera = Camera::page(800, 600);
        let before = camera.clone();
        camera.set_viewport(1920, 1080);

        assert!((camera.aspect - 1920.0 / 1080.0).abs() < 1e-6);
        assert_eq!(camera.position, before.position);
        assert_eq!(camera.fov, before.fov);
        assert_eq!(camera.far, before.far);
    }

    #[test]
    fn test_zero_height_does_not_divide_by_zero() {
        let camera = Camera::page(300, 0);
        assert!(camera.aspect.is_finite());
    }

    #[test]
    fn test_origin_projects_to_screen_center() {
        let camera = Camera::page(800, 600);
        let (x, y, depth) = camera
            .project_to_screen(&Point3::origin(), &Matrix4::identity(), 800, 600)
            .unwrap();
        assert!((x - 400.0).abs() < 1e-3);
        assert!((y - 300.0).abs() < 1e-3);
        assert!(depth > -1.0 && depth < 1.0);
    }

    #[test]
    fn test_point_behind_camera_is_clipped() {
        let camera = Camera::page(800, 600);
        let behind = Point3::new(0.0, 0.0, 30.0);
        assert!(camera
            .project_to_screen(&behind, &Matrix4::identity(), 800, 600)
            .is_none());
    }

    #[test]
    fn test_center_ray_points_down_negative_z() {
        let camera = Camera::page(800, 600);
        let ray = camera.ray_through(&Point2::origin()).unwrap();
        assert!((ray.direction - Vector3::new(0.0, 0.0, -1.0)).norm() < 1e-4);
        assert!(ray.origin.x.abs() < 1e-4 && ray.origin.y.abs() < 1e-4);
    }
}
