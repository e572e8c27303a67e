/// Ray casting against displayed objects
use nalgebra::{Matrix4, Point2, Point3, Vector3};

use crate::geometry::{Aabb, Triangle};
use crate::scene::DisplayedObject;

const EPSILON: f32 = 1e-7;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Point3<f32>,
    /// Unit length
    pub direction: Vector3<f32>,
}

/// Nearest intersection with a displayed object
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub distance: f32,
    /// Index into `DisplayedObject::parts`
    pub part: usize,
}

impl Ray {
    pub fn new(origin: Point3<f32>, direction: Vector3<f32>) -> Self {
        Self { origin, direction }
    }

    pub fn at(&self, t: f32) -> Point3<f32> {
        self.origin + self.direction * t
    }

    /// Distance along the ray to `triangle` placed in the world by `matrix`.
    ///
    /// Möller–Trumbore; both faces count.
    pub fn intersect_triangle(&self, triangle: &Triangle, matrix: &Matrix4<f32>) -> Option<f32> {
        let v0 = matrix.transform_point(&triangle.vertices[0].position);
        let v1 = matrix.transform_point(&triangle.vertices[1].position);
        let v2 = matrix.transform_point(&triangle.vertices[2].position);

        let edge1 = v1 - v0;
        let edge2 = v2 - v0;
        let p = self.direction.cross(&edge2);
        let det = edge1.dot(&p);
        if det.abs() < EPSILON {
            return None;
        }

        let inv_det = 1.0 / det;
        let s = self.origin - v0;
        let u = s.dot(&p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(&edge1);
        let v = self.direction.dot(&q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = edge2.dot(&q) * inv_det;
        (t > EPSILON).then_some(t)
    }

    /// Nearest hit over every mesh part of `object`
    pub fn intersect_object(&self, object: &DisplayedObject) -> Option<Hit> {
        let mut nearest: Option<Hit> = None;

        for (index, part) in object.parts.iter().enumerate() {
            let matrix = object.part_matrix(index);

            // Cheap reject before walking the triangles
            if self.intersect_aabb(&part.mesh.bounds().transformed(&matrix)).is_none() {
                continue;
            }

            for triangle in &part.mesh.triangles {
                if let Some(distance) = self.intersect_triangle(triangle, &matrix) {
                    if nearest.map_or(true, |hit| distance < hit.distance) {
                        nearest = Some(Hit { distance, part: index });
                    }
                }
            }
        }

        nearest
    }

    /// Slab test; returns the entry distance (zero when starting inside)
    pub fn intersect_aabb(&self, bounds: &Aabb) -> Option<f32> {
        if bounds.is_empty() {
            return None;
        }

        let mut t_min = 0.0_f32;
        let mut t_max = f32::INFINITY;
        for axis in 0..3 {
            let origin = self.origin[axis];
            let direction = self.direction[axis];
            if direction.abs() < EPSILON {
                if origin < bounds.min[axis] || origin > bounds.max[axis] {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / direction;
            let mut t0 = (bounds.min[axis] - origin) * inv;
            let mut t1 = (bounds.max[axis] - origin) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return None;
            }
        }

        Some(t_min)
    }
}

/// Pointer position helpers
pub struct Pointer;

impl Pointer {
    /// Client pixel coordinates to normalized device coordinates (-1 to +1, y up)
    pub fn from_client(client_x: f32, client_y: f32, width: f32, height: f32) -> Point2<f32> {
        let width = width.max(1.0);
        let height = height.max(1.0);
        Point2::new(
            (client_x / width) * 2.0 - 1.0,
            -(client_y / height) * 2.0 + 1.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fallback;
    use crate::geometry::{Mesh, Vertex};
    use crate::animation::{CardPhase, Motion};
    use crate::config::CardConfig;
    use crate::projection::Camera;
    use crate::scene::MeshPart;

    fn unit_triangle() -> Triangle {
        Triangle::new(
            Vertex::new(-1.0, -1.0, 0.0, 0.0, 0.0, 1.0),
            Vertex::new(1.0, -1.0, 0.0, 0.0, 0.0, 1.0),
            Vertex::new(0.0, 1.0, 0.0, 0.0, 0.0, 1.0),
        )
    }

    #[test]
    fn test_ray_hits_triangle_front_and_back() {
        let triangle = unit_triangle();
        let front = Ray::new(Point3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
        let back = Ray::new(Point3::new(0.0, 0.0, -5.0), Vector3::new(0.0, 0.0, 1.0));

        let t = front.intersect_triangle(&triangle, &Matrix4::identity()).unwrap();
        assert!((t - 5.0).abs() < 1e-5);
        assert!(back.intersect_triangle(&triangle, &Matrix4::identity()).is_some());
    }

    #[test]
    fn test_ray_misses_outside_triangle_and_behind_origin() {
        let triangle = unit_triangle();
        let beside = Ray::new(Point3::new(3.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
        let away = Ray::new(Point3::new(0.0, 0.0, 5.0), Vector3::new(0.0, 0.0, 1.0));

        assert!(beside.intersect_triangle(&triangle, &Matrix4::identity()).is_none());
        assert!(away.intersect_triangle(&triangle, &Matrix4::identity()).is_none());
    }

    #[test]
    fn test_matrix_moves_triangle() {
        let triangle = unit_triangle();
        let ray = Ray::new(Point3::new(10.0, 0.0, 5.0), Vector3::new(0.0, 0.0, -1.0));
        let moved = Matrix4::new_translation(&Vector3::new(10.0, 0.0, 0.0));
        assert!(ray.intersect_triangle(&triangle, &moved).is_some());
    }

    #[test]
    fn test_pointer_normalization() {
        let center = Pointer::from_client(400.0, 300.0, 800.0, 600.0);
        assert!(center.coords.norm() < 1e-6);

        let top_left = Pointer::from_client(0.0, 0.0, 800.0, 600.0);
        assert_eq!(top_left, Point2::new(-1.0, 1.0));

        let bottom_right = Pointer::from_client(800.0, 600.0, 800.0, 600.0);
        assert_eq!(bottom_right, Point2::new(1.0, -1.0));
    }

    #[test]
    fn test_click_on_card_hits_and_corner_misses() {
        let card = fallback::business_card();
        let camera = Camera::page(800, 600);

        let center = camera
            .ray_through(&Pointer::from_client(400.0, 300.0, 800.0, 600.0))
            .unwrap();
        let hit = center.intersect_object(&card).unwrap();
        // Front face of the base panel
        assert!((center.at(hit.distance).z - 0.05).abs() < 1e-2);

        let corner = camera
            .ray_through(&Pointer::from_client(5.0, 5.0, 800.0, 600.0))
            .unwrap();
        assert!(corner.intersect_object(&card).is_none());
    }

    fn pick(object: &DisplayedObject, client_x: f32, client_y: f32) -> Option<Hit> {
        let camera = Camera::page(800, 600);
        camera
            .ray_through(&Pointer::from_client(client_x, client_y, 800.0, 600.0))?
            .intersect_object(object)
    }

    /// Place `object` as the card viewer does, then click the center and two corners
    fn clicks_on_posed_card(mut object: DisplayedObject, fallback: bool) {
        let config = CardConfig::default();
        let mut motion = Motion::new(&config.viewport.behavior);
        motion.begin_loading().unwrap();
        motion.place(&mut object.pose, fallback).unwrap();

        // Still below the view
        assert_eq!(object.pose.position.y, -30.0);
        assert!(pick(&object, 400.0, 300.0).is_none());

        motion.on_scroll(60.0);
        for _ in 0..400 {
            motion.tick(&mut object.pose);
        }
        let Motion::Card(card) = &motion else {
            panic!("card config builds a card motion");
        };
        assert_eq!(card.phase(), CardPhase::ScrollRotating);
        assert_eq!(object.pose.position.y, 0.0);
        assert!(object.pose.rotation.x > std::f32::consts::FRAC_PI_2);

        assert!(pick(&object, 400.0, 300.0).is_some());
        assert!(pick(&object, 5.0, 5.0).is_none());
        assert!(pick(&object, 795.0, 595.0).is_none());
    }

    #[test]
    fn test_clicks_on_risen_fallback_card() {
        clicks_on_posed_card(fallback::business_card(), true);
    }

    #[test]
    fn test_clicks_on_risen_normalized_card() {
        // Off-center raw asset; normalization scales it by 5 and recenters it
        let mut object = DisplayedObject::new(vec![MeshPart::new(Mesh::cuboid(2.0, 1.2, 0.1))
            .with_local(Matrix4::new_translation(&Vector3::new(4.0, -3.0, 7.0)))]);
        object.normalize(10.0).unwrap();
        assert!((object.scale - 5.0).abs() < 1e-5);

        clicks_on_posed_card(object, false);
    }

    #[test]
    fn test_nearest_part_wins() {
        let object = DisplayedObject::new(vec![
            MeshPart::new(Mesh::cuboid(1.0, 1.0, 1.0)),
            MeshPart::new(Mesh::cuboid(1.0, 1.0, 1.0))
                .with_local(Matrix4::new_translation(&Vector3::new(0.0, 0.0, 3.0))),
        ]);

        let ray = Ray::new(Point3::new(0.0, 0.0, 10.0), Vector3::new(0.0, 0.0, -1.0));
        let hit = ray.intersect_object(&object).unwrap();
        assert_eq!(hit.part, 1);
        assert!((hit.distance - 6.5).abs() < 1e-5);
    }

    #[test]
    fn test_aabb_slab() {
        let bounds = Mesh::cuboid(2.0, 2.0, 2.0).bounds();
        let ray = Ray::new(Point3::new(0.0, 0.0, 10.0), Vector3::new(0.0, 0.0, -1.0));
        assert!((ray.intersect_aabb(&bounds).unwrap() - 9.0).abs() < 1e-5);

        let parallel = Ray::new(Point3::new(5.0, 0.0, 10.0), Vector3::new(0.0, 0.0, -1.0));
        assert!(parallel.intersect_aabb(&bounds).is_none());
    }
}
