/// Geometry primitives shared by the renderers and the picker
use nalgebra::{Matrix4, Point3, Vector3};

/// A 3D vertex with position and normal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: Point3<f32>,
    pub normal: Vector3<f32>,
}

impl Vertex {
    pub fn new(x: f32, y: f32, z: f32, nx: f32, ny: f32, nz: f32) -> Self {
        Self {
            position: Point3::new(x, y, z),
            normal: Vector3::new(nx, ny, nz),
        }
    }
}

/// A triangle face defined by three vertices
#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    pub vertices: [Vertex; 3],
}

impl Triangle {
    pub fn new(v0: Vertex, v1: Vertex, v2: Vertex) -> Self {
        Self {
            vertices: [v0, v1, v2],
        }
    }

    /// Calculate the face normal from the triangle's vertices.
    ///
    /// Degenerate triangles yield a zero vector instead of NaNs.
    pub fn calculate_normal(&self) -> Vector3<f32> {
        let v0 = self.vertices[0].position;
        let v1 = self.vertices[1].position;
        let v2 = self.vertices[2].position;

        let edge1 = v1 - v0;
        let edge2 = v2 - v0;

        edge1
            .cross(&edge2)
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(Vector3::zeros)
    }
}

/// A 3D mesh composed of triangles
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub triangles: Vec<Triangle>,
}

impl Mesh {
    pub fn new() -> Self {
        Self {
            triangles: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            triangles: Vec::with_capacity(capacity),
        }
    }

    pub fn add_triangle(&mut self, triangle: Triangle) {
        self.triangles.push(triangle);
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Axis-aligned bounds of every vertex in mesh space
    pub fn bounds(&self) -> Aabb {
        let mut bounds = Aabb::empty();
        for triangle in &self.triangles {
            for vertex in &triangle.vertices {
                bounds.extend(&vertex.position);
            }
        }
        bounds
    }

    /// Axis-aligned box centered at the origin, two triangles per face
    pub fn cuboid(width: f32, height: f32, depth: f32) -> Self {
        let (hx, hy, hz) = (width / 2.0, height / 2.0, depth / 2.0);
        let mut mesh = Self::with_capacity(12);

        // Each face: outward normal and its four corners, counter-clockwise seen from outside
        let faces: [([f32; 3], [[f32; 3]; 4]); 6] = [
            ([0.0, 0.0, 1.0], [[-hx, -hy, hz], [hx, -hy, hz], [hx, hy, hz], [-hx, hy, hz]]),
            ([0.0, 0.0, -1.0], [[hx, -hy, -hz], [-hx, -hy, -hz], [-hx, hy, -hz], [hx, hy, -hz]]),
            ([0.0, 1.0, 0.0], [[-hx, hy, hz], [hx, hy, hz], [hx, hy, -hz], [-hx, hy, -hz]]),
            ([0.0, -1.0, 0.0], [[-hx, -hy, -hz], [hx, -hy, -hz], [hx, -hy, hz], [-hx, -hy, hz]]),
            ([1.0, 0.0, 0.0], [[hx, -hy, hz], [hx, -hy, -hz], [hx, hy, -hz], [hx, hy, hz]]),
            ([-1.0, 0.0, 0.0], [[-hx, -hy, -hz], [-hx, -hy, hz], [-hx, hy, hz], [-hx, hy, -hz]]),
        ];

        for (n, corners) in faces {
            let v = |c: [f32; 3]| Vertex::new(c[0], c[1], c[2], n[0], n[1], n[2]);
            mesh.add_triangle(Triangle::new(v(corners[0]), v(corners[1]), v(corners[2])));
            mesh.add_triangle(Triangle::new(v(corners[0]), v(corners[2]), v(corners[3])));
        }

        mesh
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl Aabb {
    /// An inverted box that any point extends
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            max: Point3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    pub fn extend(&mut self, point: &Point3<f32>) {
        self.min = self.min.inf(point);
        self.max = self.max.sup(point);
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// Zero for an empty box
    pub fn size(&self) -> Vector3<f32> {
        if self.is_empty() {
            return Vector3::zeros();
        }
        self.max - self.min
    }

    pub fn center(&self) -> Point3<f32> {
        if self.is_empty() {
            return Point3::origin();
        }
        nalgebra::center(&self.min, &self.max)
    }

    pub fn max_dimension(&self) -> f32 {
        self.size().max()
    }

    /// Bounds of the eight corners after applying `matrix`
    pub fn transformed(&self, matrix: &Matrix4<f32>) -> Aabb {
        if self.is_empty() {
            return *self;
        }
        let mut out = Aabb::empty();
        for i in 0..8 {
            let corner = Point3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            );
            out.extend(&matrix.transform_point(&corner));
        }
        out
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cuboid_bounds() {
        let mesh = Mesh::cuboid(6.0, 3.5, 0.1);
        assert_eq!(mesh.triangles.len(), 12);

        let bounds = mesh.bounds();
        assert!((bounds.size() - Vector3::new(6.0, 3.5, 0.1)).norm() < 1e-6);
        assert!(bounds.center().coords.norm() < 1e-6);
    }

    #[test]
    fn test_cuboid_normals_face_outward() {
        let mesh = Mesh::cuboid(2.0, 2.0, 2.0);
        for triangle in &mesh.triangles {
            let centroid = (triangle.vertices[0].position.coords
                + triangle.vertices[1].position.coords
                + triangle.vertices[2].position.coords)
                / 3.0;
            let normal = triangle.calculate_normal();
            assert!(normal.dot(&centroid) > 0.0);
            assert!((normal - triangle.vertices[0].normal).norm() < 1e-6);
        }
    }

    #[test]
    fn test_empty_aabb() {
        let bounds = Mesh::new().bounds();
        assert!(bounds.is_empty());
        assert_eq!(bounds.max_dimension(), 0.0);
        assert_eq!(bounds.center(), Point3::origin());
    }

    #[test]
    fn test_transformed_aabb() {
        let mut bounds = Aabb::empty();
        bounds.extend(&Point3::new(-1.0, -2.0, -3.0));
        bounds.extend(&Point3::new(1.0, 2.0, 3.0));

        let moved = bounds.transformed(&Matrix4::new_translation(&Vector3::new(10.0, 0.0, 0.0)));
        assert!((moved.center().x - 10.0).abs() < 1e-6);
        assert!((moved.size() - bounds.size()).norm() < 1e-6);

        let scaled = bounds.transformed(&Matrix4::new_scaling(2.0));
        assert!((scaled.max_dimension() - 12.0).abs() < 1e-5);
    }

    #[test]
    fn test_degenerate_triangle_normal() {
        let v = Vertex::new(1.0, 1.0, 1.0, 0.0, 0.0, 1.0);
        let triangle = Triangle::new(v, v, v);
        assert_eq!(triangle.calculate_normal(), Vector3::zeros());
    }
}
