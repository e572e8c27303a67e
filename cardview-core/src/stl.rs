/// STL file parser for binary and ASCII formats
use nom::{
    bytes::complete::tag,
    character::complete::{multispace0, multispace1, not_line_ending},
    multi::many0,
    number::complete::float,
    sequence::preceded,
    IResult,
};

use crate::error::StlError;
use crate::geometry::{Mesh, Triangle, Vertex};

const HEADER_LEN: usize = 80;
const FACET_LEN: usize = 50;

/// Parse a binary STL file
pub fn parse_binary_stl(data: &[u8]) -> Result<Mesh, StlError> {
    if data.len() < HEADER_LEN + 4 {
        return Err(StlError::TooSmall);
    }

    // Skip 80-byte header
    let data = &data[HEADER_LEN..];

    // Read triangle count (4 bytes, little-endian)
    let triangle_count = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
    let facets = &data[4..];

    let available = facets.len() / FACET_LEN;
    if available < triangle_count {
        return Err(StlError::Truncated {
            parsed: available,
            expected: triangle_count,
        });
    }

    let mut mesh = Mesh::with_capacity(triangle_count);
    for facet in facets.chunks_exact(FACET_LEN).take(triangle_count) {
        let floats: Vec<f32> = facet[..48]
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();

        // Normal, then 3 vertices; the trailing attribute byte count is ignored
        let (nx, ny, nz) = (floats[0], floats[1], floats[2]);
        let vertex = |i: usize| {
            let base = 3 + i * 3;
            Vertex::new(floats[base], floats[base + 1], floats[base + 2], nx, ny, nz)
        };

        mesh.add_triangle(with_face_normal(Triangle::new(vertex(0), vertex(1), vertex(2))));
    }

    Ok(mesh)
}

/// Parse an ASCII STL file
pub fn parse_ascii_stl(input: &str) -> Result<Mesh, StlError> {
    match parse_ascii_stl_impl(input) {
        Ok((_, mesh)) => Ok(mesh),
        Err(e) => Err(StlError::Ascii(format!("{e:?}"))),
    }
}

fn parse_ascii_stl_impl(input: &str) -> IResult<&str, Mesh> {
    let (input, _) = preceded(multispace0, tag("solid"))(input)?;
    let (input, _) = not_line_ending(input)?; // Optional name
    let (input, triangles) = many0(parse_facet)(input)?;
    let (input, _) = preceded(multispace0, tag("endsolid"))(input)?;

    let mut mesh = Mesh::with_capacity(triangles.len());
    for triangle in triangles {
        mesh.add_triangle(with_face_normal(triangle));
    }

    Ok((input, mesh))
}

fn parse_facet(input: &str) -> IResult<&str, Triangle> {
    let (input, _) = preceded(multispace0, tag("facet"))(input)?;
    let (input, _) = preceded(multispace1, tag("normal"))(input)?;
    let (input, normal) = parse_vector3(input)?;
    let (input, _) = preceded(multispace0, tag("outer"))(input)?;
    let (input, _) = preceded(multispace1, tag("loop"))(input)?;
    let (input, v1) = parse_vertex(input, normal)?;
    let (input, v2) = parse_vertex(input, normal)?;
    let (input, v3) = parse_vertex(input, normal)?;
    let (input, _) = preceded(multispace0, tag("endloop"))(input)?;
    let (input, _) = preceded(multispace0, tag("endfacet"))(input)?;

    Ok((input, Triangle::new(v1, v2, v3)))
}

fn parse_vertex(input: &str, normal: (f32, f32, f32)) -> IResult<&str, Vertex> {
    let (input, _) = preceded(multispace0, tag("vertex"))(input)?;
    let (input, (x, y, z)) = parse_vector3(input)?;
    Ok((input, Vertex::new(x, y, z, normal.0, normal.1, normal.2)))
}

fn parse_vector3(input: &str) -> IResult<&str, (f32, f32, f32)> {
    let (input, _) = multispace0(input)?;
    let (input, x) = float(input)?;
    let (input, _) = multispace1(input)?;
    let (input, y) = float(input)?;
    let (input, _) = multispace1(input)?;
    let (input, z) = float(input)?;
    Ok((input, (x, y, z)))
}

/// Many exporters write zero normals; fall back to the winding
fn with_face_normal(mut triangle: Triangle) -> Triangle {
    if triangle.vertices[0].normal.norm_squared() < f32::EPSILON {
        let normal = triangle.calculate_normal();
        for vertex in &mut triangle.vertices {
            vertex.normal = normal;
        }
    }
    triangle
}

/// Detect and parse STL file (binary or ASCII)
pub fn parse_stl(data: &[u8]) -> Result<Mesh, StlError> {
    // Binary files may also start with "solid", so ASCII is only a first guess
    if data.starts_with(b"solid") {
        if let Ok(text) = std::str::from_utf8(data) {
            if let Ok(mesh) = parse_ascii_stl(text) {
                return Ok(mesh);
            }
        }
    }

    parse_binary_stl(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TETRA_FACE: &str = "solid card
  facet normal 0 0 1
    outer loop
      vertex 0 0 0
      vertex 1 0 0
      vertex 0 1 0
    endloop
  endfacet
  facet normal 0 0 0
    outer loop
      vertex 0 0 0
      vertex 0 1 0
      vertex 0 0 1
    endloop
  endfacet
endsolid card
";

    #[test]
    fn test_parse_binary_header() {
        let mut data = vec![0u8; 84];
        // Set triangle count to 0
        data[80..84].copy_from_slice(&0u32.to_le_bytes());

        let result = parse_binary_stl(&data);
        assert!(result.is_ok());
        let mesh = result.unwrap();
        assert_eq!(mesh.triangles.len(), 0);
    }

    #[test]
    fn test_parse_binary_triangle() {
        let mut data = vec![0u8; 84];
        data[80..84].copy_from_slice(&1u32.to_le_bytes());
        for value in [0.0f32, 0.0, 1.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 2.0, 0.0] {
            data.extend_from_slice(&value.to_le_bytes());
        }
        data.extend_from_slice(&[0, 0]);

        let mesh = parse_binary_stl(&data).unwrap();
        assert_eq!(mesh.triangles.len(), 1);
        assert_eq!(mesh.triangles[0].vertices[1].position.x, 2.0);
        assert_eq!(mesh.triangles[0].vertices[2].normal.z, 1.0);
    }

    #[test]
    fn test_truncated_binary() {
        let mut data = vec![0u8; 84];
        data[80..84].copy_from_slice(&3u32.to_le_bytes());
        data.extend_from_slice(&[0u8; 60]);

        assert_eq!(
            parse_binary_stl(&data),
            Err(StlError::Truncated {
                parsed: 1,
                expected: 3
            })
        );
        assert_eq!(parse_binary_stl(&[0u8; 10]), Err(StlError::TooSmall));
    }

    #[test]
    fn test_parse_named_ascii_solid() {
        let mesh = parse_stl(TETRA_FACE.as_bytes()).unwrap();
        assert_eq!(mesh.triangles.len(), 2);

        // Zero normal replaced by the winding normal
        let normal = mesh.triangles[1].vertices[0].normal;
        assert!((normal.x - 1.0).abs() < 1e-6);
    }
}
