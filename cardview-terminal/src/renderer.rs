/// ASCII rasterizer for terminal rendering
use cardview_core::{Camera, DisplayedObject, LightingProfile};
use crossterm::{
    style::{Color, Print, ResetColor, SetForegroundColor},
    QueueableCommand,
};
use nalgebra::{Matrix4, Point3, Vector3};
use std::io::Write;

/// Character luminosity ramp for shading (darkest to lightest)
const LUMINOSITY_RAMP: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Terminal cells are roughly twice as tall as they are wide
pub const CELL_ASPECT: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Cell {
    character: char,
    color: [u8; 3],
}

const BLANK: Cell = Cell {
    character: ' ',
    color: [0, 0, 0],
};

/// ASCII renderer that converts displayed objects to terminal characters
pub struct AsciiRenderer {
    width: usize,
    height: usize,
    depth_buffer: Vec<f32>,
    cells: Vec<Cell>,
}

impl AsciiRenderer {
    pub fn new(width: usize, height: usize) -> Self {
        let size = width * height;
        Self {
            width,
            height,
            depth_buffer: vec![f32::INFINITY; size],
            cells: vec![BLANK; size],
        }
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        *self = Self::new(width, height);
    }

    pub fn clear(&mut self) {
        self.depth_buffer.fill(f32::INFINITY);
        self.cells.fill(BLANK);
    }

    /// Number of cells covered by the last render
    pub fn coverage(&self) -> usize {
        self.cells.iter().filter(|cell| cell.character != ' ').count()
    }

    pub fn char_at(&self, x: usize, y: usize) -> Option<char> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.cells[y * self.width + x].character)
    }

    pub fn render_object(
        &mut self,
        object: &DisplayedObject,
        camera: &Camera,
        lighting: &LightingProfile,
    ) {
        for (index, part) in object.parts.iter().enumerate() {
            let model = object.part_matrix(index);
            let material = part.material.unwrap_or_else(|| cardview_core::Material::standard(0xffffff));
            for triangle in &part.mesh.triangles {
                let world = triangle
                    .vertices
                    .map(|vertex| model.transform_point(&vertex.position));
                let brightness = shade(&world, camera, lighting);
                self.render_triangle(&world, brightness, material.color, camera);
            }
        }
    }

    fn render_triangle(
        &mut self,
        world: &[Point3<f32>; 3],
        brightness: f32,
        color: [f32; 3],
        camera: &Camera,
    ) {
        let identity = Matrix4::identity();
        let mut screen_coords = [(0.0, 0.0, 0.0); 3];
        for (slot, point) in screen_coords.iter_mut().zip(world) {
            match camera.project_to_screen(point, &identity, self.width as u32, self.height as u32) {
                Some(coords) => *slot = coords,
                None => return, // Triangle is clipped
            }
        }

        // Map brightness to character
        let char_index = (brightness * (LUMINOSITY_RAMP.len() - 1) as f32).round() as usize;
        let character = LUMINOSITY_RAMP[char_index.clamp(1, LUMINOSITY_RAMP.len() - 1)];
        let color = color.map(|c| (c * brightness).sqrt().clamp(0.0, 1.0) * 255.0).map(|c| c as u8);

        self.rasterize_triangle(&screen_coords, Cell { character, color });
    }

    fn rasterize_triangle(&mut self, coords: &[(f32, f32, f32); 3], cell: Cell) {
        let (v0, v1, v2) = (coords[0], coords[1], coords[2]);

        // Bounding box
        let min_x = v0.0.min(v1.0).min(v2.0).floor() as i32;
        let max_x = v0.0.max(v1.0).max(v2.0).ceil() as i32;
        let min_y = v0.1.min(v1.1).min(v2.1).floor() as i32;
        let max_y = v0.1.max(v1.1).max(v2.1).ceil() as i32;

        // Clip to screen bounds
        let min_x = min_x.max(0);
        let max_x = max_x.min(self.width as i32 - 1);
        let min_y = min_y.max(0);
        let max_y = max_y.min(self.height as i32 - 1);

        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let px = x as f32 + 0.5;
                let py = y as f32 + 0.5;

                let Some((w0, w1, w2)) = barycentric((v0.0, v0.1), (v1.0, v1.1), (v2.0, v2.1), (px, py))
                else {
                    continue;
                };
                if w0 < 0.0 || w1 < 0.0 || w2 < 0.0 {
                    continue;
                }

                let depth = w0 * v0.2 + w1 * v1.2 + w2 * v2.2;
                let idx = y as usize * self.width + x as usize;
                if depth < self.depth_buffer[idx] {
                    self.depth_buffer[idx] = depth;
                    self.cells[idx] = cell;
                }
            }
        }
    }

    pub fn draw<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for row in self.cells.chunks(self.width.max(1)) {
            for cell in row {
                let [r, g, b] = cell.color;
                writer.queue(SetForegroundColor(Color::Rgb { r, g, b }))?;
                writer.queue(Print(cell.character))?;
            }
            writer.queue(Print("\r\n"))?;
        }
        writer.queue(ResetColor)?;
        Ok(())
    }
}

/// Lambert shading of a world-space triangle, turned to face the camera
fn shade(world: &[Point3<f32>; 3], camera: &Camera, lighting: &LightingProfile) -> f32 {
    let Some(mut normal) = (world[1] - world[0])
        .cross(&(world[2] - world[0]))
        .try_normalize(f32::EPSILON)
    else {
        return 0.0;
    };
    if normal.dot(&(camera.position - world[0])) < 0.0 {
        normal = -normal;
    }

    let diffuse: f32 = lighting
        .directional
        .iter()
        .filter_map(|light| {
            let direction = Vector3::from(light.position).try_normalize(f32::EPSILON)?;
            Some(light.intensity * normal.dot(&direction).max(0.0))
        })
        .sum();
    let brightness = lighting.ambient.intensity * 0.25 + diffuse * 0.6;
    brightness.clamp(0.0, 1.0)
}

/// Calculate barycentric coordinates for a point in a triangle
fn barycentric(
    v0: (f32, f32),
    v1: (f32, f32),
    v2: (f32, f32),
    p: (f32, f32),
) -> Option<(f32, f32, f32)> {
    let denom = (v1.1 - v2.1) * (v0.0 - v2.0) + (v2.0 - v1.0) * (v0.1 - v2.1);

    if denom.abs() < 1e-6 {
        return None;
    }

    let w0 = ((v1.1 - v2.1) * (p.0 - v2.0) + (v2.0 - v1.0) * (p.1 - v2.1)) / denom;
    let w1 = ((v2.1 - v0.1) * (p.0 - v2.0) + (v0.0 - v2.0) * (p.1 - v2.1)) / denom;
    let w2 = 1.0 - w0 - w1;

    Some((w0, w1, w2))
}
