/// WebGL2 renderer: one lit pass plus an optional shadow-map pass
use std::collections::HashMap;

use cardview_core::geometry::{Aabb, Mesh};
use cardview_core::lighting::{EnvironmentLight, LightingProfile, ToneMapping};
use cardview_core::scene::{DisplayedObject, Material, MaterialKind};
use cardview_core::Camera;
use js_sys::{Object, Reflect};
use nalgebra::{Matrix3, Matrix4, Point3, Vector3};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{
    HtmlCanvasElement, WebGl2RenderingContext as GL, WebGlBuffer, WebGlFramebuffer, WebGlProgram,
    WebGlShader, WebGlTexture, WebGlUniformLocation, WebGlVertexArrayObject,
};

use crate::error::ViewerError;
use crate::shaders;

const FLOATS_PER_VERTEX: usize = 6;
const STRIDE: i32 = (FLOATS_PER_VERTEX * 4) as i32;

fn compile_shader(gl: &GL, source: &str, kind: u32) -> Result<WebGlShader, ViewerError> {
    let shader = gl
        .create_shader(kind)
        .ok_or_else(|| ViewerError::Gl("could not create shader".to_string()))?;
    gl.shader_source(&shader, source);
    gl.compile_shader(&shader);
    if !gl
        .get_shader_parameter(&shader, GL::COMPILE_STATUS)
        .as_bool()
        .unwrap_or(false)
    {
        let log = gl.get_shader_info_log(&shader).unwrap_or_default();
        gl.delete_shader(Some(&shader));
        return Err(ViewerError::Gl(log));
    }
    Ok(shader)
}

fn link_program(gl: &GL, vert_src: &str, frag_src: &str) -> Result<WebGlProgram, ViewerError> {
    let vert = compile_shader(gl, vert_src, GL::VERTEX_SHADER)?;
    let frag = compile_shader(gl, frag_src, GL::FRAGMENT_SHADER)?;
    let program = gl
        .create_program()
        .ok_or_else(|| ViewerError::Gl("could not create program".to_string()))?;
    gl.attach_shader(&program, &vert);
    gl.attach_shader(&program, &frag);
    gl.link_program(&program);
    gl.delete_shader(Some(&vert));
    gl.delete_shader(Some(&frag));
    if !gl
        .get_program_parameter(&program, GL::LINK_STATUS)
        .as_bool()
        .unwrap_or(false)
    {
        return Err(ViewerError::Gl(
            gl.get_program_info_log(&program).unwrap_or_default(),
        ));
    }
    Ok(program)
}

/// Linked program with its uniform locations looked up once
struct Program {
    program: WebGlProgram,
    uniforms: HashMap<&'static str, WebGlUniformLocation>,
}

impl Program {
    fn new(
        gl: &GL,
        vert_src: &str,
        frag_src: &str,
        names: &[&'static str],
    ) -> Result<Self, ViewerError> {
        let program = link_program(gl, vert_src, frag_src)?;
        // Uniforms the compiler optimized away have no location
        let uniforms = names
            .iter()
            .filter_map(|&name| Some((name, gl.get_uniform_location(&program, name)?)))
            .collect();
        Ok(Self { program, uniforms })
    }

    fn uniform(&self, name: &str) -> Option<&WebGlUniformLocation> {
        self.uniforms.get(name)
    }
}

const LIT_UNIFORMS: &[&str] = &[
    "u_model",
    "u_view_projection",
    "u_normal_matrix",
    "u_light_view_projection",
    "u_camera",
    "u_color",
    "u_opacity",
    "u_metalness",
    "u_roughness",
    "u_unlit",
    "u_specular",
    "u_ambient",
    "u_light_count",
    "u_light_dir",
    "u_light_color",
    "u_shadow_light",
    "u_receive_shadow",
    "u_shadow_map",
    "u_shadow_texel",
    "u_sky",
    "u_ground",
    "u_env_intensity",
    "u_tone_mapping",
    "u_srgb",
];

const DEPTH_UNIFORMS: &[&str] = &["u_model", "u_light_view_projection"];

/// Position and normal per vertex, little-endian f32, three vertices per triangle
pub fn interleave(mesh: &Mesh) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(mesh.triangles.len() * 3 * STRIDE as usize);
    for vertex in mesh.triangles.iter().flat_map(|triangle| &triangle.vertices) {
        let p = vertex.position;
        let n = vertex.normal;
        for value in [p.x, p.y, p.z, n.x, n.y, n.z] {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
    }
    bytes
}

/// Inverse transpose of the upper 3x3, for transforming normals
pub fn normal_matrix(model: &Matrix4<f32>) -> Matrix3<f32> {
    model
        .fixed_view::<3, 3>(0, 0)
        .into_owned()
        .try_inverse()
        .map_or_else(Matrix3::identity, |inverse| inverse.transpose())
}

/// Orthographic projection from a directional light that encloses `bounds`
pub fn light_view_projection(bounds: &Aabb, light_position: &Vector3<f32>) -> Matrix4<f32> {
    let direction = light_position
        .try_normalize(f32::EPSILON)
        .unwrap_or_else(Vector3::z);
    let center = bounds.center();
    let radius = (bounds.size().norm() * 0.5).max(1e-3);

    let eye = center + direction * (radius * 2.0);
    let up = if direction.cross(&Vector3::y()).norm() < 1e-4 {
        Vector3::z()
    } else {
        Vector3::y()
    };
    let view = Matrix4::look_at_rh(&eye, &center, &up);
    let projection =
        Matrix4::new_orthographic(-radius, radius, -radius, radius, radius * 0.5, radius * 3.5);
    projection * view
}

/// glTF default material: white, fully metallic and rough
fn unassigned_material() -> Material {
    Material::standard(0xffffff).with_metal_rough(1.0, 1.0)
}

struct GpuMesh {
    vao: WebGlVertexArrayObject,
    buffer: WebGlBuffer,
    vertex_count: i32,
    local: Matrix4<f32>,
    bounds: Aabb,
    material: Material,
    cast_shadow: bool,
    receive_shadow: bool,
}

struct ShadowPass {
    framebuffer: WebGlFramebuffer,
    texture: WebGlTexture,
    size: u32,
}

impl ShadowPass {
    /// A 1x1 map stands in when nothing casts, so the sampler is always complete
    fn new(gl: &GL, size: u32) -> Result<Self, ViewerError> {
        let size = size.max(1);
        let texture = gl
            .create_texture()
            .ok_or_else(|| ViewerError::Gl("could not create shadow texture".to_string()))?;
        gl.bind_texture(GL::TEXTURE_2D, Some(&texture));
        gl.tex_image_2d_with_i32_and_i32_and_i32_and_format_and_type_and_opt_u8_array(
            GL::TEXTURE_2D,
            0,
            GL::DEPTH_COMPONENT24 as i32,
            size as i32,
            size as i32,
            0,
            GL::DEPTH_COMPONENT,
            GL::UNSIGNED_INT,
            None,
        )?;
        gl.tex_parameteri(GL::TEXTURE_2D, GL::TEXTURE_MIN_FILTER, GL::LINEAR as i32);
        gl.tex_parameteri(GL::TEXTURE_2D, GL::TEXTURE_MAG_FILTER, GL::LINEAR as i32);
        gl.tex_parameteri(GL::TEXTURE_2D, GL::TEXTURE_WRAP_S, GL::CLAMP_TO_EDGE as i32);
        gl.tex_parameteri(GL::TEXTURE_2D, GL::TEXTURE_WRAP_T, GL::CLAMP_TO_EDGE as i32);
        gl.tex_parameteri(
            GL::TEXTURE_2D,
            GL::TEXTURE_COMPARE_MODE,
            GL::COMPARE_REF_TO_TEXTURE as i32,
        );
        gl.tex_parameteri(GL::TEXTURE_2D, GL::TEXTURE_COMPARE_FUNC, GL::LEQUAL as i32);

        let framebuffer = gl
            .create_framebuffer()
            .ok_or_else(|| ViewerError::Gl("could not create shadow framebuffer".to_string()))?;
        gl.bind_framebuffer(GL::FRAMEBUFFER, Some(&framebuffer));
        gl.framebuffer_texture_2d(
            GL::FRAMEBUFFER,
            GL::DEPTH_ATTACHMENT,
            GL::TEXTURE_2D,
            Some(&texture),
            0,
        );
        let status = gl.check_framebuffer_status(GL::FRAMEBUFFER);
        gl.bind_framebuffer(GL::FRAMEBUFFER, None);
        gl.bind_texture(GL::TEXTURE_2D, None);
        if status != GL::FRAMEBUFFER_COMPLETE {
            return Err(ViewerError::Gl(format!(
                "shadow framebuffer incomplete (0x{status:x})"
            )));
        }

        Ok(Self {
            framebuffer,
            texture,
            size,
        })
    }
}

pub struct Renderer {
    gl: GL,
    lit: Program,
    depth: Program,
    shadow: ShadowPass,
    meshes: Vec<GpuMesh>,
    lighting: LightingProfile,
    environment: Option<EnvironmentLight>,
    width: u32,
    height: u32,
}

impl Renderer {
    pub fn new(canvas: &HtmlCanvasElement, lighting: LightingProfile) -> Result<Self, ViewerError> {
        let options = Object::new();
        Reflect::set(&options, &JsValue::from_str("alpha"), &JsValue::TRUE)?;
        Reflect::set(&options, &JsValue::from_str("antialias"), &JsValue::TRUE)?;
        let gl: GL = canvas
            .get_context_with_context_options("webgl2", &options)?
            .ok_or_else(|| ViewerError::Gl("WebGL2 not supported".to_string()))?
            .dyn_into()
            .map_err(|_| ViewerError::Gl("context is not WebGL2".to_string()))?;

        let lit = Program::new(&gl, shaders::LIT_VERT, shaders::LIT_FRAG, LIT_UNIFORMS)?;
        let depth = Program::new(&gl, shaders::DEPTH_VERT, shaders::DEPTH_FRAG, DEPTH_UNIFORMS)?;
        let shadow_size = lighting.shadow_caster().map_or(1, |light| light.shadow_map_size);
        let shadow = ShadowPass::new(&gl, shadow_size)?;

        if lighting.directional.len() > shaders::MAX_LIGHTS {
            tracing::warn!(
                lights = lighting.directional.len(),
                max = shaders::MAX_LIGHTS,
                "extra directional lights ignored"
            );
        }
        tracing::debug!(shadow_size = shadow.size, "renderer ready");

        Ok(Self {
            gl,
            lit,
            depth,
            shadow,
            meshes: Vec::new(),
            lighting,
            environment: None,
            width: canvas.width(),
            height: canvas.height(),
        })
    }

    /// Replace whatever was uploaded before
    pub fn upload(&mut self, object: &DisplayedObject) -> Result<(), ViewerError> {
        let mut meshes = Vec::with_capacity(object.parts.len());
        for part in &object.parts {
            if part.mesh.is_empty() {
                continue;
            }
            let bytes = interleave(&part.mesh);
            match self.upload_mesh(&bytes) {
                Ok((vao, buffer)) => meshes.push(GpuMesh {
                    vao,
                    buffer,
                    vertex_count: (part.mesh.triangles.len() * 3) as i32,
                    local: part.local,
                    bounds: part.mesh.bounds(),
                    material: part.material.unwrap_or_else(unassigned_material),
                    cast_shadow: part.cast_shadow,
                    receive_shadow: part.receive_shadow,
                }),
                Err(err) => {
                    self.release(meshes);
                    return Err(err);
                }
            }
        }

        let previous = std::mem::replace(&mut self.meshes, meshes);
        self.release(previous);
        tracing::debug!(meshes = self.meshes.len(), "uploaded object");
        Ok(())
    }

    fn upload_mesh(&self, bytes: &[u8]) -> Result<(WebGlVertexArrayObject, WebGlBuffer), ViewerError> {
        let gl = &self.gl;
        let vao = gl
            .create_vertex_array()
            .ok_or_else(|| ViewerError::Gl("could not create vertex array".to_string()))?;
        let Some(buffer) = gl.create_buffer() else {
            gl.delete_vertex_array(Some(&vao));
            return Err(ViewerError::Gl("could not create buffer".to_string()));
        };

        gl.bind_vertex_array(Some(&vao));
        gl.bind_buffer(GL::ARRAY_BUFFER, Some(&buffer));
        gl.buffer_data_with_u8_array(GL::ARRAY_BUFFER, bytes, GL::STATIC_DRAW);
        gl.enable_vertex_attrib_array(0);
        gl.vertex_attrib_pointer_with_i32(0, 3, GL::FLOAT, false, STRIDE, 0);
        gl.enable_vertex_attrib_array(1);
        gl.vertex_attrib_pointer_with_i32(1, 3, GL::FLOAT, false, STRIDE, 12);
        gl.bind_vertex_array(None);
        gl.bind_buffer(GL::ARRAY_BUFFER, None);

        Ok((vao, buffer))
    }

    fn release(&self, meshes: Vec<GpuMesh>) {
        for mesh in meshes {
            self.gl.delete_vertex_array(Some(&mesh.vao));
            self.gl.delete_buffer(Some(&mesh.buffer));
        }
    }

    pub fn set_environment(&mut self, environment: EnvironmentLight) {
        self.environment = Some(environment);
    }

    /// Drawing buffer size in device pixels
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
    }

    pub fn render(&self, camera: &Camera, model: &Matrix4<f32>) {
        let gl = &self.gl;

        let caster = self
            .lighting
            .shadow_caster()
            .filter(|_| self.meshes.iter().any(|mesh| mesh.cast_shadow));
        let light_vp = match caster {
            Some(light) => {
                let bounds = self.meshes.iter().fold(Aabb::empty(), |bounds, mesh| {
                    bounds.union(&mesh.bounds.transformed(&(model * mesh.local)))
                });
                let vp = light_view_projection(&bounds, &Vector3::from(light.position));
                self.shadow_pass(model, &vp);
                Some(vp)
            }
            None => None,
        };

        gl.viewport(0, 0, self.width as i32, self.height as i32);
        let [r, g, b, a] = self.lighting.clear_color.unwrap_or([0.0; 4]);
        gl.clear_color(r, g, b, a);
        gl.clear(GL::COLOR_BUFFER_BIT | GL::DEPTH_BUFFER_BIT);
        if self.meshes.is_empty() {
            return;
        }

        gl.enable(GL::DEPTH_TEST);
        gl.disable(GL::CULL_FACE);
        gl.use_program(Some(&self.lit.program));
        self.set_frame_uniforms(camera, light_vp.as_ref(), caster.is_some());

        gl.disable(GL::BLEND);
        gl.depth_mask(true);
        for mesh in self.meshes.iter().filter(|mesh| !mesh.material.transparent) {
            self.draw_lit(mesh, model);
        }

        gl.enable(GL::BLEND);
        gl.blend_func(GL::SRC_ALPHA, GL::ONE_MINUS_SRC_ALPHA);
        gl.depth_mask(false);
        for mesh in self.meshes.iter().filter(|mesh| mesh.material.transparent) {
            self.draw_lit(mesh, model);
        }
        gl.depth_mask(true);
        gl.disable(GL::BLEND);
        gl.bind_vertex_array(None);
    }

    fn shadow_pass(&self, model: &Matrix4<f32>, light_vp: &Matrix4<f32>) {
        let gl = &self.gl;
        let program = &self.depth;
        let size = self.shadow.size as i32;

        gl.bind_framebuffer(GL::FRAMEBUFFER, Some(&self.shadow.framebuffer));
        gl.viewport(0, 0, size, size);
        gl.clear(GL::DEPTH_BUFFER_BIT);
        gl.enable(GL::DEPTH_TEST);
        gl.use_program(Some(&program.program));
        gl.uniform_matrix4fv_with_f32_array(
            program.uniform("u_light_view_projection"),
            false,
            light_vp.as_slice(),
        );

        for mesh in self.meshes.iter().filter(|mesh| mesh.cast_shadow) {
            let world = model * mesh.local;
            gl.uniform_matrix4fv_with_f32_array(program.uniform("u_model"), false, world.as_slice());
            gl.bind_vertex_array(Some(&mesh.vao));
            gl.draw_arrays(GL::TRIANGLES, 0, mesh.vertex_count);
        }

        gl.bind_vertex_array(None);
        gl.bind_framebuffer(GL::FRAMEBUFFER, None);
    }

    fn set_frame_uniforms(&self, camera: &Camera, light_vp: Option<&Matrix4<f32>>, shadowed: bool) {
        let gl = &self.gl;
        let program = &self.lit;
        let lighting = &self.lighting;

        gl.uniform_matrix4fv_with_f32_array(
            program.uniform("u_view_projection"),
            false,
            camera.view_projection().as_slice(),
        );
        let eye: Point3<f32> = camera.position;
        gl.uniform3f(program.uniform("u_camera"), eye.x, eye.y, eye.z);

        let ambient = lighting.ambient.color.map(|c| c * lighting.ambient.intensity);
        gl.uniform3fv_with_f32_array(program.uniform("u_ambient"), &ambient);

        let lights = &lighting.directional[..lighting.directional.len().min(shaders::MAX_LIGHTS)];
        let mut directions = [0.0f32; shaders::MAX_LIGHTS * 3];
        let mut colors = [0.0f32; shaders::MAX_LIGHTS * 3];
        let mut shadow_light = -1;
        for (i, light) in lights.iter().enumerate() {
            directions[i * 3..i * 3 + 3].copy_from_slice(&light.position);
            colors[i * 3..i * 3 + 3].copy_from_slice(&light.color.map(|c| c * light.intensity));
            if shadowed && shadow_light < 0 && light.cast_shadow {
                shadow_light = i as i32;
            }
        }
        gl.uniform1i(program.uniform("u_light_count"), lights.len() as i32);
        gl.uniform3fv_with_f32_array(program.uniform("u_light_dir"), &directions);
        gl.uniform3fv_with_f32_array(program.uniform("u_light_color"), &colors);

        gl.uniform1i(program.uniform("u_shadow_light"), shadow_light);
        gl.uniform_matrix4fv_with_f32_array(
            program.uniform("u_light_view_projection"),
            false,
            light_vp.copied().unwrap_or_else(Matrix4::identity).as_slice(),
        );
        gl.active_texture(GL::TEXTURE0);
        gl.bind_texture(GL::TEXTURE_2D, Some(&self.shadow.texture));
        gl.uniform1i(program.uniform("u_shadow_map"), 0);
        gl.uniform1f(program.uniform("u_shadow_texel"), 1.0 / self.shadow.size as f32);

        let environment = self.environment.unwrap_or(EnvironmentLight {
            sky: [0.0; 3],
            ground: [0.0; 3],
            intensity: 0.0,
        });
        gl.uniform3fv_with_f32_array(program.uniform("u_sky"), &environment.sky);
        gl.uniform3fv_with_f32_array(program.uniform("u_ground"), &environment.ground);
        gl.uniform1f(program.uniform("u_env_intensity"), environment.intensity);

        let aces = lighting.tone_mapping == ToneMapping::AcesFilmic;
        gl.uniform1i(program.uniform("u_tone_mapping"), i32::from(aces));
        gl.uniform1i(program.uniform("u_srgb"), i32::from(lighting.output_srgb));
    }

    fn draw_lit(&self, mesh: &GpuMesh, model: &Matrix4<f32>) {
        let gl = &self.gl;
        let program = &self.lit;
        let world = model * mesh.local;
        let material = &mesh.material;

        gl.uniform_matrix4fv_with_f32_array(program.uniform("u_model"), false, world.as_slice());
        gl.uniform_matrix3fv_with_f32_array(
            program.uniform("u_normal_matrix"),
            false,
            normal_matrix(&world).as_slice(),
        );
        gl.uniform3fv_with_f32_array(program.uniform("u_color"), &material.color);
        gl.uniform1f(program.uniform("u_opacity"), material.opacity);
        gl.uniform1f(program.uniform("u_metalness"), material.metalness);
        gl.uniform1f(program.uniform("u_roughness"), material.roughness);
        gl.uniform1i(
            program.uniform("u_unlit"),
            i32::from(material.kind == MaterialKind::Basic),
        );
        gl.uniform1i(
            program.uniform("u_specular"),
            i32::from(material.kind == MaterialKind::Standard),
        );
        gl.uniform1i(program.uniform("u_receive_shadow"), i32::from(mesh.receive_shadow));

        gl.bind_vertex_array(Some(&mesh.vao));
        gl.draw_arrays(GL::TRIANGLES, 0, mesh.vertex_count);
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        let meshes = std::mem::take(&mut self.meshes);
        self.release(meshes);
        self.gl.delete_framebuffer(Some(&self.shadow.framebuffer));
        self.gl.delete_texture(Some(&self.shadow.texture));
        self.gl.delete_program(Some(&self.lit.program));
        self.gl.delete_program(Some(&self.depth.program));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardview_core::fallback;

    #[test]
    fn test_interleave_layout() {
        let mesh = Mesh::cuboid(2.0, 2.0, 2.0);
        let bytes = interleave(&mesh);
        assert_eq!(bytes.len(), 12 * 3 * STRIDE as usize);

        let first = &mesh.triangles[0].vertices[0];
        let read = |i: usize| {
            let start = i * 4;
            f32::from_le_bytes([bytes[start], bytes[start + 1], bytes[start + 2], bytes[start + 3]])
        };
        assert_eq!(read(0), first.position.x);
        assert_eq!(read(2), first.position.z);
        assert_eq!(read(3), first.normal.x);
        assert_eq!(read(5), first.normal.z);
    }

    #[test]
    fn test_normal_matrix_undoes_non_uniform_scale() {
        let model = Matrix4::new_nonuniform_scaling(&Vector3::new(2.0, 1.0, 1.0));
        let normal = normal_matrix(&model) * Vector3::new(1.0, 1.0, 0.0);
        assert!((normal.x - 0.5).abs() < 1e-6);
        assert!((normal.y - 1.0).abs() < 1e-6);

        let singular = Matrix4::new_scaling(0.0);
        assert_eq!(normal_matrix(&singular), Matrix3::identity());
    }

    #[test]
    fn test_light_projection_encloses_bounds() {
        let card = fallback::business_card();
        let bounds = card.world_bounds();
        let light_vp = light_view_projection(&bounds, &Vector3::new(5.0, 5.0, 5.0));

        for x in [bounds.min.x, bounds.max.x] {
            for y in [bounds.min.y, bounds.max.y] {
                for z in [bounds.min.z, bounds.max.z] {
                    let clip = light_vp.transform_point(&Point3::new(x, y, z));
                    assert!(clip.x.abs() <= 1.0 && clip.y.abs() <= 1.0 && clip.z.abs() <= 1.0);
                }
            }
        }
    }

    #[test]
    fn test_light_straight_above() {
        let bounds = Mesh::cuboid(1.0, 1.0, 1.0).bounds();
        let light_vp = light_view_projection(&bounds, &Vector3::new(0.0, 10.0, 0.0));
        assert!(light_vp.iter().all(|v| v.is_finite()));
    }
}
