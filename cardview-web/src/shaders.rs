//! GLSL ES 3.00 sources for the lit and depth-only programs

pub const MAX_LIGHTS: usize = 4;

pub const LIT_VERT: &str = r#"#version 300 es
layout(location = 0) in vec3 a_position;
layout(location = 1) in vec3 a_normal;

uniform mat4 u_model;
uniform mat4 u_view_projection;
uniform mat3 u_normal_matrix;
uniform mat4 u_light_view_projection;

out vec3 v_world;
out vec3 v_normal;
out vec4 v_light_space;

void main() {
    vec4 world = u_model * vec4(a_position, 1.0);
    v_world = world.xyz;
    v_normal = u_normal_matrix * a_normal;
    v_light_space = u_light_view_projection * world;
    gl_Position = u_view_projection * world;
}
"#;

pub const LIT_FRAG: &str = r#"#version 300 es
precision highp float;
precision highp sampler2DShadow;

#define MAX_LIGHTS 4

in vec3 v_world;
in vec3 v_normal;
in vec4 v_light_space;

uniform vec3 u_camera;

uniform vec3 u_color;
uniform float u_opacity;
uniform float u_metalness;
uniform float u_roughness;
uniform int u_unlit;
uniform int u_specular;

uniform vec3 u_ambient;
uniform int u_light_count;
uniform vec3 u_light_dir[MAX_LIGHTS];
uniform vec3 u_light_color[MAX_LIGHTS];

uniform int u_shadow_light;
uniform int u_receive_shadow;
uniform sampler2DShadow u_shadow_map;
uniform float u_shadow_texel;

uniform vec3 u_sky;
uniform vec3 u_ground;
uniform float u_env_intensity;

uniform int u_tone_mapping;
uniform int u_srgb;

out vec4 out_color;

float shadow_visibility() {
    vec3 coords = v_light_space.xyz / v_light_space.w * 0.5 + 0.5;
    if (coords.z > 1.0 || any(lessThan(coords.xy, vec2(0.0))) || any(greaterThan(coords.xy, vec2(1.0)))) {
        return 1.0;
    }
    float sum = 0.0;
    for (int x = -1; x <= 1; x++) {
        for (int y = -1; y <= 1; y++) {
            vec2 offset = vec2(float(x), float(y)) * u_shadow_texel;
            sum += texture(u_shadow_map, vec3(coords.xy + offset, coords.z - 0.002));
        }
    }
    return sum / 9.0;
}

vec3 aces_filmic(vec3 x) {
    return clamp((x * (2.51 * x + 0.03)) / (x * (2.43 * x + 0.59) + 0.14), 0.0, 1.0);
}

vec3 linear_to_srgb(vec3 c) {
    vec3 low = c * 12.92;
    vec3 high = 1.055 * pow(c, vec3(1.0 / 2.4)) - 0.055;
    return mix(low, high, step(vec3(0.0031308), c));
}

void main() {
    // Sampled outside any branch so derivatives stay defined
    float shadow = shadow_visibility();

    vec3 color;
    if (u_unlit == 1) {
        color = u_color;
    } else {
        vec3 n = normalize(v_normal);
        if (!gl_FrontFacing) {
            n = -n;
        }
        vec3 v = normalize(u_camera - v_world);

        vec3 diffuse = u_color * (1.0 - u_metalness);
        vec3 f0 = mix(vec3(0.04), u_color, u_metalness);
        float shininess = exp2(10.0 * (1.0 - u_roughness) + 1.0);

        color = u_ambient * diffuse;

        float up = dot(n, vec3(0.0, 1.0, 0.0)) * 0.5 + 0.5;
        vec3 env = mix(u_ground, u_sky, up) * u_env_intensity;
        color += env * (diffuse + f0 * (1.0 - u_roughness));

        for (int i = 0; i < MAX_LIGHTS; i++) {
            if (i >= u_light_count) {
                break;
            }
            vec3 l = normalize(u_light_dir[i]);
            float n_dot_l = max(dot(n, l), 0.0);
            float visibility = (i == u_shadow_light && u_receive_shadow == 1) ? shadow : 1.0;

            vec3 specular = vec3(0.0);
            if (u_specular == 1) {
                vec3 h = normalize(l + v);
                float norm = (shininess + 8.0) / 25.1327;
                specular = f0 * norm * pow(max(dot(n, h), 0.0), shininess);
            }
            color += u_light_color[i] * n_dot_l * visibility * (diffuse + specular);
        }
    }

    if (u_tone_mapping == 1) {
        color = aces_filmic(color);
    }
    if (u_srgb == 1) {
        color = linear_to_srgb(clamp(color, 0.0, 1.0));
    }
    out_color = vec4(color, u_opacity);
}
"#;

pub const DEPTH_VERT: &str = r#"#version 300 es
layout(location = 0) in vec3 a_position;

uniform mat4 u_model;
uniform mat4 u_light_view_projection;

void main() {
    gl_Position = u_light_view_projection * u_model * vec4(a_position, 1.0);
}
"#;

pub const DEPTH_FRAG: &str = r#"#version 300 es
precision mediump float;

void main() {}
"#;
