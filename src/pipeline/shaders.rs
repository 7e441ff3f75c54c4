//! Shader programs driven by the pass sequence
//!
//! GLSL sources for GL-class devices. The software device checks that every
//! stage is present and runs its built-in equivalents.

use crate::backend::{
    BackendResult, GraphicsDevice, ProgramDescriptor, ProgramHandle, ProgramKind, ShaderSource,
    ShaderStage,
};

pub const SCENE_VERTEX: &str = r#"#version 460

uniform mat4 ModelMatrix;
uniform mat4 ViewMatrix;
uniform mat4 ProjectionMatrix;

layout (location = 0) in vec3 v_position;
layout (location = 1) in vec3 v_normal;
layout (location = 2) in vec2 v_tex_coord;

out vec3 position_in_wc;
out vec3 normal_in_wc;
out vec2 tex_coord;

void main()
{
   vec4 world = ModelMatrix * vec4(v_position, 1.0f);
   position_in_wc = world.xyz;
   normal_in_wc = transpose( inverse( mat3(ModelMatrix) ) ) * v_normal;
   tex_coord = v_tex_coord;
   gl_Position = ProjectionMatrix * (ViewMatrix * world);
}
"#;

pub const SCENE_FRAGMENT: &str = r#"#version 460

struct LightInfo
{
   int LightSwitch;
   vec4 Position;
   vec3 AmbientColor;
   vec3 DiffuseColor;
   vec3 SpecularColor;
};
uniform LightInfo Lights[4];

struct MateralInfo
{
   vec3 EmissionColor;
   vec3 AmbientColor;
   vec4 DiffuseColor;
   vec3 SpecularColor;
   float SpecularExponent;
};
uniform MateralInfo Material;

uniform mat4 ViewMatrix;
uniform int LightNum;
uniform int LightIndex;
uniform int UseTexture;
layout (binding = 0) uniform sampler2D BaseTexture;

in vec3 position_in_wc;
in vec3 normal_in_wc;
in vec2 tex_coord;

layout (location = 0) out vec4 final_color;

void main()
{
   vec3 color = Material.EmissionColor;
   if (LightIndex >= 0 && LightIndex < LightNum && Lights[LightIndex].LightSwitch != 0) {
      vec4 light = Lights[LightIndex].Position;
      vec3 camera_in_wc = inverse( ViewMatrix )[3].xyz;
      vec3 N = normalize( normal_in_wc );
      vec3 L = light.w == 0.0f ? normalize( light.xyz ) : normalize( light.xyz / light.w - position_in_wc );
      vec3 V = normalize( camera_in_wc - position_in_wc );
      vec3 H = normalize( L + V );

      vec4 diffuse = UseTexture != 0 ? texture( BaseTexture, tex_coord ) : Material.DiffuseColor;
      float diffuse_intensity = max( dot( N, L ), 0.0f );
      float specular_intensity = diffuse_intensity > 0.0f
         ? pow( max( dot( N, H ), 0.0f ), max( Material.SpecularExponent, 1.0f ) ) : 0.0f;

      color += Lights[LightIndex].AmbientColor * Material.AmbientColor
         + Lights[LightIndex].DiffuseColor * diffuse.rgb * diffuse_intensity
         + Lights[LightIndex].SpecularColor * Material.SpecularColor * specular_intensity;
   }
   final_color = vec4(clamp( color, 0.0f, 1.0f ), Material.DiffuseColor.a);
}
"#;

pub const SHADOW_VOLUME_VERTEX: &str = r#"#version 460

uniform mat4 ModelMatrix;
uniform mat4 ViewMatrix;

layout (location = 0) in vec3 v_position;

out vec3 position_in_ec;

void main()
{
   position_in_ec = (ViewMatrix * (ModelMatrix * vec4(v_position, 1.0f))).xyz;
}
"#;

pub const SHADOW_VOLUME_GEOMETRY: &str = r#"#version 460

layout (triangles_adjacency) in;
layout (triangle_strip, max_vertices = 24) out;

uniform mat4 ProjectionMatrix;
uniform vec4 LightPosition;
uniform int Robust;
uniform int ZFail;

in vec3 position_in_ec[];

vec3 toLight(vec3 p)
{
   return LightPosition.xyz - p * LightPosition.w;
}

bool corner(vec3 p, vec3 q, vec3 r)
{
   return dot( cross( q - p, r - p ), toLight( p ) ) > 0.0f;
}

bool facesLight(vec3 a, vec3 b, vec3 c)
{
   if (Robust != 0) return corner( a, b, c ) || corner( b, c, a ) || corner( c, a, b );
   return corner( a, b, c );
}

void emitQuad(vec3 a, vec3 b)
{
   gl_Position = ProjectionMatrix * vec4(a, 1.0f); EmitVertex();
   gl_Position = ProjectionMatrix * vec4(-toLight( a ), 0.0f); EmitVertex();
   gl_Position = ProjectionMatrix * vec4(b, 1.0f); EmitVertex();
   gl_Position = ProjectionMatrix * vec4(-toLight( b ), 0.0f); EmitVertex();
   EndPrimitive();
}

void main()
{
   vec3 v[3] = vec3[3](position_in_ec[0], position_in_ec[2], position_in_ec[4]);
   vec3 adj[3] = vec3[3](position_in_ec[1], position_in_ec[3], position_in_ec[5]);
   if (cross( v[1] - v[0], v[2] - v[0] ) == vec3(0.0f)) return;

   bool open[3] = bool[3](adj[0] == v[2], adj[1] == v[0], adj[2] == v[1]);
   bool lit = facesLight( v[0], v[1], v[2] );
   if (!lit) {
      if (Robust == 0 || !(open[0] || open[1] || open[2])) return;
      v = vec3[3](v[0], v[2], v[1]);
      adj = vec3[3](adj[2], adj[1], adj[0]);
      open = bool[3](open[2], open[1], open[0]);
   }

   for (int i = 0; i < 3; ++i) {
      vec3 a = v[i];
      vec3 b = v[(i + 1) % 3];
      bool neighbor_lit = facesLight( b, a, adj[i] );
      if ((Robust != 0 && open[i]) || neighbor_lit != lit) emitQuad( a, b );
   }

   if (ZFail != 0) {
      for (int i = 0; i < 3; ++i) {
         gl_Position = ProjectionMatrix * vec4(v[i], 1.0f); EmitVertex();
      }
      EndPrimitive();
      gl_Position = ProjectionMatrix * vec4(-toLight( v[0] ), 0.0f); EmitVertex();
      gl_Position = ProjectionMatrix * vec4(-toLight( v[2] ), 0.0f); EmitVertex();
      gl_Position = ProjectionMatrix * vec4(-toLight( v[1] ), 0.0f); EmitVertex();
      EndPrimitive();
   }
}
"#;

pub const SHADOW_VOLUME_FRAGMENT: &str = r#"#version 460

layout (location = 0) out vec4 final_color;

void main()
{
   final_color = vec4(0.0f, 0.0f, 0.0f, 1.0f);
}
"#;

fn descriptor(label: &str, kind: ProgramKind, stages: &[(ShaderStage, &str)]) -> ProgramDescriptor {
    ProgramDescriptor {
        label: Some(label.to_string()),
        kind,
        stages: stages
            .iter()
            .map(|(stage, source)| ShaderSource {
                stage: *stage,
                source: source.to_string(),
            })
            .collect(),
    }
}

pub fn scene_program_descriptor() -> ProgramDescriptor {
    descriptor(
        "scene",
        ProgramKind::Scene,
        &[
            (ShaderStage::Vertex, SCENE_VERTEX),
            (ShaderStage::Fragment, SCENE_FRAGMENT),
        ],
    )
}

pub fn shadow_volume_program_descriptor() -> ProgramDescriptor {
    descriptor(
        "shadow volume",
        ProgramKind::ShadowVolume,
        &[
            (ShaderStage::Vertex, SHADOW_VOLUME_VERTEX),
            (ShaderStage::Geometry, SHADOW_VOLUME_GEOMETRY),
            (ShaderStage::Fragment, SHADOW_VOLUME_FRAGMENT),
        ],
    )
}

/// Linked programs used by the passes
#[derive(Debug, Clone, Copy)]
pub struct ShadowPrograms {
    pub scene: ProgramHandle,
    pub shadow_volume: ProgramHandle,
}

impl ShadowPrograms {
    /// Link both programs. Any failure is fatal to the renderer.
    pub fn create(device: &mut dyn GraphicsDevice) -> BackendResult<Self> {
        Ok(Self {
            scene: device.create_program(&scene_program_descriptor())?,
            shadow_volume: device.create_program(&shadow_volume_program_descriptor())?,
        })
    }
}
