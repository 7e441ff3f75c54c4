//! Scene management

mod camera;
mod light;
mod transform;

pub use camera::*;
pub use light::*;
pub use transform::*;

use glam::Vec3;

use crate::resources::Material;

/// Handle to a mesh loaded into the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeshId(pub(crate) usize);

/// A renderable object in the scene
#[derive(Debug, Clone)]
pub struct SceneObject {
    pub mesh: MeshId,
    pub material: Material,
    pub transform: Transform,
    /// Draw into the shadow-volume pass. Requires an adjacency mesh.
    pub casts_shadow: bool,
}

impl SceneObject {
    pub fn new(mesh: MeshId) -> Self {
        Self {
            mesh,
            material: Material::default(),
            transform: Transform::default(),
            casts_shadow: true,
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.transform.position = position;
        self
    }

    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.transform.scale = scale;
        self
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    pub fn with_shadow(mut self, casts_shadow: bool) -> Self {
        self.casts_shadow = casts_shadow;
        self
    }
}

/// The scene containing all renderable content
#[derive(Debug, Clone, Default)]
pub struct Scene {
    pub camera: Camera,
    pub lights: Vec<Light>,
    pub objects: Vec<SceneObject>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a light and return its index
    pub fn add_light(&mut self, light: Light) -> usize {
        self.lights.push(light);
        self.lights.len() - 1
    }

    /// Add a render object to the scene
    pub fn add_object(&mut self, object: SceneObject) -> usize {
        let id = self.objects.len();
        self.objects.push(object);
        id
    }

    pub fn light(&self, index: usize) -> Option<&Light> {
        self.lights.get(index)
    }

    pub fn casters(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.iter().filter(|o| o.casts_shadow)
    }
}
