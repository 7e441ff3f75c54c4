//! Material definitions for Blinn-Phong shading

use glam::{Vec3, Vec4};

use crate::backend::GraphicsDevice;

/// Reflection properties uploaded per draw in the shaded passes
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub emission: Vec3,
    pub ambient: Vec3,
    /// RGB reflectance, alpha is the surface opacity
    pub diffuse: Vec4,
    pub specular: Vec3,
    pub specular_exponent: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            emission: Vec3::ZERO,
            ambient: Vec3::splat(0.2),
            diffuse: Vec4::new(0.8, 0.8, 0.8, 1.0),
            specular: Vec3::ZERO,
            specular_exponent: 1.0,
        }
    }
}

impl Material {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_emission(mut self, color: Vec3) -> Self {
        self.emission = color;
        self
    }

    pub fn with_ambient(mut self, color: Vec3) -> Self {
        self.ambient = color;
        self
    }

    pub fn with_diffuse(mut self, color: Vec4) -> Self {
        self.diffuse = color;
        self
    }

    pub fn with_specular(mut self, color: Vec3, exponent: f32) -> Self {
        self.specular = color;
        self.specular_exponent = exponent;
        self
    }

    /// Upload as the `Material` uniform block of the bound program
    pub fn upload(&self, device: &mut dyn GraphicsDevice) {
        device.set_uniform("Material.EmissionColor", self.emission.into());
        device.set_uniform("Material.AmbientColor", self.ambient.into());
        device.set_uniform("Material.DiffuseColor", self.diffuse.into());
        device.set_uniform("Material.SpecularColor", self.specular.into());
        device.set_uniform("Material.SpecularExponent", self.specular_exponent.into());
    }

    // Preset materials

    pub fn plastic(color: Vec3) -> Self {
        Self::new("plastic")
            .with_ambient(color * 0.3)
            .with_diffuse(color.extend(1.0))
            .with_specular(Vec3::splat(0.5), 32.0)
    }

    pub fn matte(color: Vec3) -> Self {
        Self::new("matte")
            .with_ambient(color * 0.3)
            .with_diffuse(color.extend(1.0))
    }

    /// Light gray floor used by the demo scenes
    pub fn ground() -> Self {
        Self::matte(Vec3::new(0.75, 0.75, 0.7)).with_specular(Vec3::splat(0.1), 8.0)
    }

    pub fn emissive(color: Vec3) -> Self {
        Self::new("emissive")
            .with_emission(color)
            .with_ambient(Vec3::ZERO)
            .with_diffuse(Vec4::new(0.0, 0.0, 0.0, 1.0))
    }
}
