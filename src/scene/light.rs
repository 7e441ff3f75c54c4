//! Light types for the scene

use glam::{Vec3, Vec4};

use crate::backend::GraphicsDevice;

/// Point or directional light with Phong color terms
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    /// Homogeneous world-space position; w = 0 makes a directional light
    pub position: Vec4,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub enabled: bool,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            position: Vec4::new(0.0, 10.0, 0.0, 1.0),
            ambient: Vec3::ONE,
            diffuse: Vec3::splat(0.9),
            specular: Vec3::splat(0.9),
            enabled: true,
        }
    }
}

impl Light {
    pub fn point(position: Vec3) -> Self {
        Self {
            position: position.extend(1.0),
            ..Default::default()
        }
    }

    pub fn with_colors(mut self, ambient: Vec3, diffuse: Vec3, specular: Vec3) -> Self {
        self.ambient = ambient;
        self.diffuse = diffuse;
        self.specular = specular;
        self
    }

    /// Light infinitely far away, shining from `toward_light` onto the scene
    pub fn directional(toward_light: Vec3) -> Self {
        Self {
            position: toward_light.extend(0.0),
            ..Default::default()
        }
    }

    pub fn is_directional(&self) -> bool {
        self.position.w == 0.0
    }

    pub fn toggle(&mut self) -> bool {
        self.enabled = !self.enabled;
        self.enabled
    }

    /// Upload as `Lights[index]` of the bound program
    pub fn upload(&self, device: &mut dyn GraphicsDevice, index: usize) {
        let field = |name: &str| format!("Lights[{}].{}", index, name);
        device.set_uniform(&field("LightSwitch"), self.enabled.into());
        device.set_uniform(&field("Position"), self.position.into());
        device.set_uniform(&field("AmbientColor"), self.ambient.into());
        device.set_uniform(&field("DiffuseColor"), self.diffuse.into());
        device.set_uniform(&field("SpecularColor"), self.specular.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directional_light_has_zero_w() {
        let sun = Light::directional(Vec3::Y);
        assert!(sun.is_directional());
        assert_eq!(sun.position, Vec4::new(0.0, 1.0, 0.0, 0.0));
        assert!(!Light::point(Vec3::Y).is_directional());
    }
}
