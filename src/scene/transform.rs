//! Placement of casters and receivers in world space

use glam::{Mat4, Quat, Vec3};

/// Where an object sits in the world. Its model matrix feeds the scene
/// program and the volume extrusion alike, so a caster and the shadow it
/// throws always move together.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Same factor on every axis
    pub fn scaled(mut self, factor: f32) -> Self {
        self.scale = Vec3::splat(factor);
        self
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Uploaded as `ModelMatrix`
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Turn in place about `axis` (world space), after the current rotation
    pub fn spin(&mut self, axis: Vec3, angle: f32) {
        self.rotation = (Quat::from_axis_angle(axis, angle) * self.rotation).normalize();
    }

    /// A negative scale determinant reverses triangle winding, which swaps
    /// which side of a caster counts as facing the light.
    pub fn mirrors(&self) -> bool {
        self.scale.x * self.scale.y * self.scale.z < 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn model_matrix_scales_before_moving() {
        let transform = Transform::at(Vec3::new(0.0, 3.0, 0.0)).scaled(2.0);
        let corner = transform.model_matrix().transform_point3(Vec3::splat(0.5));
        assert_eq!(corner, Vec3::new(1.0, 4.0, 1.0));
    }

    #[test]
    fn spin_composes_in_world_space() {
        let mut transform = Transform::default();
        transform.spin(Vec3::Y, FRAC_PI_2);
        let x = transform.model_matrix().transform_vector3(Vec3::X);
        assert!((x - Vec3::NEG_Z).length() < 1e-6);
    }

    #[test]
    fn one_negative_axis_mirrors() {
        let mut transform = Transform::default();
        assert!(!transform.mirrors());
        transform.scale = Vec3::new(-1.0, 1.0, 1.0);
        assert!(transform.mirrors());
        transform.scale.y = -1.0;
        assert!(!transform.mirrors());
    }
}
