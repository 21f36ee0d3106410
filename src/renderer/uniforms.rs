use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::renderer::camera::Camera;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    pub ka: Vec3,
    pub kd: Vec3,
    pub ks: Vec3,
    pub shininess: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            ka: Vec3::ONE,
            kd: Vec3::ONE,
            ks: Vec3::ONE,
            shininess: 20.0,
        }
    }
}

impl Material {
    /// Unlit markers: full ambient, no diffuse or specular response.
    pub fn emissive(color: Vec3) -> Self {
        Self {
            ka: color,
            kd: Vec3::ZERO,
            ks: Vec3::ZERO,
            shininess: 1.0,
        }
    }
}

/// Point light (`position.w == 1`) or directional light (`w == 0`).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Lighting {
    pub position: Vec4,
    pub la: Vec3,
    pub ld: Vec3,
    pub ls: Vec3,
    pub constant_attenuation: f32,
    pub linear_attenuation: f32,
    pub quadratic_attenuation: f32,
    pub follow_camera: bool,
}

impl Default for Lighting {
    fn default() -> Self {
        Self {
            position: Vec4::new(0.0, 1.0, 0.0, 1.0),
            la: Vec3::splat(0.125),
            ld: Vec3::ONE,
            ls: Vec3::ONE,
            constant_attenuation: 1.0,
            linear_attenuation: 0.0,
            quadratic_attenuation: 0.0,
            follow_camera: true,
        }
    }
}

impl Lighting {
    pub fn track_camera(&mut self, eye: Vec3) {
        if self.follow_camera {
            self.position = eye.extend(1.0);
        }
    }

    /// Places the light on the unit hemisphere above `xz` and stops tracking
    /// the camera.
    pub fn set_xz(&mut self, xz: Vec2) {
        self.position = light_on_hemisphere(xz).extend(self.position.w);
        self.follow_camera = false;
    }
}

/// Projects `xz` into the unit disk and lifts it onto the upper unit
/// hemisphere.
pub fn light_on_hemisphere(xz: Vec2) -> Vec3 {
    let mut xz = if xz.is_finite() { xz } else { Vec2::ZERO };
    let mut len2 = xz.length_squared();
    if len2 > 1.0 {
        xz /= len2.sqrt();
        len2 = 1.0;
    }
    Vec3::new(xz.x, (1.0 - len2).max(0.0).sqrt(), xz.y)
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct FrameUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub camera_pos: [f32; 4],
    pub light_pos: [f32; 4],
    pub la: [f32; 4],
    pub ld: [f32; 4],
    pub ls: [f32; 4],
    /// constant, linear, quadratic, unused
    pub attenuation: [f32; 4],
}

impl FrameUniforms {
    pub fn new(camera: &Camera, lighting: &Lighting) -> Self {
        Self {
            view_proj: camera.view_projection_matrix().to_cols_array_2d(),
            camera_pos: camera.eye().extend(1.0).to_array(),
            light_pos: lighting.position.to_array(),
            la: lighting.la.extend(0.0).to_array(),
            ld: lighting.ld.extend(0.0).to_array(),
            ls: lighting.ls.extend(0.0).to_array(),
            attenuation: [
                lighting.constant_attenuation,
                lighting.linear_attenuation,
                lighting.quadratic_attenuation,
                0.0,
            ],
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct DrawUniforms {
    pub world: [[f32; 4]; 4],
    pub world_it: [[f32; 4]; 4],
    pub ka: [f32; 4],
    pub kd: [f32; 4],
    pub ks: [f32; 4],
    pub shininess: f32,
    pub _padding: [f32; 3],
}

impl DrawUniforms {
    pub fn new(world: Mat4, material: &Material) -> Self {
        Self {
            world: world.to_cols_array_2d(),
            world_it: world.inverse().transpose().to_cols_array_2d(),
            ka: material.ka.extend(0.0).to_array(),
            kd: material.kd.extend(0.0).to_array(),
            ks: material.ks.extend(0.0).to_array(),
            shininess: material.shininess,
            _padding: [0.0; 3],
        }
    }

    pub fn world(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.world)
    }

    pub fn world_it(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.world_it)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use glam::Quat;

    #[test]
    fn uniform_sizes_are_16_byte_multiples() {
        assert_eq!(std::mem::size_of::<FrameUniforms>(), 160);
        assert_eq!(std::mem::size_of::<DrawUniforms>(), 192);
    }

    #[test]
    fn inverse_transpose_keeps_normals_perpendicular() {
        let world = Mat4::from_scale_rotation_translation(
            Vec3::new(2.0, 0.5, 1.0),
            Quat::from_rotation_y(0.7),
            Vec3::new(1.0, 2.0, 3.0),
        );
        let draw = DrawUniforms::new(world, &Material::default());

        let tangent = Vec3::X;
        let normal = Vec3::Y;
        let t = draw.world().transform_vector3(tangent);
        let n = draw.world_it().transform_vector3(normal);
        assert_abs_diff_eq!(t.dot(n), 0.0, epsilon = 1e-5);
    }

    #[test]
    fn hemisphere_inside_disk() {
        let p = light_on_hemisphere(Vec2::new(0.6, 0.0));
        assert_abs_diff_eq!(p, Vec3::new(0.6, 0.8, 0.0), epsilon = 1e-6);
        assert_abs_diff_eq!(light_on_hemisphere(Vec2::ZERO), Vec3::Y);
    }

    #[test]
    fn hemisphere_clamps_to_rim() {
        let p = light_on_hemisphere(Vec2::new(3.0, 4.0));
        assert_abs_diff_eq!(p, Vec3::new(0.6, 0.0, 0.8), epsilon = 1e-6);
        assert_abs_diff_eq!(p.length(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn moving_light_stops_camera_tracking() {
        let mut lighting = Lighting::default();
        lighting.track_camera(Vec3::new(0.0, 7.0, 7.0));
        assert_eq!(lighting.position, Vec4::new(0.0, 7.0, 7.0, 1.0));

        lighting.set_xz(Vec2::new(0.0, 0.6));
        assert!(!lighting.follow_camera);
        lighting.track_camera(Vec3::splat(9.0));
        assert_abs_diff_eq!(lighting.position, Vec4::new(0.0, 0.8, 0.6, 1.0), epsilon = 1e-6);
    }
}
