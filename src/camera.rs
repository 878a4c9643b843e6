//! Orbit camera, projection and the camera uniform.
//!
//! The camera circles the room centre at a fixed radius and eye height,
//! always looking at the configured target. [`Projection`] owns the aspect
//! ratio and is resized together with the surface.

use std::{f32::consts::TAU, time::Duration};

use cgmath::{Matrix4, Point3, Rad, Vector3};
use wgpu::util::DeviceExt;

use crate::config::{OrbitConfig, ProjectionConfig};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// A camera moving on a horizontal circle around `target`.
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    pub angle: Rad<f32>,
    pub radius: f32,
    pub eye_height: f32,
    pub target: Point3<f32>,
    /// Radians per second.
    pub angular_speed: f32,
}

impl OrbitCamera {
    pub fn new(config: &OrbitConfig) -> Self {
        Self {
            angle: Rad(0.0),
            radius: config.radius,
            eye_height: config.eye_height,
            target: config.target.into(),
            angular_speed: config.angular_speed,
        }
    }

    /// Eye position for the current angle: `(sin θ · r, h, cos θ · r)`.
    pub fn eye(&self) -> Point3<f32> {
        let (sin, cos) = self.angle.0.sin_cos();
        Point3::new(sin * self.radius, self.eye_height, cos * self.radius)
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.eye(), self.target, Vector3::unit_y())
    }

    /// Advances the orbit by `angular_speed · dt`, keeping the angle in `[0, 2π)`.
    pub fn update(&mut self, dt: Duration) {
        let angle = self.angle.0 + self.angular_speed * dt.as_secs_f32();
        self.angle = Rad(angle.rem_euclid(TAU));
    }
}

#[derive(Debug, Clone)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new(width: u32, height: u32, config: &ProjectionConfig) -> Self {
        Self {
            aspect: width.max(1) as f32 / height.max(1) as f32,
            fovy: Rad(config.fovy),
            znear: config.znear,
            zfar: config.zfar,
        }
    }

    /// Zero-sized surfaces (minimised windows) keep the previous aspect.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.aspect = width as f32 / height as f32;
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * cgmath::perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

/// View and projection are kept apart; the shader multiplies them itself.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_position: [f32; 4],
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        use cgmath::SquareMatrix;
        Self {
            view_position: [0.0; 4],
            view: Matrix4::identity().into(),
            proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &OrbitCamera, projection: &Projection) {
        self.view_position = camera.eye().to_homogeneous().into();
        self.view = camera.calc_matrix().into();
        self.proj = projection.calc_matrix().into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

/// GPU-side state of the camera.
#[derive(Debug)]
pub struct CameraResources {
    pub camera: OrbitCamera,
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

impl CameraResources {
    pub fn new(device: &wgpu::Device, camera: OrbitCamera, projection: &Projection) -> Self {
        let mut uniform = CameraUniform::new();
        uniform.update_view_proj(&camera, projection);

        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("camera_bind_group_layout"),
        });

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        Self {
            camera,
            uniform,
            buffer,
            bind_group,
            bind_group_layout,
        }
    }

    /// Recomputes the uniform and uploads it.
    pub fn write_to_buffer(&mut self, queue: &wgpu::Queue, projection: &Projection) {
        self.uniform.update_view_proj(&self.camera, projection);
        queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[self.uniform]));
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use cgmath::{Transform, Vector4};

    use super::*;

    fn camera() -> OrbitCamera {
        OrbitCamera::new(&OrbitConfig::default())
    }

    #[test]
    fn eye_starts_on_positive_z() {
        let eye = camera().eye();
        assert_relative_eq!(eye.x, 0.0);
        assert_relative_eq!(eye.y, 0.5);
        assert_relative_eq!(eye.z, 1.0);
    }

    #[test]
    fn eye_follows_the_circle() {
        let mut cam = camera();
        cam.angle = Rad(std::f32::consts::FRAC_PI_2);
        let eye = cam.eye();
        assert_relative_eq!(eye.x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(eye.z, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn view_matrix_looks_down_negative_z_at_target() {
        let cam = camera();
        let target_in_view = cam.calc_matrix().transform_point(cam.target);
        assert_relative_eq!(target_in_view.x, 0.0, epsilon = 1e-6);
        assert_relative_eq!(target_in_view.y, 0.0, epsilon = 1e-6);
        assert_relative_eq!(target_in_view.z, -1.0, epsilon = 1e-6);
    }

    #[test]
    fn update_is_scaled_by_elapsed_time() {
        let mut cam = camera();
        cam.update(Duration::from_millis(500));
        assert_relative_eq!(cam.angle.0, 0.03, epsilon = 1e-6);
    }

    #[test]
    fn angle_wraps_after_a_full_turn() {
        let mut cam = camera();
        cam.angle = Rad(TAU - 0.01);
        cam.update(Duration::from_secs(1));
        assert!(cam.angle.0 >= 0.0 && cam.angle.0 < TAU);
        assert_relative_eq!(cam.angle.0, 0.05, epsilon = 1e-5);
    }

    #[test]
    fn resize_updates_aspect_and_ignores_zero() {
        let mut projection = Projection::new(800, 600, &ProjectionConfig::default());
        assert_relative_eq!(projection.aspect(), 800.0 / 600.0);
        projection.resize(1920, 1080);
        assert_relative_eq!(projection.aspect(), 1920.0 / 1080.0);
        projection.resize(0, 1080);
        assert_relative_eq!(projection.aspect(), 1920.0 / 1080.0);
    }

    #[test]
    fn projection_maps_near_and_far_planes_to_wgpu_depth_range() {
        let config = ProjectionConfig::default();
        let projection = Projection::new(1, 1, &config);
        let m = projection.calc_matrix();
        let near = m * Vector4::new(0.0, 0.0, -config.znear, 1.0);
        let far = m * Vector4::new(0.0, 0.0, -config.zfar, 1.0);
        assert_relative_eq!(near.z / near.w, 0.0, epsilon = 1e-5);
        assert_relative_eq!(far.z / far.w, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn uniform_carries_eye_position() {
        let cam = camera();
        let projection = Projection::new(4, 3, &ProjectionConfig::default());
        let mut uniform = CameraUniform::new();
        uniform.update_view_proj(&cam, &projection);
        assert_relative_eq!(uniform.view_position[2], 1.0);
        assert_relative_eq!(uniform.view_position[3], 1.0);
    }
}
