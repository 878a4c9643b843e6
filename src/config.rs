//! Scene constants.
//!
//! Everything the gallery hardcodes lives in [`GalleryConfig`] so that
//! callers can tweak the room without touching the render code.

use std::f32::consts::FRAC_PI_4;

/// Configuration for the gallery scene.
///
/// The defaults reproduce the reference scene: a camera orbiting at radius 1
/// and eye height 0.5 around `(0, 0.5, 0)`, a white point light at
/// `(0, 1, 0)` and an opaque black background.
#[derive(Clone, Debug, PartialEq)]
pub struct GalleryConfig {
    /// Id of the `<canvas>` element used on the web.
    pub canvas_id: String,
    /// Path of the binary glTF picture frame, relative to the asset root.
    pub frame_model: String,
    /// Path of the floor texture, relative to the asset root.
    pub floor_texture: String,
    pub orbit: OrbitConfig,
    pub projection: ProjectionConfig,
    pub light_position: [f32; 3],
    pub light_color: [f32; 3],
    /// Flat colour of the wall panels (and of frame meshes without a texture
    /// or base colour).
    pub object_color: [f32; 3],
    pub clear_colour: wgpu::Color,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrbitConfig {
    pub radius: f32,
    pub eye_height: f32,
    pub target: [f32; 3],
    /// Radians per second.
    pub angular_speed: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProjectionConfig {
    /// Vertical field of view in radians.
    pub fovy: f32,
    pub znear: f32,
    pub zfar: f32,
}

impl Default for OrbitConfig {
    fn default() -> Self {
        Self {
            radius: 1.0,
            eye_height: 0.5,
            target: [0.0, 0.5, 0.0],
            // 0.001 rad per frame at 60 fps
            angular_speed: 0.06,
        }
    }
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            fovy: FRAC_PI_4,
            znear: 0.1,
            zfar: 100.0,
        }
    }
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            canvas_id: "glCanvas".to_string(),
            frame_model: "models/picture_frame.glb".to_string(),
            floor_texture: "imgs/wood-floor.jpg".to_string(),
            orbit: OrbitConfig::default(),
            projection: ProjectionConfig::default(),
            light_position: [0.0, 1.0, 0.0],
            light_color: [1.0, 1.0, 1.0],
            object_color: [1.0, 1.0, 1.0],
            clear_colour: wgpu::Color::BLACK,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_scene() {
        let config = GalleryConfig::default();
        assert_eq!(config.frame_model, "models/picture_frame.glb");
        assert_eq!(config.floor_texture, "imgs/wood-floor.jpg");
        assert_eq!(config.light_position, [0.0, 1.0, 0.0]);
        assert_eq!(config.orbit.target, [0.0, 0.5, 0.0]);
        assert_eq!(config.projection.fovy, FRAC_PI_4);
        assert_eq!(config.clear_colour, wgpu::Color::BLACK);
    }

    #[test]
    fn orbit_speed_matches_one_milliradian_per_frame_at_60_fps() {
        let orbit = OrbitConfig::default();
        approx::assert_relative_eq!(orbit.angular_speed / 60.0, 0.001);
    }
}
