//! gallery-ngin
//!
//! Renders a small gallery room: a wood floor, four wall panels and a
//! picture frame loaded from a binary glTF, seen through a camera that
//! slowly orbits the room centre. Runs natively through winit and in the
//! browser through wgpu's WebGL backend.
//!
//! High-level modules
//! - `camera`: orbit camera, projection and the camera uniform
//! - `config`: scene constants (asset paths, orbit, projection, light)
//! - `context`: GPU and window context that owns device/queue/pipeline
//! - `data_structures`: vertices, meshes, materials, textures and the room
//! - `flow`: event loop and the `GraphicsFlow` abstraction
//! - `gallery`: the gallery scene flow (floor, walls, frame)
//! - `pipelines`: the scene render pipeline and its light uniform
//! - `resources`: asset IO, texture and glTF loading
//! - `render`: draw composition returned by flows each frame
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod flow;
pub mod gallery;
pub mod pipelines;
pub mod render;
pub mod resources;

pub use config::GalleryConfig;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Runs the gallery with the default configuration until the window closes.
pub fn run() -> anyhow::Result<()> {
    gallery::run(GalleryConfig::default())
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn run_web() -> Result<(), JsValue> {
    run().map_err(|e| JsValue::from_str(&format!("{e:#}")))
}
