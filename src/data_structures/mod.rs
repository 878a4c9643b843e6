//! Engine data structures: vertices, meshes, materials, textures and the room.
//!
//! - `model` contains the vertex layout, CPU/GPU meshes, materials and draw helpers
//! - `texture` contains the GPU texture wrapper and creation utilities
//! - `room` holds the hardcoded floor and wall geometry

pub mod model;
pub mod room;
pub mod texture;
