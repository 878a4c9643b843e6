//! Render pipeline construction.
//!
//! - `basic` builds the one scene pipeline shared by floor, walls and frame
//! - `light` owns the light uniform bound next to the camera

pub mod basic;
pub mod light;
