//! The hardcoded room: one floor quad and four wall panels.
//!
//! Both share the interleaved [`ModelVertex`] layout. The floor spans
//! `x, z ∈ [-1, 1]` at `y = 0`; each wall is one unit tall and stands on one
//! edge of the floor, facing the room centre.

use crate::data_structures::{
    model::{Indices, Material, MaterialUniform, MeshData, Model, ModelVertex},
    texture::Texture,
};

const fn v(position: [f32; 3], normal: [f32; 3], tex_coords: [f32; 2]) -> ModelVertex {
    ModelVertex::new(position, normal, tex_coords)
}

#[rustfmt::skip]
pub const FLOOR_VERTICES: [ModelVertex; 4] = [
    v([-1.0, 0.0, -1.0], [0.0, 1.0, 0.0], [0.0, 0.0]),
    v([ 1.0, 0.0, -1.0], [0.0, 1.0, 0.0], [1.0, 0.0]),
    v([ 1.0, 0.0,  1.0], [0.0, 1.0, 0.0], [1.0, 1.0]),
    v([-1.0, 0.0,  1.0], [0.0, 1.0, 0.0], [0.0, 1.0]),
];

pub const FLOOR_INDICES: [u16; 6] = [0, 1, 2, 2, 3, 0];

#[rustfmt::skip]
pub const WALL_VERTICES: [ModelVertex; 16] = [
    // back, z = -1
    v([-1.0, 0.0, -1.0], [ 0.0, 0.0,  1.0], [0.0, 0.0]),
    v([-1.0, 1.0, -1.0], [ 0.0, 0.0,  1.0], [0.0, 1.0]),
    v([ 1.0, 1.0, -1.0], [ 0.0, 0.0,  1.0], [1.0, 1.0]),
    v([ 1.0, 0.0, -1.0], [ 0.0, 0.0,  1.0], [1.0, 0.0]),
    // right, x = 1
    v([ 1.0, 0.0, -1.0], [-1.0, 0.0,  0.0], [0.0, 0.0]),
    v([ 1.0, 1.0, -1.0], [-1.0, 0.0,  0.0], [0.0, 1.0]),
    v([ 1.0, 1.0,  1.0], [-1.0, 0.0,  0.0], [1.0, 1.0]),
    v([ 1.0, 0.0,  1.0], [-1.0, 0.0,  0.0], [1.0, 0.0]),
    // front, z = 1
    v([ 1.0, 0.0,  1.0], [ 0.0, 0.0, -1.0], [0.0, 0.0]),
    v([ 1.0, 1.0,  1.0], [ 0.0, 0.0, -1.0], [0.0, 1.0]),
    v([-1.0, 1.0,  1.0], [ 0.0, 0.0, -1.0], [1.0, 1.0]),
    v([-1.0, 0.0,  1.0], [ 0.0, 0.0, -1.0], [1.0, 0.0]),
    // left, x = -1
    v([-1.0, 0.0,  1.0], [ 1.0, 0.0,  0.0], [0.0, 0.0]),
    v([-1.0, 1.0,  1.0], [ 1.0, 0.0,  0.0], [0.0, 1.0]),
    v([-1.0, 1.0, -1.0], [ 1.0, 0.0,  0.0], [1.0, 1.0]),
    v([-1.0, 0.0, -1.0], [ 1.0, 0.0,  0.0], [1.0, 0.0]),
];

#[rustfmt::skip]
pub const WALL_INDICES: [u16; 24] = [
    0, 1, 2, 2, 3, 0,
    4, 5, 6, 6, 7, 4,
    8, 9, 10, 10, 11, 8,
    12, 13, 14, 14, 15, 12,
];

pub fn floor_mesh() -> MeshData {
    MeshData {
        name: "floor".to_string(),
        vertices: FLOOR_VERTICES.to_vec(),
        indices: Indices::U16(FLOOR_INDICES.to_vec()),
        material: 0,
    }
}

pub fn wall_mesh() -> MeshData {
    MeshData {
        name: "walls".to_string(),
        vertices: WALL_VERTICES.to_vec(),
        indices: Indices::U16(WALL_INDICES.to_vec()),
        material: 0,
    }
}

/// The room's GPU resources. Allocated once at startup.
#[derive(Debug)]
pub struct Room {
    pub floor: Model,
    pub walls: Model,
}

impl Room {
    /// The floor starts out textured with a white placeholder until
    /// [`Room::set_floor_material`] swaps in the loaded texture.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        wall_color: [f32; 3],
    ) -> Self {
        let floor_placeholder =
            Texture::create_placeholder([255; 4], "floor placeholder", device, queue);
        let floor_material = Material::new(
            device,
            "floor",
            floor_placeholder,
            MaterialUniform::textured(),
            layout,
        );
        let wall_texture = Texture::create_placeholder([255; 4], "wall placeholder", device, queue);
        let wall_material = Material::new(
            device,
            "walls",
            wall_texture,
            MaterialUniform::flat(wall_color),
            layout,
        );
        Self {
            floor: Model::new(device, &[floor_mesh()], vec![floor_material]),
            walls: Model::new(device, &[wall_mesh()], vec![wall_material]),
        }
    }

    pub fn set_floor_material(&mut self, material: Material) {
        self.floor.materials = vec![material];
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use cgmath::{InnerSpace, Vector3};

    use super::*;

    #[test]
    fn floor_is_a_single_upward_quad() {
        let floor = floor_mesh();
        assert!(floor.indices_in_bounds());
        assert_eq!(floor.indices.len(), 6);
        for vertex in &floor.vertices {
            assert_eq!(vertex.position[1], 0.0);
            assert_eq!(vertex.normal, [0.0, 1.0, 0.0]);
        }
    }

    #[test]
    fn walls_are_four_quads() {
        let walls = wall_mesh();
        assert_eq!(walls.vertices.len(), 16);
        assert_eq!(walls.indices.len(), 24);
        assert!(walls.indices_in_bounds());
        for (quad, chunk) in WALL_INDICES.chunks(6).enumerate() {
            let base = quad as u16 * 4;
            assert_eq!(chunk, &[base, base + 1, base + 2, base + 2, base + 3, base]);
        }
    }

    #[test]
    fn walls_face_the_room_centre() {
        for quad in WALL_VERTICES.chunks(4) {
            // Every corner of a quad shares its normal.
            assert!(quad.iter().all(|v| v.normal == quad[0].normal));
            let normal = Vector3::from(quad[0].normal);
            assert_relative_eq!(normal.magnitude(), 1.0);
            let (x, z) = quad.iter().fold((0.0, 0.0), |(x, z), v| {
                (x + v.position[0] / 4.0, z + v.position[2] / 4.0)
            });
            let to_centre = Vector3::new(-x, 0.0, -z);
            assert!(normal.dot(to_centre) > 0.0, "{normal:?} points away from the centre");
        }
    }

    #[test]
    fn walls_are_one_unit_tall() {
        let heights: Vec<f32> = WALL_VERTICES.iter().map(|v| v.position[1]).collect();
        assert!(heights.iter().all(|&y| y == 0.0 || y == 1.0));
    }
}
