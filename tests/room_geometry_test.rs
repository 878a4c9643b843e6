use gallery_ngin::data_structures::{
    model::{Indices, ModelVertex, Vertex},
    room::{FLOOR_INDICES, WALL_INDICES, WALL_VERTICES, floor_mesh, wall_mesh},
};

#[test]
fn room_fits_in_the_unit_box() {
    for mesh in [floor_mesh(), wall_mesh()] {
        for vertex in &mesh.vertices {
            let [x, y, z] = vertex.position;
            assert!((-1.0..=1.0).contains(&x), "{}: x = {x}", mesh.name);
            assert!((0.0..=1.0).contains(&y), "{}: y = {y}", mesh.name);
            assert!((-1.0..=1.0).contains(&z), "{}: z = {z}", mesh.name);
            for uv in vertex.tex_coords {
                assert!((0.0..=1.0).contains(&uv));
            }
        }
    }
}

#[test]
fn room_indices_stay_16_bit() {
    assert_eq!(floor_mesh().indices, Indices::U16(FLOOR_INDICES.to_vec()));
    assert_eq!(wall_mesh().indices, Indices::U16(WALL_INDICES.to_vec()));
    assert_eq!(floor_mesh().indices.format(), wgpu::IndexFormat::Uint16);
}

#[test]
fn walls_cover_every_floor_edge() {
    // Each wall quad pins one coordinate to +-1.
    let mut edges: Vec<(usize, i32)> = WALL_VERTICES
        .chunks(4)
        .map(|quad| {
            let axis = if quad.iter().all(|v| v.position[0] == quad[0].position[0]) {
                0
            } else {
                2
            };
            (axis, quad[0].position[axis] as i32)
        })
        .collect();
    edges.sort();
    assert_eq!(edges, vec![(0, -1), (0, 1), (2, -1), (2, 1)]);
}

#[test]
fn vertex_layout_is_interleaved() {
    let desc = ModelVertex::desc();
    assert_eq!(desc.array_stride, 32);
    let offsets: Vec<u64> = desc.attributes.iter().map(|a| a.offset).collect();
    assert_eq!(offsets, vec![0, 12, 24]);
}
