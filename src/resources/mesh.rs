use anyhow::{Context, bail};
use cgmath::{InnerSpace, Vector3};

use crate::data_structures::model::{Indices, MeshData, ModelVertex};

/**
 * Reads the vertex and index data of the first mesh in a glTF document.
 *
 * Each triangle primitive becomes one `MeshData`. POSITION is mandatory;
 * missing normals are rebuilt from the triangle faces and missing tex
 * coords default to zero. The material index of a primitive without a
 * material is `document.materials().len()`, one past the document's own
 * materials, where the loader puts a flat default.
 */
pub fn read_meshes(document: &gltf::Document, buffers: &[Vec<u8>]) -> anyhow::Result<Vec<MeshData>> {
    let mesh = document
        .meshes()
        .next()
        .context("glTF document contains no mesh")?;
    let mesh_name = mesh.name().unwrap_or("mesh");
    let default_material = document.materials().len();

    let mut meshes = Vec::new();
    for primitive in mesh.primitives() {
        let name = format!("{}#{}", mesh_name, primitive.index());
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            log::warn!(
                "Primitive {} uses {:?} instead of triangles and is skipped",
                name,
                primitive.mode()
            );
            continue;
        }
        let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));

        let positions: Vec<[f32; 3]> = reader
            .read_positions()
            .with_context(|| format!("Primitive {name} has no POSITION attribute"))?
            .collect();

        let indices: Vec<u32> = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect(),
            None => (0..positions.len() as u32).collect(),
        };
        if indices.len() % 3 != 0 {
            bail!("Primitive {name} has {} indices, not a triangle list", indices.len());
        }
        if let Some(max) = indices.iter().max() {
            if *max as usize >= positions.len() {
                bail!(
                    "Primitive {name} indexes vertex {max} but has only {} vertices",
                    positions.len()
                );
            }
        }

        let normals: Vec<[f32; 3]> = match reader.read_normals() {
            Some(normals) => normals.collect(),
            None => {
                log::warn!("Primitive {name} has no NORMAL attribute, using face normals");
                face_normals(&positions, &indices)
            }
        };
        check_count(&name, "NORMAL", normals.len(), positions.len())?;

        let tex_coords: Vec<[f32; 2]> = match reader.read_tex_coords(0) {
            Some(tex_coords) => tex_coords.into_f32().collect(),
            None => {
                log::warn!("Primitive {name} has no TEXCOORD_0 attribute");
                vec![[0.0; 2]; positions.len()]
            }
        };
        check_count(&name, "TEXCOORD_0", tex_coords.len(), positions.len())?;

        let vertices = positions
            .into_iter()
            .zip(normals)
            .zip(tex_coords)
            .map(|((position, normal), tex_coords)| ModelVertex::new(position, normal, tex_coords))
            .collect();

        meshes.push(MeshData {
            name,
            vertices,
            indices: Indices::from_u32(indices),
            material: primitive.material().index().unwrap_or(default_material),
        });
    }

    if meshes.is_empty() {
        bail!("Mesh {mesh_name} has no triangle primitives");
    }
    Ok(meshes)
}

fn check_count(name: &str, attribute: &str, count: usize, expected: usize) -> anyhow::Result<()> {
    if count != expected {
        bail!("Primitive {name} has {count} {attribute} values for {expected} positions");
    }
    Ok(())
}

/// Area-weighted vertex normals accumulated from the triangles around each vertex.
pub fn face_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut normals = vec![Vector3::new(0.0f32, 0.0, 0.0); positions.len()];
    for c in indices.chunks_exact(3) {
        let p0 = Vector3::from(positions[c[0] as usize]);
        let p1 = Vector3::from(positions[c[1] as usize]);
        let p2 = Vector3::from(positions[c[2] as usize]);
        let face = (p1 - p0).cross(p2 - p0);
        for &i in c {
            normals[i as usize] += face;
        }
    }
    normals
        .into_iter()
        .map(|n| {
            if n.magnitude2() > f32::EPSILON {
                n.normalize().into()
            } else {
                // Unreferenced or degenerate vertices still need a usable normal.
                [0.0, 1.0, 0.0]
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    const POSITIONS: [[f32; 3]; 3] = [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
    const NORMALS: [[f32; 3]; 3] = [[0.0, 0.0, 1.0]; 3];
    const TEX_COORDS: [[f32; 2]; 3] = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
    const INDICES: [u16; 3] = [2, 1, 0];

    /// Binary chunk: positions @0, normals @36, tex coords @72, indices @96.
    fn bin() -> Vec<u8> {
        let mut bin = Vec::new();
        bin.extend_from_slice(bytemuck::cast_slice(&POSITIONS));
        bin.extend_from_slice(bytemuck::cast_slice(&NORMALS));
        bin.extend_from_slice(bytemuck::cast_slice(&TEX_COORDS));
        bin.extend_from_slice(bytemuck::cast_slice(&INDICES));
        bin.resize(104, 0);
        bin
    }

    /// Accessors: 0 POSITION, 1 NORMAL, 2 TEXCOORD_0, 3 indices, 4 a short TEXCOORD_0.
    fn json(meshes: &str) -> String {
        format!(
            r#"{{
  "asset": {{ "version": "2.0" }},
  "buffers": [{{ "byteLength": 102 }}],
  "bufferViews": [
    {{ "buffer": 0, "byteOffset": 0, "byteLength": 36 }},
    {{ "buffer": 0, "byteOffset": 36, "byteLength": 36 }},
    {{ "buffer": 0, "byteOffset": 72, "byteLength": 24 }},
    {{ "buffer": 0, "byteOffset": 96, "byteLength": 6 }}
  ],
  "accessors": [
    {{ "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
       "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] }},
    {{ "bufferView": 1, "componentType": 5126, "count": 3, "type": "VEC3" }},
    {{ "bufferView": 2, "componentType": 5126, "count": 3, "type": "VEC2" }},
    {{ "bufferView": 3, "componentType": 5123, "count": 3, "type": "SCALAR" }},
    {{ "bufferView": 2, "componentType": 5126, "count": 2, "type": "VEC2" }}
  ],
  "meshes": {meshes}
}}"#
        )
    }

    fn glb(json: &str, bin: &[u8]) -> Vec<u8> {
        let mut json = json.as_bytes().to_vec();
        json.resize(json.len().next_multiple_of(4), b' ');
        let total = 12 + 8 + json.len() + 8 + bin.len();
        let mut glb = Vec::with_capacity(total);
        glb.extend_from_slice(b"glTF");
        glb.extend_from_slice(&2u32.to_le_bytes());
        glb.extend_from_slice(&(total as u32).to_le_bytes());
        glb.extend_from_slice(&(json.len() as u32).to_le_bytes());
        glb.extend_from_slice(b"JSON");
        glb.extend_from_slice(&json);
        glb.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        glb.extend_from_slice(b"BIN\0");
        glb.extend_from_slice(bin);
        glb
    }

    fn read(meshes: &str) -> anyhow::Result<Vec<MeshData>> {
        let gltf = gltf::Gltf::from_slice(&glb(&json(meshes), &bin()))?;
        let blob = gltf.blob.clone().context("missing BIN chunk")?;
        read_meshes(&gltf.document, &[blob])
    }

    #[test]
    fn reads_an_indexed_triangle() {
        let meshes = read(
            r#"[{ "name": "frame", "primitives": [{
                "attributes": { "POSITION": 0, "NORMAL": 1, "TEXCOORD_0": 2 },
                "indices": 3 }] }]"#,
        )
        .unwrap();
        assert_eq!(meshes.len(), 1);
        let mesh = &meshes[0];
        assert_eq!(mesh.name, "frame#0");
        assert_eq!(mesh.indices, Indices::U16(vec![2, 1, 0]));
        assert_eq!(mesh.vertices[1].position, [1.0, 0.0, 0.0]);
        assert_eq!(mesh.vertices[1].normal, [0.0, 0.0, 1.0]);
        assert_eq!(mesh.vertices[2].tex_coords, [0.0, 1.0]);
        // no material in the document: points at the default slot
        assert_eq!(mesh.material, 0);
        assert!(mesh.indices_in_bounds());
    }

    #[test]
    fn generates_sequential_indices_when_missing() {
        let meshes = read(
            r#"[{ "primitives": [{
                "attributes": { "POSITION": 0, "NORMAL": 1, "TEXCOORD_0": 2 } }] }]"#,
        )
        .unwrap();
        assert_eq!(meshes[0].indices, Indices::U16(vec![0, 1, 2]));
        assert_eq!(meshes[0].name, "mesh#0");
    }

    #[test]
    fn rebuilds_missing_normals_and_zeroes_tex_coords() {
        let meshes = read(r#"[{ "primitives": [{ "attributes": { "POSITION": 0 }, "indices": 3 }] }]"#)
            .unwrap();
        for vertex in &meshes[0].vertices {
            // indices 2, 1, 0 wind clockwise seen from +Z
            assert_relative_eq!(vertex.normal[2], -1.0);
            assert_eq!(vertex.tex_coords, [0.0, 0.0]);
        }
    }

    #[test]
    fn rejects_attribute_count_mismatch() {
        let err = read(
            r#"[{ "primitives": [{
                "attributes": { "POSITION": 0, "NORMAL": 1, "TEXCOORD_0": 4 } }] }]"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("TEXCOORD_0"), "{err}");
    }

    #[test]
    fn skips_non_triangle_primitives() {
        let err = read(r#"[{ "primitives": [{ "attributes": { "POSITION": 0 }, "mode": 0 }] }]"#)
            .unwrap_err();
        assert!(err.to_string().contains("no triangle primitives"), "{err}");
    }

    #[test]
    fn requires_a_mesh() {
        let gltf = gltf::Gltf::from_slice(br#"{ "asset": { "version": "2.0" } }"#).unwrap();
        let err = read_meshes(&gltf.document, &[]).unwrap_err();
        assert!(err.to_string().contains("no mesh"), "{err}");
    }

    #[test]
    fn face_normals_fall_back_to_up_for_unused_vertices() {
        let normals = face_normals(&[[0.0; 3]; 4], &[]);
        assert_eq!(normals, vec![[0.0, 1.0, 0.0]; 4]);
    }
}
