//! Meshes, materials and the vertex layout shared by every draw call.

use wgpu::util::DeviceExt;

use crate::data_structures::texture::Texture;

/// Describes how a vertex type is laid out in its GPU buffer.
pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

/// Interleaved position, normal and texture coordinate (8 floats, 32 bytes).
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coords: [f32; 2],
}

impl ModelVertex {
    pub const fn new(position: [f32; 3], normal: [f32; 3], tex_coords: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            tex_coords,
        }
    }
}

/**
 * stride: 8 floats per vertex
 *
 * offsets: position at 0, normal after 3 floats, tex coords after 6 floats.
 */
impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 6]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }
}

/// Triangle list indices, narrowed to 16 bit whenever the mesh allows it.
#[derive(Clone, Debug, PartialEq)]
pub enum Indices {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl Indices {
    /// Picks `U16` if every index fits, `U32` otherwise.
    pub fn from_u32(indices: Vec<u32>) -> Self {
        if indices.iter().all(|&i| i <= u16::MAX as u32) {
            Indices::U16(indices.into_iter().map(|i| i as u16).collect())
        } else {
            Indices::U32(indices)
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Indices::U16(v) => v.len(),
            Indices::U32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max(&self) -> Option<u32> {
        match self {
            Indices::U16(v) => v.iter().max().map(|&i| i as u32),
            Indices::U32(v) => v.iter().max().copied(),
        }
    }

    pub fn format(&self) -> wgpu::IndexFormat {
        match self {
            Indices::U16(_) => wgpu::IndexFormat::Uint16,
            Indices::U32(_) => wgpu::IndexFormat::Uint32,
        }
    }

    /// Raw bytes for the index buffer. 16-bit lists are padded to a
    /// multiple of four bytes as wgpu requires for buffer initialisation.
    pub fn as_bytes(&self) -> Vec<u8> {
        match self {
            Indices::U16(v) => {
                let mut bytes = bytemuck::cast_slice::<u16, u8>(v).to_vec();
                bytes.resize(bytes.len().next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT as usize), 0);
                bytes
            }
            Indices::U32(v) => bytemuck::cast_slice::<u32, u8>(v).to_vec(),
        }
    }
}

/// CPU-side mesh, before upload.
#[derive(Clone, Debug, PartialEq)]
pub struct MeshData {
    pub name: String,
    pub vertices: Vec<ModelVertex>,
    pub indices: Indices,
    pub material: usize,
}

impl MeshData {
    /// True when every index addresses an existing vertex.
    pub fn indices_in_bounds(&self) -> bool {
        self.indices
            .max()
            .is_none_or(|max| (max as usize) < self.vertices.len())
    }
}

#[derive(Debug)]
pub struct Mesh {
    pub name: String,
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_format: wgpu::IndexFormat,
    pub num_elements: u32,
    pub material: usize,
}

impl Mesh {
    pub fn new(device: &wgpu::Device, data: &MeshData) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Vertex Buffer", data.name)),
            contents: bytemuck::cast_slice(&data.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{} Index Buffer", data.name)),
            contents: &data.indices.as_bytes(),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            name: data.name.clone(),
            vertex_buffer,
            index_buffer,
            index_format: data.indices.format(),
            num_elements: data.indices.len() as u32,
            material: data.material,
        }
    }
}

/// Per-material shader parameters.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    pub color: [f32; 3],
    pub use_texture: u32,
}

impl MaterialUniform {
    pub fn textured() -> Self {
        Self {
            color: [1.0; 3],
            use_texture: 1,
        }
    }

    pub fn flat(color: [f32; 3]) -> Self {
        Self {
            color,
            use_texture: 0,
        }
    }
}

/// Texture, sampler and [`MaterialUniform`] at group 0.
pub fn material_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
        ],
        label: Some("material_bind_group_layout"),
    })
}

#[derive(Debug)]
pub struct Material {
    pub name: String,
    pub diffuse_texture: Texture,
    pub uniform: MaterialUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
}

impl Material {
    pub fn new(
        device: &wgpu::Device,
        name: &str,
        diffuse_texture: Texture,
        uniform: MaterialUniform,
        layout: &wgpu::BindGroupLayout,
    ) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{name} Material Buffer")),
            contents: bytemuck::cast_slice(&[uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&diffuse_texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&diffuse_texture.sampler),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: buffer.as_entire_binding(),
                },
            ],
            label: Some(name),
        });
        Self {
            name: name.to_string(),
            diffuse_texture,
            uniform,
            buffer,
            bind_group,
        }
    }
}

#[derive(Debug)]
pub struct Model {
    pub meshes: Vec<Mesh>,
    pub materials: Vec<Material>,
}

impl Model {
    /// Uploads the meshes. Every `MeshData::material` must index `materials`.
    pub fn new(device: &wgpu::Device, meshes: &[MeshData], materials: Vec<Material>) -> Self {
        Self {
            meshes: meshes.iter().map(|data| Mesh::new(device, data)).collect(),
            materials,
        }
    }
}

pub trait DrawModel<'a> {
    fn draw_mesh(
        &mut self,
        mesh: &'a Mesh,
        material: &'a Material,
        camera_bind_group: &'a wgpu::BindGroup,
        light_bind_group: &'a wgpu::BindGroup,
    );

    fn draw_model(
        &mut self,
        model: &'a Model,
        camera_bind_group: &'a wgpu::BindGroup,
        light_bind_group: &'a wgpu::BindGroup,
    );
}

impl<'a, 'b> DrawModel<'b> for wgpu::RenderPass<'a>
where
    'b: 'a,
{
    fn draw_mesh(
        &mut self,
        mesh: &'b Mesh,
        material: &'b Material,
        camera_bind_group: &'b wgpu::BindGroup,
        light_bind_group: &'b wgpu::BindGroup,
    ) {
        self.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
        self.set_index_buffer(mesh.index_buffer.slice(..), mesh.index_format);
        self.set_bind_group(0, &material.bind_group, &[]);
        self.set_bind_group(1, camera_bind_group, &[]);
        self.set_bind_group(2, light_bind_group, &[]);
        self.draw_indexed(0..mesh.num_elements, 0, 0..1);
    }

    fn draw_model(
        &mut self,
        model: &'b Model,
        camera_bind_group: &'b wgpu::BindGroup,
        light_bind_group: &'b wgpu::BindGroup,
    ) {
        for mesh in &model.meshes {
            match model.materials.get(mesh.material) {
                Some(material) => {
                    self.draw_mesh(mesh, material, camera_bind_group, light_bind_group)
                }
                None => log::warn!(
                    "Mesh {} references missing material {}; skipped",
                    mesh.name,
                    mesh.material
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_layout_matches_interleaving() {
        let layout = ModelVertex::desc();
        assert_eq!(layout.array_stride, 32);
        let offsets: Vec<_> = layout.attributes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 12, 24]);
        let locations: Vec<_> = layout.attributes.iter().map(|a| a.shader_location).collect();
        assert_eq!(locations, vec![0, 1, 2]);
    }

    #[test]
    fn indices_narrow_to_u16_when_possible() {
        let small = Indices::from_u32(vec![0, 1, 65535]);
        assert_eq!(small, Indices::U16(vec![0, 1, 65535]));
        assert_eq!(small.format(), wgpu::IndexFormat::Uint16);

        let large = Indices::from_u32(vec![0, 65536]);
        assert_eq!(large.format(), wgpu::IndexFormat::Uint32);
        assert_eq!(large.max(), Some(65536));
    }

    #[test]
    fn u16_index_bytes_are_padded_to_four() {
        let indices = Indices::U16(vec![0, 1, 2]);
        assert_eq!(indices.as_bytes().len(), 8);
        assert_eq!(indices.len(), 3);
    }

    #[test]
    fn detects_out_of_bounds_indices() {
        let mesh = MeshData {
            name: "tri".into(),
            vertices: vec![ModelVertex::default(); 3],
            indices: Indices::U16(vec![0, 1, 3]),
            material: 0,
        };
        assert!(!mesh.indices_in_bounds());
    }

    #[test]
    fn material_uniform_is_one_vec4() {
        assert_eq!(std::mem::size_of::<MaterialUniform>(), 16);
        assert_eq!(MaterialUniform::flat([1.0; 3]).use_texture, 0);
        assert_eq!(MaterialUniform::textured().use_texture, 1);
    }
}
