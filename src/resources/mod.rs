use std::ops::Range;

use anyhow::{Context, bail};

use crate::{
    context::InitContext,
    data_structures::{
        model::{self, MaterialUniform},
        texture::Texture,
    },
    resources::{
        mesh::read_meshes,
        texture::{format_hint, load_binary, resolve_relative},
    },
};

/**
 * This module contains all logic for loading meshes and textures from external files.
 */
pub mod mesh;
pub mod texture;

/// Loads the first mesh of a glTF/GLB file together with its materials.
///
/// Materials without a base colour texture fall back to their base colour
/// factor; primitives without a material use `default_color`.
pub async fn load_model_gltf(
    file_name: &str,
    ctx: &InitContext,
    default_color: [f32; 3],
) -> anyhow::Result<model::Model> {
    let gltf_bytes = load_binary(file_name).await?;
    let gltf = gltf::Gltf::from_slice(&gltf_bytes)
        .with_context(|| format!("Cannot parse glTF {file_name}"))?;

    // Load buffers
    let mut buffer_data = Vec::new();
    for buffer in gltf.buffers() {
        match buffer.source() {
            gltf::buffer::Source::Bin => {
                let blob = gltf
                    .blob
                    .as_deref()
                    .with_context(|| format!("{file_name} references a missing BIN chunk"))?;
                buffer_data.push(blob.to_vec());
            }
            gltf::buffer::Source::Uri(uri) => {
                buffer_data.push(load_uri(file_name, uri).await?);
            }
        }
    }

    let meshes = read_meshes(&gltf.document, &buffer_data)
        .with_context(|| format!("Cannot read meshes of {file_name}"))?;

    // Load materials
    let mut materials = Vec::new();
    for material in gltf.materials() {
        materials.push(load_material(file_name, &material, &buffer_data, ctx).await?);
    }
    let placeholder =
        Texture::create_placeholder([255; 4], "frame default", &ctx.device, &ctx.queue);
    materials.push(model::Material::new(
        &ctx.device,
        &format!("{file_name} default material"),
        placeholder,
        MaterialUniform::flat(default_color),
        &ctx.material_layout,
    ));

    log::info!(
        "Loaded {} with {} meshes and {} materials",
        file_name,
        meshes.len(),
        materials.len()
    );
    Ok(model::Model::new(&ctx.device, &meshes, materials))
}

/// Where a material's base colour comes from.
#[derive(Debug, PartialEq)]
enum MaterialSource<'a> {
    /// Image bytes inside a loaded buffer.
    View {
        buffer: usize,
        range: Range<usize>,
        mime_type: &'a str,
    },
    /// External image next to the model file.
    Uri {
        uri: &'a str,
        mime_type: Option<&'a str>,
    },
    /// No texture: the base colour factor, alpha dropped.
    Flat([f32; 3]),
}

fn material_source<'a>(material: &gltf::Material<'a>) -> MaterialSource<'a> {
    let pbr = material.pbr_metallic_roughness();
    match pbr.base_color_texture() {
        Some(info) => match info.texture().source().source() {
            gltf::image::Source::View { view, mime_type } => MaterialSource::View {
                buffer: view.buffer().index(),
                range: view.offset()..view.offset() + view.length(),
                mime_type,
            },
            gltf::image::Source::Uri { uri, mime_type } => MaterialSource::Uri { uri, mime_type },
        },
        None => {
            let [r, g, b, _] = pbr.base_color_factor();
            MaterialSource::Flat([r, g, b])
        }
    }
}

/// The bytes of a buffer view, or `None` if it reaches past its buffer.
fn view_bytes(buffers: &[Vec<u8>], buffer: usize, range: Range<usize>) -> Option<&[u8]> {
    buffers.get(buffer)?.get(range)
}

async fn load_material(
    file_name: &str,
    material: &gltf::Material<'_>,
    buffer_data: &[Vec<u8>],
    ctx: &InitContext,
) -> anyhow::Result<model::Material> {
    let name = format!("{file_name}#{}", material.name().unwrap_or("material"));

    let (texture, uniform) = match material_source(material) {
        MaterialSource::View {
            buffer,
            range,
            mime_type,
        } => {
            let data = view_bytes(buffer_data, buffer, range)
                .with_context(|| format!("Image view of {name} is out of bounds"))?;
            let texture =
                Texture::from_bytes(&ctx.device, &ctx.queue, data, &name, format_hint(mime_type))?;
            (texture, MaterialUniform::textured())
        }
        MaterialSource::Uri { uri, mime_type } => {
            let data = load_uri(file_name, uri).await?;
            let hint = mime_type.and_then(format_hint).or_else(|| format_hint(uri));
            let texture = Texture::from_bytes(&ctx.device, &ctx.queue, &data, &name, hint)?;
            (texture, MaterialUniform::textured())
        }
        MaterialSource::Flat(color) => (
            Texture::create_placeholder([255; 4], &name, &ctx.device, &ctx.queue),
            MaterialUniform::flat(color),
        ),
    };

    Ok(model::Material::new(
        &ctx.device,
        &name,
        texture,
        uniform,
        &ctx.material_layout,
    ))
}

async fn load_uri(file_name: &str, uri: &str) -> anyhow::Result<Vec<u8>> {
    if uri.starts_with("data:") {
        bail!("{file_name}: embedded data URIs are not supported, use a .glb");
    }
    load_binary(&resolve_relative(file_name, uri)).await
}
