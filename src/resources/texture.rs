use anyhow::Context as _;

use crate::{context::InitContext, data_structures::texture};

#[cfg(target_arch = "wasm32")]
fn format_url(file_name: &str) -> anyhow::Result<reqwest::Url> {
    let window = web_sys::window().context("No browser window")?;
    let href = window
        .location()
        .href()
        .map_err(|e| anyhow::anyhow!("Cannot read page location: {e:?}"))?;
    // Relative to the page, like a plain `<img src>` would be.
    let base = reqwest::Url::parse(&href)?;
    Ok(base.join(file_name)?)
}

/// Reads an asset: `./assets/<file_name>` natively, relative to the page URL on the web.
pub async fn load_binary(file_name: &str) -> anyhow::Result<Vec<u8>> {
    #[cfg(target_arch = "wasm32")]
    let data = {
        let url = format_url(file_name)?;
        let response = reqwest::get(url).await?.error_for_status()?;
        response.bytes().await?.to_vec()
    };
    #[cfg(not(target_arch = "wasm32"))]
    let data = {
        let path = std::path::Path::new("./").join("assets").join(file_name);
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("Cannot read {}", path.display()))?
    };

    Ok(data)
}

/// Resolves `uri` against the directory of `base_file`, the way glTF
/// resolves external buffers and images.
pub fn resolve_relative(base_file: &str, uri: &str) -> String {
    match base_file.rfind('/') {
        Some(idx) => format!("{}/{}", &base_file[..idx], uri),
        None => uri.to_string(),
    }
}

/// Extension hint for the image decoder, taken from a file name or a mime type.
pub fn format_hint(name: &str) -> Option<&str> {
    name.rsplit(['.', '/'])
        .next()
        .filter(|hint| !hint.is_empty() && *hint != name)
}

pub async fn load_texture(file_name: &str, ctx: &InitContext) -> anyhow::Result<texture::Texture> {
    let data = load_binary(file_name).await?;
    texture::Texture::from_bytes(
        &ctx.device,
        &ctx.queue,
        &data,
        file_name,
        format_hint(file_name),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_next_to_the_model() {
        assert_eq!(
            resolve_relative("models/picture_frame.gltf", "frame.bin"),
            "models/frame.bin"
        );
        assert_eq!(resolve_relative("frame.gltf", "frame.bin"), "frame.bin");
        assert_eq!(
            resolve_relative("a/b/frame.gltf", "textures/wood.png"),
            "a/b/textures/wood.png"
        );
    }

    #[test]
    fn format_hints() {
        assert_eq!(format_hint("imgs/wood-floor.jpg"), Some("jpg"));
        assert_eq!(format_hint("image/png"), Some("png"));
        assert_eq!(format_hint("noextension"), None);
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[tokio::test]
    async fn missing_assets_name_their_path() {
        let err = load_binary("imgs/does-not-exist.jpg").await.unwrap_err();
        assert!(
            err.to_string().contains("assets/imgs/does-not-exist.jpg"),
            "{err}"
        );
    }
}
