use anyhow::*;
use fs_extra::copy_items;
use fs_extra::dir::CopyOptions;
use std::env;
use std::path::PathBuf;

/// Assets the gallery requests at startup, relative to `assets/`.
const SCENE_ASSETS: [&str; 2] = ["imgs/wood-floor.jpg", "models/picture_frame.glb"];

fn main() -> Result<()> {
    println!("cargo:rerun-if-changed=assets");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let assets_src = manifest_dir.join("assets");
    if !assets_src.exists() {
        println!("cargo:warning=no assets/ directory, the gallery will render without floor texture and frame");
        return Ok(());
    }

    for asset in SCENE_ASSETS {
        if !assets_src.join(asset).exists() {
            println!("cargo:warning=missing assets/{asset}");
        }
    }

    // Keep a copy next to the build output for packaging the web build.
    let out_dir = env::var("OUT_DIR")?;
    let mut copy_options = CopyOptions::new();
    copy_options.overwrite = true;
    copy_items(&[assets_src], out_dir, &copy_options)?;

    Ok(())
}
