//! The gallery scene.
//!
//! The room is on screen from the first frame, with a white placeholder
//! floor. The floor texture and the picture frame are swapped in when their
//! loads resolve: in the background on the web, right after the first frame
//! natively. A failed load is logged and the scene keeps rendering without it.

use std::pin::Pin;

use instant::Duration;
use winit::event::WindowEvent;

use crate::{
    config::GalleryConfig,
    context::{Context, InitContext},
    data_structures::{
        model::{Material, MaterialUniform, Model},
        room::Room,
    },
    flow::{self, FlowConstructor, GraphicsFlow, Out},
    render::Render,
    resources::{load_model_gltf, texture::load_texture},
};

/// Results of the background loads started in `on_init`.
pub enum GalleryEvent {
    FloorMaterial(anyhow::Result<Material>),
    Frame(anyhow::Result<Model>),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AssetState {
    #[default]
    Loading,
    Ready,
    Failed,
}

impl AssetState {
    fn of<T>(result: &anyhow::Result<T>) -> Self {
        match result {
            Ok(_) => Self::Ready,
            Err(_) => Self::Failed,
        }
    }
}

/// Load progress of the two external assets, shared by the app as flow state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadStatus {
    pub floor_texture: AssetState,
    pub frame: AssetState,
}

impl LoadStatus {
    /// No load is pending any more, whether it succeeded or not.
    pub fn is_settled(&self) -> bool {
        self.floor_texture != AssetState::Loading && self.frame != AssetState::Loading
    }

    pub fn is_complete(&self) -> bool {
        self.floor_texture == AssetState::Ready && self.frame == AssetState::Ready
    }

    fn record(&mut self, event: &GalleryEvent) {
        match event {
            GalleryEvent::FloorMaterial(result) => self.floor_texture = AssetState::of(result),
            GalleryEvent::Frame(result) => self.frame = AssetState::of(result),
        }
    }
}

pub struct Gallery {
    config: GalleryConfig,
    room: Room,
    frame: Option<Model>,
}

impl Gallery {
    pub fn new(config: GalleryConfig, ctx: &InitContext) -> Self {
        let room = Room::new(
            &ctx.device,
            &ctx.queue,
            &ctx.material_layout,
            config.object_color,
        );
        Self {
            config,
            room,
            frame: None,
        }
    }

    pub fn constructor(config: GalleryConfig) -> FlowConstructor<LoadStatus, GalleryEvent> {
        Box::new(move |ctx: InitContext| {
            let flow: Box<dyn GraphicsFlow<LoadStatus, GalleryEvent>> =
                Box::new(Gallery::new(config, &ctx));
            Box::pin(async move { flow })
                as Pin<Box<dyn Future<Output = Box<dyn GraphicsFlow<LoadStatus, GalleryEvent>>>>>
        })
    }
}

fn floor_material(path: String, ctx: InitContext) -> impl Future<Output = GalleryEvent> {
    async move {
        let result = load_texture(&path, &ctx).await.map(|texture| {
            Material::new(
                &ctx.device,
                "floor",
                texture,
                MaterialUniform::textured(),
                &ctx.material_layout,
            )
        });
        GalleryEvent::FloorMaterial(result)
    }
}

fn frame_model(
    path: String,
    default_color: [f32; 3],
    ctx: InitContext,
) -> impl Future<Output = GalleryEvent> {
    async move { GalleryEvent::Frame(load_model_gltf(&path, &ctx, default_color).await) }
}

impl GraphicsFlow<LoadStatus, GalleryEvent> for Gallery {
    fn on_init(
        &mut self,
        ctx: &mut Context,
        state: &mut LoadStatus,
    ) -> Out<LoadStatus, GalleryEvent> {
        *state = LoadStatus::default();
        ctx.clear_colour = self.config.clear_colour;
        log::info!(
            "Loading {} and {}",
            self.config.floor_texture,
            self.config.frame_model
        );
        let init_ctx = InitContext::from(&*ctx);
        let loads: Vec<Box<dyn Future<Output = GalleryEvent>>> = vec![
            Box::new(floor_material(
                self.config.floor_texture.clone(),
                init_ctx.clone(),
            )),
            Box::new(frame_model(
                self.config.frame_model.clone(),
                self.config.object_color,
                init_ctx,
            )),
        ];
        Out::FutEvent(loads)
    }

    fn on_update(
        &mut self,
        _: &Context,
        _: &mut LoadStatus,
        _: Duration,
    ) -> Out<LoadStatus, GalleryEvent> {
        Out::empty()
    }

    fn on_window_events(
        &mut self,
        _: &Context,
        _: &mut LoadStatus,
        _: &WindowEvent,
    ) -> Out<LoadStatus, GalleryEvent> {
        Out::empty()
    }

    fn on_custom_events(
        &mut self,
        _: &Context,
        state: &mut LoadStatus,
        event: GalleryEvent,
    ) -> Option<GalleryEvent> {
        state.record(&event);
        match event {
            GalleryEvent::FloorMaterial(Ok(material)) => {
                log::info!("Floor texture {} loaded", self.config.floor_texture);
                self.room.set_floor_material(material);
            }
            GalleryEvent::FloorMaterial(Err(e)) => {
                log::error!(
                    "Cannot load floor texture {}: {:#}",
                    self.config.floor_texture,
                    e
                );
            }
            GalleryEvent::Frame(Ok(model)) => {
                log::info!("Picture frame {} loaded", self.config.frame_model);
                self.frame = Some(model);
            }
            GalleryEvent::Frame(Err(e)) => {
                log::error!(
                    "Cannot load picture frame {}: {:#}",
                    self.config.frame_model,
                    e
                );
            }
        }
        if state.is_settled() {
            if state.is_complete() {
                log::info!("Gallery fully loaded");
            } else {
                log::warn!("Gallery loaded with missing assets: {:?}", state);
            }
        }
        None
    }

    fn on_render(&self) -> Render<'_> {
        Render::Composed(vec![
            Render::from(&self.room.floor),
            Render::from(&self.room.walls),
            self.frame.as_ref().into(),
        ])
    }
}

/// Opens the window (or binds the canvas) and renders the gallery.
pub fn run(config: GalleryConfig) -> anyhow::Result<()> {
    let constructor = Gallery::constructor(config.clone());
    flow::run(config, vec![constructor])
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use super::*;

    #[test]
    fn starts_loading() {
        let status = LoadStatus::default();
        assert_eq!(status.floor_texture, AssetState::Loading);
        assert_eq!(status.frame, AssetState::Loading);
        assert!(!status.is_settled());
        assert!(!status.is_complete());
    }

    #[test]
    fn failed_load_settles_without_completing() {
        let mut status = LoadStatus::default();
        status.record(&GalleryEvent::FloorMaterial(Err(anyhow!("404"))));
        assert_eq!(status.floor_texture, AssetState::Failed);
        assert!(!status.is_settled());

        status.record(&GalleryEvent::Frame(Err(anyhow!("bad glb"))));
        assert!(status.is_settled());
        assert!(!status.is_complete());
    }

    #[test]
    fn settled_and_complete() {
        let status = LoadStatus {
            floor_texture: AssetState::Ready,
            frame: AssetState::Ready,
        };
        assert!(status.is_settled());
        assert!(status.is_complete());
    }
}
