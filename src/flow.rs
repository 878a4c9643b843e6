//! Flow control and application event loop.
//!
//! A "flow" is a self-contained scene that handles window input, updates
//! itself every frame and tells the app what to draw. The app owns the GPU
//! [`Context`], drives the orbit camera and forwards events to every flow.
//!
//! # User-facing types
//!
//! - [`GraphicsFlow<S, E>`] is the trait for scenes that handle events and rendering
//! - [`Out<S, E>`] is the output type for async work started by a hook
//!
//! # Lifecycle Flow
//!
//! The event loop follows this pattern each frame:
//! 1. Collect window events and hand them to `on_window_events`
//! 2. Render every flow's `on_render()` output with the scene pipeline
//! 3. Present the frame
//! 4. Advance the camera by the frame time and upload its uniform
//! 5. Call `on_update` on every flow
//!
//! Futures returned through [`Out::FutEvent`] resolve into custom events
//! that are delivered to `on_custom_events` whenever they complete. Natively
//! they are driven on the app's tokio runtime; the ones returned from
//! `on_init` wait until the first frame has been presented.

use std::{fmt::Debug, iter, marker::PhantomData, pin::Pin, sync::Arc};

use instant::{Duration, Instant};

use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::Window,
};

use crate::{
    config::GalleryConfig,
    context::{Context, InitContext},
    data_structures::model::DrawModel,
    render::Render,
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

///
/// This is the Output Type for every lifecycle hook where the user can pass async events that are
/// handled according to the platform you're running on.
///
/// `Out::FutEvent` can be used to resolve futures into Events that are put in the Event Queue after
/// being resolved. Each event is delivered on its own, in completion order.
///
/// `Empty` is the default output used when no eventing/futures need to be handled.
///
pub enum Out<S, E> {
    FutEvent(Vec<Box<dyn Future<Output = E>>>),
    Empty(PhantomData<fn(&mut S)>),
}

impl<S, E> Out<S, E> {
    pub fn empty() -> Self {
        Self::Empty(PhantomData)
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Out::FutEvent(futures) => futures.is_empty(),
            Out::Empty(_) => true,
        }
    }
}

impl<S, E> Default for Out<S, E> {
    fn default() -> Self {
        Self::empty()
    }
}

/// Trait for implementing a renderable scene.
///
/// # Lifecycle
///
/// 1. `on_init()` is called once when the flow is created; configure the context here
/// 2. `on_window_events()` is called for each winit window event
/// 3. `on_update()` is called every frame
/// 4. `on_custom_events()` is called when a future from `Out::FutEvent` resolves
/// 5. `on_render()` is called each frame and specifies how to render `self`
///
pub trait GraphicsFlow<S, E> {
    /// Initialize the flow and configure the context.
    ///
    /// This is the only place to modify the Context, e.g. the background colour.
    fn on_init(&mut self, ctx: &mut Context, state: &mut S) -> Out<S, E>;

    /// Update state every frame with the elapsed time `dt`.
    fn on_update(&mut self, ctx: &Context, state: &mut S, dt: Duration) -> Out<S, E>;

    /// Handle window events (keyboard, mouse, window resizing, etc.).
    fn on_window_events(&mut self, ctx: &Context, state: &mut S, event: &WindowEvent) -> Out<S, E>;

    /// Handle custom application events.
    ///
    /// Returns the event if it was not consumed, allowing it to be passed to
    /// the next flow. Returning `None` means the event was consumed.
    fn on_custom_events(&mut self, ctx: &Context, state: &mut S, event: E) -> Option<E>;

    /// Return renderable objects for this flow, in draw order.
    fn on_render(&self) -> Render<'_>;
}

// Dummy impl to make wasm work
impl<State, Event> Debug for dyn GraphicsFlow<State, Event> + 'static {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("GraphicsFlow")
    }
}

/// Type alias for a flow constructor (factory function).
///
/// A flow constructor takes an `InitContext` and asynchronously returns a
/// boxed `GraphicsFlow`. This allows lazy initialization and resource loading.
pub type FlowConstructor<S, E> =
    Box<dyn FnOnce(InitContext) -> Pin<Box<dyn Future<Output = Box<dyn GraphicsFlow<S, E>>>>>>;

/// Application state bundle: GPU context, app state, and surface status.
#[derive(Debug)]
pub struct AppState<State: 'static> {
    pub(crate) ctx: Context,
    state: State,
    is_surface_configured: bool,
}

impl<State: Default> AppState<State> {
    async fn new(window: Arc<Window>, config: &GalleryConfig) -> anyhow::Result<Self> {
        let ctx = Context::new(window, config).await?;
        Ok(Self {
            ctx,
            state: State::default(),
            is_surface_configured: false,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.ctx.resize(width, height);
            self.is_surface_configured = true;
        }
    }

    fn render<Event>(
        &mut self,
        graphics_flows: &[Box<dyn GraphicsFlow<State, Event>>],
    ) -> Result<(), wgpu::SurfaceError> {
        // invoke main render loop
        self.ctx.window.request_redraw();

        // Rendering requires the surface to be configured
        if !self.is_surface_configured {
            return Ok(());
        }

        let output = self.ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.ctx.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.ctx.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            let mut models = Vec::new();
            graphics_flows
                .iter()
                .for_each(|flow| flow.on_render().collect(&mut models));

            render_pass.set_pipeline(&self.ctx.pipeline);
            for model in models {
                render_pass.draw_model(
                    model,
                    &self.ctx.camera.bind_group,
                    &self.ctx.light.bind_group,
                );
            }
        }

        self.ctx.queue.submit(iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

pub struct App<State: 'static, Event: 'static> {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    proxy: winit::event_loop::EventLoopProxy<FlowEvent<State, Event>>,
    config: GalleryConfig,
    state: Option<AppState<State>>,
    // This will hold the fully initialized flows once they are ready.
    graphics_flows: Vec<Box<dyn GraphicsFlow<State, Event>>>,
    // This holds the constructors at the start.
    // We use Option to `take()` it after use.
    constructors: Option<Vec<FlowConstructor<State, Event>>>,
    // Native loads from `on_init` run after the first frame is on screen.
    #[cfg(not(target_arch = "wasm32"))]
    deferred: Vec<Out<State, Event>>,
    clock: FrameClock,
}

impl<State, Event> App<State, Event>
where
    State: 'static,
    Event: 'static,
{
    fn new(
        event_loop: &EventLoop<FlowEvent<State, Event>>,
        config: GalleryConfig,
        constructors: Vec<FlowConstructor<State, Event>>,
    ) -> anyhow::Result<Self> {
        let proxy = event_loop.create_proxy();
        #[cfg(not(target_arch = "wasm32"))]
        let async_runtime = tokio::runtime::Runtime::new()?;
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            proxy,
            config,
            state: None,
            graphics_flows: Vec::new(),
            constructors: Some(constructors),
            #[cfg(not(target_arch = "wasm32"))]
            deferred: Vec::new(),
            clock: FrameClock::new(),
        })
    }
}

pub enum FlowEvent<State: 'static, Event: 'static> {
    Initialized {
        state: AppState<State>,
        flows: Vec<Box<dyn GraphicsFlow<State, Event>>>,
    },
    Custom(Event),
    Exit,
}

/// Measures the time between redraws.
#[derive(Debug)]
struct FrameClock {
    last: Instant,
}

impl FrameClock {
    fn new() -> Self {
        Self {
            last: Instant::now(),
        }
    }

    /// Time since the previous tick or reset.
    fn tick(&mut self) -> Duration {
        let now = Instant::now();
        let dt = now - self.last;
        self.last = now;
        dt
    }

    /// Drops time spent outside the frame loop (setup, blocking loads).
    fn reset(&mut self) {
        self.last = Instant::now();
    }
}

impl<State, Event> Debug for FlowEvent<State, Event> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialized { state: _, flows } => {
                f.debug_struct("Initialized").field("flows", flows).finish()
            }
            Self::Custom(_) => f.write_str("Custom(E)"),
            Self::Exit => f.write_str("Exit"),
        }
    }
}

impl<State: 'static + Default, Event: 'static> App<State, Event> {
    /// Runs `on_init` on every flow and starts their async work.
    fn init_flows(&mut self) {
        let Some(app_state) = self.state.as_mut() else {
            return;
        };
        let size = app_state.ctx.window.inner_size();
        app_state.resize(size.width, size.height);
        for flow in self.graphics_flows.iter_mut() {
            let events = flow.on_init(&mut app_state.ctx, &mut app_state.state);
            #[cfg(not(target_arch = "wasm32"))]
            self.deferred.push(events);
            #[cfg(target_arch = "wasm32")]
            handle_flow_output(self.proxy.clone(), events);
        }
        app_state.ctx.window.request_redraw();
        self.clock.reset();
    }
}

impl<State: 'static + Default, Event: 'static> ApplicationHandler<FlowEvent<State, Event>>
    for App<State, Event>
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let Some(constructors) = self.constructors.take() else {
            // Already initialized (or initializing) on an earlier resume.
            return;
        };

        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title("gallery");

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            let window = wgpu::web_sys::window().unwrap_throw();
            let document = window.document().unwrap_throw();
            let canvas = match document.get_element_by_id(&self.config.canvas_id) {
                Some(canvas) => canvas,
                None => {
                    log::error!("No canvas with id {} on the page", self.config.canvas_id);
                    event_loop.exit();
                    return;
                }
            };
            let html_canvas_element = canvas.unchecked_into();
            window_attributes = window_attributes.with_canvas(Some(html_canvas_element));

            // Fill the browser window
            if let Some(size) = browser_viewport(&window) {
                window_attributes = window_attributes.with_inner_size(size);
            }
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Cannot create a window: {}", e);
                event_loop.exit();
                return;
            }
        };

        #[cfg(target_arch = "wasm32")]
        follow_browser_resizes(window.clone());

        let config = self.config.clone();
        let init_future = async move {
            let app_state = AppState::new(window, &config).await?;

            let flow_futures: Vec<_> = constructors
                .into_iter()
                // The clone in into() leverages the internal Arcs of Device and Queue and thus only clones the ref
                .map(|constructor| constructor((&app_state.ctx).into()))
                .collect();
            let flows: Vec<_> = futures::future::join_all(flow_futures).await;
            anyhow::Ok((app_state, flows))
        };

        #[cfg(not(target_arch = "wasm32"))]
        {
            match self.async_runtime.block_on(init_future) {
                Ok((app_state, flows)) => {
                    self.state = Some(app_state);
                    self.graphics_flows = flows;
                    self.init_flows();
                }
                Err(e) => {
                    log::error!("App initialization failed: {:#}", e);
                    event_loop.exit();
                }
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let event = match init_future.await {
                    Ok((state, flows)) => FlowEvent::Initialized { state, flows },
                    Err(e) => {
                        log::error!("App initialization failed: {:#}", e);
                        FlowEvent::Exit
                    }
                };
                if proxy.send_event(event).is_err() {
                    log::error!("Event loop closed before initialization finished");
                }
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: FlowEvent<State, Event>) {
        match event {
            FlowEvent::Initialized { state, flows } => {
                // This is the message from our wasm `spawn_local`
                self.state = Some(state);
                self.graphics_flows = flows;
                self.init_flows();
            }
            FlowEvent::Custom(custom_event) => {
                if let Some(state) = &mut self.state {
                    let result = self
                        .graphics_flows
                        .iter_mut()
                        .fold(Some(custom_event), |event, flow| {
                            flow.on_custom_events(&state.ctx, &mut state.state, event?)
                        });
                    if result.is_some() {
                        log::warn!("Warning! Custom event was not consumed this cycle");
                    }
                }
            }
            FlowEvent::Exit => {
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };

        self.graphics_flows.iter_mut().for_each(|f| {
            let events = f.on_window_events(&state.ctx, &mut state.state, &event);
            handle_flow_output(
                #[cfg(not(target_arch = "wasm32"))]
                &self.async_runtime,
                self.proxy.clone(),
                events,
            );
        });

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => state.resize(size.width, size.height),
            WindowEvent::RedrawRequested => {
                let dt = self.clock.tick();

                match state.render(&self.graphics_flows) {
                    Ok(_) => {
                        // Update the camera
                        state.ctx.camera.camera.update(dt);
                        state
                            .ctx
                            .camera
                            .write_to_buffer(&state.ctx.queue, &state.ctx.projection);
                        // Update custom stuff
                        self.graphics_flows.iter_mut().for_each(|f| {
                            let events = f.on_update(&state.ctx, &mut state.state, dt);
                            handle_flow_output(
                                #[cfg(not(target_arch = "wasm32"))]
                                &self.async_runtime,
                                self.proxy.clone(),
                                events,
                            );
                        });
                        #[cfg(not(target_arch = "wasm32"))]
                        if !self.deferred.is_empty() {
                            for events in self.deferred.drain(..) {
                                handle_flow_output(
                                    &self.async_runtime,
                                    self.proxy.clone(),
                                    events,
                                );
                            }
                            self.clock.reset();
                        }
                    }
                    // Reconfigure the surface if it's lost or outdated
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let size = state.ctx.window.inner_size();
                        state.resize(size.width, size.height);
                    }
                    Err(e) => {
                        log::error!("Unable to render {}", e);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Logical size of the browser viewport, if the browser reports a usable one.
#[cfg_attr(not(target_arch = "wasm32"), allow(dead_code))]
fn viewport_size(width: Option<f64>, height: Option<f64>) -> Option<LogicalSize<f64>> {
    match (width, height) {
        (Some(width), Some(height)) if width > 0.0 && height > 0.0 => {
            Some(LogicalSize::new(width, height))
        }
        _ => None,
    }
}

#[cfg(target_arch = "wasm32")]
fn browser_viewport(window: &web_sys::Window) -> Option<LogicalSize<f64>> {
    viewport_size(
        window.inner_width().ok().and_then(|w| w.as_f64()),
        window.inner_height().ok().and_then(|h| h.as_f64()),
    )
}

/// Resizes the canvas with the browser window. winit then reports
/// `WindowEvent::Resized` and the surface follows.
#[cfg(target_arch = "wasm32")]
fn follow_browser_resizes(window: Arc<Window>) {
    let Some(browser) = web_sys::window() else {
        return;
    };
    let on_resize = Closure::<dyn FnMut()>::new(move || {
        if let Some(size) = web_sys::window().as_ref().and_then(browser_viewport) {
            let _ = window.request_inner_size(size);
        }
    });
    if let Err(e) =
        browser.add_event_listener_with_callback("resize", on_resize.as_ref().unchecked_ref())
    {
        log::error!("Cannot listen for browser resizes: {:?}", e);
    }
    // The listener lives as long as the page.
    on_resize.forget();
}

fn handle_flow_output<State, Event>(
    #[cfg(not(target_arch = "wasm32"))] async_runtime: &tokio::runtime::Runtime,
    proxy: winit::event_loop::EventLoopProxy<FlowEvent<State, Event>>,
    out: Out<State, Event>,
) {
    match out {
        // Send the events passed by the user to winit
        Out::FutEvent(futures) => {
            #[cfg(not(target_arch = "wasm32"))]
            {
                for fut in futures {
                    let event = async_runtime.block_on(Pin::from(fut));
                    if let Err(err) = proxy.send_event(FlowEvent::Custom(event)) {
                        log::error!("Event loop was closed before all events could be processed: {}", err);
                    }
                }
            }

            #[cfg(target_arch = "wasm32")]
            {
                // One task per future so that each result is delivered as soon as it is ready.
                for fut in futures {
                    let proxy = proxy.clone();
                    wasm_bindgen_futures::spawn_local(async move {
                        let event = Pin::from(fut).await;
                        if proxy.send_event(FlowEvent::Custom(event)).is_err() {
                            log::error!("Event loop was closed before all events could be processed");
                        }
                    });
                }
            }
        }
        Out::Empty(_) => (),
    }
}

/// Runs the given flows until the window is closed.
pub fn run<State: 'static + Default, Event: 'static>(
    config: GalleryConfig,
    constructors: Vec<FlowConstructor<State, Event>>,
) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            eprintln!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        if console_log::init_with_level(log::Level::Info).is_err() {
            log::warn!("Logger was already initialized");
        }
    }

    let event_loop: EventLoop<FlowEvent<State, Event>> = EventLoop::with_user_event().build()?;

    let mut app: App<State, Event> = App::new(&event_loop, config, constructors)?;

    event_loop.run_app(&mut app)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_measures_time_between_ticks() {
        let mut clock = FrameClock::new();
        std::thread::sleep(Duration::from_millis(20));
        assert!(clock.tick() >= Duration::from_millis(20));
    }

    #[test]
    fn clock_reset_drops_setup_time() {
        let mut clock = FrameClock::new();
        std::thread::sleep(Duration::from_millis(50));
        clock.reset();
        assert!(clock.tick() < Duration::from_millis(50));
    }

    #[test]
    fn viewport_needs_a_positive_size() {
        assert_eq!(
            viewport_size(Some(1280.0), Some(720.0)),
            Some(LogicalSize::new(1280.0, 720.0))
        );
        assert_eq!(viewport_size(Some(0.0), Some(720.0)), None);
        assert_eq!(viewport_size(None, Some(720.0)), None);
    }

    #[test]
    fn out_defaults_to_empty() {
        let out: Out<(), ()> = Out::default();
        assert!(out.is_empty());
        let futures: Vec<Box<dyn Future<Output = u8>>> = vec![Box::new(async { 1u8 })];
        let out: Out<(), u8> = Out::FutEvent(futures);
        assert!(!out.is_empty());
    }
}
