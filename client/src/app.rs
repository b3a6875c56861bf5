use std::cell::{Cell, RefCell};
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Document, HtmlElement, PointerEvent, Window};

use camgrid_shared::{ChannelState, Command, GridDescriptor, MotionEffect, SessionCore, VideoEffect};

use crate::channel::{self, ChannelEvent, ChannelHandle};
use crate::decoder::DecoderAdapter;
use crate::editor::{pointer_to_canvas, PointerHandlers};
use crate::net::{channel_url, MOTION_PATH, VIDEO_PATH};
use crate::overlay::OverlaySurface;
use crate::viewport;

/// Default layout inset in CSS pixels; the embedder can override it with
/// `set_top_offset`.
const DEFAULT_TOP_OFFSET: f64 = 32.0;

fn debug_enabled(window: &Window) -> bool {
    let search = window.location().search().ok().unwrap_or_default();
    search.contains("debug=1") || search.contains("debug=true")
}

type SharedChannel = Rc<RefCell<Option<Rc<ChannelHandle>>>>;
type SharedSurface = Rc<RefCell<Option<OverlaySurface>>>;

/// One surveillance-viewer session: two independently connected channels,
/// a decoder, and the motion overlay, bound to one container element.
/// Everything is per-instance; multiple viewers can share a page.
#[wasm_bindgen]
pub struct Viewer {
    window: Window,
    document: Document,
    container: HtmlElement,
    ws_address: String,
    decoder: Rc<DecoderAdapter>,
    session: Rc<RefCell<SessionCore>>,
    surface: SharedSurface,
    video: SharedChannel,
    motion: SharedChannel,
    editor: Rc<RefCell<Option<PointerHandlers>>>,
    top_offset: Rc<Cell<f64>>,
    debug: bool,
}

#[wasm_bindgen]
impl Viewer {
    #[wasm_bindgen(constructor)]
    pub fn new(container_id: &str, ws_address: &str) -> Result<Viewer, JsValue> {
        console_error_panic_hook::set_once();

        let window = web_sys::window().ok_or_else(|| JsValue::from_str("Missing window"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("Missing document"))?;
        let container: HtmlElement = document
            .get_element_by_id(container_id)
            .ok_or_else(|| JsValue::from_str(&format!("Missing element: {container_id}")))?
            .dyn_into()
            .map_err(|_| JsValue::from_str(&format!("Invalid element type: {container_id}")))?;

        let debug = debug_enabled(&window);
        let decoder = Rc::new(DecoderAdapter::new()?);
        if debug {
            let pictures = Cell::new(0u64);
            decoder.on_picture_decoded(move || {
                let count = pictures.get() + 1;
                pictures.set(count);
                if count % 100 == 0 {
                    web_sys::console::log_1(&format!("decoded pictures={count}").into());
                }
            });
        }

        let viewer = Viewer {
            window: window.clone(),
            document,
            container,
            ws_address: ws_address.to_string(),
            decoder,
            session: Rc::new(RefCell::new(SessionCore::new())),
            surface: Rc::new(RefCell::new(None)),
            video: Rc::new(RefCell::new(None)),
            motion: Rc::new(RefCell::new(None)),
            editor: Rc::new(RefCell::new(None)),
            top_offset: Rc::new(Cell::new(DEFAULT_TOP_OFFSET)),
            debug,
        };

        {
            let session = viewer.session.clone();
            let container = viewer.container.clone();
            let window_cb = window.clone();
            let top_offset = viewer.top_offset.clone();
            let onresize = Closure::<dyn FnMut()>::new(move || {
                let (viewport_w, viewport_h) = viewport::measure(&window_cb);
                let scaling =
                    session
                        .borrow_mut()
                        .rescale(viewport_w, viewport_h, top_offset.get());
                viewport::apply(&container, &scaling);
            });
            window.add_event_listener_with_callback("resize", onresize.as_ref().unchecked_ref())?;
            onresize.forget();
        }

        Ok(viewer)
    }

    /// Opens both channels. Idempotent; a channel that has closed stays
    /// closed for the life of the session.
    pub fn start(&self) -> Result<(), JsValue> {
        self.connect_video()?;
        self.connect_motion()?;
        Ok(())
    }

    /// Closes both channels. Terminal.
    pub fn stop(&self) {
        if let Some(handle) = self.video.borrow().as_ref() {
            handle.close();
        }
        if let Some(handle) = self.motion.borrow().as_ref() {
            handle.close();
        }
    }

    /// Frames decoded so far.
    pub fn tick(&self) -> u32 {
        self.session.borrow().frame_counter() as u32
    }

    /// Switches the camera between day and night exposure.
    pub fn set_mode(&self, mode: &str) -> Result<(), JsValue> {
        let command = match mode.to_ascii_lowercase().as_str() {
            "day" => Command::ModeDay,
            "night" => Command::ModeNight,
            other => return Err(JsValue::from_str(&format!("unknown camera mode: {other}"))),
        };
        self.send_video(command);
        Ok(())
    }

    pub fn start_record(&self) {
        self.send_video(Command::StartRecord);
    }

    pub fn stop_record(&self) {
        self.send_video(Command::StopRecord);
    }

    /// Layout inset below which the video is anchored.
    pub fn set_top_offset(&self, offset: f64) {
        self.top_offset.set(offset);
        let (viewport_w, viewport_h) = viewport::measure(&self.window);
        let scaling = self
            .session
            .borrow_mut()
            .rescale(viewport_w, viewport_h, offset);
        viewport::apply(&self.container, &scaling);
    }

    /// Toggles mask-edit mode; returns whether it is now active. Entry is
    /// refused (returns false) until the first stream-init has arrived.
    pub fn toggle_mask_edit(&self) -> bool {
        let active = self.session.borrow_mut().toggle_edit();
        if active {
            if self.editor.borrow().is_none() {
                match self.attach_editor() {
                    Ok(handlers) => *self.editor.borrow_mut() = Some(handlers),
                    Err(error) => {
                        web_sys::console::error_1(&error);
                        self.session.borrow_mut().toggle_edit();
                        return false;
                    }
                }
            }
        } else {
            // Dropping the handle detaches the listeners.
            self.editor.borrow_mut().take();
        }
        active
    }

    pub fn video_state(&self) -> String {
        self.session.borrow().video_state.as_str().to_string()
    }

    pub fn motion_state(&self) -> String {
        self.session.borrow().motion_state.as_str().to_string()
    }
}

impl Viewer {
    fn send_video(&self, command: Command) {
        if let Some(handle) = self.video.borrow().as_ref() {
            handle.send_token(command.token());
        }
    }

    fn connect_video(&self) -> Result<(), JsValue> {
        if self.video.borrow().is_some() {
            return Ok(());
        }

        let session = self.session.clone();
        let surface = self.surface.clone();
        let decoder = self.decoder.clone();
        let document = self.document.clone();
        let window = self.window.clone();
        let container = self.container.clone();
        let top_offset = self.top_offset.clone();
        let video_slot = self.video.clone();
        let debug = self.debug;

        let url = channel_url(&self.ws_address, VIDEO_PATH);
        let handle = channel::connect(&self.window, &url, move |event| match event {
            ChannelEvent::Open => {
                session.borrow_mut().set_video_state(ChannelState::Open);
                if let Some(handle) = video_slot.borrow().as_ref() {
                    handle.send_token(Command::Start.token());
                }
            }
            ChannelEvent::Closed => {
                session.borrow_mut().set_video_state(ChannelState::Closed);
            }
            ChannelEvent::Text(text) => {
                let effect = session.borrow_mut().on_video_text(&text);
                match effect {
                    Ok(VideoEffect::Configure(grid)) => {
                        if let Err(error) = apply_stream_init(
                            &document,
                            &window,
                            &container,
                            &decoder,
                            &surface,
                            &session,
                            top_offset.get(),
                            grid,
                        ) {
                            web_sys::console::error_1(&error);
                        }
                    }
                    Ok(VideoEffect::Ignored) => {
                        web_sys::console::log_1(&format!("video control ignored: {text}").into());
                    }
                    Ok(_) => {}
                    Err(error) => {
                        web_sys::console::error_1(
                            &format!("video control parse error: {error}").into(),
                        );
                    }
                }
            }
            ChannelEvent::Binary(bytes) => {
                let effect = session.borrow_mut().on_video_binary(bytes.len());
                if effect != VideoEffect::RenderFrame {
                    return;
                }
                // Repaint the overlay before the decode call so highlights
                // stay synchronized to arrival order on this channel.
                {
                    let session = session.borrow();
                    if let Some(surface) = surface.borrow().as_ref() {
                        surface.begin_frame(
                            &session.mask,
                            session.coordinates().ok(),
                            session.edit_active,
                        );
                    }
                }
                decoder.decode(&bytes);
                if debug {
                    let ticks = session.borrow().frame_counter();
                    if ticks % 300 == 0 {
                        web_sys::console::log_1(&format!("video frames={ticks}").into());
                    }
                }
            }
        })?;

        *self.video.borrow_mut() = Some(handle);
        Ok(())
    }

    fn connect_motion(&self) -> Result<(), JsValue> {
        if self.motion.borrow().is_some() {
            return Ok(());
        }

        let session = self.session.clone();
        let surface = self.surface.clone();
        let motion_slot = self.motion.clone();

        let url = channel_url(&self.ws_address, MOTION_PATH);
        let handle = channel::connect(&self.window, &url, move |event| match event {
            ChannelEvent::Open => {
                session.borrow_mut().set_motion_state(ChannelState::Open);
                if let Some(handle) = motion_slot.borrow().as_ref() {
                    handle.send_token(Command::Start.token());
                }
            }
            ChannelEvent::Closed => {
                session.borrow_mut().set_motion_state(ChannelState::Closed);
            }
            ChannelEvent::Text(text) => {
                if let Err(error) = session.borrow_mut().on_motion_text(&text) {
                    web_sys::console::error_1(
                        &format!("motion control parse error: {error}").into(),
                    );
                }
            }
            ChannelEvent::Binary(bytes) => {
                let effect = session.borrow_mut().on_motion_binary(&bytes);
                if let MotionEffect::Detections(flagged) = effect {
                    let session = session.borrow();
                    if let (Some(surface), Ok(cache)) =
                        (surface.borrow().as_ref(), session.coordinates())
                    {
                        surface.paint_detections(cache, &flagged);
                    }
                }
            }
        })?;

        *self.motion.borrow_mut() = Some(handle);
        Ok(())
    }

    fn attach_editor(&self) -> Result<PointerHandlers, JsValue> {
        let surface = self.surface.borrow();
        let canvas = surface
            .as_ref()
            .ok_or_else(|| JsValue::from_str("overlay surface not ready"))?
            .canvas()
            .clone();

        let down = {
            let session = self.session.clone();
            let canvas = canvas.clone();
            Closure::<dyn FnMut(PointerEvent)>::new(move |event: PointerEvent| {
                let mut session = session.borrow_mut();
                if let Some((x, y)) = pointer_to_canvas(&canvas, &event, &session.scaling) {
                    session.pointer_down(x, y);
                }
            })
        };

        let moved = {
            let session = self.session.clone();
            let canvas = canvas.clone();
            Closure::<dyn FnMut(PointerEvent)>::new(move |event: PointerEvent| {
                let mut session = session.borrow_mut();
                if let Some((x, y)) = pointer_to_canvas(&canvas, &event, &session.scaling) {
                    session.pointer_move(x, y);
                }
            })
        };

        let up = {
            let session = self.session.clone();
            let canvas = canvas.clone();
            let motion = self.motion.clone();
            Closure::<dyn FnMut(PointerEvent)>::new(move |event: PointerEvent| {
                let payload = {
                    let mut session = session.borrow_mut();
                    let point = pointer_to_canvas(&canvas, &event, &session.scaling);
                    session.pointer_up(point)
                };
                if let Some(payload) = payload {
                    if let Some(handle) = motion.borrow().as_ref() {
                        handle.send_binary(&payload);
                    }
                }
            })
        };

        PointerHandlers::attach(&canvas, down, moved, up)
    }
}

/// Stream-init side effects: size both canvases, mount them, and refit the
/// viewport. Runs again on any init with new dimensions.
#[allow(clippy::too_many_arguments)]
fn apply_stream_init(
    document: &Document,
    window: &Window,
    container: &HtmlElement,
    decoder: &DecoderAdapter,
    surface: &SharedSurface,
    session: &Rc<RefCell<SessionCore>>,
    top_offset: f64,
    grid: GridDescriptor,
) -> Result<(), JsValue> {
    decoder.set_dimensions(grid.width_px, grid.height_px);
    container.append_child(&decoder.canvas())?;

    {
        let mut slot = surface.borrow_mut();
        match slot.as_ref() {
            Some(surface) => surface.resize(grid.width_px, grid.height_px),
            None => {
                let created = OverlaySurface::create(document, grid.width_px, grid.height_px)?;
                container.append_child(created.canvas())?;
                *slot = Some(created);
            }
        }
    }

    let (viewport_w, viewport_h) = viewport::measure(window);
    let scaling = session
        .borrow_mut()
        .rescale(viewport_w, viewport_h, top_offset);
    viewport::apply(container, &scaling);
    Ok(())
}
