use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{HtmlCanvasElement, PointerEvent};

use camgrid_shared::ScalingState;

/// Revocable pointer-handler registration for mask editing. Entering edit
/// mode attaches exactly these three listeners; dropping the handle
/// detaches them, so repeated toggles cannot leak.
pub struct PointerHandlers {
    target: HtmlCanvasElement,
    down: Closure<dyn FnMut(PointerEvent)>,
    moved: Closure<dyn FnMut(PointerEvent)>,
    up: Closure<dyn FnMut(PointerEvent)>,
}

impl PointerHandlers {
    pub fn attach(
        target: &HtmlCanvasElement,
        down: Closure<dyn FnMut(PointerEvent)>,
        moved: Closure<dyn FnMut(PointerEvent)>,
        up: Closure<dyn FnMut(PointerEvent)>,
    ) -> Result<Self, JsValue> {
        target.add_event_listener_with_callback("pointerdown", down.as_ref().unchecked_ref())?;
        target.add_event_listener_with_callback("pointermove", moved.as_ref().unchecked_ref())?;
        target.add_event_listener_with_callback("pointerup", up.as_ref().unchecked_ref())?;
        Ok(Self {
            target: target.clone(),
            down,
            moved,
            up,
        })
    }

    fn detach(&self) {
        let _ = self
            .target
            .remove_event_listener_with_callback("pointerdown", self.down.as_ref().unchecked_ref());
        let _ = self
            .target
            .remove_event_listener_with_callback("pointermove", self.moved.as_ref().unchecked_ref());
        let _ = self
            .target
            .remove_event_listener_with_callback("pointerup", self.up.as_ref().unchecked_ref());
    }
}

impl Drop for PointerHandlers {
    fn drop(&mut self) {
        self.detach();
    }
}

/// Pointer position in canvas space, with the active scale divided out.
/// Rendering and this inverse mapping must share one scaling snapshot per
/// click cycle.
pub fn pointer_to_canvas(
    canvas: &HtmlCanvasElement,
    event: &PointerEvent,
    scaling: &ScalingState,
) -> Option<(f64, f64)> {
    let rect = canvas.get_bounding_client_rect();
    if rect.width() <= 0.0 || rect.height() <= 0.0 {
        return None;
    }
    Some(scaling.to_canvas(
        event.client_x() as f64,
        event.client_y() as f64,
        rect.left(),
        rect.top(),
    ))
}
