use web_sys::{HtmlElement, Window};

use camgrid_shared::ScalingState;

/// Usable viewport in CSS pixels.
pub fn measure(window: &Window) -> (f64, f64) {
    let width = window
        .document()
        .and_then(|document| document.document_element())
        .map(|root| root.client_width() as f64 - 1.0)
        .unwrap_or(0.0);
    let height = window
        .inner_height()
        .ok()
        .and_then(|value| value.as_f64())
        .unwrap_or(0.0);
    (width, height)
}

/// Applies the fit to the container element. This is the sole mutation of
/// on-screen geometry, and it is idempotent.
pub fn apply(container: &HtmlElement, scaling: &ScalingState) {
    let style = container.style();
    let _ = style.set_property("position", "absolute");
    let _ = style.set_property("transform-origin", "0 0");
    let _ = style.set_property("transform", &format!("scale({})", scaling.scale_factor));
    let _ = style.set_property("left", &format!("{}px", scaling.left_offset));
    let _ = style.set_property("top", &format!("{}px", scaling.top_offset));
}
