use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, Document, HtmlCanvasElement};

use camgrid_shared::{CoordinateCache, MotionMask};

const DETECTION_STROKE: &str = "red";
const MASK_STROKE: &str = "gray";
const MASK_FILL: &str = "rgba(0, 0, 0, 0.7)";

/// The motion canvas stacked over the video canvas. Detection and mask
/// highlights both draw here; it is cleared once per video frame tick,
/// right before the decode call.
pub struct OverlaySurface {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
}

impl OverlaySurface {
    pub fn create(document: &Document, width: u32, height: u32) -> Result<Self, JsValue> {
        let canvas: HtmlCanvasElement = document
            .create_element("canvas")?
            .dyn_into()
            .map_err(|_| JsValue::from_str("overlay element is not a canvas"))?;
        canvas.set_width(width);
        canvas.set_height(height);
        let style = canvas.style();
        let _ = style.set_property("position", "absolute");
        let _ = style.set_property("left", "0px");
        let _ = style.set_property("top", "0px");
        let ctx = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("missing 2d context"))?
            .dyn_into::<CanvasRenderingContext2d>()?;
        Ok(Self { canvas, ctx })
    }

    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }

    pub fn resize(&self, width: u32, height: u32) {
        self.canvas.set_width(width);
        self.canvas.set_height(height);
    }

    pub fn clear(&self) {
        self.ctx.clear_rect(
            0.0,
            0.0,
            self.canvas.width() as f64,
            self.canvas.height() as f64,
        );
    }

    /// Runs before each decode call so highlights never trail the frame
    /// they annotate: clear, then repaint the mask cue if editing.
    pub fn begin_frame(&self, mask: &MotionMask, cache: Option<&CoordinateCache>, editing: bool) {
        self.clear();
        if editing {
            if let Some(cache) = cache {
                self.paint_mask(mask, cache);
            }
        }
    }

    /// Transient detection highlights for the current tick.
    pub fn paint_detections(&self, cache: &CoordinateCache, flagged: &[usize]) {
        let block = cache.descriptor().block_size as f64;
        for &index in flagged {
            if let Some((x, y)) = cache.index_to_coord(index) {
                self.stroke_block(x as f64, y as f64, block);
            }
        }
    }

    /// Inverse cue while editing: unmasked (active) blocks get the
    /// translucent fill, masked-off blocks stay clear.
    pub fn paint_mask(&self, mask: &MotionMask, cache: &CoordinateCache) {
        let block = cache.descriptor().block_size as f64;
        for (index, flag) in mask.iter() {
            if flag != 0 {
                continue;
            }
            if let Some((x, y)) = cache.index_to_coord(index) {
                self.fill_block(x as f64, y as f64, block);
            }
        }
    }

    fn stroke_block(&self, x: f64, y: f64, size: f64) {
        self.ctx.begin_path();
        self.ctx.rect(x, y, size, size);
        self.ctx.set_stroke_style_str(DETECTION_STROKE);
        self.ctx.stroke();
    }

    fn fill_block(&self, x: f64, y: f64, size: f64) {
        self.ctx.begin_path();
        self.ctx.rect(x, y, size, size);
        self.ctx.set_stroke_style_str(MASK_STROKE);
        self.ctx.set_fill_style_str(MASK_FILL);
        self.ctx.fill();
        self.ctx.stroke();
    }
}
