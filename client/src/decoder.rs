use js_sys::{Object, Reflect, Uint8Array};
use wasm_bindgen::prelude::*;
use web_sys::HtmlCanvasElement;

#[wasm_bindgen]
extern "C" {
    /// Broadway's H.264 player, loaded by the embedding page. Decode work
    /// runs in its worker; decoded pictures come back on this thread in
    /// arrival order via `onPictureDecoded`.
    #[wasm_bindgen(js_name = Player)]
    type BroadwayPlayer;

    #[wasm_bindgen(constructor, js_class = "Player")]
    fn new(options: &JsValue) -> BroadwayPlayer;

    #[wasm_bindgen(method)]
    fn decode(this: &BroadwayPlayer, data: &Uint8Array);

    #[wasm_bindgen(method, getter)]
    fn canvas(this: &BroadwayPlayer) -> HtmlCanvasElement;
}

const WORKER_FILE: &str = "./js/Broadway/Decoder.js";

/// Thin ownership boundary around the codec: raw elementary-stream units
/// in, a renderable canvas out. Canvas dimensions are assigned once per
/// stream-init.
pub struct DecoderAdapter {
    player: BroadwayPlayer,
}

impl DecoderAdapter {
    pub fn new() -> Result<Self, JsValue> {
        let options = Object::new();
        Reflect::set(
            options.as_ref(),
            &JsValue::from_str("webgl"),
            &JsValue::from_str("auto"),
        )?;
        Reflect::set(
            options.as_ref(),
            &JsValue::from_str("useWorker"),
            &JsValue::TRUE,
        )?;
        Reflect::set(
            options.as_ref(),
            &JsValue::from_str("workerFile"),
            &JsValue::from_str(WORKER_FILE),
        )?;
        Ok(Self {
            player: BroadwayPlayer::new(options.as_ref()),
        })
    }

    pub fn canvas(&self) -> HtmlCanvasElement {
        self.player.canvas()
    }

    pub fn set_dimensions(&self, width: u32, height: u32) {
        let canvas = self.canvas();
        canvas.set_width(width);
        canvas.set_height(height);
    }

    pub fn decode(&self, frame: &[u8]) {
        self.player.decode(&Uint8Array::from(frame));
    }

    /// Hooks Broadway's picture-ready callback.
    pub fn on_picture_decoded(&self, mut callback: impl 'static + FnMut()) {
        let hook = Closure::<dyn FnMut(JsValue, JsValue, JsValue)>::new(
            move |_buffer: JsValue, _width: JsValue, _height: JsValue| callback(),
        );
        let _ = Reflect::set(
            self.player.as_ref(),
            &JsValue::from_str("onPictureDecoded"),
            hook.as_ref(),
        );
        hook.forget();
    }
}
