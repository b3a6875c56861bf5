use std::cell::{Cell, RefCell};
use std::rc::Rc;

use js_sys::{Reflect, Uint8Array};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{CloseEvent, Event, MessageEvent, WebSocket, Window};

/// One persistent server-pushed channel. Payloads arrive either as text
/// (control JSON) or as raw binary; the session core decides what they
/// mean. Transport errors surface as `Closed`; there is no reconnect.
#[derive(Debug)]
pub enum ChannelEvent {
    Open,
    Closed,
    Text(String),
    Binary(Vec<u8>),
}

pub struct ChannelHandle {
    socket: WebSocket,
}

impl ChannelHandle {
    pub fn is_open(&self) -> bool {
        self.socket.ready_state() == WebSocket::OPEN
    }

    pub fn send_token(&self, token: &str) {
        if self.is_open() {
            let _ = self.socket.send_with_str(token);
        }
    }

    pub fn send_binary(&self, payload: &[u8]) {
        if self.is_open() {
            let _ = self.socket.send_with_u8_array(payload);
        }
    }

    pub fn close(&self) {
        let _ = self.socket.close();
    }
}

pub fn connect(
    window: &Window,
    url: &str,
    on_event: impl 'static + FnMut(ChannelEvent),
) -> Result<Rc<ChannelHandle>, JsValue> {
    let socket = WebSocket::new(url)?;
    let _ = Reflect::set(
        socket.as_ref(),
        &JsValue::from_str("binaryType"),
        &JsValue::from_str("arraybuffer"),
    );

    let handle = Rc::new(ChannelHandle {
        socket: socket.clone(),
    });

    let on_event = Rc::new(RefCell::new(on_event));
    let open_reported = Rc::new(Cell::new(false));

    {
        let on_event = on_event.clone();
        let open_reported = open_reported.clone();
        let onopen = Closure::<dyn FnMut(Event)>::new(move |_| {
            if !open_reported.replace(true) {
                on_event.borrow_mut()(ChannelEvent::Open);
            }
        });
        socket.set_onopen(Some(onopen.as_ref().unchecked_ref()));
        onopen.forget();
    }

    {
        let on_event = on_event.clone();
        let url = url.to_string();
        let onclose = Closure::<dyn FnMut(CloseEvent)>::new(move |event: CloseEvent| {
            web_sys::console::log_1(
                &format!(
                    "channel closed url={url} code={} was_clean={}",
                    event.code(),
                    event.was_clean()
                )
                .into(),
            );
            on_event.borrow_mut()(ChannelEvent::Closed);
        });
        socket.set_onclose(Some(onclose.as_ref().unchecked_ref()));
        onclose.forget();
    }

    {
        let on_event = on_event.clone();
        let url = url.to_string();
        let onerror = Closure::<dyn FnMut(Event)>::new(move |_| {
            web_sys::console::error_1(&format!("channel transport error url={url}").into());
            on_event.borrow_mut()(ChannelEvent::Closed);
        });
        socket.set_onerror(Some(onerror.as_ref().unchecked_ref()));
        onerror.forget();
    }

    {
        let on_event = on_event.clone();
        let open_reported = open_reported.clone();
        let onmessage = Closure::<dyn FnMut(MessageEvent)>::new(move |event: MessageEvent| {
            // A message can beat the open callback; report the channel open
            // before delivering it.
            if !open_reported.replace(true) {
                on_event.borrow_mut()(ChannelEvent::Open);
            }

            if let Ok(buffer) = event.data().dyn_into::<js_sys::ArrayBuffer>() {
                let bytes = Uint8Array::new(&buffer).to_vec();
                on_event.borrow_mut()(ChannelEvent::Binary(bytes));
            } else if let Some(text) = event.data().as_string() {
                on_event.borrow_mut()(ChannelEvent::Text(text));
            } else {
                web_sys::console::error_2(
                    &"channel message is not a string or arraybuffer".into(),
                    &event.data(),
                );
            }
        });
        socket.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));
        onmessage.forget();
    }

    {
        let socket = socket.clone();
        let onbeforeunload = Closure::<dyn FnMut(Event)>::new(move |_| {
            let _ = socket.close();
        });
        window.add_event_listener_with_callback(
            "beforeunload",
            onbeforeunload.as_ref().unchecked_ref(),
        )?;
        onbeforeunload.forget();
    }

    Ok(handle)
}
