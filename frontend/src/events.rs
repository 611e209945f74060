use log::error;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::convert::FromWasmAbi;
use wasm_bindgen::JsCast;
use web_sys::{Document, EventTarget};

/// Attaches a listener for the lifetime of the page.
pub fn listen<E, F>(target: &EventTarget, event: &str, handler: F)
where
    E: FromWasmAbi + 'static,
    F: FnMut(E) + 'static,
{
    let closure = Closure::wrap(Box::new(handler) as Box<dyn FnMut(E)>);
    if let Err(e) = target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref()) {
        error!("Could not listen for {}: {:?}", event, e);
        return;
    }
    closure.forget();
}

/// Sets `overflow: hidden` on the body and returns the value it replaced.
pub fn lock_body_scroll(document: &Document) -> Option<String> {
    let style = document.body()?.style();
    let previous = style.get_property_value("overflow").unwrap_or_default();
    let _ = style.set_property("overflow", "hidden");
    Some(previous)
}

/// Puts back what [`lock_body_scroll`] replaced.
pub fn unlock_body_scroll(document: &Document, previous: &str) {
    let Some(body) = document.body() else {
        return;
    };
    let style = body.style();
    let _ = match overflow_after_unlock(previous) {
        Some(value) => style.set_property("overflow", value),
        None => style.remove_property("overflow").map(|_| ()),
    };
}

// An empty previous value means the page had no inline overflow of its own.
fn overflow_after_unlock(previous: &str) -> Option<&str> {
    let previous = previous.trim();
    (!previous.is_empty()).then_some(previous)
}
