use std::rc::Rc;

use gloo_net::http::Request;
use gloo_timers::callback::Timeout;
use log::{error, info, warn};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{window, Blob, Document, Event, HtmlAnchorElement, KeyboardEvent, MouseEvent, Node, Url};

use crate::config;
use crate::events::listen;
use super::controller::{Controller, Fetched, Outcome};
use super::disposition::filename_from_disposition;
use super::modal::DownloadElements;
use super::request::{DownloadRequest, SubmitError};

type DownloadFlow = Controller<DownloadElements>;

/// Binds the download modal to the page. Leaves the page untouched if the
/// markup is incomplete.
pub fn init() {
    let Some(document) = window().and_then(|w| w.document()) else {
        warn!("Download form not initialised: no document");
        return;
    };

    match DownloadElements::locate(&document) {
        Ok(els) => {
            let flow = Rc::new(Controller::new(els));
            attach(&flow, &document);
            info!("Download form ready");
        }
        Err(e) => warn!("Download form not initialised: {}", e),
    }
}

fn attach(flow: &Rc<DownloadFlow>, document: &Document) {
    let els = flow.host();

    {
        let flow = flow.clone();
        listen(&els.trigger, "click", move |e: MouseEvent| {
            e.prevent_default();
            flow.open();
        });
    }

    for control in [&els.close, &els.cancel] {
        let flow = flow.clone();
        listen(control, "click", move |e: MouseEvent| {
            e.prevent_default();
            flow.close();
        });
    }

    {
        let flow = flow.clone();
        listen(&els.modal, "click", move |e: MouseEvent| {
            let target = e.target().and_then(|t| t.dyn_into::<Node>().ok());
            if flow.host().modal.is_same_node(target.as_ref()) {
                flow.close();
            }
        });
    }

    {
        let flow = flow.clone();
        listen(document, "keydown", move |e: KeyboardEvent| {
            if e.key() == "Escape" && flow.is_open() {
                flow.close();
            }
        });
    }

    {
        let flow = flow.clone();
        listen(&els.form, "submit", move |e: Event| {
            e.prevent_default();
            let flow = flow.clone();
            spawn_local(async move {
                let outcome = flow.submit().await;
                if let Outcome::Saved { close: Some(pending), .. } = outcome {
                    Timeout::new(pending.after.as_millis() as u32, move || flow.close_if_due(pending))
                        .forget();
                }
            });
        });
    }
}

pub(super) async fn fetch_document(request: &DownloadRequest) -> Result<Fetched<Blob>, SubmitError> {
    let response = Request::post(config::download_url())
        .json(request)
        .map_err(|e| {
            error!("Could not encode download request: {}", e);
            SubmitError::Transport
        })?
        .send()
        .await
        .map_err(|e| {
            error!("Download request failed: {}", e);
            SubmitError::Transport
        })?;

    if !response.ok() {
        let body = response.text().await.unwrap_or_default();
        let err = SubmitError::server(response.status(), &response.status_text(), &body);
        warn!("Download rejected with status {}: {}", response.status(), err);
        return Err(err);
    }

    let filename = response
        .headers()
        .get("content-disposition")
        .as_deref()
        .and_then(filename_from_disposition);

    let body = read_blob(response.as_raw()).await.map_err(|e| {
        error!("Could not read download body: {:?}", e);
        SubmitError::Transport
    })?;

    Ok(Fetched { body, filename })
}

async fn read_blob(response: &web_sys::Response) -> Result<Blob, JsValue> {
    let value = JsFuture::from(response.blob()?).await?;
    value.dyn_into::<Blob>()
}

/// Hands the blob to the browser's save behaviour through a throwaway link.
pub(super) fn save_blob(document: &Document, blob: &Blob, filename: &str) -> Result<(), JsValue> {
    let url = Url::create_object_url_with_blob(blob)?;
    let clicked = click_download_link(document, &url, filename);
    Url::revoke_object_url(&url)?;
    clicked
}

fn click_download_link(document: &Document, url: &str, filename: &str) -> Result<(), JsValue> {
    let anchor = document
        .create_element("a")?
        .dyn_into::<HtmlAnchorElement>()
        .map_err(JsValue::from)?;
    anchor.set_href(url);
    anchor.set_download(filename);
    anchor.style().set_property("display", "none")?;

    let body = document
        .body()
        .ok_or_else(|| JsValue::from_str("document has no body"))?;
    body.append_child(&anchor)?;
    anchor.click();
    anchor.remove();
    Ok(())
}
