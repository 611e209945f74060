//! The markup the download flow drives: lookup of the required elements and
//! the small set of DOM mutations opening, closing and status updates need.

use log::error;
use thiserror::Error;
use wasm_bindgen::JsCast;
use web_sys::{window, Blob, Document, Element, HtmlElement, HtmlFormElement, HtmlInputElement};

use crate::config::DOWNLOAD_DOM;
use crate::events::{lock_body_scroll, unlock_body_scroll};
use super::controller::{DownloadHost, Fetched};
use super::flow::{fetch_document, save_blob};
use super::request::{DownloadRequest, Status, SubmitError};

const STATUS_CLASSES: [&str; 3] = ["processing", "success", "error"];
const FOCUSABLE: &str =
    "input:not([type=hidden]):not([disabled]), select:not([disabled]), textarea:not([disabled]), button:not([disabled])";

#[derive(Error, Debug)]
pub enum MissingElement {
    #[error("no element with id `{0}`")]
    Id(&'static str),

    #[error("form has no field named `{0}`")]
    Field(&'static str),

    #[error("`{id}` is not a {expected}")]
    WrongType {
        id: &'static str,
        expected: &'static str,
    },
}

#[derive(Clone)]
pub struct DownloadElements {
    pub document: Document,
    pub trigger: HtmlElement,
    pub modal: HtmlElement,
    pub close: Element,
    pub cancel: Element,
    pub form: HtmlFormElement,
    pub message: Element,
    pub name: HtmlInputElement,
    pub email: HtmlInputElement,
    pub mobile: HtmlInputElement,
}

impl DownloadElements {
    /// Either every element of the contract is found, or nothing is returned.
    pub fn locate(document: &Document) -> Result<Self, MissingElement> {
        let by_id = |id: &'static str| document.get_element_by_id(id).ok_or(MissingElement::Id(id));

        let trigger = html_element(by_id(DOWNLOAD_DOM.trigger)?, DOWNLOAD_DOM.trigger)?;
        let modal = html_element(by_id(DOWNLOAD_DOM.modal)?, DOWNLOAD_DOM.modal)?;
        let close = by_id(DOWNLOAD_DOM.close)?;
        let cancel = by_id(DOWNLOAD_DOM.cancel)?;
        let form = by_id(DOWNLOAD_DOM.form)?
            .dyn_into::<HtmlFormElement>()
            .map_err(|_| MissingElement::WrongType {
                id: DOWNLOAD_DOM.form,
                expected: "form",
            })?;
        let message = by_id(DOWNLOAD_DOM.message)?;

        let [name, email, mobile] = DOWNLOAD_DOM.fields;
        let name = form_field(&form, name)?;
        let email = form_field(&form, email)?;
        let mobile = form_field(&form, mobile)?;

        Ok(Self {
            document: document.clone(),
            trigger,
            modal,
            close,
            cancel,
            form,
            message,
            name,
            email,
            mobile,
        })
    }
}

impl DownloadHost for DownloadElements {
    type Body = Blob;

    fn show_modal(&self) {
        self.modal.set_hidden(false);
        let _ = self.modal.class_list().add_1("open");
        let _ = self.modal.set_attribute("aria-hidden", "false");
    }

    fn hide_modal(&self) {
        self.modal.set_hidden(true);
        let _ = self.modal.class_list().remove_1("open");
        let _ = self.modal.set_attribute("aria-hidden", "true");
    }

    /// Stops the page behind the modal from scrolling and returns the
    /// previous `overflow` value so it can be put back.
    fn lock_scroll(&self) -> Option<String> {
        lock_body_scroll(&self.document)
    }

    fn unlock_scroll(&self, previous: &str) {
        unlock_body_scroll(&self.document, previous);
    }

    fn focus_first_field(&self) {
        let first = self
            .form
            .query_selector(FOCUSABLE)
            .ok()
            .flatten()
            .and_then(|el| el.dyn_into::<HtmlElement>().ok());
        if let Some(el) = first {
            let _ = el.focus();
        }
    }

    fn focus_trigger(&self) {
        let _ = self.trigger.focus();
    }

    fn show_status(&self, status: &Status) {
        self.clear_status();
        self.message.set_text_content(Some(&status.text()));
        let _ = self.message.class_list().add_1(status.class());
    }

    fn clear_status(&self) {
        self.message.set_text_content(None);
        for class in STATUS_CLASSES {
            let _ = self.message.class_list().remove_1(class);
        }
    }

    /// Disables or re-enables every submit control of the form.
    fn set_busy(&self, busy: bool) {
        let Ok(controls) = self.form.query_selector_all("[type=submit]") else {
            return;
        };
        for i in 0..controls.length() {
            if let Some(control) = controls.item(i).and_then(|n| n.dyn_into::<Element>().ok()) {
                let _ = if busy {
                    control.set_attribute("disabled", "")
                } else {
                    control.remove_attribute("disabled")
                };
            }
        }
    }

    fn field_values(&self) -> (String, String, String) {
        (self.name.value(), self.email.value(), self.mobile.value())
    }

    fn reset_form(&self) {
        self.form.reset();
    }

    fn trigger_attr(&self, name: &str) -> Option<String> {
        self.trigger.get_attribute(name)
    }

    fn set_trigger_attr(&self, name: &str, value: &str) {
        let _ = self.trigger.set_attribute(name, value);
    }

    fn page_path(&self) -> String {
        window()
            .and_then(|w| w.location().pathname().ok())
            .unwrap_or_default()
    }

    async fn fetch(&self, request: &DownloadRequest) -> Result<Fetched<Blob>, SubmitError> {
        fetch_document(request).await
    }

    fn save(&self, body: &Blob, filename: &str) -> Result<(), SubmitError> {
        save_blob(&self.document, body, filename).map_err(|e| {
            error!("Could not save {}: {:?}", filename, e);
            SubmitError::Transport
        })
    }
}

fn html_element(el: Element, id: &'static str) -> Result<HtmlElement, MissingElement> {
    el.dyn_into::<HtmlElement>()
        .map_err(|_| MissingElement::WrongType {
            id,
            expected: "HTML element",
        })
}

fn form_field(form: &HtmlFormElement, name: &'static str) -> Result<HtmlInputElement, MissingElement> {
    form.query_selector(&format!("[name=\"{}\"]", name))
        .ok()
        .flatten()
        .ok_or(MissingElement::Field(name))?
        .dyn_into::<HtmlInputElement>()
        .map_err(|_| MissingElement::WrongType {
            id: name,
            expected: "text input",
        })
}
