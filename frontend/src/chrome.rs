//! Page furniture shared by every marketing page: the burger menu, the
//! header that compacts on scroll, smooth scrolling to in-page anchors,
//! reveal-on-view sections, lazy images and the fade between pages.
//! Each piece is skipped when its markup is absent.

use gloo_timers::callback::Timeout;
use js_sys::Array;
use log::{debug, warn};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::{
    window, Document, Element, Event, HtmlAnchorElement, HtmlImageElement, IntersectionObserver,
    IntersectionObserverEntry, IntersectionObserverInit, MouseEvent, ScrollBehavior,
    ScrollIntoViewOptions, Window,
};

use crate::config;
use crate::events::listen;

pub fn init() {
    let Some(window) = window() else {
        return;
    };
    let Some(document) = window.document() else {
        return;
    };

    mobile_menu(&document);
    sticky_header(&window, &document);
    smooth_scroll(&document);
    fade_in(&document);
    lazy_images(&document);
    page_transitions(&window, &document);
}

fn mobile_menu(document: &Document) {
    let (Some(burger), Some(menu)) = (
        query(document, ".burger-menu"),
        query(document, ".nav-right"),
    ) else {
        debug!("No mobile menu on this page");
        return;
    };

    {
        let menu = menu.clone();
        listen(&burger, "click", move |e: MouseEvent| {
            e.prevent_default();
            let _ = menu.class_list().toggle("mobile-menu-open");
        });
    }

    let links = menu.clone();
    listen(&links, "click", move |e: MouseEvent| {
        let on_link = e
            .target()
            .and_then(|t| t.dyn_into::<Element>().ok())
            .and_then(|el| el.closest("a").ok().flatten())
            .is_some();
        if on_link {
            let _ = menu.class_list().remove_1("mobile-menu-open");
        }
    });
}

fn sticky_header(window: &Window, document: &Document) {
    let Some(header) = query(document, ".top-nav") else {
        debug!("No header to pin");
        return;
    };

    let update = {
        let window = window.clone();
        move || {
            let scrolled = window.scroll_y().unwrap_or(0.0) > config::STICKY_HEADER_THRESHOLD as f64;
            let _ = header.class_list().toggle_with_force("scrolled", scrolled);
        }
    };
    update();

    listen(window, "scroll", move |_: web_sys::Event| update());
}

fn smooth_scroll(document: &Document) {
    let doc = document.clone();
    listen(document, "click", move |e: MouseEvent| {
        let Some(anchor) = e
            .target()
            .and_then(|t| t.dyn_into::<Element>().ok())
            .and_then(|el| el.closest("a[href^=\"#\"]").ok().flatten())
        else {
            return;
        };
        let Some(id) = anchor.get_attribute("href").and_then(|h| in_page_target(&h)) else {
            return;
        };
        if let Some(target) = doc.get_element_by_id(&id) {
            e.prevent_default();
            let options = ScrollIntoViewOptions::new();
            options.set_behavior(ScrollBehavior::Smooth);
            target.scroll_into_view_with_scroll_into_view_options(&options);
        }
    });
}

fn fade_in(document: &Document) {
    let targets = query_all(document, FADE_SELECTOR);
    if targets.is_empty() {
        return;
    }
    on_first_view(targets, |el| {
        let _ = el.class_list().add_1("visible");
    });
}

fn lazy_images(document: &Document) {
    let targets = query_all(document, "img[data-src]");
    if targets.is_empty() {
        return;
    }
    on_first_view(targets, |el| {
        let Some(src) = lazy_source(el.get_attribute("data-src").as_deref()) else {
            return;
        };
        if let Some(img) = el.dyn_ref::<HtmlImageElement>() {
            img.set_src(&src);
        } else {
            let _ = el.set_attribute("src", &src);
        }
        let _ = el.remove_attribute("data-src");
    });
}

/// Runs `reveal` once per element, the first time it scrolls into view.
/// Without observer support every element is revealed straight away.
fn on_first_view(targets: Vec<Element>, reveal: fn(&Element)) {
    let callback = Closure::wrap(Box::new(move |entries: Array, observer: IntersectionObserver| {
        for entry in entries.iter() {
            let Ok(entry) = entry.dyn_into::<IntersectionObserverEntry>() else {
                continue;
            };
            if entry.is_intersecting() {
                let target = entry.target();
                reveal(&target);
                observer.unobserve(&target);
            }
        }
    }) as Box<dyn FnMut(Array, IntersectionObserver)>);

    let options = IntersectionObserverInit::new();
    options.set_root_margin(REVEAL_MARGIN);
    match IntersectionObserver::new_with_options(callback.as_ref().unchecked_ref(), &options) {
        Ok(observer) => {
            for el in &targets {
                observer.observe(el);
            }
            callback.forget();
        }
        Err(e) => {
            warn!("No IntersectionObserver, revealing everything: {:?}", e);
            targets.iter().for_each(reveal);
        }
    }
}

fn page_transitions(window: &Window, document: &Document) {
    let Some(body) = document.body() else {
        return;
    };

    {
        let body = body.clone();
        // back/forward cache restores the page with the leaving class still set
        listen(window, "pageshow", move |_: Event| {
            let _ = body.class_list().remove_1(LEAVING_CLASS);
        });
    }

    let window = window.clone();
    listen(document, "click", move |e: MouseEvent| {
        if e.default_prevented()
            || e.button() != 0
            || e.ctrl_key()
            || e.meta_key()
            || e.shift_key()
            || e.alt_key()
        {
            return;
        }
        let Some(anchor) = e
            .target()
            .and_then(|t| t.dyn_into::<Element>().ok())
            .and_then(|el| el.closest("a[href]").ok().flatten())
            .and_then(|el| el.dyn_into::<HtmlAnchorElement>().ok())
        else {
            return;
        };
        let opens_elsewhere = !matches!(anchor.target().as_str(), "" | "_self");
        if opens_elsewhere
            || anchor.has_attribute("download")
            || anchor.has_attribute("data-no-transition")
        {
            return;
        }

        let location = window.location();
        let (Ok(origin), Ok(current)) = (location.origin(), location.href()) else {
            return;
        };
        let Some(destination) = transition_target(&anchor.href(), &origin, &current) else {
            return;
        };

        e.prevent_default();
        let _ = body.class_list().add_1(LEAVING_CLASS);
        let window = window.clone();
        Timeout::new(config::PAGE_TRANSITION_DELAY.as_millis() as u32, move || {
            if let Err(e) = window.location().set_href(&destination) {
                warn!("Navigation to {} failed: {:?}", destination, e);
            }
        })
        .forget();
    });
}

const FADE_SELECTOR: &str = ".fade-in";
const REVEAL_MARGIN: &str = "0px 0px -50px 0px";
const LEAVING_CLASS: &str = "page-leaving";

/// The URL to fade out towards, if following `href` leaves the current page
/// for another page of the same site.
fn transition_target(href: &str, origin: &str, current: &str) -> Option<String> {
    let rest = href.strip_prefix(origin)?;
    if !(rest.is_empty() || rest.starts_with('/') || rest.starts_with('?') || rest.starts_with('#')) {
        return None;
    }
    let (page, fragment) = match href.split_once('#') {
        Some((page, fragment)) => (page, Some(fragment)),
        None => (href, None),
    };
    let current_page = current.split_once('#').map_or(current, |(page, _)| page);
    if fragment.is_some() && page == current_page {
        return None;
    }
    Some(href.to_string())
}

fn lazy_source(data_src: Option<&str>) -> Option<String> {
    let src = data_src?.trim();
    (!src.is_empty()).then(|| src.to_string())
}

/// `#pricing` -> `pricing`. A bare `#` is not a target.
fn in_page_target(href: &str) -> Option<String> {
    let id = href.strip_prefix('#')?;
    let id = urlencoding::decode(id).ok()?.into_owned();
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

fn query(document: &Document, selector: &str) -> Option<Element> {
    document.query_selector(selector).ok().flatten()
}

fn query_all(document: &Document, selector: &str) -> Vec<Element> {
    let Ok(nodes) = document.query_selector_all(selector) else {
        return Vec::new();
    };
    (0..nodes.length())
        .filter_map(|i| nodes.item(i))
        .filter_map(|n| n.dyn_into::<Element>().ok())
        .collect()
}
