use log::{info, Level};
use web_sys::window;

mod config;
mod events;
mod chrome;
mod download {
    pub mod key;
    pub mod disposition;
    pub mod request;
    pub mod session;
    pub mod controller;
    pub mod modal;
    pub mod flow;
}
mod components {
    pub mod video_catalog;
}

use components::video_catalog::{load_catalog, VideoCatalog, VideoCatalogProps};

fn mount_video_catalog() {
    let Some(document) = window().and_then(|w| w.document()) else {
        return;
    };
    let Some(root) = document.get_element_by_id(config::VIDEO_CATALOG_ROOT) else {
        return;
    };
    let Some(catalog) = load_catalog(&document) else {
        return;
    };

    let start_playlist = root.get_attribute("data-playlist");
    info!("Rendering video catalog");
    yew::Renderer::<VideoCatalog>::with_root_and_props(
        root,
        VideoCatalogProps { catalog, start_playlist },
    )
    .render();
}

fn main() {
    // Initialize console error panic hook for better error messages
    console_error_panic_hook::set_once();

    // Initialize logging
    console_log::init_with_level(Level::Info).expect("error initializing log");

    info!("Starting page scripts");
    chrome::init();
    download::flow::init();
    mount_video_catalog();
}
