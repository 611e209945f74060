use std::rc::Rc;

use log::{info, warn};
use serde::Deserialize;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys::{window, Document, KeyboardEvent};
use yew::prelude::*;

use crate::config;
use crate::events::{lock_body_scroll, unlock_body_scroll};

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Video {
    pub id: String,
    pub title: String,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Playlist {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub videos: Vec<Video>,
}

/// Read-only table of playlists, parsed once when the page boots.
#[derive(Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Catalog {
    #[serde(default)]
    pub playlists: Vec<Playlist>,
}

impl Catalog {
    /// Playlists without videos are dropped.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let mut catalog: Catalog = serde_json::from_str(raw)?;
        catalog.playlists.retain(|p| !p.videos.is_empty());
        Ok(catalog)
    }

    pub fn is_empty(&self) -> bool {
        self.playlists.is_empty()
    }

    pub fn position(&self, playlist_id: &str) -> Option<usize> {
        self.playlists.iter().position(|p| p.id == playlist_id)
    }

    fn video(&self, selection: Selection) -> Option<&Video> {
        self.playlists.get(selection.playlist)?.videos.get(selection.video)
    }
}

pub fn embed_url(video_id: &str) -> String {
    format!(
        "https://www.youtube-nocookie.com/embed/{}",
        urlencoding::encode(video_id)
    )
}

/// Reads the catalog embedded in the page, if there is one.
pub fn load_catalog(document: &Document) -> Option<Rc<Catalog>> {
    let raw = document
        .get_element_by_id(config::VIDEO_CATALOG_DATA)?
        .text_content()?;
    match Catalog::from_json(&raw) {
        Ok(catalog) if !catalog.is_empty() => {
            info!("Loaded {} video playlists", catalog.playlists.len());
            Some(Rc::new(catalog))
        }
        Ok(_) => {
            warn!("Video catalog has no playlists");
            None
        }
        Err(e) => {
            warn!("Video catalog is not valid JSON: {}", e);
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct Selection {
    playlist: usize,
    video: usize,
}

#[derive(Properties, PartialEq)]
pub struct VideoCatalogProps {
    pub catalog: Rc<Catalog>,
    /// Playlist shown first, e.g. the product the page is about.
    #[prop_or_default]
    pub start_playlist: Option<String>,
}

#[function_component]
pub fn VideoCatalog(props: &VideoCatalogProps) -> Html {
    let open = use_state(|| false);
    let selection = use_state(Selection::default);

    // Escape closes the modal and the page behind it stays put while it is open
    {
        let is_open_now = *open;
        let open = open.clone();
        use_effect_with_deps(
            move |is_open: &bool| {
                let document = window().and_then(|w| w.document());
                let mut listener = None;

                if let (true, Some(document)) = (*is_open, document) {
                    let previous = lock_body_scroll(&document).unwrap_or_default();
                    let open = open.clone();
                    let on_key = Closure::wrap(Box::new(move |e: KeyboardEvent| {
                        if e.key() == "Escape" {
                            open.set(false);
                        }
                    }) as Box<dyn FnMut(KeyboardEvent)>);
                    if let Err(e) =
                        document.add_event_listener_with_callback("keydown", on_key.as_ref().unchecked_ref())
                    {
                        warn!("Video catalog could not listen for Escape: {:?}", e);
                    }
                    listener = Some((document, on_key, previous));
                }

                move || {
                    if let Some((document, on_key, previous)) = listener {
                        let _ = document.remove_event_listener_with_callback(
                            "keydown",
                            on_key.as_ref().unchecked_ref(),
                        );
                        unlock_body_scroll(&document, &previous);
                    }
                }
            },
            is_open_now,
        );
    }

    let open_modal = {
        let open = open.clone();
        let selection = selection.clone();
        let start = props
            .start_playlist
            .as_deref()
            .and_then(|id| props.catalog.position(id))
            .unwrap_or(0);
        Callback::from(move |_: MouseEvent| {
            selection.set(Selection { playlist: start, video: 0 });
            open.set(true);
        })
    };

    let close_modal = {
        let open = open.clone();
        Callback::from(move |_: MouseEvent| open.set(false))
    };

    let catalog = &props.catalog;
    let current = *selection;

    html! {
        <>
            <button class="video-catalog-btn" onclick={open_modal}>{"Watch videos"}</button>
            if *open {
                <div class="modal-overlay video-modal" onclick={close_modal.clone()}>
                    <div class="modal-content" onclick={Callback::from(|e: MouseEvent| e.stop_propagation())}>
                        <button class="modal-close" onclick={close_modal}>{"✕"}</button>
                        <div class="playlist-tabs">
                            { for catalog.playlists.iter().enumerate().map(|(i, playlist)| {
                                let selection = selection.clone();
                                html! {
                                    <button
                                        class={classes!("playlist-tab", (i == current.playlist).then(|| "active"))}
                                        onclick={Callback::from(move |_: MouseEvent| {
                                            selection.set(Selection { playlist: i, video: 0 });
                                        })}
                                    >
                                        {&playlist.title}
                                    </button>
                                }
                            }) }
                        </div>
                        if let Some(video) = catalog.video(current) {
                            <div class="video-frame">
                                <iframe
                                    key={video.id.clone()}
                                    src={embed_url(&video.id)}
                                    title={video.title.clone()}
                                    allow="accelerometer; autoplay; encrypted-media; gyroscope; picture-in-picture"
                                    allowfullscreen=true
                                />
                            </div>
                        }
                        <ul class="video-list">
                            { for catalog.playlists.get(current.playlist).into_iter().flat_map(|p| p.videos.iter().enumerate()).map(|(j, video)| {
                                let selection = selection.clone();
                                html! {
                                    <li
                                        class={classes!("video-item", (j == current.video).then(|| "active"))}
                                        onclick={Callback::from(move |_: MouseEvent| {
                                            selection.set(Selection { playlist: current.playlist, video: j });
                                        })}
                                    >
                                        {&video.title}
                                    </li>
                                }
                            }) }
                        </ul>
                    </div>
                </div>
            }
        </>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "playlists": [
            {"id": "cutter-compactor", "title": "Cutter Compactor", "videos": [
                {"id": "abc123", "title": "Overview"},
                {"id": "def456", "title": "Maintenance"}
            ]},
            {"id": "dry-wash", "title": "Dry Wash", "videos": []}
        ]
    }"#;

    #[test]
    fn empty_playlists_are_dropped() {
        let catalog = Catalog::from_json(SAMPLE).unwrap();
        assert_eq!(catalog.playlists.len(), 1);
        assert_eq!(catalog.position("dry-wash"), None);
        assert_eq!(catalog.position("cutter-compactor"), Some(0));
        assert_eq!(catalog.playlists[0].videos.len(), 2);
    }

    #[test]
    fn selection_lookup() {
        let catalog = Catalog::from_json(SAMPLE).unwrap();
        assert_eq!(catalog.video(Selection::default()).unwrap().id, "abc123");
        assert_eq!(
            catalog.video(Selection { playlist: 0, video: 1 }).unwrap().title,
            "Maintenance"
        );
        assert!(catalog.video(Selection { playlist: 3, video: 0 }).is_none());
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(Catalog::from_json("{\"playlists\": [").is_err());
        assert!(Catalog::from_json("{}").unwrap().is_empty());
    }

    #[test]
    fn embed_urls_are_escaped() {
        assert_eq!(embed_url("abc123"), "https://www.youtube-nocookie.com/embed/abc123");
        assert_eq!(embed_url("a/b"), "https://www.youtube-nocookie.com/embed/a%2Fb");
    }
}
