//! Which document a download request asks for, and what to call the file.

pub const KEY_ATTR: &str = "data-pdf";
pub const FILENAME_ATTR: &str = "data-filename";

const PAGE_PREFIXES: [&str; 2] = ["series-", "page-"];

/// Derives a pdf key from the current page path, e.g.
/// `/products/series-cutter-compactor.html` -> `cutter-compactor`.
pub fn infer_key_from_path(path: &str) -> Option<String> {
    let file = path.rsplit('/').next().unwrap_or_default();

    let stem = file
        .len()
        .checked_sub(".html".len())
        .filter(|&at| file.get(at..).map_or(false, |ext| ext.eq_ignore_ascii_case(".html")))
        .map_or(file, |at| &file[..at]);

    let key = PAGE_PREFIXES
        .iter()
        .find_map(|prefix| stem.strip_prefix(prefix))
        .unwrap_or(stem);

    if key.is_empty() {
        None
    } else {
        Some(key.to_string())
    }
}

/// An explicit key on the trigger control always wins over the page path.
pub fn resolve_key(explicit: Option<&str>, path: &str) -> Option<String> {
    match explicit.map(str::trim) {
        Some(key) if !key.is_empty() => Some(key.to_string()),
        _ => infer_key_from_path(path),
    }
}

pub fn fallback_filename(explicit: Option<&str>, key: Option<&str>) -> String {
    if let Some(name) = explicit.map(str::trim).filter(|n| !n.is_empty()) {
        return name.to_string();
    }
    match key.filter(|k| !k.is_empty()) {
        Some(key) => format!("{}.pdf", key),
        None => "download.pdf".to_string(),
    }
}
