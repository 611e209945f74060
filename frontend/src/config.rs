use std::time::Duration;

/// The download server also serves the pages, so requests stay same-origin.
pub const DOWNLOAD_PATH: &str = "/download";

pub fn download_url() -> &'static str {
    DOWNLOAD_PATH
}

/// How long the success message stays up before the modal closes itself.
pub const SUCCESS_CLOSE_DELAY: Duration = Duration::from_millis(800);

/// Scroll offset (px) after which the header switches to its compact style.
pub const STICKY_HEADER_THRESHOLD: i32 = 80;

/// Time the leaving animation gets before the browser navigates away.
pub const PAGE_TRANSITION_DELAY: Duration = Duration::from_millis(250);

pub const MSG_PROCESSING: &str = "Processing your request...";
pub const MSG_SUCCESS: &str = "Thank you! Your download will start shortly.";
pub const MSG_MISSING_FIELDS: &str = "Please fill all required fields.";
pub const MSG_TRANSPORT: &str = "Network or server error.";

/// Ids and names of the markup the download flow binds to.
pub struct DomIds {
    pub trigger: &'static str,
    pub modal: &'static str,
    pub close: &'static str,
    pub cancel: &'static str,
    pub form: &'static str,
    pub message: &'static str,
    pub fields: [&'static str; 3],
}

pub const DOWNLOAD_DOM: DomIds = DomIds {
    trigger: "download-btn",
    modal: "download-modal",
    close: "modal-close",
    cancel: "cancel",
    form: "download-form",
    message: "form-msg",
    fields: ["name", "email", "mobile"],
};

pub const VIDEO_CATALOG_ROOT: &str = "video-catalog";
pub const VIDEO_CATALOG_DATA: &str = "video-catalog-data";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn download_posts_to_relative_path() {
        assert_eq!(download_url(), "/download");
        assert!(!download_url().contains("://"));
    }
}
