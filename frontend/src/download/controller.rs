//! What the download modal does, apart from the page it does it to.
//!
//! `Controller` owns the session state and runs open, close and submit
//! against a `DownloadHost`. The browser host lives in `modal.rs`.

use std::cell::RefCell;
use std::time::Duration;

use log::{debug, info};

use crate::config;
use super::key::{fallback_filename, resolve_key, FILENAME_ATTR, KEY_ATTR};
use super::request::{DownloadRequest, Status, SubmitError};
use super::session::Session;

pub struct Fetched<B> {
    pub body: B,
    /// Name taken from `Content-Disposition`, if the server sent one.
    pub filename: Option<String>,
}

pub trait DownloadHost {
    type Body;

    fn show_modal(&self);
    fn hide_modal(&self);
    /// Returns the previous `overflow` value of the page.
    fn lock_scroll(&self) -> Option<String>;
    fn unlock_scroll(&self, previous: &str);
    fn focus_first_field(&self);
    fn focus_trigger(&self);
    fn show_status(&self, status: &Status);
    fn clear_status(&self);
    fn set_busy(&self, busy: bool);
    fn field_values(&self) -> (String, String, String);
    fn reset_form(&self);
    fn trigger_attr(&self, name: &str) -> Option<String>;
    fn set_trigger_attr(&self, name: &str, value: &str);
    fn page_path(&self) -> String;

    async fn fetch(&self, request: &DownloadRequest) -> Result<Fetched<Self::Body>, SubmitError>;
    fn save(&self, body: &Self::Body, filename: &str) -> Result<(), SubmitError>;
}

/// A close the caller should run after `after`, via `Controller::close_if_due`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingClose {
    pub after: Duration,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Modal closed, or another submission still running.
    Ignored,
    Failed(SubmitError),
    Saved {
        filename: String,
        close: Option<PendingClose>,
    },
}

pub struct Controller<H> {
    host: H,
    session: RefCell<Session>,
    saved_overflow: RefCell<Option<String>>,
}

impl<H: DownloadHost> Controller<H> {
    pub fn new(host: H) -> Self {
        Self {
            host,
            session: RefCell::new(Session::new()),
            saved_overflow: RefCell::new(None),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn is_open(&self) -> bool {
        self.session.borrow().is_open()
    }

    pub fn open(&self) {
        if !self.session.borrow_mut().open() {
            return;
        }
        self.host.show_modal();
        *self.saved_overflow.borrow_mut() = self.host.lock_scroll();
        self.host.clear_status();
        self.host.focus_first_field();
    }

    pub fn close(&self) {
        if !self.session.borrow_mut().close() {
            return;
        }
        self.host.hide_modal();
        if let Some(previous) = self.saved_overflow.borrow_mut().take() {
            self.host.unlock_scroll(&previous);
        }
        self.host.set_busy(false);
        self.host.focus_trigger();
    }

    pub fn close_if_due(&self, pending: PendingClose) {
        let due = self.session.borrow().close_is_due(pending.generation);
        if due {
            self.close();
        }
    }

    /// The explicit key on the trigger, or one inferred from the page path.
    /// Whatever is found is written back onto the trigger.
    fn pdf_key(&self) -> Option<String> {
        let explicit = self.host.trigger_attr(KEY_ATTR);
        let key = resolve_key(explicit.as_deref(), &self.host.page_path())?;
        if explicit.as_deref() != Some(key.as_str()) {
            self.host.set_trigger_attr(KEY_ATTR, &key);
        }
        Some(key)
    }

    pub async fn submit(&self) -> Outcome {
        let attempt = self.session.borrow_mut().begin();
        let Some(attempt) = attempt else {
            match self.session.borrow().in_flight() {
                Some(running) => debug!("Submit ignored: attempt {} still running", running.id()),
                None => debug!("Submit ignored: modal is closed"),
            }
            return Outcome::Ignored;
        };
        self.host.set_busy(true);
        self.host.show_status(&Status::Processing);

        let (name, email, mobile) = self.host.field_values();
        let pdf = self.pdf_key();
        let request = match DownloadRequest::from_fields(&name, &email, &mobile, pdf.as_deref()) {
            Ok(request) => request,
            Err(err) => {
                self.session.borrow_mut().finish(attempt);
                self.host.show_status(&Status::Failed(err.clone()));
                self.host.set_busy(false);
                return Outcome::Failed(err);
            }
        };

        info!("Requesting document '{}' (attempt {})", request.pdf, attempt.id());
        let fetched = self.host.fetch(&request).await;

        let current = self.session.borrow().is_current(attempt);
        self.session.borrow_mut().finish(attempt);
        if !current {
            debug!("Attempt {} finished after the modal was closed", attempt.id());
        }

        let saved = fetched.and_then(|file| {
            let filename = file.filename.clone().unwrap_or_else(|| {
                let explicit = self.host.trigger_attr(FILENAME_ATTR);
                fallback_filename(explicit.as_deref(), Some(&request.pdf))
            });
            self.host.save(&file.body, &filename).map(|_| filename)
        });

        let filename = match saved {
            Ok(filename) => filename,
            Err(err) => {
                if current {
                    self.host.show_status(&Status::Failed(err.clone()));
                    self.host.set_busy(false);
                }
                return Outcome::Failed(err);
            }
        };
        info!("Saved {}", filename);

        if !current {
            return Outcome::Saved { filename, close: None };
        }
        self.host.show_status(&Status::Success);
        self.host.reset_form();
        self.host.set_busy(false);

        let close = PendingClose {
            after: config::SUCCESS_CLOSE_DELAY,
            generation: self.session.borrow().generation(),
        };
        Outcome::Saved {
            filename,
            close: Some(close),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::collections::{HashMap, VecDeque};
    use std::rc::Rc;

    use futures::channel::oneshot;
    use futures::executor::{block_on, LocalPool};
    use futures::task::LocalSpawnExt;

    use super::*;

    type Reply = Result<Fetched<Vec<u8>>, SubmitError>;

    #[derive(Default)]
    struct FakePage {
        visible: Cell<bool>,
        overflow: RefCell<String>,
        busy: Cell<bool>,
        status: RefCell<Option<Status>>,
        fields: RefCell<(String, String, String)>,
        attrs: RefCell<HashMap<String, String>>,
        path: RefCell<String>,
        focused: RefCell<Vec<&'static str>>,
        resets: Cell<u32>,
        requests: RefCell<Vec<DownloadRequest>>,
        replies: RefCell<VecDeque<oneshot::Receiver<Reply>>>,
        saved: RefCell<Vec<String>>,
    }

    impl FakePage {
        fn reply(&self, reply: Reply) {
            let (tx, rx) = oneshot::channel();
            let _ = tx.send(reply);
            self.replies.borrow_mut().push_back(rx);
        }

        fn reply_later(&self) -> oneshot::Sender<Reply> {
            let (tx, rx) = oneshot::channel();
            self.replies.borrow_mut().push_back(rx);
            tx
        }

        fn status_text(&self) -> Option<String> {
            self.status.borrow().as_ref().map(Status::text)
        }
    }

    impl DownloadHost for FakePage {
        type Body = Vec<u8>;

        fn show_modal(&self) {
            self.visible.set(true);
        }
        fn hide_modal(&self) {
            self.visible.set(false);
        }
        fn lock_scroll(&self) -> Option<String> {
            Some(self.overflow.replace("hidden".to_string()))
        }
        fn unlock_scroll(&self, previous: &str) {
            *self.overflow.borrow_mut() = previous.to_string();
        }
        fn focus_first_field(&self) {
            self.focused.borrow_mut().push("name");
        }
        fn focus_trigger(&self) {
            self.focused.borrow_mut().push("trigger");
        }
        fn show_status(&self, status: &Status) {
            *self.status.borrow_mut() = Some(status.clone());
        }
        fn clear_status(&self) {
            *self.status.borrow_mut() = None;
        }
        fn set_busy(&self, busy: bool) {
            self.busy.set(busy);
        }
        fn field_values(&self) -> (String, String, String) {
            self.fields.borrow().clone()
        }
        fn reset_form(&self) {
            self.resets.set(self.resets.get() + 1);
            *self.fields.borrow_mut() = Default::default();
        }
        fn trigger_attr(&self, name: &str) -> Option<String> {
            self.attrs.borrow().get(name).cloned()
        }
        fn set_trigger_attr(&self, name: &str, value: &str) {
            self.attrs.borrow_mut().insert(name.to_string(), value.to_string());
        }
        fn page_path(&self) -> String {
            self.path.borrow().clone()
        }

        async fn fetch(&self, request: &DownloadRequest) -> Reply {
            self.requests.borrow_mut().push(request.clone());
            let pending = self.replies.borrow_mut().pop_front();
            match pending {
                Some(rx) => rx.await.unwrap_or(Err(SubmitError::Transport)),
                None => Err(SubmitError::Transport),
            }
        }

        fn save(&self, _body: &Vec<u8>, filename: &str) -> Result<(), SubmitError> {
            self.saved.borrow_mut().push(filename.to_string());
            Ok(())
        }
    }

    fn pdf(filename: Option<&str>) -> Reply {
        Ok(Fetched {
            body: b"%PDF-1.4".to_vec(),
            filename: filename.map(str::to_string),
        })
    }

    fn opened_form(name: &str, email: &str, mobile: &str) -> Controller<FakePage> {
        let page = FakePage::default();
        *page.overflow.borrow_mut() = "auto".to_string();
        *page.path.borrow_mut() = "/series-cutter-compactor.html".to_string();
        *page.fields.borrow_mut() = (name.to_string(), email.to_string(), mobile.to_string());
        let flow = Controller::new(page);
        flow.open();
        flow
    }

    #[test]
    fn blank_field_sends_nothing() {
        for (name, email, mobile) in [(" ", "a@b.com", "123"), ("A", "", "123"), ("A", "a@b.com", "\t")] {
            let flow = opened_form(name, email, mobile);
            let outcome = block_on(flow.submit());

            assert_eq!(outcome, Outcome::Failed(SubmitError::MissingFields));
            let page = flow.host();
            assert!(page.requests.borrow().is_empty());
            assert_eq!(page.status_text().as_deref(), Some("Please fill all required fields."));
            assert!(!page.busy.get());
            assert!(page.visible.get());
        }
    }

    #[test]
    fn posts_key_inferred_from_page() {
        let flow = opened_form("A", "a@b.com", "123");
        flow.host().reply(pdf(None));
        let outcome = block_on(flow.submit());

        let page = flow.host();
        assert_eq!(page.requests.borrow()[0].pdf, "cutter-compactor");
        assert_eq!(page.trigger_attr(KEY_ATTR).as_deref(), Some("cutter-compactor"));
        assert_eq!(*page.saved.borrow(), vec!["cutter-compactor.pdf".to_string()]);
        assert!(matches!(outcome, Outcome::Saved { ref filename, .. } if filename == "cutter-compactor.pdf"));
    }

    #[test]
    fn explicit_key_ignores_page() {
        let flow = opened_form("A", "a@b.com", "123");
        flow.host().set_trigger_attr(KEY_ATTR, "widgetA");
        flow.host().reply(pdf(None));
        block_on(flow.submit());

        assert_eq!(flow.host().requests.borrow()[0].pdf, "widgetA");
        assert_eq!(*flow.host().saved.borrow(), vec!["widgetA.pdf".to_string()]);
    }

    #[test]
    fn server_filename_wins() {
        let flow = opened_form("A", "a@b.com", "123");
        flow.host().set_trigger_attr(FILENAME_ATTR, "ignored.pdf");
        flow.host().reply(pdf(Some("guide.pdf")));
        block_on(flow.submit());

        assert_eq!(*flow.host().saved.borrow(), vec!["guide.pdf".to_string()]);
    }

    #[test]
    fn server_error_keeps_modal_open() {
        let flow = opened_form("A", "a@b.com", "123");
        flow.host().reply(Err(SubmitError::server(
            422,
            "Unprocessable Entity",
            r#"{"message":"Invalid email"}"#,
        )));
        let outcome = block_on(flow.submit());

        let page = flow.host();
        assert!(matches!(outcome, Outcome::Failed(SubmitError::Server { .. })));
        assert_eq!(page.status_text().as_deref(), Some("Error: Invalid email"));
        assert!(flow.is_open());
        assert!(page.visible.get());
        assert!(!page.busy.get());
        assert!(page.saved.borrow().is_empty());
        assert_eq!(page.resets.get(), 0);
    }

    #[test]
    fn transport_error_can_be_retried() {
        let flow = opened_form("A", "a@b.com", "123");
        flow.host().reply(Err(SubmitError::Transport));
        block_on(flow.submit());
        assert_eq!(flow.host().status_text().as_deref(), Some("Network or server error."));
        assert!(flow.is_open());

        flow.host().reply(pdf(None));
        let outcome = block_on(flow.submit());
        assert!(matches!(outcome, Outcome::Saved { .. }));
        assert_eq!(flow.host().requests.borrow().len(), 2);
    }

    #[test]
    fn success_resets_form_then_closes_after_delay() {
        let flow = opened_form("A", "a@b.com", "123");
        flow.host().reply(pdf(None));
        let outcome = block_on(flow.submit());

        let Outcome::Saved { close: Some(pending), .. } = outcome else {
            panic!("expected a scheduled close, got {:?}", outcome);
        };
        assert_eq!(pending.after, Duration::from_millis(800));

        let page = flow.host();
        assert_eq!(page.status.borrow().as_ref(), Some(&Status::Success));
        assert_eq!(page.resets.get(), 1);
        assert_eq!(page.field_values(), <(String, String, String)>::default());
        assert!(!page.busy.get());
        assert!(page.visible.get());

        flow.close_if_due(pending);
        assert!(!page.visible.get());
        assert_eq!(*page.overflow.borrow(), "auto");
        assert_eq!(page.focused.borrow().last(), Some(&"trigger"));
    }

    #[test]
    fn delayed_close_skipped_after_manual_close_and_reopen() {
        let flow = opened_form("A", "a@b.com", "123");
        flow.host().reply(pdf(None));
        let Outcome::Saved { close: Some(pending), .. } = block_on(flow.submit()) else {
            panic!("expected a scheduled close");
        };

        flow.close();
        flow.open();
        flow.close_if_due(pending);
        assert!(flow.is_open());
        assert!(flow.host().visible.get());
    }

    #[test]
    fn escape_during_request_reenables_submit() {
        let flow = Rc::new(opened_form("A", "a@b.com", "123"));
        let reply = flow.host().reply_later();
        let outcome = Rc::new(RefCell::new(None));

        let mut pool = LocalPool::new();
        {
            let flow = flow.clone();
            let outcome = outcome.clone();
            pool.spawner()
                .spawn_local(async move {
                    *outcome.borrow_mut() = Some(flow.submit().await);
                })
                .unwrap();
        }
        pool.run_until_stalled();
        assert!(flow.host().busy.get());
        assert_eq!(flow.host().status.borrow().as_ref(), Some(&Status::Processing));

        flow.close();
        assert!(!flow.host().busy.get());
        assert!(!flow.host().visible.get());
        assert_eq!(*flow.host().overflow.borrow(), "auto");

        let _ = reply.send(pdf(None));
        pool.run_until_stalled();

        let page = flow.host();
        assert!(!page.busy.get());
        assert_eq!(page.resets.get(), 0);
        assert_eq!(page.status.borrow().as_ref(), Some(&Status::Processing));
        // the file the user asked for is still saved
        assert_eq!(*page.saved.borrow(), vec!["cutter-compactor.pdf".to_string()]);
        assert!(matches!(
            outcome.borrow().as_ref(),
            Some(Outcome::Saved { close: None, .. })
        ));
    }

    #[test]
    fn stale_failure_leaves_reopened_modal_alone() {
        let flow = Rc::new(opened_form("A", "a@b.com", "123"));
        let reply = flow.host().reply_later();

        let mut pool = LocalPool::new();
        {
            let flow = flow.clone();
            pool.spawner()
                .spawn_local(async move {
                    flow.submit().await;
                })
                .unwrap();
        }
        pool.run_until_stalled();
        flow.close();
        flow.open();
        assert_eq!(flow.host().status.borrow().as_ref(), None);

        let _ = reply.send(Err(SubmitError::Transport));
        pool.run_until_stalled();
        assert_eq!(flow.host().status.borrow().as_ref(), None);
        assert!(!flow.host().busy.get());
    }

    #[test]
    fn double_submit_is_ignored_while_running() {
        let flow = Rc::new(opened_form("A", "a@b.com", "123"));
        let reply = flow.host().reply_later();

        let mut pool = LocalPool::new();
        {
            let flow = flow.clone();
            pool.spawner()
                .spawn_local(async move {
                    flow.submit().await;
                })
                .unwrap();
        }
        pool.run_until_stalled();

        assert_eq!(block_on(flow.submit()), Outcome::Ignored);
        assert_eq!(flow.host().requests.borrow().len(), 1);

        let _ = reply.send(pdf(None));
        pool.run_until_stalled();
    }

    #[test]
    fn open_then_close_leaves_no_residue() {
        let page = FakePage::default();
        *page.overflow.borrow_mut() = "auto".to_string();
        let flow = Controller::new(page);

        flow.open();
        assert_eq!(*flow.host().overflow.borrow(), "hidden");
        assert_eq!(*flow.host().focused.borrow(), vec!["name"]);

        flow.close();
        let page = flow.host();
        assert!(!page.visible.get());
        assert_eq!(*page.overflow.borrow(), "auto");
        assert!(!page.busy.get());
        assert!(page.requests.borrow().is_empty());
        assert_eq!(*page.focused.borrow(), vec!["name", "trigger"]);
    }

    #[test]
    fn submit_with_modal_closed_is_ignored() {
        let flow = Controller::new(FakePage::default());
        assert_eq!(block_on(flow.submit()), Outcome::Ignored);
        assert!(flow.host().requests.borrow().is_empty());
    }
}
