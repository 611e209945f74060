//! Bookkeeping for one modal on one page view.
//!
//! Every open and close starts a new generation. A submission remembers the
//! generation it started in, so a response that lands after the user closed
//! (or closed and reopened) the modal can be told apart from a live one.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    id: u64,
    generation: u64,
}

impl Attempt {
    pub fn id(&self) -> u64 {
        self.id
    }
}

#[derive(Debug, Default)]
pub struct Session {
    open: bool,
    generation: u64,
    next_attempt: u64,
    in_flight: Option<Attempt>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn in_flight(&self) -> Option<Attempt> {
        self.in_flight
    }

    /// Returns false if the modal was already open.
    pub fn open(&mut self) -> bool {
        if self.open {
            return false;
        }
        self.open = true;
        self.generation += 1;
        true
    }

    /// Returns false if the modal was already closed. Any in-flight attempt
    /// becomes stale.
    pub fn close(&mut self) -> bool {
        if !self.open {
            return false;
        }
        self.open = false;
        self.generation += 1;
        self.in_flight = None;
        true
    }

    /// Starts a submission, unless the modal is closed or one is already running.
    pub fn begin(&mut self) -> Option<Attempt> {
        if !self.open || self.in_flight.is_some() {
            return None;
        }
        self.next_attempt += 1;
        let attempt = Attempt {
            id: self.next_attempt,
            generation: self.generation,
        };
        self.in_flight = Some(attempt);
        Some(attempt)
    }

    pub fn finish(&mut self, attempt: Attempt) {
        if self.in_flight == Some(attempt) {
            self.in_flight = None;
        }
    }

    /// Whether results of `attempt` may still be shown to the user.
    pub fn is_current(&self, attempt: Attempt) -> bool {
        self.open && attempt.generation == self.generation
    }

    /// Whether a delayed close scheduled during `generation` should still fire.
    pub fn close_is_due(&self, generation: u64) -> bool {
        self.open && generation == self.generation
    }
}
