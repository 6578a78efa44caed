use std::cell::RefCell;
use std::rc::Rc;

/// Fire-and-forget channel for user-facing status lines. Callers never
/// wait on delivery and never fail because of it.
pub trait Notifier {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
}

#[derive(Debug, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn success(&self, message: &str) {
        println!("{message}");
    }

    fn error(&self, message: &str) {
        eprintln!("{message}");
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Error(String),
}

/// Captures notices instead of printing them; clones share the log.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    log: Rc<RefCell<Vec<Notice>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.log.borrow().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.log
            .borrow()
            .iter()
            .filter_map(|notice| match notice {
                Notice::Error(message) => Some(message.clone()),
                Notice::Success(_) => None,
            })
            .collect()
    }

    pub fn successes(&self) -> Vec<String> {
        self.log
            .borrow()
            .iter()
            .filter_map(|notice| match notice {
                Notice::Success(message) => Some(message.clone()),
                Notice::Error(_) => None,
            })
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn success(&self, message: &str) {
        self.log.borrow_mut().push(Notice::Success(message.to_string()));
    }

    fn error(&self, message: &str) {
        self.log.borrow_mut().push(Notice::Error(message.to_string()));
    }
}
