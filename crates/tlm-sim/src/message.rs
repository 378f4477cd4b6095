//! Message channel between components and the user.
//!
//! Every posted message is also emitted as a `tracing` event at the matching
//! level, so a subscriber sees it as it happens; the handler keeps a bounded
//! backlog for callers that poll.

use serde::Serialize;
use std::collections::VecDeque;
use tracing::{debug, error, info, warn};

/// Severity of a [`Message`]. `Fatal` aborts the running simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum MessageLevel {
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub level: MessageLevel,
    /// Component path that posted the message, e.g. `Sub/Orifice`.
    pub source: String,
    pub text: String,
}

const DEFAULT_CAPACITY: usize = 10_000;

/// Bounded queue of messages; the oldest entries are dropped when full.
#[derive(Debug, Clone)]
pub struct MessageHandler {
    queue: VecDeque<Message>,
    capacity: usize,
    dropped: usize,
    fatal: Option<Message>,
}

impl Default for MessageHandler {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl MessageHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            capacity: capacity.max(1),
            dropped: 0,
            fatal: None,
        }
    }

    pub fn post(&mut self, level: MessageLevel, source: &str, text: impl Into<String>) {
        let text = text.into();
        match level {
            MessageLevel::Debug => debug!(source, "{text}"),
            MessageLevel::Info => info!(source, "{text}"),
            MessageLevel::Warning => warn!(source, "{text}"),
            MessageLevel::Error => error!(source, "{text}"),
            MessageLevel::Fatal => error!(source, fatal = true, "{text}"),
        }
        self.push(Message {
            level,
            source: source.to_string(),
            text,
        });
    }

    fn push(&mut self, message: Message) {
        if message.level == MessageLevel::Fatal && self.fatal.is_none() {
            self.fatal = Some(message.clone());
        }
        if self.queue.len() == self.capacity {
            self.queue.pop_front();
            self.dropped += 1;
        }
        self.queue.push_back(message);
    }

    pub fn debug(&mut self, source: &str, text: impl Into<String>) {
        self.post(MessageLevel::Debug, source, text);
    }

    pub fn info(&mut self, source: &str, text: impl Into<String>) {
        self.post(MessageLevel::Info, source, text);
    }

    pub fn warning(&mut self, source: &str, text: impl Into<String>) {
        self.post(MessageLevel::Warning, source, text);
    }

    pub fn error(&mut self, source: &str, text: impl Into<String>) {
        self.post(MessageLevel::Error, source, text);
    }

    /// Post a fatal message; the owning system stops after the current component.
    pub fn fatal(&mut self, source: &str, text: impl Into<String>) {
        self.post(MessageLevel::Fatal, source, text);
    }

    /// The first fatal message since the last [`MessageHandler::take_fatal`].
    pub fn take_fatal(&mut self) -> Option<Message> {
        self.fatal.take()
    }

    pub fn has_fatal(&self) -> bool {
        self.fatal.is_some()
    }

    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.queue.iter()
    }

    pub fn count(&self, level: MessageLevel) -> usize {
        self.queue.iter().filter(|m| m.level == level).count()
    }

    /// Messages evicted because the backlog was full.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn drain(&mut self) -> Vec<Message> {
        self.queue.drain(..).collect()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.dropped = 0;
        self.fatal = None;
    }

    /// Move the messages of a subsystem into this handler, prefixing sources
    /// with `prefix/`. Absorbed messages are not traced again.
    pub fn absorb(&mut self, other: &mut MessageHandler, prefix: &str) {
        for mut m in other.queue.drain(..) {
            m.source = format!("{prefix}/{}", m.source);
            self.push(m);
        }
        self.dropped += std::mem::take(&mut other.dropped);
        if let Some(mut fatal) = other.fatal.take() {
            fatal.source = format!("{prefix}/{}", fatal.source);
            self.fatal.get_or_insert(fatal);
        }
    }
}
