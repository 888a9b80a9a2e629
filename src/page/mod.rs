//! Options page runtime - the single cooperative event loop.
//!
//! The `Page` owns the document, the localizer and the navigation state.
//! Everything that happens to it arrives as a [`Task`] on one queue and is
//! processed strictly in arrival order:
//! ```text
//!   peer transport ──Inbound──┐
//!   channel callbacks ────────┼──▶ queue ──▶ Page::process ──▶ flush mutations
//!   embedder (DOM, ready) ────┘                                 └─▶ Localizer
//! ```
//! Channel callbacks never touch page state directly; they enqueue tasks.
//! After each task the mutation records collected on the document are
//! flushed to the localizer as observation batches.

mod navigation;

pub use navigation::{Navigation, NavigationSink};

use serde_json::Value;
use std::fmt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::channel::{Channel, Envelope};
use crate::dom::Document;
use crate::i18n::{Dictionary, Localizer};
use crate::protocol::{I18N_CACHE, OPTIONS_INIT, TAB_GET, TAB_SET};
use crate::types::LocalizerConfig;

/// Unit of work for the page loop.
pub enum Task {
    /// Envelope received from the peer.
    Inbound(Envelope),
    /// Dictionary response arrived.
    DictionaryArrived(Dictionary),
    /// `options.init` received, with its payload.
    Init(Value),
    /// A navigation target was resolved.
    Navigate(String),
    /// The document finished loading.
    DocumentReady,
    /// Embedder mutation of the document.
    Mutate(Box<dyn FnOnce(&mut Document) + Send>),
}

impl From<Envelope> for Task {
    fn from(envelope: Envelope) -> Self {
        Task::Inbound(envelope)
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::Inbound(env) => f.debug_tuple("Inbound").field(&env.kind).finish(),
            Task::DictionaryArrived(dict) => {
                f.debug_tuple("DictionaryArrived").field(&dict.len()).finish()
            }
            Task::Init(payload) => f.debug_tuple("Init").field(payload).finish(),
            Task::Navigate(target) => f.debug_tuple("Navigate").field(target).finish(),
            Task::DocumentReady => f.write_str("DocumentReady"),
            Task::Mutate(_) => f.write_str("Mutate"),
        }
    }
}

/// Sender and receiver of a page queue.
pub type TaskQueue = (mpsc::UnboundedSender<Task>, mpsc::UnboundedReceiver<Task>);

/// Create a page queue. The sender is what a peer's transport posts into.
pub fn task_queue() -> TaskQueue {
    mpsc::unbounded_channel()
}

/// The options document and its event loop.
pub struct Page {
    channel: Channel,
    document: Document,
    localizer: Localizer,
    navigation: Navigation,
    location_hash: Option<String>,
    max_flush_rounds: usize,
    started: bool,
    tasks: mpsc::UnboundedSender<Task>,
    queue: mpsc::UnboundedReceiver<Task>,
}

impl Page {
    pub fn new(channel: Channel, queue: TaskQueue, config: LocalizerConfig) -> Self {
        let (tasks, queue) = queue;
        Self {
            channel,
            document: Document::new(),
            max_flush_rounds: config.max_flush_rounds.max(1),
            localizer: Localizer::new(config),
            navigation: Navigation::new(),
            location_hash: None,
            started: false,
            tasks,
            queue,
        }
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Direct access for the embedder; records are flushed on the next
    /// processed task or [`Page::run_until_idle`].
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn localizer(&self) -> &Localizer {
        &self.localizer
    }

    pub fn navigation(&self) -> &Navigation {
        &self.navigation
    }

    /// Sender for submitting tasks from outside the loop.
    pub fn sender(&self) -> mpsc::UnboundedSender<Task> {
        self.tasks.clone()
    }

    pub fn set_location_hash(&mut self, hash: Option<String>) {
        self.location_hash = hash.filter(|h| !h.is_empty());
    }

    pub fn location_hash(&self) -> Option<&str> {
        self.location_hash.as_deref()
    }

    /// Register the embedder's navigation callback.
    pub fn on_navigate<F>(&mut self, sink: F)
    where
        F: FnMut(&str) + Send + 'static,
    {
        self.navigation.set_sink(Box::new(sink));
    }

    /// Request the dictionary and listen for the lifecycle event.
    /// Calling it again has no effect.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;

        let tasks = self.tasks.clone();
        self.channel.on(OPTIONS_INIT, move |payload, _| {
            let _ = tasks.send(Task::Init(payload.clone()));
        });

        let tasks = self.tasks.clone();
        self.channel.request(I18N_CACHE, Value::Null, move |payload| {
            match Dictionary::from_payload(&payload) {
                Ok(dictionary) => {
                    let _ = tasks.send(Task::DictionaryArrived(dictionary));
                }
                Err(e) => tracing::warn!("Unusable dictionary response: {}", e),
            }
        });
        tracing::debug!("Options page started");
    }

    /// Tell the host which tab is shown so it can be restored later.
    pub fn remember_tab(&self, hash: &str) {
        self.channel.send(TAB_SET, Value::String(hash.to_string()));
    }

    // =========================================================================
    // Event loop
    // =========================================================================

    /// Process one task, then flush pending mutation records.
    pub fn process(&mut self, task: Task) {
        tracing::trace!(?task, "Processing task");
        match task {
            Task::Inbound(envelope) => self.channel.dispatch(envelope),
            Task::DictionaryArrived(dictionary) => {
                if let Err(e) = self.localizer.load(&mut self.document, dictionary) {
                    tracing::warn!("Ignoring dictionary: {}", e);
                }
            }
            Task::Init(payload) => self.handle_init(&payload),
            Task::Navigate(target) => self.navigation.show(target),
            Task::DocumentReady => {
                self.document.mark_ready();
                self.navigation.document_ready();
            }
            Task::Mutate(mutate) => mutate(&mut self.document),
        }
        self.flush_mutations();
    }

    /// Drain every queued task without waiting. Returns how many ran.
    pub fn run_until_idle(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(task) = self.queue.try_recv() {
            self.process(task);
            processed += 1;
        }
        self.flush_mutations();
        processed
    }

    /// Run the loop until cancelled.
    pub async fn run(&mut self, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("Options page loop cancelled");
                    break;
                }
                task = self.queue.recv() => match task {
                    Some(task) => self.process(task),
                    None => break,
                },
            }
        }
    }

    /// Hand collected records to the localizer, one batch per round, until
    /// the document is quiet or the round limit is hit.
    fn flush_mutations(&mut self) -> usize {
        let mut rounds = 0;
        while rounds < self.max_flush_rounds {
            let batch = self.document.take_records();
            if batch.is_empty() {
                return rounds;
            }
            self.localizer.observe(&mut self.document, &batch);
            rounds += 1;
        }
        if self.document.has_pending_records() {
            tracing::warn!(
                rounds,
                "Mutation records still pending after flush limit, deferring"
            );
        }
        rounds
    }

    /// Resolve the navigation target for `options.init`: the payload, then
    /// the location hash (cleared once used), then the host's remembered tab.
    fn handle_init(&mut self, payload: &Value) {
        let target = payload
            .as_str()
            .filter(|t| !t.is_empty())
            .map(str::to_owned)
            .or_else(|| self.location_hash.take());

        match target {
            Some(target) => self.navigation.show(target),
            None => {
                let tasks = self.tasks.clone();
                self.channel.request(TAB_GET, Value::Null, move |answer| {
                    if let Some(hash) = answer.as_str().filter(|h| !h.is_empty()) {
                        let _ = tasks.send(Task::Navigate(hash.to_string()));
                    }
                });
            }
        }
    }
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("channel", &self.channel)
            .field("localized", &self.localizer.is_loaded())
            .field("navigation", &self.navigation)
            .field("started", &self.started)
            .finish_non_exhaustive()
    }
}
