//! Navigation targets gated on document readiness.

use std::fmt;

/// Receives navigation targets (e.g. `#general`) once the page can show them.
pub type NavigationSink = Box<dyn FnMut(&str) + Send>;

/// Holds targets until the document is ready, then hands them to the sink in
/// arrival order.
#[derive(Default)]
pub struct Navigation {
    ready: bool,
    queued: Vec<String>,
    current: Option<String>,
    sink: Option<NavigationSink>,
}

impl Navigation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_sink(&mut self, sink: NavigationSink) {
        self.sink = Some(sink);
    }

    /// Last target handed to the sink.
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn queued(&self) -> &[String] {
        &self.queued
    }

    pub fn show(&mut self, target: String) {
        if self.ready {
            self.deliver(target);
        } else {
            tracing::debug!("Document not ready, queueing navigation to {}", target);
            self.queued.push(target);
        }
    }

    pub fn document_ready(&mut self) {
        if self.ready {
            return;
        }
        self.ready = true;
        for target in std::mem::take(&mut self.queued) {
            self.deliver(target);
        }
    }

    fn deliver(&mut self, target: String) {
        match &mut self.sink {
            Some(sink) => sink(&target),
            None => tracing::debug!("No navigation sink, target {} recorded only", target),
        }
        self.current = Some(target);
    }
}

impl fmt::Debug for Navigation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Navigation")
            .field("ready", &self.ready)
            .field("queued", &self.queued)
            .field("current", &self.current)
            .field("sink", &self.sink.is_some())
            .finish()
    }
}
