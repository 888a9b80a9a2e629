//! Background-side peer of the options page.
//!
//! Serves the dictionary, remembers the last shown tab and announces
//! `options.init`. Like the page, it owns an inbox drained by its own loop.

use serde_json::Value;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::channel::{Channel, Envelope};
use crate::i18n::Dictionary;
use crate::protocol::{I18N_CACHE, OPTIONS_INIT, TAB_GET, TAB_SET};

#[derive(Debug)]
pub struct OptionsHost {
    channel: Channel,
    dictionary: Dictionary,
    last_tab: Arc<Mutex<Option<String>>>,
    inbox: mpsc::UnboundedReceiver<Envelope>,
}

impl OptionsHost {
    pub fn new(
        channel: Channel,
        dictionary: Dictionary,
        inbox: mpsc::UnboundedReceiver<Envelope>,
    ) -> Self {
        Self {
            channel,
            dictionary,
            last_tab: Arc::new(Mutex::new(None)),
            inbox,
        }
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    /// Register the `i18n.cache`, `tab.get` and `tab.set` handlers.
    pub fn install(&self) {
        let dictionary = self.dictionary.clone();
        let remembered = self.last_tab.clone();
        let store = self.last_tab.clone();

        self.channel
            .on(I18N_CACHE, move |_, responder| {
                responder.respond(dictionary.to_payload());
            })
            .on(TAB_GET, move |_, responder| {
                let tab = remembered
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone();
                responder.respond(tab.map(Value::String).unwrap_or(Value::Null));
            })
            .on(TAB_SET, move |payload, _| match payload.as_str() {
                Some(hash) => {
                    tracing::debug!("Remembering tab {}", hash);
                    *store.lock().unwrap_or_else(PoisonError::into_inner) = Some(hash.to_string());
                }
                None => tracing::debug!("Ignoring tab.set without a string payload"),
            });
    }

    /// Emit `options.init`, optionally naming the tab to show.
    pub fn announce(&self, target: Option<&str>) {
        let payload = target
            .map(|t| Value::String(t.to_string()))
            .unwrap_or(Value::Null);
        self.channel.send(OPTIONS_INIT, payload);
    }

    pub fn last_tab(&self) -> Option<String> {
        self.last_tab
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Dispatch every queued envelope. Returns how many ran.
    pub fn run_until_idle(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(envelope) = self.inbox.try_recv() {
            self.channel.dispatch(envelope);
            processed += 1;
        }
        processed
    }

    /// Dispatch envelopes until cancelled or the inbox closes.
    pub async fn run(&mut self, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                envelope = self.inbox.recv() => match envelope {
                    Some(envelope) => self.channel.dispatch(envelope),
                    None => {
                        tracing::debug!("Host inbox closed");
                        break;
                    }
                },
            }
        }
    }
}
