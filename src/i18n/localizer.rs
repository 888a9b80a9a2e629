//! Live localization of a mutating document.
//!
//! The dictionary is absent until [`Localizer::load`], which is a one-way
//! transition: it runs a full pass over the document and only then arms
//! observation. Batches observed before that are ignored since the full pass
//! covers every node that existed at load time.

use serde::{Deserialize, Serialize};

use super::directive::{parse_values, MarkerSyntax, ValueTarget};
use super::Dictionary;
use crate::dom::{Document, MutationRecord, NodeId, NodeKind, ObserverOptions};
use crate::types::{Error, LocalizerConfig, Result};

/// Statistics about translation work.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizerStats {
    pub full_passes: u64,
    pub incremental_passes: u64,
    pub writes: u64,
    pub missing_keys: u64,
    pub batches_ignored: u64,
}

#[derive(Debug, Default)]
struct PassOutcome {
    writes: usize,
    missing: usize,
}

/// Keeps a document translated against a dictionary loaded once.
#[derive(Debug)]
pub struct Localizer {
    config: LocalizerConfig,
    dictionary: Option<Dictionary>,
    stats: LocalizerStats,
}

impl Localizer {
    pub fn new(config: LocalizerConfig) -> Self {
        Self {
            config,
            dictionary: None,
            stats: LocalizerStats::default(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.dictionary.is_some()
    }

    pub fn dictionary(&self) -> Option<&Dictionary> {
        self.dictionary.as_ref()
    }

    pub fn stats(&self) -> &LocalizerStats {
        &self.stats
    }

    /// Store the dictionary, translate the whole document, then start
    /// observing it. Returns the number of writes of the full pass.
    pub fn load(&mut self, document: &mut Document, dictionary: Dictionary) -> Result<usize> {
        if self.dictionary.is_some() {
            return Err(Error::state_transition("dictionary already loaded"));
        }
        self.dictionary = Some(dictionary);

        let root = document.root();
        let writes = self.translate(document, root);
        self.stats.full_passes += 1;
        document.observe(root, ObserverOptions::all());

        tracing::info!(
            entries = self.dictionary.as_ref().map_or(0, Dictionary::len),
            writes,
            "Dictionary loaded, observing document"
        );
        Ok(writes)
    }

    /// Apply one observation batch. Returns the number of writes.
    pub fn observe(&mut self, document: &mut Document, batch: &[MutationRecord]) -> usize {
        if self.dictionary.is_none() {
            self.stats.batches_ignored += 1;
            return 0;
        }

        let mut writes = 0;
        for record in batch {
            match record {
                MutationRecord::ChildList { added, .. } => {
                    for &node in added {
                        if document.is_element(node) {
                            writes += self.translate(document, node);
                        }
                    }
                }
                MutationRecord::Attributes { target, .. } => {
                    writes += self.translate_element(document, *target);
                }
            }
        }
        self.stats.incremental_passes += 1;
        tracing::trace!(records = batch.len(), writes, "Observation batch applied");
        writes
    }

    /// Translation pass over `root` and its descendants.
    ///
    /// Returns the number of writes; `0` when no dictionary is loaded.
    pub fn translate(&mut self, document: &mut Document, root: NodeId) -> usize {
        let Some(dictionary) = &self.dictionary else {
            return 0;
        };
        let pass = Pass {
            config: &self.config,
            dictionary,
        };
        let outcome = pass.run(document, root, true);
        self.record(&outcome);
        outcome.writes
    }

    fn translate_element(&mut self, document: &mut Document, node: NodeId) -> usize {
        let Some(dictionary) = &self.dictionary else {
            return 0;
        };
        let pass = Pass {
            config: &self.config,
            dictionary,
        };
        let outcome = pass.run(document, node, false);
        self.record(&outcome);
        outcome.writes
    }

    fn record(&mut self, outcome: &PassOutcome) {
        self.stats.writes += outcome.writes as u64;
        self.stats.missing_keys += outcome.missing as u64;
    }
}

/// One translation pass, borrowing the dictionary for its duration.
struct Pass<'a> {
    config: &'a LocalizerConfig,
    dictionary: &'a Dictionary,
}

impl Pass<'_> {
    fn run(&self, document: &mut Document, root: NodeId, subtree: bool) -> PassOutcome {
        let mut outcome = PassOutcome::default();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            let descend = self.apply(document, node, &mut outcome);
            if subtree && descend {
                stack.extend(document.children(node).iter().rev());
            }
        }
        outcome
    }

    /// Apply the directives of one node. Returns whether its children still
    /// need visiting (not when the element text was replaced).
    fn apply(&self, document: &mut Document, node: NodeId, outcome: &mut PassOutcome) -> bool {
        match document.kind(node) {
            Some(NodeKind::Element { .. }) => self.apply_element(document, node, outcome),
            Some(NodeKind::Text(data)) => {
                let markers = MarkerSyntax {
                    prefix: &self.config.marker_prefix,
                    suffix: &self.config.marker_suffix,
                };
                if let Some(text) = markers.substitute(data, self.dictionary) {
                    self.write(document.set_text_content(node, &text), node, outcome);
                }
                false
            }
            _ => true,
        }
    }

    fn apply_element(
        &self,
        document: &mut Document,
        node: NodeId,
        outcome: &mut PassOutcome,
    ) -> bool {
        let mut descend = true;

        let content_key = document
            .attribute(node, &self.config.content_attribute)
            .map(str::to_owned);
        if let Some(key) = content_key {
            if let Some(value) = self.lookup(&key, outcome) {
                self.write(document.set_text_content(node, value), node, outcome);
                descend = false;
            }
        }

        let values = document
            .attribute(node, &self.config.values_attribute)
            .map(parse_values)
            .unwrap_or_default();
        for binding in values {
            let Some(value) = self.lookup(&binding.key, outcome) else {
                continue;
            };
            match binding.target {
                ValueTarget::Text => {
                    self.write(document.set_text_content(node, value), node, outcome);
                    descend = false;
                }
                ValueTarget::Attribute(name) => {
                    self.write(document.set_attribute(node, &name, value), node, outcome);
                }
            }
        }

        descend
    }

    fn lookup(&self, key: &str, outcome: &mut PassOutcome) -> Option<&str> {
        let value = self.dictionary.get(key);
        if value.is_none() {
            outcome.missing += 1;
            tracing::debug!("Missing translation for key={}", key);
        }
        value
    }

    fn write(&self, result: Result<bool>, node: NodeId, outcome: &mut PassOutcome) {
        match result {
            Ok(true) => outcome.writes += 1,
            Ok(false) => {}
            Err(e) => tracing::warn!("Translation write to node {} failed: {}", node.index(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn dictionary() -> Dictionary {
        [
            ("greet", "Hello"),
            ("tip", "Click to save"),
            ("hint", "Type a host"),
            ("title", "Options"),
        ]
        .into_iter()
        .collect()
    }

    fn element(
        doc: &mut Document,
        parent: NodeId,
        tag: &str,
        attrs: &[(&str, &str)],
        text: &str,
    ) -> NodeId {
        let el = doc.create_element(tag);
        for (name, value) in attrs {
            doc.set_attribute(el, name, value).unwrap();
        }
        if !text.is_empty() {
            let t = doc.create_text(text);
            doc.append_child(el, t).unwrap();
        }
        doc.append_child(parent, el).unwrap();
        el
    }

    #[test]
    fn test_load_translates_existing_nodes_and_arms_observer() {
        let mut doc = Document::new();
        let root = doc.root();
        let h1 = element(&mut doc, root, "h1", &[("i18n-content", "title")], "options");
        let input = element(
            &mut doc,
            root,
            "input",
            &[("i18n-values", "title:tip;placeholder:hint")],
            "",
        );

        let mut localizer = Localizer::new(LocalizerConfig::default());
        let writes = localizer.load(&mut doc, dictionary()).unwrap();

        assert_eq!(writes, 3);
        assert_eq!(doc.text_content(h1), "Options");
        assert_eq!(doc.attribute(input, "title"), Some("Click to save"));
        assert_eq!(doc.attribute(input, "placeholder"), Some("Type a host"));
        assert!(doc.is_observed());
        // The full pass itself is not reported back as mutations
        assert!(doc.take_records().is_empty());
    }

    #[test]
    fn test_second_load_is_rejected() {
        let mut doc = Document::new();
        let mut localizer = Localizer::new(LocalizerConfig::default());
        localizer.load(&mut doc, dictionary()).unwrap();

        let other: Dictionary = [("greet", "Bonjour")].into_iter().collect();
        let err = localizer.load(&mut doc, other).unwrap_err();

        assert!(matches!(err, Error::StateTransition(_)));
        assert_eq!(localizer.dictionary().unwrap().get("greet"), Some("Hello"));
    }

    #[test]
    fn test_batches_before_load_are_ignored() {
        let mut doc = Document::new();
        let root = doc.root();
        let p = element(&mut doc, root, "p", &[("i18n-content", "greet")], "greet");
        let mut localizer = Localizer::new(LocalizerConfig::default());

        let batch = vec![MutationRecord::ChildList {
            target: root,
            added: vec![p],
            removed: vec![],
        }];
        assert_eq!(localizer.observe(&mut doc, &batch), 0);
        assert_eq!(doc.text_content(p), "greet");
        assert_eq!(localizer.stats().batches_ignored, 1);
    }

    #[test]
    fn test_late_element_translated_by_next_batch() {
        let mut doc = Document::new();
        let mut localizer = Localizer::new(LocalizerConfig::default());
        localizer.load(&mut doc, dictionary()).unwrap();

        let root = doc.root();
        let p = element(&mut doc, root, "p", &[("i18n-content", "greet")], "");
        let batch = doc.take_records();
        localizer.observe(&mut doc, &batch);

        assert_eq!(doc.text_content(p), "Hello");
    }

    #[test]
    fn test_nested_late_subtree_translated() {
        let mut doc = Document::new();
        let mut localizer = Localizer::new(LocalizerConfig::default());
        localizer.load(&mut doc, dictionary()).unwrap();

        // Build detached, then attach in one mutation
        let section = doc.create_element("section");
        let label = doc.create_element("label");
        doc.set_attribute(label, "i18n-content", "greet").unwrap();
        doc.append_child(section, label).unwrap();
        let note = doc.create_text("__MSG_title__ page");
        doc.append_child(section, note).unwrap();
        let root = doc.root();
        doc.append_child(root, section).unwrap();

        let batch = doc.take_records();
        assert_eq!(batch.len(), 1);
        localizer.observe(&mut doc, &batch);

        assert_eq!(doc.text_content(label), "Hello");
        assert_eq!(doc.text_content(note), "Options page");
    }

    #[test]
    fn test_attribute_change_retranslates_target() {
        let mut doc = Document::new();
        let root = doc.root();
        let p = element(&mut doc, root, "p", &[("i18n-content", "greet")], "");
        let mut localizer = Localizer::new(LocalizerConfig::default());
        localizer.load(&mut doc, dictionary()).unwrap();

        doc.set_attribute(p, "i18n-content", "title").unwrap();
        let batch = doc.take_records();
        localizer.observe(&mut doc, &batch);

        assert_eq!(doc.text_content(p), "Options");
    }

    #[test]
    fn test_missing_key_keeps_source_text() {
        let mut doc = Document::new();
        let root = doc.root();
        let p = element(&mut doc, root, "p", &[("i18n-content", "unknown_key")], "Original");
        let mut localizer = Localizer::new(LocalizerConfig::default());

        assert_eq!(localizer.load(&mut doc, dictionary()).unwrap(), 0);
        assert_eq!(doc.text_content(p), "Original");
        assert_eq!(localizer.stats().missing_keys, 1);
    }

    #[test]
    fn test_added_text_nodes_are_ignored() {
        let mut doc = Document::new();
        let mut localizer = Localizer::new(LocalizerConfig::default());
        localizer.load(&mut doc, dictionary()).unwrap();

        let root = doc.root();
        let body = doc.create_element("body");
        doc.append_child(root, body).unwrap();
        let batch = doc.take_records();
        localizer.observe(&mut doc, &batch);

        let text = doc.create_text("__MSG_greet__");
        doc.append_child(body, text).unwrap();
        let batch = doc.take_records();
        assert_eq!(localizer.observe(&mut doc, &batch), 0);
        assert_eq!(doc.text_content(text), "__MSG_greet__");
    }

    #[test]
    fn test_custom_directive_attributes() {
        let config = LocalizerConfig {
            content_attribute: "data-i18n".to_string(),
            ..LocalizerConfig::default()
        };
        let mut doc = Document::new();
        let root = doc.root();
        let p = element(&mut doc, root, "p", &[("data-i18n", "greet")], "");
        let ignored = element(&mut doc, root, "p", &[("i18n-content", "greet")], "x");

        Localizer::new(config).load(&mut doc, dictionary()).unwrap();

        assert_eq!(doc.text_content(p), "Hello");
        assert_eq!(doc.text_content(ignored), "x");
    }

    #[test]
    fn test_nested_markers_settle_after_first_pass() {
        let dict: Dictionary = [("a", "see __MSG_b__"), ("b", "B")].into_iter().collect();
        let mut doc = Document::new();
        let root = doc.root();
        let div = element(&mut doc, root, "div", &[], "__MSG_a__");
        let sibling = element(&mut doc, root, "section", &[], "");

        let mut localizer = Localizer::new(LocalizerConfig::default());
        localizer.load(&mut doc, dict).unwrap();
        assert_eq!(doc.text_content(div), "see B");
        assert_eq!(localizer.translate(&mut doc, root), 0);

        doc.append_child(sibling, div).unwrap();
        let batch = doc.take_records();
        assert_eq!(localizer.observe(&mut doc, &batch), 0);
        assert_eq!(doc.text_content(div), "see B");
    }

    const TEMPLATES: [&str; 6] = [
        "Plain words",
        "see __MSG_k1__",
        "__MSG_k2__ and __MSG_k3__",
        "loop __MSG_k0__",
        "keeps __MSG_absent__",
        "",
    ];

    /// Own text children and title of each node, unaffected by moving
    /// elements between them.
    fn snapshot(doc: &Document, nodes: &[NodeId]) -> Vec<(Vec<String>, Option<String>)> {
        nodes
            .iter()
            .map(|&n| {
                let texts = doc
                    .children(n)
                    .iter()
                    .filter_map(|&c| match doc.kind(c) {
                        Some(NodeKind::Text(data)) => Some(data.clone()),
                        _ => None,
                    })
                    .collect();
                (texts, doc.attribute(n, "title").map(str::to_owned))
            })
            .collect()
    }

    proptest! {
        #[test]
        fn prop_translation_is_idempotent(
            values in proptest::collection::vec(0..TEMPLATES.len(), 4),
            keys in proptest::collection::vec(
                prop_oneof![Just("k0"), Just("k1"), Just("k2"), Just("k3"), Just("absent")],
                1..12,
            ),
        ) {
            let dict: Dictionary = values
                .iter()
                .enumerate()
                .map(|(i, &t)| (format!("k{i}"), TEMPLATES[t]))
                .collect();

            let mut doc = Document::new();
            let root = doc.root();
            let mut nodes = Vec::new();
            for (i, key) in keys.iter().enumerate() {
                let el = doc.create_element("span");
                match i % 3 {
                    0 => doc.set_attribute(el, "i18n-content", key).unwrap(),
                    1 => doc.set_attribute(el, "i18n-values", &format!("title:{key}")).unwrap(),
                    _ => false,
                };
                let text = doc.create_text(format!("src __MSG_{key}__ / __MSG_k{}__", i % 4));
                doc.append_child(el, text).unwrap();
                doc.append_child(root, el).unwrap();
                nodes.push(el);
            }

            let mut localizer = Localizer::new(LocalizerConfig::default());
            localizer.load(&mut doc, dict).unwrap();
            let loaded = snapshot(&doc, &nodes);

            let second = localizer.translate(&mut doc, root);
            prop_assert_eq!(second, 0);
            prop_assert_eq!(&loaded, &snapshot(&doc, &nodes));
            prop_assert!(doc.take_records().is_empty());

            // Moving a translated subtree re-runs the pass on it
            if let [first, .., last] = nodes.as_slice() {
                doc.append_child(*last, *first).unwrap();
                let batch = doc.take_records();
                prop_assert_eq!(localizer.observe(&mut doc, &batch), 0);
                prop_assert_eq!(&loaded, &snapshot(&doc, &nodes));
            }
        }
    }
}
