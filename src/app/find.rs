use std::collections::HashSet;
use std::time::{Duration, Instant};

use eframe::egui::Context;

use crate::store::{FocusFilter, SearchOptions};

use super::{Node, SessionView};

/// Trailing debounce for local highlight while typing.
const HIGHLIGHT_DEBOUNCE: Duration = Duration::from_millis(500);

/// One parsed search term. `label:x` scopes by label, `key:value` by a
/// property, and a bare token is an implicit name lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(in crate::app) enum SearchTerm {
    Label(String),
    Property { key: String, value: String },
}

impl SearchTerm {
    fn matches(&self, node: &Node) -> bool {
        match self {
            SearchTerm::Label(label) => node
                .primary_label()
                .is_some_and(|primary| primary.eq_ignore_ascii_case(label)),
            SearchTerm::Property { key, value } => node
                .properties
                .get(key)
                .is_some_and(|actual| actual.eq_ignore_ascii_case(value)),
        }
    }

    fn dedup_key(&self) -> String {
        match self {
            SearchTerm::Label(label) => format!("label\u{1}{}", label.to_lowercase()),
            SearchTerm::Property { key, value } => {
                format!("{}\u{1}{}", key.to_lowercase(), value.to_lowercase())
            }
        }
    }
}

/// Which matching node's primary label an unlabeled term inherits when the
/// committed query needs one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) enum UnlabeledTermPolicy {
    /// The last matching node in array order wins (original behavior).
    LastMatchingLabel,
    FirstMatchingLabel,
}

impl UnlabeledTermPolicy {
    pub(in crate::app) fn label(self) -> &'static str {
        match self {
            Self::LastMatchingLabel => "last matching label",
            Self::FirstMatchingLabel => "first matching label",
        }
    }
}

pub(in crate::app) struct FindState {
    pub text: String,
    pub policy: UnlabeledTermPolicy,
    pending_highlight: Option<PendingHighlight>,
}

impl Default for FindState {
    fn default() -> Self {
        Self {
            text: String::new(),
            policy: UnlabeledTermPolicy::LastMatchingLabel,
            pending_highlight: None,
        }
    }
}

struct PendingHighlight {
    deadline: Instant,
    name: String,
}

/// Split the input into terms. Returns `None` while the input is incomplete
/// (empty, or a trailing `key:` with no value yet).
pub(in crate::app) fn parse_terms(text: &str) -> Option<Vec<SearchTerm>> {
    let mut terms = Vec::new();

    for token in text.split(" and ") {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }

        match token.split_once(':') {
            Some((key, value)) => {
                let key = key.trim();
                let value = value.trim();
                if value.is_empty() {
                    return None;
                }

                if key.eq_ignore_ascii_case("label") {
                    terms.push(SearchTerm::Label(value.to_owned()));
                } else {
                    terms.push(SearchTerm::Property {
                        key: key.to_owned(),
                        value: value.to_owned(),
                    });
                }
            }
            None => terms.push(SearchTerm::Property {
                key: "name".to_owned(),
                value: token.to_owned(),
            }),
        }
    }

    if terms.is_empty() { None } else { Some(terms) }
}

fn name_starts_with(node: &Node, prefix: &str) -> bool {
    node.properties
        .get("name")
        .is_some_and(|name| name.to_lowercase().starts_with(&prefix.to_lowercase()))
}

impl SessionView {
    pub(in crate::app) fn find_changed(&mut self) {
        self.find_input(false);
    }

    pub(in crate::app) fn find_committed(&mut self) {
        self.find_input(true);
    }

    fn find_input(&mut self, committed: bool) {
        let text = self.find.text.clone();

        // Committing an empty box resets the focus to everything.
        if committed && text.trim().is_empty() {
            self.find.pending_highlight = None;
            self.issue_queries(vec![SearchOptions::default()]);
            return;
        }

        let Some(terms) = parse_terms(&text) else {
            return;
        };

        if let [SearchTerm::Property { key, value }] = terms.as_slice()
            && key == "name"
        {
            let name = value.clone();
            self.find_by_name(name, committed);
            return;
        }

        self.find_multi(&terms, committed);
    }

    fn find_by_name(&mut self, name: String, committed: bool) {
        if name.chars().count() < 2 {
            return;
        }

        self.scene.clear_selection();

        if committed {
            self.find.pending_highlight = None;

            let matched = self
                .scene
                .nodes
                .iter()
                .find(|node| name_starts_with(node, &name));
            let Some(node) = matched else {
                return;
            };
            let Some(label) = node.primary_label() else {
                log::warn!("node {} has no label to focus on", node.id);
                return;
            };

            // Query with the node's exact label and name, not the typed
            // prefix.
            let filter = FocusFilter::property(label, "name", node.name());
            self.issue_queries(vec![SearchOptions::focused(filter)]);
            return;
        }

        // Trailing debounce: every keystroke pushes the deadline out so
        // rapid typing does not highlight every intermediate prefix.
        self.find.pending_highlight = Some(PendingHighlight {
            deadline: Instant::now() + HIGHLIGHT_DEBOUNCE,
            name,
        });
    }

    /// Fires the debounced highlight once its deadline passes. Runs every
    /// frame from the session loop.
    pub(in crate::app) fn service_find(&mut self, ctx: &Context) {
        let now = Instant::now();
        match &self.find.pending_highlight {
            None => return,
            Some(pending) if now < pending.deadline => {
                ctx.request_repaint_after(pending.deadline - now);
                return;
            }
            Some(_) => {}
        }

        if let Some(pending) = self.find.pending_highlight.take() {
            self.highlight_by_name(&pending.name);
        }
    }

    fn highlight_by_name(&mut self, name: &str) {
        let Some(id) = self
            .scene
            .nodes
            .iter()
            .find(|node| name_starts_with(node, name))
            .map(|node| node.id.clone())
        else {
            return;
        };

        self.scene.clear_selection();
        if let Some(node) = self.scene.node_mut(&id) {
            node.selected = true;
        }

        // The found node anchors the next relayout and paints on top.
        self.scene.move_to_front(&id);
        self.relayout_needed = true;
    }

    fn find_multi(&mut self, terms: &[SearchTerm], committed: bool) {
        self.find.pending_highlight = None;
        self.scene.clear_selection();

        // Local highlight: a node must match every term. While scanning,
        // record which labels the unlabeled terms could inherit.
        let policy = self.find.policy;
        let mut per_term_label: Vec<Option<String>> = vec![None; terms.len()];
        let mut fallback_label: Option<String> = None;

        for node in &mut self.scene.nodes {
            let mut matches_all = true;
            for (index, term) in terms.iter().enumerate() {
                if !term.matches(node) {
                    matches_all = false;
                    continue;
                }

                if let Some(label) = node.labels.first() {
                    match policy {
                        UnlabeledTermPolicy::LastMatchingLabel => {
                            per_term_label[index] = Some(label.clone());
                            fallback_label = Some(label.clone());
                        }
                        UnlabeledTermPolicy::FirstMatchingLabel => {
                            per_term_label[index].get_or_insert_with(|| label.clone());
                            fallback_label.get_or_insert_with(|| label.clone());
                        }
                    }
                }
            }
            node.selected = matches_all;
        }

        if !committed {
            return;
        }

        // One focus query per distinct term; the union of the responses
        // replaces the current data.
        let mut seen = HashSet::new();
        let mut queries = Vec::new();
        for (index, term) in terms.iter().enumerate() {
            if !seen.insert(term.dedup_key()) {
                continue;
            }

            match term {
                SearchTerm::Label(label) => {
                    let label = per_term_label[index].clone().unwrap_or_else(|| label.clone());
                    queries.push(SearchOptions::focused(FocusFilter::label_only(label)));
                }
                SearchTerm::Property { key, value } => {
                    let label = per_term_label[index]
                        .clone()
                        .or_else(|| fallback_label.clone());
                    let Some(label) = label else {
                        log::warn!(
                            "no label known for term {key}:{value}, skipping its focus query"
                        );
                        continue;
                    };

                    queries.push(SearchOptions::focused(FocusFilter::property(
                        label,
                        key.clone(),
                        value.clone(),
                    )));
                }
            }
        }

        self.issue_queries(queries);
    }
}
