mod memory;

pub use memory::JsonStore;

use std::collections::BTreeMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Wire shape of a graph entity as the store returns it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: String,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    #[serde(default)]
    pub labels: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub id: String,
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GraphData {
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    #[serde(default)]
    pub edges: Vec<EdgeRecord>,
}

/// Scopes a search to entities carrying one label, optionally narrowed
/// further to a single property value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FocusFilter {
    pub label: String,
    pub property: Option<(String, String)>,
}

impl FocusFilter {
    pub fn label_only(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            property: None,
        }
    }

    pub fn property(
        label: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            label: label.into(),
            property: Some((key.into(), value.into())),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchOptions {
    pub focus: Option<FocusFilter>,
}

impl SearchOptions {
    pub fn focused(filter: FocusFilter) -> Self {
        Self {
            focus: Some(filter),
        }
    }
}

/// Remote graph store boundary. Calls block and are expected to run on a
/// worker thread; implementations must be shareable across threads.
pub trait GraphStore: Send + Sync {
    fn search(&self, options: &SearchOptions) -> Result<GraphData>;

    /// Idempotent upsert by id.
    fn save_node(&self, node: &NodeRecord) -> Result<()>;

    /// Idempotent upsert by id.
    fn save_edge(&self, edge: &EdgeRecord) -> Result<()>;

    /// Idempotent remove. Deleting a node also removes its edges store-side.
    fn delete_node(&self, id: &str) -> Result<()>;

    fn delete_edge(&self, id: &str) -> Result<()>;
}
