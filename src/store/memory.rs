use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use anyhow::{Context, Result};

use super::{EdgeRecord, FocusFilter, GraphData, GraphStore, NodeRecord, SearchOptions};

/// In-memory graph store, optionally backed by a JSON file on disk. Stands in
/// for the remote store service so the application runs stand-alone.
pub struct JsonStore {
    path: Option<PathBuf>,
    data: Mutex<GraphData>,
}

impl JsonStore {
    pub fn open(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("failed to read graph data from {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("invalid graph JSON in {}", path.display()))?
        } else {
            GraphData::default()
        };

        Ok(Self {
            path: Some(path),
            data: Mutex::new(data),
        })
    }

    pub fn empty() -> Self {
        Self::with_data(GraphData::default())
    }

    pub fn with_data(data: GraphData) -> Self {
        Self {
            path: None,
            data: Mutex::new(data),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, GraphData> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, data: &GraphData) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let raw = serde_json::to_string_pretty(data).context("failed to serialize graph data")?;
        fs::write(path, raw)
            .with_context(|| format!("failed to write graph data to {}", path.display()))
    }

    fn focus_matches(node: &NodeRecord, filter: &FocusFilter) -> bool {
        let label_matches = node
            .labels
            .first()
            .is_some_and(|label| label.eq_ignore_ascii_case(&filter.label));
        if !label_matches {
            return false;
        }

        match &filter.property {
            Some((key, value)) => node
                .properties
                .get(key)
                .is_some_and(|actual| actual.eq_ignore_ascii_case(value)),
            None => true,
        }
    }
}

impl GraphStore for JsonStore {
    fn search(&self, options: &SearchOptions) -> Result<GraphData> {
        let data = self.lock();

        let Some(filter) = &options.focus else {
            return Ok(data.clone());
        };

        // Matching entities plus their one-hop neighborhood, with all edges
        // induced on the included set.
        let mut included: HashSet<String> = data
            .nodes
            .iter()
            .filter(|node| Self::focus_matches(node, filter))
            .map(|node| node.id.clone())
            .collect();

        for edge in &data.edges {
            if included.contains(&edge.from) || included.contains(&edge.to) {
                included.insert(edge.from.clone());
                included.insert(edge.to.clone());
            }
        }

        let nodes = data
            .nodes
            .iter()
            .filter(|node| included.contains(&node.id))
            .cloned()
            .collect::<Vec<_>>();
        let node_ids: HashSet<&str> = nodes.iter().map(|node| node.id.as_str()).collect();
        let edges = data
            .edges
            .iter()
            .filter(|edge| {
                node_ids.contains(edge.from.as_str()) && node_ids.contains(edge.to.as_str())
            })
            .cloned()
            .collect();

        Ok(GraphData { nodes, edges })
    }

    fn save_node(&self, node: &NodeRecord) -> Result<()> {
        let mut data = self.lock();
        match data.nodes.iter_mut().find(|existing| existing.id == node.id) {
            Some(existing) => *existing = node.clone(),
            None => data.nodes.push(node.clone()),
        }
        self.persist(&data)
    }

    fn save_edge(&self, edge: &EdgeRecord) -> Result<()> {
        let mut data = self.lock();
        match data.edges.iter_mut().find(|existing| existing.id == edge.id) {
            Some(existing) => *existing = edge.clone(),
            None => data.edges.push(edge.clone()),
        }
        self.persist(&data)
    }

    fn delete_node(&self, id: &str) -> Result<()> {
        let mut data = self.lock();
        data.nodes.retain(|node| node.id != id);
        data.edges.retain(|edge| edge.from != id && edge.to != id);
        self.persist(&data)
    }

    fn delete_edge(&self, id: &str) -> Result<()> {
        let mut data = self.lock();
        data.edges.retain(|edge| edge.id != id);
        self.persist(&data)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::super::EdgeRecord;
    use super::*;

    fn node(id: &str, label: &str, props: &[(&str, &str)]) -> NodeRecord {
        NodeRecord {
            id: id.to_owned(),
            labels: vec![label.to_owned()],
            properties: props
                .iter()
                .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    fn edge(id: &str, from: &str, to: &str) -> EdgeRecord {
        EdgeRecord {
            id: id.to_owned(),
            from: from.to_owned(),
            to: to.to_owned(),
            label: "knows".to_owned(),
            properties: BTreeMap::new(),
        }
    }

    fn sample() -> GraphData {
        GraphData {
            nodes: vec![
                node("n1", "person", &[("name", "Eric")]),
                node("n2", "person", &[("name", "Dana"), ("title", "Manager")]),
                node("n3", "place", &[("name", "Lisbon")]),
            ],
            edges: vec![edge("e1", "n1", "n2"), edge("e2", "n2", "n3")],
        }
    }

    #[test]
    fn unfiltered_search_returns_everything() {
        let store = JsonStore::with_data(sample());
        let result = store.search(&SearchOptions::default()).expect("search");
        assert_eq!(result.nodes.len(), 3);
        assert_eq!(result.edges.len(), 2);
    }

    #[test]
    fn focus_search_scopes_to_neighborhood() {
        let store = JsonStore::with_data(sample());
        let options = SearchOptions::focused(FocusFilter::property("person", "name", "eric"));
        let result = store.search(&options).expect("search");

        // n1 matches; n2 joins as its neighbor; n3 is two hops out.
        let ids: Vec<&str> = result.nodes.iter().map(|n| n.id.as_str()).collect();
        assert!(ids.contains(&"n1"));
        assert!(ids.contains(&"n2"));
        assert!(!ids.contains(&"n3"));
        assert_eq!(result.edges.len(), 1);
        assert_eq!(result.edges[0].id, "e1");
    }

    #[test]
    fn focus_by_label_only() {
        let store = JsonStore::with_data(sample());
        let options = SearchOptions::focused(FocusFilter::label_only("place"));
        let result = store.search(&options).expect("search");
        assert!(result.nodes.iter().any(|n| n.id == "n3"));
    }

    #[test]
    fn save_node_upserts_by_id() {
        let store = JsonStore::with_data(sample());
        let updated = node("n1", "person", &[("name", "Erik")]);
        store.save_node(&updated).expect("save");
        store.save_node(&updated).expect("save again");

        let result = store.search(&SearchOptions::default()).expect("search");
        assert_eq!(result.nodes.len(), 3);
        let n1 = result.nodes.iter().find(|n| n.id == "n1").expect("n1");
        assert_eq!(n1.properties.get("name").map(String::as_str), Some("Erik"));
    }

    #[test]
    fn delete_node_removes_incident_edges() {
        let store = JsonStore::with_data(sample());
        store.delete_node("n2").expect("delete");
        store.delete_node("n2").expect("idempotent delete");

        let result = store.search(&SearchOptions::default()).expect("search");
        assert_eq!(result.nodes.len(), 2);
        assert!(result.edges.is_empty());
    }

    #[test]
    fn persists_mutations_to_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("graph.json");

        let store = JsonStore::open(path.clone()).expect("open");
        store
            .save_node(&node("n1", "person", &[("name", "Eric")]))
            .expect("save");
        drop(store);

        let reopened = JsonStore::open(path).expect("reopen");
        let result = reopened.search(&SearchOptions::default()).expect("search");
        assert_eq!(result.nodes.len(), 1);
    }
}
