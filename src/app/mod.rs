use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver};
use std::thread;

use eframe::egui::{self, Context, Pos2, Rect, Vec2};

use crate::store::{EdgeRecord, GraphData, GraphStore, NodeRecord, SearchOptions};
use crate::util::circle_contains;

mod find;
mod graph;
mod render_utils;
mod ui;

use find::FindState;
use render_utils::LabelColors;

/// Draw radius of a node circle, in graph units.
pub(crate) const NODE_RADIUS: f32 = 30.0;

pub struct GraphLensApp {
    store: Arc<dyn GraphStore>,
    state: AppState,
}

enum AppState {
    Loading {
        rx: Receiver<Result<GraphData, String>>,
    },
    Ready(Box<SessionView>),
    Error(String),
}

/// Pan offset plus device scale. The single source of truth for mapping
/// between pointer coordinates and graph-space coordinates: rendering and
/// hit-testing both go through these two fields, and hit-testing re-derives
/// the inverse on every call.
pub(crate) struct Viewport {
    pub offset: Vec2,
    pub scale: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            offset: Vec2::ZERO,
            scale: 1.0,
        }
    }
}

impl Viewport {
    pub fn to_screen(&self, rect: Rect, graph: Pos2) -> Pos2 {
        rect.left_top() + self.offset + graph.to_vec2() * self.scale
    }

    pub fn to_graph(&self, rect: Rect, screen: Pos2) -> Pos2 {
        ((screen - rect.left_top() - self.offset) / self.scale).to_pos2()
    }

    /// Inclusive hit test against a circle given in graph space, with the
    /// probe point in screen space.
    pub fn hit_test_circle(&self, rect: Rect, center: Pos2, radius: f32, point: Pos2) -> bool {
        let center = self.to_screen(rect, center);
        circle_contains(center.x, center.y, radius * self.scale, point.x, point.y)
    }
}

pub(crate) struct Node {
    pub id: String,
    pub labels: Vec<String>,
    pub properties: BTreeMap<String, String>,
    /// Graph-space position; `None` until the placement engine locates the
    /// node (or when placement failed).
    pub pos: Option<Pos2>,
    pub hover: bool,
    pub selected: bool,
    pub down: bool,
}

impl Node {
    pub fn from_record(record: NodeRecord) -> Self {
        Self {
            id: record.id,
            labels: record.labels,
            properties: record.properties,
            pos: None,
            hover: false,
            selected: false,
            down: false,
        }
    }

    pub fn to_record(&self) -> NodeRecord {
        NodeRecord {
            id: self.id.clone(),
            labels: self.labels.clone(),
            properties: self.properties.clone(),
        }
    }

    pub fn name(&self) -> &str {
        self.properties
            .get("name")
            .map(String::as_str)
            .unwrap_or(&self.id)
    }

    pub fn primary_label(&self) -> Option<&str> {
        self.labels.first().map(String::as_str)
    }
}

pub(crate) struct Edge {
    pub id: String,
    pub from: String,
    pub to: String,
    pub label: String,
    pub properties: BTreeMap<String, String>,
    /// Label center in graph space, recomputed while drawing. Doubles as the
    /// edge hit-test anchor.
    pub label_pos: Option<Pos2>,
    /// Boundary attachment points of the connecting line, in graph space.
    pub endpoints: Option<(Pos2, Pos2)>,
    pub hover: bool,
    pub selected: bool,
}

impl Edge {
    pub fn from_record(record: EdgeRecord) -> Self {
        Self {
            id: record.id,
            from: record.from,
            to: record.to,
            label: record.label,
            properties: record.properties,
            label_pos: None,
            endpoints: None,
            hover: false,
            selected: false,
        }
    }

    pub fn to_record(&self) -> EdgeRecord {
        EdgeRecord {
            id: self.id.clone(),
            from: self.from.clone(),
            to: self.to.clone(),
            label: self.label.clone(),
            properties: self.properties.clone(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct NodeLinks {
    pub incoming: Vec<String>,
    pub outgoing: Vec<String>,
}

/// The per-session mutable aggregate: viewport transform, entity collections,
/// and the derived adjacency index. Created once per view session and passed
/// by reference to every component.
pub(crate) struct GraphScene {
    pub viewport: Viewport,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub links: HashMap<String, NodeLinks>,
    pub index_by_id: HashMap<String, usize>,
    pub label_colors: LabelColors,
    pub canvas_rect: Rect,
}

#[derive(Clone, Debug, PartialEq)]
enum DragState {
    Idle,
    NodeDown { id: String },
    Panning { start: Pos2, origin: Vec2 },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum DetailView {
    None,
    Node(String),
    Edge(String),
}

struct PendingQuery {
    generation: u64,
    rx: Receiver<Result<GraphData, String>>,
}

#[derive(Clone, Debug)]
enum DeleteTarget {
    Node(String),
    Edge(String),
}

struct PendingDelete {
    target: DeleteTarget,
    rx: Receiver<Result<(), String>>,
}

pub(crate) struct SessionView {
    store: Arc<dyn GraphStore>,
    scene: GraphScene,
    drag: DragState,
    detail: DetailView,
    find: FindState,
    relayout_needed: bool,
    query_generation: u64,
    pending_queries: Vec<PendingQuery>,
    pending_deletes: Vec<PendingDelete>,
    show_frame_stats: bool,
    fps_current: f32,
    fps_samples: VecDeque<f32>,
}

impl GraphLensApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, store: Arc<dyn GraphStore>) -> Self {
        let state = Self::start_load(&store);
        Self { store, state }
    }

    fn start_load(store: &Arc<dyn GraphStore>) -> AppState {
        let store = Arc::clone(store);
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let result = store
                .search(&SearchOptions::default())
                .map_err(|error| format!("{error:#}"));
            let _ = tx.send(result);
        });

        AppState::Loading { rx }
    }
}

impl eframe::App for GraphLensApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.state {
            AppState::Loading { rx } => {
                if let Ok(result) = rx.try_recv() {
                    transition = Some(match result {
                        Ok(data) => AppState::Ready(Box::new(SessionView::new(
                            Arc::clone(&self.store),
                            data,
                        ))),
                        Err(error) => AppState::Error(error),
                    });
                }

                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(120.0);
                        ui.heading("Loading graph...");
                        ui.add_space(8.0);
                        ui.spinner();
                    });
                });
            }
            AppState::Error(error) => {
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.heading("Failed to fetch the graph");
                    ui.add_space(6.0);
                    ui.label(error.as_str());
                    ui.add_space(10.0);
                    if ui.button("Retry").clicked() {
                        transition = Some(Self::start_load(&self.store));
                    }
                });
            }
            AppState::Ready(session) => {
                session.show(ctx);
            }
        }

        if let Some(next_state) = transition {
            self.state = next_state;
        }
    }
}

impl SessionView {
    pub(in crate::app) fn new(store: Arc<dyn GraphStore>, data: GraphData) -> Self {
        Self {
            store,
            scene: GraphScene::new(data),
            drag: DragState::Idle,
            detail: DetailView::None,
            find: FindState::default(),
            relayout_needed: true,
            query_generation: 0,
            pending_queries: Vec::new(),
            pending_deletes: Vec::new(),
            show_frame_stats: true,
            fps_current: 0.0,
            fps_samples: VecDeque::new(),
        }
    }

    /// Run the given queries on a worker thread and adopt the unioned result,
    /// unless a newer query has been issued by the time it resolves.
    pub(in crate::app) fn issue_queries(&mut self, queries: Vec<SearchOptions>) {
        if queries.is_empty() {
            return;
        }

        self.query_generation += 1;
        let generation = self.query_generation;
        let store = Arc::clone(&self.store);
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let mut combined = GraphData::default();
            let mut seen_nodes = std::collections::HashSet::new();
            let mut seen_edges = std::collections::HashSet::new();

            for options in &queries {
                let result = match store.search(options) {
                    Ok(result) => result,
                    Err(error) => {
                        // A failed sub-query degrades to an empty result.
                        log::error!("search failed: {error:#}");
                        continue;
                    }
                };

                for node in result.nodes {
                    if seen_nodes.insert(node.id.clone()) {
                        combined.nodes.push(node);
                    }
                }
                for edge in result.edges {
                    if seen_edges.insert(edge.id.clone()) {
                        combined.edges.push(edge);
                    }
                }
            }

            let _ = tx.send(Ok(combined));
        });

        self.pending_queries.push(PendingQuery { generation, rx });
    }

    pub(in crate::app) fn issue_delete(&mut self, target: DeleteTarget) {
        let store = Arc::clone(&self.store);
        let (tx, rx) = mpsc::channel();
        let remote_target = target.clone();

        thread::spawn(move || {
            let result = match &remote_target {
                DeleteTarget::Node(id) => store.delete_node(id),
                DeleteTarget::Edge(id) => store.delete_edge(id),
            };
            let _ = tx.send(result.map_err(|error| format!("{error:#}")));
        });

        self.pending_deletes.push(PendingDelete { target, rx });
    }

    /// Drain completed remote calls. Search responses older than the latest
    /// issued generation are discarded so a slow early query cannot overwrite
    /// a later one.
    pub(in crate::app) fn poll_pending(&mut self) {
        let mut adopted: Option<GraphData> = None;
        let latest_generation = self.query_generation;

        self.pending_queries.retain_mut(|pending| {
            match pending.rx.try_recv() {
                Ok(Ok(data)) => {
                    if pending.generation == latest_generation {
                        adopted = Some(data);
                    } else {
                        log::info!(
                            "discarding stale search response (generation {} < {})",
                            pending.generation,
                            latest_generation
                        );
                    }
                    false
                }
                Ok(Err(error)) => {
                    log::error!("search failed: {error}");
                    false
                }
                Err(mpsc::TryRecvError::Empty) => true,
                Err(mpsc::TryRecvError::Disconnected) => {
                    log::error!("search worker disconnected before sending a result");
                    false
                }
            }
        });

        if let Some(data) = adopted {
            self.scene.replace_data(data);
            self.relayout_needed = true;
        }

        let mut prune: Vec<DeleteTarget> = Vec::new();
        self.pending_deletes.retain_mut(|pending| {
            match pending.rx.try_recv() {
                Ok(Ok(())) => {
                    prune.push(pending.target.clone());
                    false
                }
                Ok(Err(error)) => {
                    log::error!("delete failed: {error}");
                    false
                }
                Err(mpsc::TryRecvError::Empty) => true,
                Err(mpsc::TryRecvError::Disconnected) => {
                    log::error!("delete worker disconnected before sending a result");
                    false
                }
            }
        });

        for target in prune {
            match target {
                DeleteTarget::Node(id) => self.scene.remove_node(&id),
                DeleteTarget::Edge(id) => self.scene.remove_edge(&id),
            }
            self.detail = DetailView::None;
            self.relayout_needed = true;
        }
    }

    pub(in crate::app) fn has_pending(&self) -> bool {
        !self.pending_queries.is_empty() || !self.pending_deletes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::{Rect, pos2, vec2};

    use super::Viewport;

    #[test]
    fn transform_round_trips_under_pan_and_scale() {
        let viewport = Viewport {
            offset: vec2(13.0, -7.0),
            scale: 2.0,
        };
        let rect = Rect::from_min_max(pos2(100.0, 50.0), pos2(900.0, 650.0));

        let graph = pos2(42.0, 31.5);
        let screen = viewport.to_screen(rect, graph);
        assert_eq!(screen, pos2(100.0 + 13.0 + 84.0, 50.0 - 7.0 + 63.0));
        assert_eq!(viewport.to_graph(rect, screen), graph);
    }

    #[test]
    fn hit_testing_inverts_the_live_transform() {
        let mut viewport = Viewport::default();
        let rect = Rect::from_min_max(pos2(0.0, 0.0), pos2(800.0, 600.0));

        let center = pos2(0.0, 0.0);
        assert!(viewport.hit_test_circle(rect, center, 5.0, pos2(1.0, 1.0)));
        assert!(!viewport.hit_test_circle(rect, center, 5.0, pos2(6.0, 6.0)));
        assert!(viewport.hit_test_circle(rect, center, 6.0, pos2(4.0, 4.0)));

        // Panning moves the hit target with the drawing; there is no cached
        // inverse to go stale.
        viewport.offset = vec2(50.0, 0.0);
        assert!(!viewport.hit_test_circle(rect, center, 5.0, pos2(1.0, 1.0)));
        assert!(viewport.hit_test_circle(rect, center, 5.0, pos2(51.0, 1.0)));

        viewport.offset = vec2(0.0, 0.0);
        viewport.scale = 2.0;
        assert!(viewport.hit_test_circle(rect, pos2(10.0, 0.0), 5.0, pos2(21.0, 1.0)));
        assert!(!viewport.hit_test_circle(rect, pos2(10.0, 0.0), 5.0, pos2(33.0, 1.0)));
    }
}
