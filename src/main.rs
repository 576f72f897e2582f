mod app;
mod store;
mod util;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use crate::store::{GraphStore, JsonStore};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// JSON graph file to load and persist. Starts empty when omitted.
    #[arg(long)]
    data: Option<PathBuf>,
}

fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let store: Arc<dyn GraphStore> = match args.data {
        Some(path) => match JsonStore::open(path) {
            Ok(store) => Arc::new(store),
            Err(error) => {
                log::error!("failed to open graph data file: {error:#}");
                Arc::new(JsonStore::empty())
            }
        },
        None => Arc::new(JsonStore::empty()),
    };

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    eframe::run_native(
        "graph-lens",
        options,
        Box::new(move |cc| Ok(Box::new(app::GraphLensApp::new(cc, store)))),
    )
}
