use anyhow::{anyhow, Result};
use eframe::NativeOptions;
use editor::EditorConfig;
use tracing_subscriber::EnvFilter;

mod app;
mod notice;
mod preview;
mod strip;

use app::App;

fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();

    let config = EditorConfig::load();
    let options = NativeOptions::default();
    eframe::run_native(
        "quickcut",
        options,
        Box::new(move |_cc| Ok(Box::new(App::new(config)))),
    )
    .map_err(|e| anyhow!("eframe: {e}"))
}
