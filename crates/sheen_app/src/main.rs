mod app;
mod config;

use anyhow::Context;
use clap::Parser;
use sheen_assets::AssetServer;
use sheen_window::{WindowSettings, run_app};

use crate::{
    app::Application,
    config::{Cli, DemoConfig},
};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = DemoConfig::resolve(&cli)?;
    log::info!(
        "Starting with {:?} diffuse, IBL {:?}",
        config.diffuse,
        config.ibl
    );

    // Dedicated I/O runtime for asset decoding; the render loop stays on the main thread.
    let io_runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("sheen-io")
        .build()
        .context("Failed to start the I/O runtime")?;

    let settings = WindowSettings::from(&config.window);
    let app = Application::new(config, AssetServer::new(io_runtime.handle().clone()));
    run_app(app, settings)?;

    log::info!("Shut down cleanly");
    Ok(())
}
