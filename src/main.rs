#![allow(dead_code)]

mod app;
mod config;
mod data;
mod error;
mod gui;
mod pipeline;

use clap::Parser;

use app::ReadmeApp;
use config::{Cli, Config};
use data::readme::APP_NAME;

fn main() -> eframe::Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();
    log::info!("Starting {} v{}", APP_NAME, env!("CARGO_PKG_VERSION"));

    let config = Config::load_or_default(cli.config.as_deref());
    let startup_file = cli.file;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([900.0, 1000.0])
            .with_min_inner_size([640.0, 480.0])
            .with_title(APP_NAME)
            .with_drag_and_drop(true),
        ..Default::default()
    };

    eframe::run_native(
        APP_NAME,
        options,
        Box::new(move |cc| Ok(Box::new(ReadmeApp::new(cc, config, startup_file)))),
    )
}
