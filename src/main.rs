use eframe::egui;
use std::path::PathBuf;

use zema_player::config::{default_config_path, load_config};
use zema_player::ui::ZemaApp;

fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args: Vec<String> = std::env::args().collect();
    let initial_path = args.get(1).map(PathBuf::from);

    let config_path = default_config_path();
    let config = load_config(&config_path);

    eframe::run_native(
        "Zema Player",
        eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size([720.0, 480.0])
                .with_min_inner_size([360.0, 200.0]),
            ..Default::default()
        },
        Box::new(|cc| Ok(Box::new(ZemaApp::new(cc, config, config_path, initial_path)))),
    )
}
