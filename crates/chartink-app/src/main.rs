//! Main application entry point (native).

#[cfg(all(feature = "native", not(target_arch = "wasm32")))]
fn main() {
    use std::rc::Rc;

    use chartink_core::config::EngineConfig;
    use chartink_core::storage::FileKv;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Starting chartink demo");

    let config = match std::env::var("CHARTINK_CONFIG") {
        Ok(path) => match std::fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|json| EngineConfig::from_json(&json).map_err(|e| e.to_string()))
        {
            Ok(config) => config,
            Err(e) => {
                log::error!("Cannot read config {}: {}", path, e);
                std::process::exit(1);
            }
        },
        Err(_) => EngineConfig::default(),
    };
    let slot = std::env::args().nth(1).unwrap_or_else(|| "demo".to_string());

    let kv = match FileKv::default_location() {
        Ok(kv) => kv,
        Err(e) => {
            log::error!("Storage unavailable: {}", e);
            std::process::exit(1);
        }
    };
    log::info!("Storing projects under {}", kv.base_path().display());

    match chartink_app::run_demo(config, Rc::new(kv), &slot) {
        Ok(report) => {
            log::info!(
                "Placed {} drawings, {} draw commands",
                report.drawings,
                report.commands
            );
            for label in &report.labels {
                log::info!("  label: {}", label);
            }
            log::info!("Saved projects: {}", report.projects.join(", "));
            chartink_app::ShortcutRegistry::log_all();
        }
        Err(e) => {
            log::error!("Demo failed: {}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(not(all(feature = "native", not(target_arch = "wasm32"))))]
fn main() {
    eprintln!("Native feature not enabled. Use `cargo run --features native`");
}
