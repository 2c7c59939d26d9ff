mod app;
mod assets;
mod marker;

use anyhow::Result;
use app::App;
use oba_experiment::{ExperimentConfig, KeyboardLayout};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

// Session metadata, fixed at startup. There are deliberately no CLI
// flags; edit these constants between sessions.
const SUBJECT_ID: &str = "test";
const KEYBOARD: &str = "numpad";
const SEND_MARKERS: bool = false;
const IMAGE_ROOT: &str = "image/cyc03/FBA";
const DATA_ROOT: &str = "data";

fn session_config() -> Result<ExperimentConfig> {
    let keyboard: KeyboardLayout = KEYBOARD.parse()?;
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let log_path = PathBuf::from(DATA_ROOT).join(format!("cyc03_fba_{stamp}_{SUBJECT_ID}.json"));
    Ok(ExperimentConfig {
        subject_id: SUBJECT_ID.to_string(),
        keyboard,
        send_markers: SEND_MARKERS,
        log_path,
        ..ExperimentConfig::default()
    })
}

fn main() -> Result<()> {
    let config = session_config()?;
    println!("=== FBA TILT-DETECTION EXPERIMENT ===");
    println!("Subject: {}", config.subject_id);
    println!("Log: {}", config.log_path.display());
    println!("Press the response key to begin, the quit key to abort.\n");

    let app = App::new(config, PathBuf::from(IMAGE_ROOT))?;
    app.run()
}
