//! Subcommand handlers for config actions.

use std::path::Path;

use super::args::ConfigAction;
use crate::config::{default_path, Config};

const DEFAULT_CONFIG: &str = r#"# parallax configuration

[display]
# Tag shown in brackets before every row
# label = "spm"
# Disable keyboard echo while the display is live
disable_input = true
# Spinner interval in milliseconds
tick_ms = 100

[scheduler]
# Maximum number of commands running at once
parallel = 4
"#;

/// Handle config subcommand actions. Returns the process exit code.
pub fn handle_config_action(action: ConfigAction, path: Option<&Path>) -> i32 {
    let config_path = path.map(Path::to_path_buf).unwrap_or_else(default_path);

    match action {
        ConfigAction::Show => {
            let config = match Config::load(Some(&config_path)) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return 1;
                }
            };

            println!("Current configuration:");
            println!(
                "  Label: {}",
                config.display.label.as_deref().unwrap_or("(none)")
            );
            println!(
                "  Disable input: {}",
                if config.display.disable_input { "yes" } else { "no" }
            );
            println!("  Tick: {}ms", config.display.tick_ms);
            println!("  Parallel: {}", config.scheduler.parallel);
            println!();

            if config_path.exists() {
                println!("Config file: {} (exists)", config_path.display());
            } else {
                println!("Config file: {} (not found)", config_path.display());
            }
            0
        }
        ConfigAction::Init => {
            if config_path.exists() {
                eprintln!("Config file already exists: {}", config_path.display());
                eprintln!("Use 'parallax config show' to view current settings.");
                return 1;
            }

            if let Some(parent) = config_path.parent() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    eprintln!("Error creating config directory: {}", e);
                    return 1;
                }
            }

            if let Err(e) = std::fs::write(&config_path, DEFAULT_CONFIG) {
                eprintln!("Error writing config file: {}", e);
                return 1;
            }

            println!("Created config file: {}", config_path.display());
            0
        }
    }
}
