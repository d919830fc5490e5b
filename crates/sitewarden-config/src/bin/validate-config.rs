//! Config validation CLI tool
//!
//! Validates a sitewardend configuration file and reports any errors.

use sitewarden_util::default_config_path;
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-config [config-file]");
            eprintln!();
            eprintln!("Validates a sitewardend configuration file.");
            eprintln!();
            eprintln!("Example:");
            eprintln!("  validate-config {}", default_path.display());
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match sitewarden_config::load_config(&config_path) {
        Ok(config) => {
            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", sitewarden_config::CURRENT_CONFIG_VERSION);
            println!("  Data dir: {}", config.service.data_dir.display());
            println!("  Block page: {}", config.extension.block_page);
            println!("  Config page: {}", config.extension.config_page);
            println!(
                "  Whitelist cleanup: every {} min",
                config.whitelist.cleanup_period.as_secs() / 60
            );
            println!(
                "  Write retries: {} attempts, {:?} initial backoff",
                config.persistence.max_attempts, config.persistence.initial_backoff
            );

            if let Some(sites) = &config.seed.blocked_sites {
                println!();
                println!("Seed block-list:");
                for site in sites {
                    println!("  - {}", site);
                }
            }
            if let Some(settings) = &config.seed.settings {
                println!();
                println!(
                    "Seed window: {} - {} ({})",
                    settings.time_from,
                    settings.time_to,
                    if settings.time_slots_enabled { "enabled" } else { "disabled" }
                );
            }

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                sitewarden_config::ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                sitewarden_config::ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                sitewarden_config::ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                sitewarden_config::ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver,
                        sitewarden_config::CURRENT_CONFIG_VERSION
                    );
                }
            }
            ExitCode::from(1)
        }
    }
}
