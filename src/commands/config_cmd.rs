use clap::{Args, Subcommand, ValueEnum};

use crate::config::Config;

#[derive(Debug, Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl ConfigCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(config)?);
                    }
                    OutputFormat::Text => print_text(config),
                }
                Ok(())
            }
        }
    }
}

fn print_text(config: &Config) {
    println!("Configuration");
    println!("=============\n");

    if let Some(path) = &config.config_file {
        println!("Config file: {}", path.display());
    } else {
        println!(
            "Config file: {} (not found)",
            Config::default_config_path().display()
        );
    }
    println!();

    println!("snapshot_path: {}", config.snapshot_path.value.display());
    println!("  source: {}", config.snapshot_path.source);
    println!();

    println!("run_log_path: {}", config.run_log_path.value.display());
    println!("  source: {}", config.run_log_path.source);
    println!();

    println!("watch_interval_secs: {}", config.watch_interval_secs.value);
    println!("  source: {}", config.watch_interval_secs.source);
    println!();

    match config.run_timeout_secs {
        Some(secs) => println!("run_timeout_secs: {}", secs),
        None => println!("run_timeout_secs: (none)"),
    }
    println!();

    let remote = &config.remote;
    println!("remote:");
    println!("  url: {}", remote.url.as_deref().unwrap_or("(not set)"));
    println!("  api_key: {}", remote.api_key.as_deref().unwrap_or("(not set)"));
    println!(
        "  api_secret: {}",
        if remote.api_secret.is_some() {
            "********"
        } else {
            "(not set)"
        }
    );
    println!("  timeout_secs: {}", remote.timeout_secs);
    println!("  retry_attempts: {}", remote.retry_attempts);
    println!("  retry_delay_ms: {}", remote.retry_delay_ms);
    println!("  strict_existence_check: {}", remote.strict_existence_check);
}
