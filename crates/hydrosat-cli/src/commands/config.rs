use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use hydrosat_core::monitor::MonitorConfig;

#[derive(Args)]
pub struct ConfigArgs {
    /// Write config to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Validate an existing config file instead of printing the defaults
    #[arg(long, conflicts_with = "output")]
    pub check: Option<PathBuf>,
}

/// Print or save the default engine config as TOML, or validate a file.
pub fn run(args: &ConfigArgs) -> Result<()> {
    if let Some(ref path) = args.check {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: MonitorConfig = toml::from_str(&contents).context("Invalid engine config")?;
        config.validate()?;
        println!("{} is valid", path.display());
        return Ok(());
    }

    let toml_str = toml::to_string_pretty(&MonitorConfig::default())?;

    if let Some(ref path) = args.output {
        std::fs::write(path, &toml_str)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        println!("Default config saved to {}", path.display());
    } else {
        print!("{}", toml_str);
    }

    Ok(())
}
