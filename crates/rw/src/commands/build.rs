//! `rw build` command implementation.

use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use rw_config::{CliSettings, Config};

use crate::docs::{DocsSettings, docs_site};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the build command.
#[derive(Args)]
pub(crate) struct BuildArgs {
    /// Path to configuration file (default: auto-discover rw.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Markdown source directory (overrides config).
    #[arg(long)]
    source_dir: Option<PathBuf>,

    /// Output directory (overrides config, default: dist).
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// Enable verbose logging.
    #[arg(long)]
    pub(crate) verbose: bool,

    /// Only print errors.
    #[arg(short, long)]
    silent: bool,
}

impl BuildArgs {
    /// Execute the build command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, rendering or writing fails.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new(self.silent);
        let started = Instant::now();

        let cli_settings = CliSettings {
            source_dir: self.source_dir,
            out_dir: self.out_dir,
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        if let Some(ref config_path) = config.config_path {
            output.info(&format!("Config: {}", config_path.display()));
        }
        output.info(&format!(
            "Source: {}",
            config.docs_resolved.source_dir.display()
        ));
        output.info(&format!(
            "Output: {}",
            config.build_resolved.out_dir.display()
        ));

        let site = docs_site(DocsSettings::from_config(&config));
        let paths = site.build_all(None).await?;

        output.success(&format!(
            "Built {} files in {:.2?}",
            paths.len(),
            started.elapsed()
        ));
        output.highlight(&site.out_dir().display().to_string());
        Ok(())
    }
}
