//! `splice render` command implementation.

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::PathBuf;

use clap::Args;
use splice_config::{CliSettings, IncludeConfig};
use splice_engine::Includer;

use crate::error::CliError;
use crate::output::Output;

/// Arguments for the render command.
#[derive(Args)]
pub(crate) struct RenderArgs {
    /// Documents to process (default: read stdin).
    inputs: Vec<PathBuf>,

    /// Path to configuration file (default: auto-discover splice.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory relative include paths start from (overrides config).
    #[arg(long)]
    base_path: Option<PathBuf>,

    /// Default encoding of included content (overrides config).
    #[arg(long)]
    encoding: Option<String>,

    /// Leave remote URLs unresolved.
    #[arg(long)]
    no_remote: bool,

    /// Leave local files unresolved.
    #[arg(long)]
    no_local: bool,

    /// Keep directives that fail to resolve instead of removing them.
    #[arg(long)]
    keep_failed: bool,

    /// Write the result to a file instead of stdout (single input only).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable verbose output (show download and cache logs).
    #[arg(short, long)]
    pub verbose: bool,
}

impl RenderArgs {
    /// Execute the render command.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or an input or
    /// output cannot be accessed. Unresolvable directives are not errors.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        if self.output.is_some() && self.inputs.len() > 1 {
            return Err(CliError::Validation(
                "--output requires a single input".to_owned(),
            ));
        }

        let cli_settings = self.cli_settings();
        let config = IncludeConfig::load(self.config.as_deref(), Some(&cli_settings))?;
        if self.verbose {
            output.info(&format!("Base path: {}", config.base_path.display()));
        }
        let includer = Includer::new(config)?;

        match &self.output {
            Some(path) => {
                let mut writer = BufWriter::new(File::create(path)?);
                render(&includer, &self.inputs, io::stdin().lock(), &mut writer)?;
                output.success(&format!("Wrote {}", path.display()));
            }
            None => {
                let mut writer = io::stdout().lock();
                render(&includer, &self.inputs, io::stdin().lock(), &mut writer)?;
            }
        }
        Ok(())
    }

    /// Build config overrides from flags.
    fn cli_settings(&self) -> CliSettings {
        CliSettings {
            base_path: self.base_path.clone(),
            encoding: self.encoding.clone(),
            allow_local: self.no_local.then_some(false),
            allow_remote: self.no_remote.then_some(false),
            truncate_on_failure: self.keep_failed.then_some(false),
        }
    }
}

/// Process every input with one engine, or `stdin` when there are none.
fn render(
    includer: &Includer,
    inputs: &[PathBuf],
    mut stdin: impl Read,
    writer: &mut impl Write,
) -> Result<(), CliError> {
    if inputs.is_empty() {
        let mut document = String::new();
        stdin.read_to_string(&mut document)?;
        writer.write_all(includer.process(&document).as_bytes())?;
    }

    for input in inputs {
        let document = std::fs::read_to_string(input).map_err(|source| CliError::Input {
            path: input.clone(),
            source,
        })?;
        tracing::debug!(path = %input.display(), "Rendering document");
        writer.write_all(includer.process(&document).as_bytes())?;
    }

    writer.flush()?;
    Ok(())
}
