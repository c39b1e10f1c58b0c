//! `cartograph build` command implementation.

use std::path::PathBuf;
use std::sync::Arc;

use cartograph_storage::FsStorage;
use clap::Args;

use super::{CommonArgs, report, write_site_map};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the build command.
#[derive(Args)]
pub(crate) struct BuildArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Site map output file (overrides config).
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl BuildArgs {
    /// Execute the build command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails, the build is rejected or the
    /// site map cannot be written.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = Arc::new(self.common.load_config(self.output)?);
        let target = config.output_resolved.clone();

        let outcome = cartograph_site::build(&FsStorage::new(), config);
        report(&output, &outcome)?;

        if let Some(site_map) = outcome.site_map() {
            write_site_map(site_map, &target)?;
            output.info(&format!("Site map written to {}", target.display()));
        }
        Ok(())
    }
}
