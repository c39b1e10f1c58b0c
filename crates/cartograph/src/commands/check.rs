//! `cartograph check` command implementation.

use std::sync::Arc;

use cartograph_storage::FsStorage;
use clap::Args;

use super::{CommonArgs, report};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the check command.
#[derive(Args)]
pub(crate) struct CheckArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}

impl CheckArgs {
    /// Execute the check command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the build is rejected.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = Arc::new(self.common.load_config(None)?);
        let outcome = cartograph_site::build(&FsStorage::new(), config);
        report(&output, &outcome)
    }
}
