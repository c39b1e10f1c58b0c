//! `cartograph watch` command implementation.

use std::path::PathBuf;
use std::sync::Arc;

use cartograph_config::Config;
use cartograph_site::{BuildOutcome, Site};
use cartograph_storage::{FsStorage, Storage, StorageEventReceiver};
use clap::Args;

use super::{CommonArgs, report, write_site_map};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the watch command.
#[derive(Args)]
pub(crate) struct WatchArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Site map output file (overrides config).
    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// Why the event loop returned.
enum Stop {
    ConfigChanged,
    Closed,
}

impl WatchArgs {
    /// Execute the watch command.
    ///
    /// Runs until the event stream closes. A changed configuration file
    /// replaces the site and rebuilds from scratch; an invalid one is
    /// reported and the previous site kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial configuration fails or watching
    /// cannot be started.
    pub(crate) fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let storage = Arc::new(FsStorage::new());
        let mut site = self.start(&output, &storage, self.common.load_config(self.output.clone())?);

        loop {
            let mut roots = site.watch_paths();
            roots.extend(site.config().config_path.clone());
            let (events, handle) = storage.watch(&roots)?;
            output.info(&format!("Watching {} paths for changes", roots.len()));

            let stop = watch_events(&output, &site, &events);
            handle.stop();
            match stop {
                Stop::Closed => return Ok(()),
                Stop::ConfigChanged => match self.common.load_config(self.output.clone()) {
                    Ok(config) => {
                        output.highlight("Configuration changed, rebuilding");
                        site = self.start(&output, &storage, config);
                    }
                    Err(e) => output.error(&format!("Failed to reload configuration: {e}")),
                },
            }
        }
    }

    fn start(&self, output: &Output, storage: &Arc<FsStorage>, config: Config) -> Site {
        let site = Site::new(Arc::clone(storage) as Arc<dyn Storage>, Arc::new(config));
        publish(output, &site, &site.build());
        site
    }
}

/// Rebuild on every batch of events until the configuration changes or the
/// stream closes.
fn watch_events(output: &Output, site: &Site, events: &StorageEventReceiver) -> Stop {
    let config_path = site.config().config_path.as_deref();
    while let Some(first) = events.recv() {
        let mut paths = vec![first.path];
        while let Some(event) = events.try_recv() {
            paths.push(event.path);
        }
        if config_path.is_some_and(|config| paths.iter().any(|p| p == config)) {
            return Stop::ConfigChanged;
        }
        tracing::debug!(changes = paths.len(), "Sources changed");
        publish(output, site, &site.rebuild(paths));
    }
    Stop::Closed
}

/// Report a build and write the site map when it assembled.
fn publish(output: &Output, site: &Site, outcome: &BuildOutcome) {
    if let Err(e) = report(output, outcome) {
        output.error(&format!("{e}; keeping the previous site map"));
        return;
    }
    if let Some(site_map) = outcome.site_map() {
        let target = &site.config().output_resolved;
        match write_site_map(site_map, target) {
            Ok(()) => output.info(&format!("Site map written to {}", target.display())),
            Err(e) => output.error(&format!("Failed to write site map: {e}")),
        }
    }
}
