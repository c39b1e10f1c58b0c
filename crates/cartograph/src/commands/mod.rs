//! CLI command implementations.

pub(crate) mod build;
pub(crate) mod check;
pub(crate) mod watch;

use std::fs;
use std::path::{Path, PathBuf};

use cartograph_config::{CliSettings, Config};
use cartograph_site::{BuildOutcome, SiteMap, error_count};
use clap::Args;

use crate::error::CliError;
use crate::output::Output;

pub(crate) use build::BuildArgs;
pub(crate) use check::CheckArgs;
pub(crate) use watch::WatchArgs;

/// Arguments shared by every command.
#[derive(Args)]
pub(crate) struct CommonArgs {
    /// Path to configuration file (default: auto-discover cartograph.toml).
    #[arg(short, long, env = "CARTOGRAPH_CONFIG")]
    config: Option<PathBuf>,

    /// Include draft content (overrides config).
    #[arg(long)]
    preview: bool,

    /// Fail on unreadable or malformed sources instead of skipping them.
    #[arg(long)]
    strict: bool,

    /// Enable verbose output (stage timing and per-collection logs).
    #[arg(short, long)]
    pub verbose: bool,
}

impl CommonArgs {
    /// Load the configuration with CLI overrides applied.
    pub(crate) fn load_config(&self, output: Option<PathBuf>) -> Result<Config, CliError> {
        let cli_settings = CliSettings {
            preview: self.preview.then_some(true),
            strict_scan: self.strict.then_some(true),
            output,
        };
        Ok(Config::load(self.config.as_deref(), Some(&cli_settings))?)
    }
}

/// Print every diagnostic and a summary line.
///
/// Returns an error when the build was rejected.
pub(crate) fn report(output: &Output, outcome: &BuildOutcome) -> Result<(), CliError> {
    for diagnostic in outcome.diagnostics() {
        output.diagnostic(diagnostic);
    }
    match outcome {
        BuildOutcome::Assembled {
            site_map,
            diagnostics,
        } => {
            output.success(&format!(
                "Composed {} routes, {} sections ({} warnings)",
                site_map.routes().len(),
                site_map.sections().len(),
                diagnostics.len()
            ));
            Ok(())
        }
        BuildOutcome::Rejected(rejected) => Err(CliError::BuildFailed {
            stage: rejected.stage,
            errors: error_count(&rejected.diagnostics),
        }),
        BuildOutcome::Superseded { generation } => {
            output.info(&format!("Build {generation} superseded"));
            Ok(())
        }
    }
}

/// Write the site map as pretty JSON, creating parent directories.
pub(crate) fn write_site_map(site_map: &SiteMap, path: &Path) -> Result<(), CliError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut json = site_map.to_json_pretty()?;
    json.push('\n');
    fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use cartograph_storage::FsStorage;
    use clap::Parser;
    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        common: CommonArgs,
    }

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("docs")).unwrap();
        fs::write(dir.path().join("docs/intro.md"), "# Intro\n").unwrap();
        fs::write(dir.path().join("cartograph.toml"), "[build]\nmax_nav_depth = 4\n").unwrap();
        dir
    }

    #[test]
    fn test_flags_override_config() {
        let dir = fixture();
        let config_path = dir.path().join("cartograph.toml");
        let cli = TestCli::parse_from([
            "cartograph",
            "--config",
            config_path.to_str().unwrap(),
            "--preview",
            "--strict",
        ]);

        let config = cli.common.load_config(Some(PathBuf::from("out.json"))).unwrap();

        assert!(config.build.preview);
        assert!(config.build.strict_scan);
        assert_eq!(config.build.max_nav_depth, 4);
        assert_eq!(config.output_resolved, PathBuf::from("out.json"));
    }

    #[test]
    fn test_write_site_map_creates_directories() {
        let dir = fixture();
        let config = Config::load(Some(&dir.path().join("cartograph.toml")), None).unwrap();
        let target = config.output_resolved.clone();

        let outcome = cartograph_site::build(&FsStorage::new(), Arc::new(config));
        report(&Output::new(), &outcome).unwrap();
        write_site_map(outcome.site_map().unwrap(), &target).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&target).unwrap()).unwrap();
        assert_eq!(json["routes"]["/intro"]["kind"], "doc");
    }
}
