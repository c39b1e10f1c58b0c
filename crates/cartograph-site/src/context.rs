//! Build context threaded through every pipeline stage.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use cartograph_config::{Config, LinkPolicy};

use crate::diagnostics::{BuildError, Diagnostic, Severity, SourceLocation};

/// Pipeline stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    /// Content registry scan.
    Scanning,
    /// Sidebar parsing and navigation tree building.
    TreeBuilding,
    /// Route resolution.
    Resolving,
    /// Link integrity validation.
    Validating,
    /// Site map assembly.
    Assembling,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Scanning => "scanning",
            Self::TreeBuilding => "tree building",
            Self::Resolving => "resolving",
            Self::Validating => "validating",
            Self::Assembling => "assembling",
        })
    }
}

/// A failed build with every diagnostic collected up to the failing stage.
#[derive(Debug, thiserror::Error)]
#[error("build rejected while {stage}")]
pub struct Rejected {
    /// Stage that produced the first error.
    pub stage: Stage,
    /// All diagnostics, warnings included.
    pub diagnostics: Vec<Diagnostic>,
}

/// Generation counter shared by builds of one site.
#[derive(Clone, Debug, Default)]
pub(crate) struct Generations(Arc<AtomicU64>);

impl Generations {
    /// Issue a ticket that supersedes every earlier one.
    pub fn issue(&self) -> GenerationTicket {
        let generation = self.0.fetch_add(1, Ordering::AcqRel) + 1;
        GenerationTicket {
            generation,
            latest: Arc::clone(&self.0),
        }
    }

    pub fn latest(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }
}

/// Identifies one build; stale once a newer build is requested.
#[derive(Debug)]
pub struct GenerationTicket {
    generation: u64,
    latest: Arc<AtomicU64>,
}

impl GenerationTicket {
    /// Generation number of this build.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether no newer build has been requested.
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.latest.load(Ordering::Acquire) == self.generation
    }
}

/// Per-build state: configuration, diagnostics, current stage and ticket.
pub struct BuildContext {
    config: Arc<Config>,
    diagnostics: Vec<Diagnostic>,
    stage: Stage,
    ticket: GenerationTicket,
}

impl BuildContext {
    /// Create a context for one build.
    #[must_use]
    pub fn new(config: Arc<Config>, ticket: GenerationTicket) -> Self {
        Self {
            config,
            diagnostics: Vec::new(),
            stage: Stage::Scanning,
            ticket,
        }
    }

    /// Create a context with a private ticket that is never superseded.
    #[must_use]
    pub fn standalone(config: Arc<Config>) -> Self {
        Self::new(config, Generations::default().issue())
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn config_arc(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Whether drafts are included.
    #[must_use]
    pub fn preview(&self) -> bool {
        self.config.build.preview
    }

    #[must_use]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    #[must_use]
    pub fn ticket(&self) -> &GenerationTicket {
        &self.ticket
    }

    /// Diagnostics collected so far.
    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub(crate) fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Move to the next stage.
    pub fn enter(&mut self, stage: Stage) {
        self.stage = stage;
        tracing::info!(stage = %stage, generation = self.ticket.generation, "Entering build stage");
    }

    /// Record a diagnostic.
    pub fn report(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Error => tracing::debug!(code = diagnostic.code(), "{}", diagnostic.error),
            Severity::Warning => tracing::warn!(code = diagnostic.code(), "{}", diagnostic.error),
        }
        self.diagnostics.push(diagnostic);
    }

    /// Record an error.
    pub fn error(&mut self, error: BuildError, location: Option<SourceLocation>) {
        let mut diagnostic = Diagnostic::error(error);
        diagnostic.location = location;
        self.report(diagnostic);
    }

    /// Record a warning.
    pub fn warn(&mut self, error: BuildError, location: Option<SourceLocation>) {
        let mut diagnostic = Diagnostic::warning(error);
        diagnostic.location = location;
        self.report(diagnostic);
    }

    /// Record a link problem at the severity its policy asks for.
    pub(crate) fn report_link(
        &mut self,
        policy: LinkPolicy,
        error: BuildError,
        location: Option<SourceLocation>,
    ) {
        match policy {
            LinkPolicy::Error => self.error(error, location),
            LinkPolicy::Warn => self.warn(error, location),
            LinkPolicy::Ignore => {}
        }
    }

    /// Number of errors reported so far.
    #[must_use]
    pub fn error_count(&self) -> usize {
        crate::diagnostics::error_count(&self.diagnostics)
    }

    /// Stop the build if the current stage reported errors.
    ///
    /// # Errors
    ///
    /// Returns [`Rejected`] carrying every diagnostic when any error was
    /// reported.
    pub fn checkpoint(&mut self) -> Result<(), Rejected> {
        if self.error_count() == 0 {
            return Ok(());
        }
        Err(self.reject())
    }

    /// Reject the build at the current stage.
    pub(crate) fn reject(&mut self) -> Rejected {
        Rejected {
            stage: self.stage,
            diagnostics: self.take_diagnostics(),
        }
    }

    /// Display path relative to the site root.
    pub(crate) fn display_path(&self, path: &Path) -> std::path::PathBuf {
        path.strip_prefix(&self.config.root_dir)
            .unwrap_or(path)
            .to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ContentId;

    fn context() -> BuildContext {
        BuildContext::standalone(Arc::new(Config::default_with_base(Path::new("/site"))))
    }

    #[test]
    fn test_newer_ticket_supersedes_older() {
        let generations = Generations::default();
        let first = generations.issue();
        assert!(first.is_current());

        let second = generations.issue();
        assert!(!first.is_current());
        assert!(second.is_current());
        assert_eq!(second.generation(), 2);
        assert_eq!(generations.latest(), 2);
    }

    #[test]
    fn test_checkpoint_passes_with_warnings_only() {
        let mut ctx = context();
        ctx.warn(
            BuildError::DraftNavReference {
                id: ContentId::new("docs", "wip"),
                location: "main[0]".to_owned(),
            },
            None,
        );

        assert!(ctx.checkpoint().is_ok());
        assert_eq!(ctx.diagnostics().len(), 1);
    }

    #[test]
    fn test_checkpoint_rejects_with_all_diagnostics() {
        let mut ctx = context();
        ctx.enter(Stage::Resolving);
        ctx.warn(
            BuildError::EmptyCategoryPruned {
                label: "Empty".to_owned(),
                location: "main[0]".to_owned(),
            },
            None,
        );
        ctx.error(
            BuildError::AssemblyInvariantViolation {
                message: "boom".to_owned(),
            },
            None,
        );

        let rejected = ctx.checkpoint().unwrap_err();
        assert_eq!(rejected.stage, Stage::Resolving);
        assert_eq!(rejected.diagnostics.len(), 2);
        assert!(ctx.diagnostics().is_empty());
    }

    #[test]
    fn test_report_link_respects_policy() {
        let mut ctx = context();
        let err = || BuildError::DanglingNavLink {
            target: "/nowhere".to_owned(),
            location: "navbar[0]".to_owned(),
        };

        ctx.report_link(LinkPolicy::Ignore, err(), None);
        ctx.report_link(LinkPolicy::Warn, err(), None);
        ctx.report_link(LinkPolicy::Error, err(), None);

        let severities: Vec<_> = ctx.diagnostics().iter().map(|d| d.severity).collect();
        assert_eq!(severities, vec![Severity::Warning, Severity::Error]);
    }
}
