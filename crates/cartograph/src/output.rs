//! Colored terminal output on stderr.

use cartograph_site::{Diagnostic, Severity};
use console::{Style, Term};

/// Terminal output formatter.
pub(crate) struct Output {
    term: Term,
    green: Style,
    yellow: Style,
    red: Style,
    cyan_bold: Style,
    dim: Style,
}

impl Output {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            green: Style::new().green(),
            yellow: Style::new().yellow(),
            red: Style::new().red(),
            cyan_bold: Style::new().cyan().bold(),
            dim: Style::new().dim(),
        }
    }

    pub(crate) fn info(&self, msg: &str) {
        let _ = self.term.write_line(msg);
    }

    /// Print a success message (green).
    pub(crate) fn success(&self, msg: &str) {
        let _ = self.term.write_line(&self.green.apply_to(msg).to_string());
    }

    /// Print an error message (red).
    pub(crate) fn error(&self, msg: &str) {
        let _ = self.term.write_line(&self.red.apply_to(msg).to_string());
    }

    /// Print a highlighted message (cyan bold).
    pub(crate) fn highlight(&self, msg: &str) {
        let _ = self
            .term
            .write_line(&self.cyan_bold.apply_to(msg).to_string());
    }

    /// Print a diagnostic: severity and code colored, location dimmed.
    pub(crate) fn diagnostic(&self, diagnostic: &Diagnostic) {
        let style = match diagnostic.severity {
            Severity::Error => &self.red,
            Severity::Warning => &self.yellow,
        };
        let head = style.apply_to(format!("{}[{}]", diagnostic.severity, diagnostic.code()));
        let mut line = format!("{head}: {}", diagnostic.error);
        if let Some(location) = &diagnostic.location {
            line.push_str(&format!("\n  {} {location}", self.dim.apply_to("-->")));
        }
        let _ = self.term.write_line(&line);
    }
}
