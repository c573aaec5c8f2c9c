//! Colored terminal output utilities.

use console::{Style, Term};

/// Terminal output formatter.
///
/// Status messages go to stderr; reports go to stdout so they can be piped.
pub(crate) struct Output {
    term: Term,
    report: Term,
    red: Style,
    dim: Style,
    cyan_bold: Style,
}

impl Output {
    /// Create a new output formatter.
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            report: Term::stdout(),
            red: Style::new().red(),
            dim: Style::new().dim(),
            cyan_bold: Style::new().cyan().bold(),
        }
    }

    /// Print an info message.
    pub(crate) fn info(&self, msg: &str) {
        let _ = self.term.write_line(msg);
    }

    /// Print an error message (red).
    pub(crate) fn error(&self, msg: &str) {
        let _ = self.term.write_line(&self.red.apply_to(msg).to_string());
    }

    /// Print a report heading (cyan bold).
    pub(crate) fn heading(&self, msg: &str) {
        let _ = self
            .report
            .write_line(&self.cyan_bold.apply_to(msg).to_string());
    }

    /// Print a report line.
    pub(crate) fn line(&self, msg: &str) {
        let _ = self.report.write_line(msg);
    }

    /// Print a secondary report line (dimmed).
    pub(crate) fn muted(&self, msg: &str) {
        let _ = self.report.write_line(&self.dim.apply_to(msg).to_string());
    }
}
