//! User-facing terminal output helpers

use console::Style;

/// Print a warning to stderr. Warnings never alter control flow.
pub fn warning(message: &str) {
    eprintln!("{} {}", Style::new().yellow().bold().apply_to("warning:"), message);
}

/// Print an informational note to stderr.
pub fn note(message: &str) {
    eprintln!("{}", Style::new().dim().apply_to(message));
}
