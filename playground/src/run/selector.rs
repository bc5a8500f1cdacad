use super::format::OutputFormat;
use serde::Serialize;
use std::fmt;

/// One selectable control in the output format selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FormatOption {
    pub format: OutputFormat,
    pub label: &'static str,
    pub selected: bool,
}

impl fmt::Display for FormatOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = if self.selected { "●" } else { "○" };
        write!(f, "{} {}", marker, self.label)
    }
}

/// All formats in their fixed order, with `current` marked as selected.
pub fn format_options(current: OutputFormat) -> Vec<FormatOption> {
    OutputFormat::all()
        .map(|format| FormatOption {
            format,
            label: format.label(),
            selected: format == current,
        })
        .collect()
}
