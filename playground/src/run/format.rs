use clap::ValueEnum;
use serde::Serialize;
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

/// The report representations the engine can produce.
///
/// The `Display`/`AsRef<str>` form is the key passed to the engine; [`OutputFormat::label`]
/// is what the selector shows.
#[derive(
    Debug,
    Default,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    ValueEnum,
    Serialize,
    Display,
    AsRefStr,
    EnumIter,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Human,
    Ci,
    Json,
    Sarif,
    Junit,
}

/// How much the rendered output trusts the engine's text.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Trust {
    /// Written through verbatim, styling included.
    ///
    /// kube-score only colours its `human` report when its stdout is a terminal.
    /// The engine runs with piped stdout and has no flag to force colour, so in
    /// practice this is plain text; any escapes it does carry are kept.
    Markup,
    /// Shown exactly as produced, with control sequences neutralised.
    Literal,
}

impl OutputFormat {
    pub fn label(&self) -> &'static str {
        match self {
            OutputFormat::Human => "CLI",
            OutputFormat::Ci => "CI",
            OutputFormat::Json => "JSON",
            OutputFormat::Sarif => "SARIF",
            OutputFormat::Junit => "JUnit",
        }
    }

    pub fn trust(&self) -> Trust {
        match self {
            OutputFormat::Human => Trust::Markup,
            OutputFormat::Ci | OutputFormat::Json | OutputFormat::Sarif | OutputFormat::Junit => {
                Trust::Literal
            }
        }
    }

    pub fn all() -> impl Iterator<Item = OutputFormat> {
        OutputFormat::iter()
    }
}
