use serde::{Deserialize, Serialize};

/// How loudly a rejection is reported. Ordered from quietest to loudest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warn,
    Error,
    Critical,
}

impl Severity {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }

    /// Expected outcomes such as policy denials stay below this line; gateway faults reach it.
    pub fn is_fault(self) -> bool {
        self >= Self::Error
    }
}
