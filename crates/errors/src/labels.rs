use crate::model::ErrorObj;

/// Label names of the rejection counter, in the order [`labels`] fills them.
pub const LABEL_NAMES: [&str; 4] = ["code", "kind", "retryable", "severity"];

/// Bounded label values for counting an error. Rule names, paths and other meta stay out
/// so the series count is fixed by the code registry.
pub fn labels(err: &ErrorObj) -> [&'static str; 4] {
    [
        err.code.0,
        err.kind.as_str(),
        err.retryable.as_str(),
        err.severity.as_str(),
    ]
}
