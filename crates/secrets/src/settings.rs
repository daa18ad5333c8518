/// Per-call engine settings.
///
/// Built by the caller (normally from the CLI configuration) and passed by
/// reference into every operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Overrides the KMS endpoint, e.g. a LocalStack URL.
    pub kms_endpoint: Option<String>,
    /// How deep include chains may nest before `read` gives up.
    pub max_include_depth: usize,
}

pub const DEFAULT_MAX_INCLUDE_DEPTH: usize = 16;

impl Default for Settings {
    fn default() -> Self {
        Self {
            kms_endpoint: None,
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
        }
    }
}
