/// Fatal failures while decoding a single metadata document.
///
/// These abort the current decode call only; recoverable field-level issues
/// are accumulated as [`crate::profile::patch::Problem`]s instead.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("{source_label} is empty or null")]
    EmptyDocument { source_label: String },

    #[error("{source_label} is not an object")]
    NotAnObject { source_label: String },

    #[error("failed to parse {source_label}")]
    Malformed {
        source_label: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{source_label} has an invalid '{field}' field")]
    InvalidField {
        source_label: String,
        field: String,
    },

    #[error("{source_label} contains a library that doesn't have a 'name' field")]
    LibraryMissingName { source_label: String },

    #[error("{source_label} contains a jar mod that doesn't have a 'name' field")]
    JarModMissingName { source_label: String },

    #[error("{source_label} declares unsupported format version {version}")]
    UnsupportedFormatVersion { source_label: String, version: u64 },
}

impl FormatError {
    pub(crate) fn invalid_field(source_label: &str, field: &str) -> Self {
        FormatError::InvalidField {
            source_label: source_label.to_string(),
            field: field.to_string(),
        }
    }
}
