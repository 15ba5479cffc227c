use std::path::PathBuf;

/// Errors raised while loading or querying metadata.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse YAML {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("metadata file {path} must contain a mapping at the top level")]
    NotAMapping { path: PathBuf },

    #[error("invalid settings: {0}")]
    Settings(#[from] serde_yaml::Error),

    #[error("metadata document '{name}' is not loaded")]
    MissingDocument { name: String },

    #[error("metadata document '{document}' has no entry '{key}'")]
    MissingKey { document: String, key: String },

    #[error("unresolvable placeholder '{{{{{placeholder}}}}}'")]
    Placeholder { placeholder: String },

    #[error("invalid year selection '{spec}': {message}")]
    InvalidYears { spec: String, message: String },
}

impl MetadataError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn yaml(path: impl Into<PathBuf>, source: serde_yaml::Error) -> Self {
        Self::Yaml {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, MetadataError>;
