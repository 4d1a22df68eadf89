use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A failed read. Every variant is fatal to the run.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("could not connect to {source_name}")]
    Connection {
        source_name: &'static str,
        #[source]
        error: BoxError,
    },

    #[error("could not connect to {source_name}: timed out after {seconds}s")]
    ConnectTimeout {
        source_name: &'static str,
        seconds: u64,
    },

    #[error("query against {source_name} failed")]
    Query {
        source_name: &'static str,
        #[source]
        error: BoxError,
    },
}

impl SourceError {
    pub fn connection(source_name: &'static str, error: impl Into<BoxError>) -> Self {
        SourceError::Connection {
            source_name,
            error: error.into(),
        }
    }

    pub fn query(source_name: &'static str, error: impl Into<BoxError>) -> Self {
        SourceError::Query {
            source_name,
            error: error.into(),
        }
    }

    /// Name of the source that failed, e.g. `"MySQL POS"`.
    pub fn source_name(&self) -> &'static str {
        match self {
            SourceError::Connection { source_name, .. }
            | SourceError::ConnectTimeout { source_name, .. }
            | SourceError::Query { source_name, .. } => source_name,
        }
    }
}
