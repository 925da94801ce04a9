use std::path::PathBuf;

use thiserror::Error;

/// Batch-fatal errors: any of these aborts the whole invocation with a
/// non-zero exit code. Per-item failures never surface here; they are
/// captured in [`ResultRecord`](crate::dispatch::ResultRecord)s instead.
#[derive(Debug, Error)]
pub enum SumbenchError {
    #[error("folder not found or not readable: {0}")]
    FolderNotFound(PathBuf),

    #[error("invalid index range: {0}")]
    InvalidRange(String),

    #[error("cannot create output folder {path}: {source}")]
    OutputWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{0} not set. Export it or add it to .env / sumbench.toml")]
    MissingApiKey(&'static str),

    #[error("judge prompt not found: {0}")]
    PromptNotFound(PathBuf),

    #[error("no judgements found under the given roots")]
    NoJudgements,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folder_not_found_display() {
        let err = SumbenchError::FolderNotFound(PathBuf::from("input_docs"));
        assert_eq!(
            err.to_string(),
            "folder not found or not readable: input_docs"
        );
    }

    #[test]
    fn missing_api_key_names_the_variable() {
        let err = SumbenchError::MissingApiKey("ANTHROPIC_API_KEY");
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SumbenchError>();
    }
}
