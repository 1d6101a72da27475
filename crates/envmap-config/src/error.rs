use std::path::PathBuf;

/// Failure to read, parse or write `config.ron`. Every variant carries the
/// file it concerns so the app can log something actionable.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid RON in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },

    #[error("config could not be encoded as RON: {0}")]
    Encode(#[from] ron::Error),
}
