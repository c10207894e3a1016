use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Index(#[from] compose_core::Error),
    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),
    #[error("no sources found under {}", .0.display())]
    NoSources(PathBuf),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
