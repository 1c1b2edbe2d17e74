use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error("cannot locate the home directory")]
    NoHome,
    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
    #[error("failed to create directory {}: {source}", path.display())]
    CreateDir { path: PathBuf, source: io::Error },
    #[error("invalid forms file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("no forms found in {}", path.display())]
    NoForms { path: PathBuf },
    #[error("unknown form `{0}`")]
    UnknownForm(String),
    #[error("copy failed: {0}")]
    Clipboard(#[from] arboard::Error),
    #[error("EDITOR is not set")]
    EditorUnset,
    #[error("failed to launch editor: {0}")]
    EditorSpawn(io::Error),
    #[error("editor exited with {0}")]
    EditorExit(ExitStatus),
    #[error("terminal mode switch failed: {0}")]
    Terminal(io::Error),
}

pub(crate) type Result<T> = std::result::Result<T, Error>;
