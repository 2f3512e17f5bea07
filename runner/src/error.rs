use {std::path::PathBuf, thiserror::Error, tvr_p4rt::P4rtError, tvr_testvector::TestVectorError};

/// Failures that stop a run before or around test execution.
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("failed to load config file {path}: {reason}")]
    Config { path: PathBuf, reason: String },

    #[error("invalid argument: {0}")]
    Argument(String),

    #[error(transparent)]
    TestVector(#[from] TestVectorError),

    #[error(transparent)]
    Session(#[from] P4rtError),
}

pub type Result<T> = std::result::Result<T, RunnerError>;
