use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("series has no observations")]
    EmptySeries,

    #[error("unknown allocation mode: {0}")]
    InvalidAllocationMode(String),
}
