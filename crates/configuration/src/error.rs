use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read or write the configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed configuration line (expected key:value): {0}")]
    MalformedLine(String),

    #[error("Missing configuration key: {0}")]
    MissingKey(&'static str),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}
