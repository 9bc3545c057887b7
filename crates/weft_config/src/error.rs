//! Errors raised while loading `weft.toml`.

use std::path::PathBuf;

/// Failure to read, parse or validate a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Read {
        /// The file that was opened.
        path: PathBuf,
        /// The underlying I/O failure.
        source: std::io::Error,
    },

    /// The content is not valid TOML or has the wrong shape.
    #[error("malformed configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// The content parsed but a value is out of range.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_error_names_the_file() {
        let err = ConfigError::Read {
            path: PathBuf::from("rtl/weft.toml"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert_eq!(err.to_string(), "cannot read rtl/weft.toml: not found");
    }

    #[test]
    fn invalid_message() {
        let err = ConfigError::Invalid("ir.reserved_names contains an empty name".into());
        assert_eq!(
            err.to_string(),
            "invalid configuration: ir.reserved_names contains an empty name"
        );
    }
}
