use thiserror::Error;

use tradebridge_core::{AlpacaConfigError, BrokerError, DispatchError, ValidationError};

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Broker(#[from] BrokerError),

    #[error("configuration error: {0}")]
    Config(#[from] AlpacaConfigError),

    #[error("command error: {0}")]
    Command(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<DispatchError> for CliError {
    fn from(value: DispatchError) -> Self {
        match value {
            DispatchError::InvalidArgument(error) => Self::Validation(error),
            DispatchError::Transport(error) => Self::Broker(error),
        }
    }
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) | Self::Command(_) => 2,
            Self::Broker(_) => 3,
            Self::Config(_) => 4,
            Self::Serialization(_) => 5,
            Self::Io(_) => 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_errors_keep_their_category() {
        let invalid = CliError::from(DispatchError::InvalidArgument(ValidationError::EmptySymbol));
        assert_eq!(invalid.exit_code(), 2);

        let transport = CliError::from(DispatchError::Transport(BrokerError::unavailable("down")));
        assert_eq!(transport.exit_code(), 3);

        let config = CliError::from(AlpacaConfigError::MissingVariable {
            name: "TRADEBRIDGE_ALPACA_API_KEY",
        });
        assert_eq!(config.exit_code(), 4);
    }
}
