use thiserror::Error;

use crate::core::lang::symbol::RegistrationError;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Symbol '{0}' is not defined")]
    SymbolNotFound(String),

    #[error("Type error in '{symbol}', argument '{argument}': {message}")]
    Type {
        symbol: String,
        argument: String,
        message: String,
    },

    #[error("Symbol '{0}' has no runtime implementation")]
    RuntimeNotImplemented(String),

    #[error("Slot '{0}' is already locked by an enclosing evaluation")]
    ReentrantSlot(&'static str),

    #[error("Operation '{symbol}' is not valid here: {message}")]
    InvalidContext {
        symbol: String,
        message: String,
    },

    #[error("Symbol registration failed: {source}")]
    Registration {
        #[from]
        source: RegistrationError,
    },

    #[error("Internal logic error: {0}")]
    Internal(String),
}
