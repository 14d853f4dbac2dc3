use thiserror::Error;

/// Failure reported by the chain gateway for a read or a transaction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("transaction reverted: {0}")]
    Reverted(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unexpected response for {call}: {detail}")]
    Decode { call: String, detail: String },
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("reads still pending after {rounds} settle rounds")]
    SettleOverrun { rounds: usize },

    #[error("nothing left to fetch but the value is still loading")]
    Unresolved,

    #[error("read failed: {0}")]
    ReadFailed(String),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
