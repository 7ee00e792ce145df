use thiserror::Error;

use crate::address::Address;

pub type Result<T> = std::result::Result<T, SocketError>;

/// Everything the [reliable socket](crate::socket::ReliableSocket) can surface to its caller.
/// Protocol anomalies (stray acks, duplicates, gaps) are not in here, they are only logged
#[derive(Error, Debug)]
pub enum SocketError {
    #[error("cannot {operation} while the socket is {state}")]
    IllegalState {
        operation: &'static str,
        state: &'static str,
    },

    #[error("payload of {size} bytes does not fit into a package of {max} bytes")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("network error: {0}")]
    Network(#[from] std::io::Error),

    #[error("could not resolve {address}")]
    Resolve { address: Address },

    #[error("datagram of {length} bytes is shorter than the sequence number header")]
    Decode { length: usize },

    #[error("invalid socket config: {0}")]
    InvalidConfig(String),

    #[error("{address} already has {pending} unacknowledged sends")]
    Backpressure { address: Address, pending: usize },
}
