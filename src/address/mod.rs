use std::{
    fmt,
    net::{SocketAddr, ToSocketAddrs},
    str::FromStr,
};

use thiserror::Error;

use crate::error::SocketError;

/// A peer on the network, identified by its hostname (or IP) and port
#[derive(Clone, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct Address {
    pub hostname: String,
    pub port: u16,
}

impl Address {
    pub fn new(hostname: impl Into<String>, port: u16) -> Self {
        Self {
            hostname: hostname.into(),
            port,
        }
    }

    /// Resolves the address to the first [socket address](SocketAddr) the host stack reports
    pub fn resolve(&self) -> Result<SocketAddr, SocketError> {
        (self.hostname.as_str(), self.port)
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or_else(|| SocketError::Resolve {
                address: self.clone(),
            })
    }

    /// Resolves the address and rebuilds it from the resolved IP, so `localhost:27015` and
    /// `127.0.0.1:27015` end up as the same peer
    pub fn canonical(&self) -> Result<Address, SocketError> {
        Ok(Address::from(self.resolve()?))
    }
}

impl From<SocketAddr> for Address {
    fn from(addr: SocketAddr) -> Self {
        Self {
            hostname: addr.ip().to_string(),
            port: addr.port(),
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.hostname, self.port)
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AddressParseError {
    #[error("expected <host>:<port>, got {0:?}")]
    Format(String),

    #[error("invalid port in {0:?}")]
    Port(String),
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((hostname, port)) = s.rsplit_once(':') else {
            return Err(AddressParseError::Format(s.to_string()));
        };

        if hostname.is_empty() {
            return Err(AddressParseError::Format(s.to_string()));
        }

        let port = port
            .parse()
            .map_err(|_| AddressParseError::Port(s.to_string()))?;

        Ok(Self::new(hostname, port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let address: Address = "127.0.0.1:27015".parse().unwrap();
        assert_eq!(address, Address::new("127.0.0.1", 27015));
        assert_eq!(address.to_string(), "127.0.0.1:27015");

        assert_eq!(
            "27015".parse::<Address>(),
            Err(AddressParseError::Format("27015".to_string()))
        );
        assert!(":27015".parse::<Address>().is_err());
        assert_eq!(
            "localhost:port".parse::<Address>(),
            Err(AddressParseError::Port("localhost:port".to_string()))
        );
    }

    #[test]
    fn test_canonical_uses_resolved_ip() {
        let address = Address::new("127.0.0.1", 4000);
        assert_eq!(address.canonical().unwrap(), address);

        let from_socket: Address = "127.0.0.1:4000".parse::<SocketAddr>().unwrap().into();
        assert_eq!(from_socket, address);
    }
}
