use std::time::Duration;

use crate::{error::SocketError, packet::PUNCH_SENTINEL};

/// The config of how a [reliable socket](crate::socket::ReliableSocket) sends and retries
#[derive(Clone, Debug)]
pub struct SocketConfig {
    /// Fixed size of every payload, shorter messages are padded with zeros
    pub package_size: usize,
    /// How long a send may stay unacknowledged before it goes out again
    pub resend_timeout: Duration,
    /// How often the resend loop scans for expired sends
    pub resend_interval: Duration,
    /// Upper bound of one blocking receive, after which the listen loop checks for termination
    pub receive_timeout: Duration,
    /// Refuse to send to a peer that already has this many unacknowledged sends
    pub max_pending_sends: Option<usize>,
    /// Free peers that have been quiet for this long and have nothing left to resend
    pub idle_peer_timeout: Option<Duration>,
    pub debug: DebugHooks,
}

/// Switches for provoking retransmissions by hand
#[derive(Clone, Copy, Default, Debug)]
pub struct DebugHooks {
    /// Do not transmit the first data packet to each peer, leaving it to the resend loop
    pub skip_first_transmission: bool,
    /// Drop the first inbound data datagram as if the network lost it
    pub drop_first_data_package: bool,
}

impl SocketConfig {
    /// Size of one datagram on the wire
    pub fn datagram_size(&self) -> usize {
        crate::packet::PAYLOAD_OFFSET + self.package_size
    }

    pub fn with_package_size(mut self, package_size: usize) -> Self {
        self.package_size = package_size;
        self
    }

    pub fn validate(&self) -> Result<(), SocketError> {
        if self.package_size < PUNCH_SENTINEL.len() {
            return Err(SocketError::InvalidConfig(format!(
                "package size {} cannot hold the {} byte control payloads",
                self.package_size,
                PUNCH_SENTINEL.len()
            )));
        }

        if self.resend_interval.is_zero() || self.receive_timeout.is_zero() {
            return Err(SocketError::InvalidConfig(
                "resend interval and receive timeout must be above zero".to_string(),
            ));
        }

        if self.max_pending_sends == Some(0) {
            return Err(SocketError::InvalidConfig(
                "max pending sends of 0 would refuse every send".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            package_size: 512,
            resend_timeout: Duration::from_millis(5000),
            resend_interval: Duration::from_millis(100),
            receive_timeout: Duration::from_millis(100),
            max_pending_sends: None,
            idle_peer_timeout: None,
            debug: DebugHooks::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = SocketConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.datagram_size(), 516);
    }

    #[test]
    fn test_rejects_tiny_packages() {
        let config = SocketConfig::default().with_package_size(5);
        assert!(matches!(config.validate(), Err(SocketError::InvalidConfig(_))));
        assert!(SocketConfig::default().with_package_size(6).validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_pending_cap() {
        let config = SocketConfig {
            max_pending_sends: Some(0),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
