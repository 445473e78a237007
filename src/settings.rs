//! Server settings and the bind address accepted by `start`.

use crate::error::ServerError;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// User-facing settings that drive content derivation.
///
/// Every `configure` call re-derives the served pages and paths from the
/// settings passed in; nothing else about the server needs restarting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSettings {
    /// Gate the stream behind a numeric PIN.
    pub pin_enabled: bool,
    /// The PIN value. Only meaningful while `pin_enabled` is set.
    pub pin: String,
    /// Page background color as 0xRRGGBB. Bits above the low 24 are ignored.
    pub background_color: u32,
    /// Skip the client-side MJPEG capability check on the index page.
    pub disable_mjpeg_check: bool,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            pin_enabled: false,
            pin: "0000".to_string(),
            background_color: 0x00_00_00,
            disable_mjpeg_check: false,
        }
    }
}

impl StreamSettings {
    /// Create settings with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable the PIN gate with the given PIN value.
    pub fn with_pin(mut self, pin: impl Into<String>) -> Self {
        self.pin_enabled = true;
        self.pin = pin.into();
        self
    }

    /// Set the page background color (0xRRGGBB).
    pub fn background_color(mut self, color: u32) -> Self {
        self.background_color = color;
        self
    }

    /// Disable the client-side MJPEG capability check.
    pub fn disable_mjpeg_check(mut self, disable: bool) -> Self {
        self.disable_mjpeg_check = disable;
        self
    }
}

/// Address the listener should bind.
///
/// The port is carried as `u32` so out-of-range values survive long enough
/// to be rejected by [`BindAddress::validate`] instead of being silently
/// truncated at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindAddress {
    /// Interface to bind.
    pub host: IpAddr,
    /// TCP port; must be in [1025, 65535].
    pub port: u32,
}

/// Lowest port accepted by `validate`; everything below needs privileges.
pub const MIN_PORT: u32 = 1025;
/// Highest representable TCP port.
pub const MAX_PORT: u32 = 65535;

impl BindAddress {
    /// Create a bind address. Validation happens at `start`, not here.
    pub fn new(host: IpAddr, port: u32) -> Self {
        Self { host, port }
    }

    /// Bind to the loopback interface.
    pub fn loopback(port: u32) -> Self {
        Self::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
    }

    /// Bind to all interfaces.
    pub fn any(port: u32) -> Self {
        Self::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port)
    }

    /// Check the port range and produce a concrete socket address.
    pub fn validate(&self) -> Result<SocketAddr, ServerError> {
        if !(MIN_PORT..=MAX_PORT).contains(&self.port) {
            return Err(ServerError::InvalidPort(self.port));
        }
        Ok(SocketAddr::new(self.host, self.port as u16))
    }
}

impl std::fmt::Display for BindAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn privileged_and_oversized_ports_are_rejected() {
        assert_eq!(
            BindAddress::loopback(80).validate(),
            Err(ServerError::InvalidPort(80))
        );
        assert_eq!(
            BindAddress::loopback(70000).validate(),
            Err(ServerError::InvalidPort(70000))
        );
        assert_eq!(
            BindAddress::loopback(0).validate(),
            Err(ServerError::InvalidPort(0))
        );
    }

    #[test]
    fn valid_ports_produce_a_socket_addr() {
        let addr = BindAddress::loopback(8080).validate().unwrap();
        assert_eq!(addr.port(), 8080);
        assert!(addr.ip().is_loopback());
        assert!(BindAddress::any(1025).validate().is_ok());
        assert!(BindAddress::any(65535).validate().is_ok());
    }

    #[test]
    fn settings_builder_round_trip() {
        let settings = StreamSettings::new()
            .with_pin("4321")
            .background_color(0x00FF00)
            .disable_mjpeg_check(true);
        assert!(settings.pin_enabled);
        assert_eq!(settings.pin, "4321");
        assert_eq!(settings.background_color, 0x00FF00);
        assert!(settings.disable_mjpeg_check);

        let json = serde_json::to_string(&settings).unwrap();
        let back: StreamSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, settings);
    }
}
