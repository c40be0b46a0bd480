use std::fmt;
use std::str::FromStr;

use crate::error_handling::types::ConfigError;

const PLAIN_PORT: u16 = 1883;
const SECURE_PORT: u16 = 8883;
const WS_PORT: u16 = 80;
const WSS_PORT: u16 = 443;

/// Host, port and transport security parsed from a `scheme://host:port` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerAddress {
    pub host: String,
    pub port: u16,
    pub secure: bool,
    /// Upgrade path for MQTT over WebSocket; `None` for a raw socket.
    pub websocket_path: Option<String>,
}

impl BrokerAddress {
    /// Full `ws://` or `wss://` URL, which is what the client dials for a
    /// WebSocket broker.
    pub fn websocket_url(&self) -> Option<String> {
        let path = self.websocket_path.as_deref()?;
        let scheme = if self.secure { "wss" } else { "ws" };
        Some(format!("{}://{}{}", scheme, self.authority(), path))
    }

    fn authority(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl FromStr for BrokerAddress {
    type Err = ConfigError;

    fn from_str(url: &str) -> Result<Self, Self::Err> {
        let (scheme, rest) = url.split_once("://").unwrap_or(("tcp", url));
        let (secure, websocket) = match scheme.to_ascii_lowercase().as_str() {
            "tcp" | "mqtt" => (false, false),
            "ssl" | "tls" | "mqtts" => (true, false),
            "ws" => (false, true),
            "wss" => (true, true),
            other => {
                return Err(ConfigError::BadBrokerUrl(format!(
                    "unsupported scheme '{}' in '{}'",
                    other, url
                )))
            }
        };

        let (authority, path) = match rest.find('/') {
            Some(at) => rest.split_at(at),
            None => (rest, ""),
        };
        if authority.is_empty() {
            return Err(ConfigError::BadBrokerUrl(format!("missing host in '{}'", url)));
        }

        let default_port = match (secure, websocket) {
            (false, false) => PLAIN_PORT,
            (true, false) => SECURE_PORT,
            (false, true) => WS_PORT,
            (true, true) => WSS_PORT,
        };
        let (host, port) = if let Some(bracketed) = authority.strip_prefix('[') {
            let (host, tail) = bracketed.split_once(']').ok_or_else(|| {
                ConfigError::BadBrokerUrl(format!("unterminated IPv6 host in '{}'", url))
            })?;
            match tail.strip_prefix(':') {
                Some(port) => (host, parse_port(port, url)?),
                None if tail.is_empty() => (host, default_port),
                None => {
                    return Err(ConfigError::BadBrokerUrl(format!(
                        "unexpected '{}' after host in '{}'",
                        tail, url
                    )))
                }
            }
        } else {
            match authority.rsplit_once(':') {
                Some((host, port)) => (host, parse_port(port, url)?),
                None => (authority, default_port),
            }
        };

        if host.is_empty() {
            return Err(ConfigError::BadBrokerUrl(format!("missing host in '{}'", url)));
        }

        let websocket_path = websocket.then(|| {
            if path.is_empty() {
                "/".to_string()
            } else {
                path.to_string()
            }
        });

        Ok(Self {
            host: host.to_string(),
            port,
            secure,
            websocket_path,
        })
    }
}

fn parse_port(port: &str, url: &str) -> Result<u16, ConfigError> {
    port.parse()
        .map_err(|_| ConfigError::BadBrokerUrl(format!("invalid port '{}' in '{}'", port, url)))
}

impl fmt::Display for BrokerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(url) = self.websocket_url() {
            return f.write_str(&url);
        }
        let scheme = if self.secure { "ssl" } else { "tcp" };
        write!(f, "{}://{}", scheme, self.authority())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_default_broker() {
        let addr: BrokerAddress = "tcp://localhost:1883".parse().unwrap();
        assert_eq!(
            addr,
            BrokerAddress {
                host: "localhost".into(),
                port: 1883,
                secure: false,
                websocket_path: None,
            }
        );
    }

    #[test]
    fn secure_schemes_default_to_8883() {
        for url in ["ssl://broker.example", "tls://broker.example", "mqtts://broker.example/"] {
            let addr: BrokerAddress = url.parse().unwrap();
            assert!(addr.secure);
            assert_eq!(addr.port, 8883);
            assert_eq!(addr.host, "broker.example");
        }
    }

    #[test]
    fn bare_host_and_ipv6() {
        let addr: BrokerAddress = "10.0.0.5".parse().unwrap();
        assert_eq!((addr.host.as_str(), addr.port, addr.secure), ("10.0.0.5", 1883, false));

        let addr: BrokerAddress = "mqtt://[::1]:1999".parse().unwrap();
        assert_eq!(addr.host, "::1");
        assert_eq!(addr.port, 1999);
        assert_eq!(addr.to_string(), "tcp://[::1]:1999");
    }

    #[test]
    fn websocket_urls_keep_their_path() {
        let addr: BrokerAddress = "ws://broker.example:8080/mqtt".parse().unwrap();
        assert!(!addr.secure);
        assert_eq!(addr.port, 8080);
        assert_eq!(addr.websocket_url().as_deref(), Some("ws://broker.example:8080/mqtt"));

        let addr: BrokerAddress = "wss://broker.example".parse().unwrap();
        assert!(addr.secure);
        assert_eq!(addr.port, 443);
        assert_eq!(addr.to_string(), "wss://broker.example:443/");

        let addr: BrokerAddress = "tcp://broker.example/ignored".parse().unwrap();
        assert_eq!(addr.websocket_url(), None);
    }

    #[test]
    fn rejects_bad_urls() {
        assert!("http://localhost:80".parse::<BrokerAddress>().is_err());
        assert!("tcp://:1883".parse::<BrokerAddress>().is_err());
        assert!("tcp://localhost:port".parse::<BrokerAddress>().is_err());
        assert!("tcp://".parse::<BrokerAddress>().is_err());
    }
}
