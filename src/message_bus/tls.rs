use std::fs;
use std::path::Path;
use std::sync::Arc;

use log::{debug, warn};
use rumqttc::tokio_rustls::rustls::{ClientConfig, RootCertStore};
use rumqttc::{TlsConfiguration, Transport};

use super::broker_url::BrokerAddress;
use crate::configuration::types::TlsOptions;
use crate::error_handling::types::ConfigError;

/// Checks that the TLS flags form a usable combination.
pub fn validate(tls: &TlsOptions) -> Result<(), ConfigError> {
    if tls.cert_file.is_some() != tls.key_file.is_some() {
        return Err(ConfigError::IncompleteTls(
            "client certificate and key must be given together".to_string(),
        ));
    }
    Ok(())
}

/// Picks the transport for `addr`, loading PEM material from disk.
pub fn transport_for(addr: &BrokerAddress, tls: &TlsOptions) -> Result<Transport, ConfigError> {
    let websocket = addr.websocket_path.is_some();
    if !addr.secure {
        if !tls.is_empty() {
            warn!("TLS options are ignored for plain broker URL {}", addr);
        }
        return Ok(if websocket { Transport::Ws } else { Transport::tcp() });
    }

    validate(tls)?;
    let Some(config) = tls_configuration(tls)? else {
        debug!("Using the default root store for {}", addr);
        return Ok(if websocket {
            Transport::wss_with_default_config()
        } else {
            Transport::tls_with_default_config()
        });
    };

    debug!(
        "TLS for {}: ca={:?}, client_auth={}, alpn={:?}",
        addr,
        tls.ca_file,
        tls.cert_file.is_some(),
        tls.alpn
    );
    Ok(if websocket {
        Transport::wss_with_config(config)
    } else {
        Transport::tls_with_config(config)
    })
}

/// `None` when nothing beyond the library defaults was asked for.
fn tls_configuration(tls: &TlsOptions) -> Result<Option<TlsConfiguration>, ConfigError> {
    let client_auth = match (tls.cert_file.as_deref(), tls.key_file.as_deref()) {
        (Some(cert), Some(key)) => Some((read_pem(cert)?, read_pem(key)?)),
        _ => None,
    };
    let alpn = tls.alpn.as_ref().map(|proto| vec![proto.as_bytes().to_vec()]);

    match tls.ca_file.as_deref() {
        Some(ca_file) => Ok(Some(TlsConfiguration::Simple {
            ca: read_pem(ca_file)?,
            alpn,
            client_auth,
        })),
        None if client_auth.is_none() && alpn.is_none() => Ok(None),
        None => {
            let config = native_roots_config(client_auth, alpn)?;
            Ok(Some(TlsConfiguration::Rustls(Arc::new(config))))
        }
    }
}

/// Client config trusting the platform's roots, for client certificates or
/// ALPN without a private CA.
fn native_roots_config(
    client_auth: Option<(Vec<u8>, Vec<u8>)>,
    alpn: Option<Vec<Vec<u8>>>,
) -> Result<ClientConfig, ConfigError> {
    let mut roots = RootCertStore::empty();
    match rustls_native_certs::load_native_certs() {
        Ok(certs) => {
            let (added, ignored) = roots.add_parsable_certificates(certs);
            debug!("Loaded {} native root certificate(s), {} ignored", added, ignored);
        }
        Err(e) => warn!("Unable to load native root certificates: {}", e),
    }

    let builder = ClientConfig::builder().with_root_certificates(roots);
    let mut config = match client_auth {
        Some((cert, key)) => {
            let chain = rustls_pemfile::certs(&mut cert.as_slice())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| ConfigError::BadTlsMaterial(format!("client certificate: {}", e)))?;
            if chain.is_empty() {
                return Err(ConfigError::BadTlsMaterial(
                    "no certificate found in the client certificate file".to_string(),
                ));
            }
            let key = rustls_pemfile::private_key(&mut key.as_slice())
                .map_err(|e| ConfigError::BadTlsMaterial(format!("client key: {}", e)))?
                .ok_or_else(|| {
                    ConfigError::BadTlsMaterial(
                        "no private key found in the client key file".to_string(),
                    )
                })?;
            builder
                .with_client_auth_cert(chain, key)
                .map_err(|e| ConfigError::BadTlsMaterial(e.to_string()))?
        }
        None => builder.with_no_client_auth(),
    };
    if let Some(alpn) = alpn {
        config.alpn_protocols = alpn;
    }
    Ok(config)
}

fn read_pem(path: &Path) -> Result<Vec<u8>, ConfigError> {
    fs::read(path).map_err(|e| {
        ConfigError::IoError(std::io::Error::new(
            e.kind(),
            format!("{}: {}", path.display(), e),
        ))
    })
}
