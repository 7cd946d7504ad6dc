//! TLS transport for POP3 connections.

use std::io;
use std::sync::Arc;

use rustls::pki_types::ServerName;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;

use crate::{Error, Result};

/// Implicit-TLS POP3 stream.
pub type Pop3Stream = TlsStream<TcpStream>;

/// Creates a TLS connector trusting the webpki root certificates.
///
/// The default rustls verifier is used, so a certificate that fails
/// validation aborts the handshake.
#[must_use]
pub fn create_tls_connector() -> TlsConnector {
    let root_store = rustls::RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };

    let config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    TlsConnector::from(Arc::new(config))
}

/// Connects to a server with TLS from the start (port 995).
///
/// # Errors
///
/// Returns [`Error::Io`] if the TCP connection fails, and [`Error::Tls`] if
/// the handshake fails, including certificate validation failures.
pub async fn connect_tls(host: &str, port: u16) -> Result<Pop3Stream> {
    let server_name = ServerName::try_from(host.to_string())?;
    let tcp = TcpStream::connect((host, port)).await?;
    let tls = create_tls_connector()
        .connect(server_name, tcp)
        .await
        .map_err(handshake_error)?;
    Ok(tls)
}

/// Recovers the rustls error tokio-rustls wraps in `io::Error`.
fn handshake_error(err: io::Error) -> Error {
    match err
        .get_ref()
        .and_then(|inner| inner.downcast_ref::<rustls::Error>())
    {
        Some(tls) => Error::Tls(tls.clone()),
        None => Error::Io(err),
    }
}
