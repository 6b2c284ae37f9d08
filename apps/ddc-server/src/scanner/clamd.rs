//! clamd INSTREAM client
//!
//! Protocol: `nINSTREAM\n`, then the payload as chunks each prefixed with
//! a 4-byte big-endian length, then four zero bytes. The daemon answers
//! `stream: OK\n` for a clean stream and closes the connection.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use super::{ScanError, ScanVerdict, Scanner};

// ============================================================================
// Constants
// ============================================================================

/// Timeout of a single connection attempt
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// Connection attempts before a scan fails
pub const CONNECT_ATTEMPTS: u32 = 10;

/// Limit on one INSTREAM exchange, from the command to the verdict
pub const SCAN_TIMEOUT: Duration = Duration::from_secs(60);

/// Payload bytes per INSTREAM chunk: 1MB
pub const CHUNK_SIZE: usize = 1024 * 1024;

const INSTREAM_COMMAND: &[u8] = b"nINSTREAM\n";
const END_OF_STREAM: [u8; 4] = [0; 4];
const CLEAN_RESPONSE: &[u8] = b"stream: OK\n";

// ============================================================================
// Endpoint
// ============================================================================

/// Where clamd listens
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClamdEndpoint {
    /// `host:port`
    Tcp(String),
    /// Unix domain socket path
    Unix(PathBuf),
}

impl fmt::Display for ClamdEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClamdEndpoint::Tcp(addr) => write!(f, "tcp://{}", addr),
            ClamdEndpoint::Unix(path) => write!(f, "unix://{}", path.display()),
        }
    }
}

trait ClamdStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> ClamdStream for T {}

async fn dial(endpoint: &ClamdEndpoint) -> io::Result<Box<dyn ClamdStream>> {
    match endpoint {
        ClamdEndpoint::Tcp(addr) => Ok(Box::new(TcpStream::connect(addr.as_str()).await?)),
        #[cfg(unix)]
        ClamdEndpoint::Unix(path) => Ok(Box::new(tokio::net::UnixStream::connect(path).await?)),
        #[cfg(not(unix))]
        ClamdEndpoint::Unix(_) => Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "unix sockets are not supported on this platform",
        )),
    }
}

// ============================================================================
// Client
// ============================================================================

/// Scanner backed by a clamd daemon.
///
/// Without an endpoint every scan reports [`ScanVerdict::Clean`].
#[derive(Debug, Clone)]
pub struct ClamdClient {
    endpoint: Option<ClamdEndpoint>,
    connect_timeout: Duration,
    attempts: u32,
    scan_timeout: Duration,
}

impl ClamdClient {
    pub fn new(endpoint: Option<ClamdEndpoint>) -> Self {
        Self {
            endpoint,
            connect_timeout: CONNECT_TIMEOUT,
            attempts: CONNECT_ATTEMPTS,
            scan_timeout: SCAN_TIMEOUT,
        }
    }

    /// Client that accepts everything
    pub fn disabled() -> Self {
        Self::new(None)
    }

    /// Override the connection retry policy
    pub fn with_retry(mut self, attempts: u32, connect_timeout: Duration) -> Self {
        self.attempts = attempts.max(1);
        self.connect_timeout = connect_timeout;
        self
    }

    /// Override the limit on one INSTREAM exchange
    pub fn with_scan_timeout(mut self, scan_timeout: Duration) -> Self {
        self.scan_timeout = scan_timeout;
        self
    }

    pub fn endpoint(&self) -> Option<&ClamdEndpoint> {
        self.endpoint.as_ref()
    }

    /// Connect, retrying; the error of the last attempt is reported
    async fn connect(&self, endpoint: &ClamdEndpoint) -> Result<Box<dyn ClamdStream>, ScanError> {
        let mut last_error = None;

        for attempt in 1..=self.attempts {
            let error = match tokio::time::timeout(self.connect_timeout, dial(endpoint)).await {
                Ok(Ok(stream)) => return Ok(stream),
                Ok(Err(e)) => e,
                Err(_) => io::Error::new(io::ErrorKind::TimedOut, "connection timed out"),
            };

            tracing::debug!(
                endpoint = %endpoint,
                attempt = attempt,
                error = %error,
                "clamd connection attempt failed"
            );
            last_error = Some(error);
        }

        Err(ScanError::Connect {
            endpoint: endpoint.to_string(),
            attempts: self.attempts,
            source: last_error
                .unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "no connection attempts")),
        })
    }
}

/// Stream `data` to clamd and read its reply
async fn exchange(stream: &mut Box<dyn ClamdStream>, data: &[u8]) -> Result<Vec<u8>, ScanError> {
    stream.write_all(INSTREAM_COMMAND).await?;
    for chunk in data.chunks(CHUNK_SIZE) {
        let len = u32::try_from(chunk.len()).map_err(|_| ScanError::ChunkTooLarge(chunk.len()))?;
        stream.write_all(&len.to_be_bytes()).await?;
        stream.write_all(chunk).await?;
    }
    stream.write_all(&END_OF_STREAM).await?;
    stream.flush().await?;

    let mut response = Vec::new();
    stream.read_to_end(&mut response).await?;
    Ok(response)
}

#[async_trait]
impl Scanner for ClamdClient {
    async fn scan(&self, data: &[u8]) -> Result<ScanVerdict, ScanError> {
        let Some(endpoint) = &self.endpoint else {
            return Ok(ScanVerdict::Clean);
        };

        let mut stream = self.connect(endpoint).await?;

        let response = tokio::time::timeout(self.scan_timeout, exchange(&mut stream, data))
            .await
            .map_err(|_| {
                tracing::warn!(endpoint = %endpoint, bytes = data.len(), "clamd scan timed out");
                ScanError::Io(io::Error::new(io::ErrorKind::TimedOut, "clamd scan timed out"))
            })??;

        tracing::debug!(
            endpoint = %endpoint,
            bytes = data.len(),
            response = %String::from_utf8_lossy(&response).trim_end(),
            "clamd scan finished"
        );

        if response == CLEAN_RESPONSE {
            Ok(ScanVerdict::Clean)
        } else {
            Ok(ScanVerdict::Infected(
                String::from_utf8_lossy(&response).into_owned(),
            ))
        }
    }
}
