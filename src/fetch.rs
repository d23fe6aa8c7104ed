//! Rate-limited, disk-memoized fetching. Every network access in the crawl
//! funnels through [`FetchCache::acquire`].

use async_trait::async_trait;
use reqwest::Client;
use std::error::Error;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

const USER_AGENT: &str = "lexicrawl/0.1 (+https://github.com/lexicrawl/lexicrawl)";

const STATUS_OK: u16 = 200;
const STATUS_NOT_FOUND: u16 = 404;

/// Status code and full body of one GET.
#[derive(Debug, Clone)]
pub struct HttpReply {
    /// HTTP status code.
    pub status: u16,
    /// Response body bytes.
    pub body: Vec<u8>,
}

/// Low-level HTTP transport. The production implementation wraps `reqwest`;
/// tests substitute scripted doubles to observe request counts and ordering.
#[async_trait]
pub trait HttpBackend: Send + Sync {
    /// Issues a GET for `address` and returns the status plus the full body.
    async fn get(&self, address: &str) -> Result<HttpReply, FetchError>;
}

/// `reqwest`-backed transport used by the real crawl.
pub struct ReqwestBackend {
    client: Client,
}

impl ReqwestBackend {
    /// Builds the shared HTTP client. Requests carry no timeout: a stalled
    /// upstream stalls the run rather than producing partial output.
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpBackend for ReqwestBackend {
    async fn get(&self, address: &str) -> Result<HttpReply, FetchError> {
        let response = self
            .client
            .get(address)
            .send()
            .await
            .map_err(|err| FetchError::transport(address, err))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|err| FetchError::transport(address, err))?
            .to_vec();
        Ok(HttpReply { status, body })
    }
}

/// Outcome of one cache acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched {
    /// The address resolved to content, served from disk or freshly fetched.
    Found(Vec<u8>),
    /// The upstream answered "not found"; never memoized, so later probes of
    /// the same address re-check the network.
    NotFound,
}

/// Errors surfaced while fetching or persisting content. All of them are
/// fatal to the run.
#[derive(Debug)]
pub enum FetchError {
    /// The transport failed outright.
    Transport {
        /// Address being fetched.
        address: String,
        /// Underlying transport error.
        source: Box<dyn Error + Send + Sync>,
    },
    /// Upstream answered with a status the crawl cannot continue past.
    UnexpectedStatus {
        /// Address being fetched.
        address: String,
        /// Offending status code.
        status: u16,
    },
    /// Reading or writing the cache failed.
    Io {
        /// Address whose record was being read or written.
        address: String,
        /// Underlying I/O error.
        source: io::Error,
    },
}

impl FetchError {
    pub(crate) fn transport(
        address: &str,
        source: impl Error + Send + Sync + 'static,
    ) -> Self {
        Self::Transport {
            address: address.to_string(),
            source: Box::new(source),
        }
    }

    fn io(address: &str, source: io::Error) -> Self {
        Self::Io {
            address: address.to_string(),
            source,
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport { address, source } => {
                write!(f, "transport error for {address}: {source}")
            }
            Self::UnexpectedStatus { address, status } => {
                write!(f, "unexpected status {status} for {address}")
            }
            Self::Io { address, source } => {
                write!(f, "cache i/o error for {address}: {source}")
            }
        }
    }
}

impl Error for FetchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Transport { source, .. } => Some(source.as_ref()),
            Self::Io { source, .. } => Some(source),
            Self::UnexpectedStatus { .. } => None,
        }
    }
}

/// Disk-memoized byte fetcher with a fixed pool of outbound permits.
///
/// A cache record is one file per percent-escaped address. Records are
/// immutable once written; writers stage content under a unique temporary
/// name and atomically rename it into place, so the directory tolerates
/// arbitrarily many concurrent writers. Concurrent first-time fetches of the
/// same address each hit the network independently; the duplicate writes are
/// safe and the redundant requests are accepted.
pub struct FetchCache {
    backend: Arc<dyn HttpBackend>,
    permits: Semaphore,
    dir: PathBuf,
    temp_seq: AtomicU64,
}

impl FetchCache {
    /// Creates a cache rooted at `dir`, throttled to `permits` concurrent
    /// outbound requests. The directory must already exist.
    pub fn new(backend: Arc<dyn HttpBackend>, dir: PathBuf, permits: usize) -> Self {
        Self {
            backend,
            permits: Semaphore::new(permits),
            dir,
            temp_seq: AtomicU64::new(0),
        }
    }

    /// Returns the bytes for `address`, consulting the disk cache first.
    ///
    /// A miss takes an outbound permit for the duration of the network round
    /// trip and the cache write. "Not found" responses are returned as
    /// [`Fetched::NotFound`] without caching; any other non-success status is
    /// fatal.
    pub async fn acquire(&self, address: &str) -> Result<Fetched, FetchError> {
        let path = self.record_path(address);
        match tokio::fs::read(&path).await {
            Ok(bytes) => return Ok(Fetched::Found(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(FetchError::io(address, err)),
        }

        let _permit = self
            .permits
            .acquire()
            .await
            .expect("fetch permit pool is never closed");

        let reply = self.backend.get(address).await?;
        match reply.status {
            STATUS_NOT_FOUND => Ok(Fetched::NotFound),
            STATUS_OK => {
                self.persist(address, &path, &reply.body).await?;
                Ok(Fetched::Found(reply.body))
            }
            status => Err(FetchError::UnexpectedStatus {
                address: address.to_string(),
                status,
            }),
        }
    }

    /// Path of the cache record for `address`.
    pub fn record_path(&self, address: &str) -> PathBuf {
        self.dir.join(urlencoding::encode(address).into_owned())
    }

    async fn persist(&self, address: &str, path: &Path, body: &[u8]) -> Result<(), FetchError> {
        let temp = self.dir.join(format!(
            "tmp_{}_{}",
            std::process::id(),
            self.temp_seq.fetch_add(1, Ordering::Relaxed)
        ));
        if let Err(err) = Self::stage(&temp, path, body).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(FetchError::io(address, err));
        }
        Ok(())
    }

    async fn stage(temp: &Path, path: &Path, body: &[u8]) -> io::Result<()> {
        tokio::fs::write(temp, body).await?;
        tokio::fs::rename(temp, path).await
    }
}
