//! Harvest orchestration: query fan-out, deduplication, enrichment joins.

use crate::controls::HarvestControls;
use crate::enrich::Enricher;
use crate::fetch::{FetchCache, FetchError, HttpBackend};
use crate::model::Word;
use crate::search::{fetch_search, Query};
use std::collections::{BTreeMap, HashSet};
use std::error::Error;
use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;

/// Buffer between the query fan-out and the deduplicating consumer.
const WORD_CHANNEL_CAPACITY: usize = 100;

/// Fatal harvest failures. Any of these aborts the run with no output.
#[derive(Debug)]
pub enum HarvestError {
    /// Fetching or caching failed.
    Fetch(FetchError),
    /// A search feed body failed to decode.
    MalformedFeed {
        /// Address of the offending feed page.
        address: String,
        /// Decode failure.
        source: serde_json::Error,
    },
    /// Workspace or audio-file I/O failed.
    Io {
        /// Path being written.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// A spawned crawl task panicked or was cancelled.
    Join(tokio::task::JoinError),
}

impl From<FetchError> for HarvestError {
    fn from(err: FetchError) -> Self {
        Self::Fetch(err)
    }
}

impl fmt::Display for HarvestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch(err) => write!(f, "{err}"),
            Self::MalformedFeed { address, source } => {
                write!(f, "malformed search feed at {address}: {source}")
            }
            Self::Io { path, source } => {
                write!(f, "i/o error at {}: {source}", path.display())
            }
            Self::Join(err) => write!(f, "crawl task failed: {err}"),
        }
    }
}

impl Error for HarvestError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Fetch(err) => Some(err),
            Self::MalformedFeed { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            Self::Join(err) => Some(err),
        }
    }
}

/// Runs the full harvest and returns the deduplicated, enriched word map.
///
/// Every query in the fixed enumeration is fetched and parsed concurrently;
/// parsed words flow through a single deduplicating consumer that spawns one
/// enrichment task per first-seen canonical key. The run completes once every
/// query task and every enrichment task has joined; the first fatal error
/// aborts the whole run with no partial result.
pub async fn run(
    controls: &HarvestControls,
    backend: Arc<dyn HttpBackend>,
) -> Result<BTreeMap<String, Word>, HarvestError> {
    for dir in [controls.cache_dir(), controls.audio_dir()] {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| HarvestError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
    }

    let fetch = Arc::new(FetchCache::new(
        backend,
        controls.cache_dir().to_path_buf(),
        controls.fetch_permits(),
    ));
    let enricher = Arc::new(Enricher::new(
        Arc::clone(&fetch),
        controls.base_url().to_string(),
        controls.audio_dir().to_path_buf(),
    ));

    let (tx, mut rx) = mpsc::channel::<Word>(WORD_CHANNEL_CAPACITY);
    let mut query_tasks = Vec::new();
    for query in Query::enumerate() {
        let fetch = Arc::clone(&fetch);
        let tx = tx.clone();
        let address = query.address(controls.base_url());
        query_tasks.push(tokio::spawn(async move {
            let words = fetch_search(fetch.as_ref(), &address).await?;
            for word in words {
                if tx.send(word).await.is_err() {
                    break;
                }
            }
            Ok::<(), HarvestError>(())
        }));
    }
    drop(tx);

    // Sole owner of the seen-key registry: dedup happens strictly before an
    // enrichment task exists, so each canonical key is enriched at most once.
    let mut seen = HashSet::new();
    let mut enrich_tasks = Vec::new();
    while let Some(word) = rx.recv().await {
        let Some(key) = word.canonical_key().map(str::to_string) else {
            warn!("dropping word without spellings");
            continue;
        };
        if !seen.insert(key.clone()) {
            continue;
        }

        let enricher = Arc::clone(&enricher);
        enrich_tasks.push(tokio::spawn(async move {
            let mut word = word;
            enricher.enrich(&mut word).await?;
            Ok::<(String, Word), HarvestError>((key, word))
        }));
    }

    for task in query_tasks {
        task.await.map_err(HarvestError::Join)??;
    }

    let mut words = BTreeMap::new();
    for task in enrich_tasks {
        let (key, word) = task.await.map_err(HarvestError::Join)??;
        words.insert(key, word);
    }
    Ok(words)
}
