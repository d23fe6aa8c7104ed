//! Harvest configuration shared by the binary and tests.

use clap::Parser;
use std::path::{Path, PathBuf};

/// Tunable knobs that bound harvest behavior.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HarvestControls {
    base_url: String,
    cache_dir: PathBuf,
    audio_dir: PathBuf,
    fetch_permits: usize,
}

impl HarvestControls {
    /// Constructs a new set of harvest controls. A trailing slash on the base
    /// address is dropped so address construction stays uniform.
    pub fn new(
        base_url: String,
        cache_dir: PathBuf,
        audio_dir: PathBuf,
        fetch_permits: usize,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            cache_dir,
            audio_dir,
            fetch_permits,
        }
    }

    /// Root address of the dictionary service.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Directory holding one cache record per fetched address.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Directory downloaded audio assets are persisted under.
    pub fn audio_dir(&self) -> &Path {
        &self.audio_dir
    }

    /// Size of the outbound request permit pool.
    pub fn fetch_permits(&self) -> usize {
        self.fetch_permits
    }
}

impl Default for HarvestControls {
    fn default() -> Self {
        Self::new(
            "http://jisho.org".to_string(),
            PathBuf::from("cache"),
            PathBuf::from("audio"),
            10,
        )
    }
}

/// Command-line interface of the harvester binary.
#[derive(Parser, Debug, Clone)]
#[command(name = "lexicrawl", about = "JLPT vocabulary harvester")]
pub struct Cli {
    /// Root address of the dictionary service
    #[arg(long, env = "LEXICRAWL_BASE_URL", default_value = "http://jisho.org")]
    pub base_url: String,

    /// Directory for the on-disk fetch cache
    #[arg(long, env = "LEXICRAWL_CACHE_DIR", default_value = "cache")]
    pub cache_dir: PathBuf,

    /// Directory downloaded audio is stored in
    #[arg(long, env = "LEXICRAWL_AUDIO_DIR", default_value = "audio")]
    pub audio_dir: PathBuf,

    /// Maximum concurrent outbound requests
    #[arg(long, env = "LEXICRAWL_FETCH_PERMITS", default_value_t = 10)]
    pub fetch_permits: usize,
}

impl Cli {
    /// Converts the parsed CLI into `HarvestControls`.
    pub fn build_controls(&self) -> HarvestControls {
        HarvestControls::new(
            self.base_url.clone(),
            self.cache_dir.clone(),
            self.audio_dir.clone(),
            self.fetch_permits,
        )
    }
}
