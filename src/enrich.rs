//! Word enrichment: detail-page resolution, collocation resolution and audio
//! downloads for one deduplicated word.

use crate::fetch::{FetchCache, Fetched};
use crate::model::{Audio, Audios, Collocation, Word};
use crate::page::{decode_collocation_query, PageExtract, WordPageExtractor};
use crate::runtime::HarvestError;
use crate::search::{fetch_search, search_address, word_page_address};
use futures_util::future::join_all;
use std::mem;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

/// Enrichment service shared by every word task. Holds the fetch cache, the
/// detail-page selectors and the audio destination; constructed once per run.
pub struct Enricher {
    fetch: Arc<FetchCache>,
    extractor: WordPageExtractor,
    base: String,
    audio_dir: PathBuf,
}

impl Enricher {
    /// Builds the service for one run.
    pub fn new(fetch: Arc<FetchCache>, base: String, audio_dir: PathBuf) -> Self {
        Self {
            fetch,
            extractor: WordPageExtractor::new(),
            base,
            audio_dir,
        }
    }

    /// Probes the detail page for one identifier. "Not found" is an expected
    /// answer here; it feeds the candidate fallback rather than failing.
    async fn probe(&self, identifier: &str) -> Result<Option<PageExtract>, HarvestError> {
        let address = word_page_address(&self.base, identifier);
        match self.fetch.acquire(&address).await? {
            Fetched::NotFound => Ok(None),
            Fetched::Found(bytes) => {
                let html = String::from_utf8_lossy(&bytes);
                Ok(Some(self.extractor.extract(&html)))
            }
        }
    }

    /// Ordered candidate probing: for each spelling, written form then
    /// reading, skipping empties and repeats. First hit wins and the
    /// remaining candidates are never probed.
    async fn find_word_page(
        &self,
        word: &Word,
    ) -> Result<Option<(String, PageExtract)>, HarvestError> {
        let mut tried: Vec<&str> = Vec::new();
        for spelling in &word.japanese {
            for candidate in [spelling.word.as_str(), spelling.reading.as_str()] {
                if candidate.is_empty() || tried.contains(&candidate) {
                    continue;
                }
                tried.push(candidate);

                if let Some(extract) = self.probe(candidate).await? {
                    return Ok(Some((candidate.to_string(), extract)));
                }
            }
        }
        Ok(None)
    }

    /// Enriches one word in place: resolves its detail page, then downloads
    /// audio and resolves collocations concurrently. Exhausting every
    /// candidate identifier leaves the word unenriched and is not an error.
    pub async fn enrich(&self, word: &mut Word) -> Result<(), HarvestError> {
        let Some((identifier, extract)) = self.find_word_page(word).await? else {
            let (written, reading) = word
                .japanese
                .first()
                .map(|spelling| (spelling.word.as_str(), spelling.reading.as_str()))
                .unwrap_or_default();
            warn!(word = written, reading, "no word page found");
            return Ok(());
        };

        word.word_page = identifier;
        let (audios, collocations) = tokio::try_join!(
            self.download_audios(extract.audios),
            self.resolve_collocations(extract.collocations),
        )?;
        word.audios = audios;
        word.collocations = collocations;
        Ok(())
    }

    async fn resolve_collocations(
        &self,
        collocations: Vec<Collocation>,
    ) -> Result<Vec<Collocation>, HarvestError> {
        join_all(
            collocations
                .into_iter()
                .map(|collocation| self.resolve_collocation(collocation)),
        )
        .await
        .into_iter()
        .collect()
    }

    /// Resolves one collocation into its own nested word.
    ///
    /// The source reference is decoded back into a literal query string and
    /// searched; the first result becomes the nested word. Its detail page is
    /// resolved with the usual candidate probing, falling back to a direct
    /// probe of the literal string itself. Audio of the nested word is
    /// downloaded whenever a page was found; nested collocations are not
    /// followed.
    pub async fn resolve_collocation(
        &self,
        mut collocation: Collocation,
    ) -> Result<Collocation, HarvestError> {
        let query = decode_collocation_query(&collocation.src);
        let address = search_address(&self.base, &query);
        let results = fetch_search(&self.fetch, &address).await?;
        let Some(mut word) = results.into_iter().next() else {
            warn!(collocation = %collocation.raw, "collocation search returned nothing");
            return Ok(collocation);
        };

        let mut page_found = true;
        match self.find_word_page(&word).await? {
            Some((identifier, extract)) => {
                word.word_page = identifier;
                word.audios = extract.audios;
            }
            None => {
                if let Some(extract) = self.probe(&query).await? {
                    word.word_page = query;
                    word.audios = extract.audios;
                } else {
                    warn!(collocation = %collocation.raw, "no word page found for collocation");
                    page_found = false;
                }
            }
        }

        if page_found {
            word.audios = self.download_audios(mem::take(&mut word.audios)).await?;
        }
        collocation.word = Some(Box::new(word));
        Ok(collocation)
    }

    /// Downloads a set of audio assets concurrently. "Not found" drops the
    /// asset from the set; a successful download pins its local filename.
    async fn download_audios(&self, audios: Audios) -> Result<Audios, HarvestError> {
        let downloads = audios
            .into_iter()
            .map(|(kind, audio)| self.download_audio(kind, audio));

        let mut kept = Audios::new();
        for result in join_all(downloads).await {
            if let Some((kind, audio)) = result? {
                kept.insert(kind, audio);
            }
        }
        Ok(kept)
    }

    async fn download_audio(
        &self,
        kind: String,
        mut audio: Audio,
    ) -> Result<Option<(String, Audio)>, HarvestError> {
        match self.fetch.acquire(&audio.src).await? {
            Fetched::NotFound => Ok(None),
            Fetched::Found(bytes) => {
                let filename = audio
                    .src
                    .rsplit('/')
                    .next()
                    .unwrap_or(audio.src.as_str())
                    .to_string();
                let path = self.audio_dir.join(&filename);
                tokio::fs::write(&path, &bytes)
                    .await
                    .map_err(|source| HarvestError::Io { path, source })?;
                audio.filename = filename;
                Ok(Some((kind, audio)))
            }
        }
    }
}
