//! Search feed enumeration and retrieval.
//!
//! The crawl walks a fixed set of queries: four difficulty bands fetched
//! straight from the tag feed, plus the hardest band enumerated per kana
//! literal because the service caps how deep a single feed paginates.

use crate::fetch::{FetchCache, FetchError, Fetched};
use crate::model::{SearchPage, Word};
use crate::runtime::HarvestError;

/// Feed-enumerable difficulty bands and their page counts.
const LEVEL_PAGES: [(u8, usize); 4] = [(5, 33), (4, 29), (3, 89), (2, 91)];

/// Pages fetched for each kana-scoped hardest-band query.
const KANA_PAGES: usize = 15;

/// Phonetic index used to enumerate the hardest band.
const KANA: [&str; 71] = [
    "あ", "い", "う", "え", "お", "か", "が", "き", "ぎ", "く", "ぐ", "け", "げ", "こ", "ご",
    "さ", "ざ", "し", "じ", "す", "ず", "せ", "ぜ", "そ", "ぞ", "た", "だ", "ち", "ぢ", "つ",
    "づ", "て", "で", "と", "ど", "な", "に", "ぬ", "ね", "の", "は", "ば", "ぱ", "ひ", "び",
    "ぴ", "ふ", "ぶ", "ぷ", "へ", "べ", "ぺ", "ほ", "ぼ", "ぽ", "ま", "み", "む", "め", "も",
    "や", "ゆ", "よ", "ら", "り", "る", "れ", "ろ", "わ", "を", "ん",
];

/// What a query enumerates over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Category {
    /// One of the feed-enumerable difficulty bands (N2 through N5).
    Level(u8),
    /// A kana literal scoping the hardest band (N1).
    Kana(&'static str),
}

/// One search feed page to fetch: a category plus a 1-based page number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// Category the page belongs to.
    pub category: Category,
    /// 1-based page number.
    pub page: usize,
}

impl Query {
    /// The full fixed enumeration the crawl walks. Generated once at startup;
    /// queries are never created anywhere else.
    pub fn enumerate() -> Vec<Query> {
        let mut queries = Vec::new();
        for (level, pages) in LEVEL_PAGES {
            for page in 1..=pages {
                queries.push(Query {
                    category: Category::Level(level),
                    page,
                });
            }
        }
        for kana in KANA {
            for page in 1..=KANA_PAGES {
                queries.push(Query {
                    category: Category::Kana(kana),
                    page,
                });
            }
        }
        queries
    }

    /// Search feed address for this query under `base`.
    pub fn address(&self, base: &str) -> String {
        match self.category {
            Category::Level(level) => format!(
                "{base}/api/v1/search/words?keyword=%23jlpt-n{level}&page={page}",
                page = self.page
            ),
            Category::Kana(kana) => format!(
                "{base}/api/v1/search/words?keyword={kana}%20%23jlpt-n1&page={page}",
                kana = urlencoding::encode(kana),
                page = self.page
            ),
        }
    }
}

/// Single-keyword search address, used to resolve collocations.
pub fn search_address(base: &str, keyword: &str) -> String {
    format!(
        "{base}/api/v1/search/words?keyword={}",
        urlencoding::encode(keyword)
    )
}

/// Detail-page address for one identifier (written form or reading).
pub fn word_page_address(base: &str, identifier: &str) -> String {
    format!("{base}/word/{}", urlencoding::encode(identifier))
}

/// Fetches a search feed address and parses it into words.
///
/// Search feeds are authoritative: a "not found" answer or an undecodable
/// body here is fatal, unlike detail-page and audio fetches.
pub async fn fetch_search(fetch: &FetchCache, address: &str) -> Result<Vec<Word>, HarvestError> {
    match fetch.acquire(address).await? {
        Fetched::Found(bytes) => parse_search_page(address, &bytes),
        Fetched::NotFound => Err(HarvestError::Fetch(FetchError::UnexpectedStatus {
            address: address.to_string(),
            status: 404,
        })),
    }
}

fn parse_search_page(address: &str, bytes: &[u8]) -> Result<Vec<Word>, HarvestError> {
    let page: SearchPage =
        serde_json::from_slice(bytes).map_err(|source| HarvestError::MalformedFeed {
            address: address.to_string(),
            source,
        })?;
    Ok(page.data)
}
