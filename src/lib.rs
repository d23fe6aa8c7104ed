#![warn(missing_docs)]
//! Core library entry points for the lexicrawl harvester.

pub mod controls;
pub mod enrich;
pub mod fetch;
pub mod model;
pub mod page;
pub mod runtime;
pub mod search;

pub use controls::{Cli, HarvestControls};
pub use enrich::Enricher;
pub use fetch::{FetchCache, FetchError, Fetched, HttpBackend, HttpReply, ReqwestBackend};
pub use model::{Audio, Audios, Collocation, SearchPage, Sense, Spelling, Word};
pub use page::{decode_collocation_query, PageExtract, WordPageExtractor};
pub use runtime::{run, HarvestError};
pub use search::{search_address, word_page_address, Category, Query};
