//! Dictionary entry types shared across the harvest pipeline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Audio variants for one word, keyed by their declared MIME type.
pub type Audios = BTreeMap<String, Audio>;

/// One dictionary word as parsed from a search feed, enriched during the crawl
/// with its detail-page identifier, pronunciation audio and collocations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Word {
    /// Whether the service marks the word as common vocabulary.
    #[serde(default)]
    pub is_common: bool,
    /// Service-side tags (difficulty bands, wanikani levels, ...).
    #[serde(default)]
    pub tags: Vec<String>,
    /// Ordered spellings; the first one carries the deduplication identity.
    #[serde(default)]
    pub japanese: Vec<Spelling>,
    /// Sense glosses.
    #[serde(default)]
    pub senses: Vec<Sense>,
    /// Source-dictionary attribution flags.
    #[serde(default)]
    pub attribution: Attribution,
    /// Usage examples linked to their own entries; filled during enrichment.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub collocations: Vec<Collocation>,
    /// Pronunciation audio; filled during enrichment, pruned of 404 assets.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub audios: Audios,
    /// Identifier of the resolved detail page; empty until resolved.
    #[serde(default)]
    pub word_page: String,
}

impl Word {
    /// Deduplication identity: the first spelling's written form, or its
    /// reading when no written form exists. `None` for spelling-less words,
    /// which cannot participate in the result set.
    pub fn canonical_key(&self) -> Option<&str> {
        self.japanese.first().map(|spelling| {
            if spelling.word.is_empty() {
                spelling.reading.as_str()
            } else {
                spelling.word.as_str()
            }
        })
    }
}

/// A written form and its reading. Kana-only words omit the written form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Spelling {
    /// Written (kanji) form; may be empty.
    #[serde(default)]
    pub word: String,
    /// Kana reading; may be empty.
    #[serde(default)]
    pub reading: String,
}

/// One sense gloss of a word.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sense {
    /// English glosses.
    #[serde(default)]
    pub english_definitions: Vec<String>,
    /// Grammatical categories.
    #[serde(default)]
    pub parts_of_speech: Vec<String>,
    /// External references attached to the sense.
    #[serde(default)]
    pub links: Vec<Link>,
    /// Sense-level tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Spelling/reading restrictions this sense applies to.
    #[serde(default)]
    pub restrictions: Vec<String>,
    /// Cross references.
    #[serde(default)]
    pub see_also: Vec<String>,
    /// Antonyms.
    #[serde(default)]
    pub antonyms: Vec<String>,
    /// Loanword origins.
    #[serde(default)]
    pub source: Vec<LoanSource>,
    /// Free-form usage notes.
    #[serde(default)]
    pub info: Vec<String>,
}

/// External link carried by a sense.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Link {
    /// Display text.
    #[serde(default)]
    pub text: String,
    /// Target address.
    #[serde(default)]
    pub url: String,
}

/// Loanword origin of a sense.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoanSource {
    /// Origin language.
    #[serde(default)]
    pub language: String,
    /// Origin word, when known.
    #[serde(default)]
    pub word: String,
}

/// Source-dictionary attribution flags.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Attribution {
    /// Present in JMdict.
    #[serde(default)]
    pub jmdict: bool,
    /// Present in JMnedict.
    #[serde(default)]
    pub jmnedict: bool,
    /// DBpedia reference; the service emits either `false` or a URL here.
    #[serde(default)]
    pub dbpedia: serde_json::Value,
}

/// A usage example phrase linked to its own dictionary entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Collocation {
    /// Display text as it appears on the detail page.
    pub raw: String,
    /// Opaque href-style source reference, re-derivable into a query string.
    #[serde(default)]
    pub src: String,
    /// The collocation's own entry; `None` when resolution found nothing.
    #[serde(default)]
    pub word: Option<Box<Word>>,
}

/// One pronunciation audio asset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Audio {
    /// Source address as declared on the detail page.
    pub src: String,
    /// Local filename once downloaded; empty before that.
    #[serde(default)]
    pub filename: String,
}

/// Envelope of one search feed page.
#[derive(Debug, Default, Deserialize)]
pub struct SearchPage {
    /// Service-level status echo; the crawl acts on transport status instead.
    #[serde(default)]
    pub meta: SearchMeta,
    /// Entries carried by this page.
    #[serde(default)]
    pub data: Vec<Word>,
}

/// Metadata block of a search feed page.
#[derive(Debug, Default, Deserialize)]
pub struct SearchMeta {
    /// Status code echoed by the service.
    #[serde(default)]
    pub status: u16,
}
