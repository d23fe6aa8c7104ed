//! Detail-page extraction.
//!
//! A detail page carries, inside its fixed status block, an audio element
//! listing pronunciation sources and a div listing collocation links. The
//! surrounding markup is an opaque contract; only that block is read.

use crate::model::{Audio, Audios, Collocation};
use scraper::{ElementRef, Html, Selector};
use std::borrow::Cow;

/// Audio references and collocations extracted from one detail page.
#[derive(Debug, Default)]
pub struct PageExtract {
    /// Audio variants keyed by declared MIME type; filenames still empty.
    pub audios: Audios,
    /// Collocations with raw text and source reference; words unresolved.
    pub collocations: Vec<Collocation>,
}

/// Pre-parsed selectors for the fixed detail-page structure.
pub struct WordPageExtractor {
    status: Selector,
    source: Selector,
    link: Selector,
}

impl WordPageExtractor {
    /// Builds the selector set once; reused for every page.
    pub fn new() -> Self {
        Self {
            status: Selector::parse(".concept_light-status").expect("status selector"),
            source: Selector::parse("source").expect("source selector"),
            link: Selector::parse("ul > li > a").expect("collocation link selector"),
        }
    }

    /// Pulls audio references and collocations out of a detail page.
    ///
    /// The parser is lenient, so malformed markup degrades to an empty
    /// extract rather than failing the run. Within the status block, an
    /// audio-bearing child contributes one audio per declared source and a
    /// list-bearing child contributes one collocation per list item.
    pub fn extract(&self, html: &str) -> PageExtract {
        let document = Html::parse_document(html);
        let mut extract = PageExtract::default();

        for status in document.select(&self.status) {
            for child in status.children().filter_map(ElementRef::wrap) {
                match child.value().name() {
                    "audio" => extract.audios = self.audio_sources(child),
                    "div" => extract.collocations = self.collocation_links(child),
                    _ => {}
                }
            }
        }

        extract
    }

    fn audio_sources(&self, audio: ElementRef<'_>) -> Audios {
        let mut audios = Audios::new();
        for source in audio.select(&self.source) {
            let kind = source.value().attr("type").unwrap_or_default().to_string();
            let src = source.value().attr("src").unwrap_or_default().to_string();
            audios.insert(
                kind,
                Audio {
                    src,
                    filename: String::new(),
                },
            );
        }
        audios
    }

    fn collocation_links(&self, div: ElementRef<'_>) -> Vec<Collocation> {
        div.select(&self.link)
            .map(|anchor| Collocation {
                raw: anchor.text().next().unwrap_or_default().to_string(),
                src: anchor.value().attr("href").unwrap_or_default().to_string(),
                word: None,
            })
            .collect()
    }
}

impl Default for WordPageExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Re-derives the literal query string from a collocation source reference:
/// strip the search prefix, percent-decode, strip the section suffix, trim.
/// An undecodable reference yields an empty query, which resolves to nothing.
pub fn decode_collocation_query(src: &str) -> String {
    let stripped = src.strip_prefix("/search/").unwrap_or(src);
    let decoded = urlencoding::decode(stripped)
        .map(Cow::into_owned)
        .unwrap_or_default();
    let trimmed = decoded.strip_suffix("#words").unwrap_or(&decoded);
    trimmed.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORD_PAGE: &str = r#"
        <html><body>
          <div class="concept_light">
            <div class="concept_light-status">
              <audio id="audio_1">
                <source src="http://media.dict.test/audio/neko.mp3" type="audio/mpeg">
                <source src="http://media.dict.test/audio/neko.ogg" type="audio/ogg">
              </audio>
              <div class="concept_light-status_link">
                <ul>
                  <li><a href="/search/%E7%8C%AB%E3%81%AE%E6%89%8B#words">猫の手</a></li>
                  <li><a href="/search/%E7%8C%AB%E8%88%8C#words">猫舌</a></li>
                </ul>
              </div>
            </div>
          </div>
        </body></html>"#;

    #[test]
    fn extracts_audio_sources_by_type() {
        let extract = WordPageExtractor::new().extract(WORD_PAGE);
        assert_eq!(extract.audios.len(), 2);
        assert_eq!(
            extract.audios["audio/mpeg"].src,
            "http://media.dict.test/audio/neko.mp3"
        );
        assert!(extract.audios["audio/ogg"].filename.is_empty());
    }

    #[test]
    fn extracts_collocations_with_raw_text_and_reference() {
        let extract = WordPageExtractor::new().extract(WORD_PAGE);
        let collocations = &extract.collocations;
        assert_eq!(collocations.len(), 2);
        assert_eq!(collocations[0].raw, "猫の手");
        assert_eq!(collocations[0].src, "/search/%E7%8C%AB%E3%81%AE%E6%89%8B#words");
        assert!(collocations[0].word.is_none());
    }

    #[test]
    fn pages_without_a_status_block_yield_an_empty_extract() {
        let extract = WordPageExtractor::new().extract("<html><body><p>nope</p></body></html>");
        assert!(extract.audios.is_empty());
        assert!(extract.collocations.is_empty());
    }

    #[test]
    fn collocation_queries_decode_to_the_literal_string() {
        assert_eq!(
            decode_collocation_query("/search/%E7%8C%AB%E3%81%AE%E6%89%8B#words"),
            "猫の手"
        );
        assert_eq!(
            decode_collocation_query("/search/%E7%8C%AB%E8%88%8C%20#words"),
            "猫舌"
        );
    }

    #[test]
    fn undecodable_references_yield_an_empty_query() {
        assert_eq!(decode_collocation_query("/search/%FF#words"), "");
    }
}
