//! End-to-end harvest runs against a scripted transport.

use async_trait::async_trait;
use lexicrawl::{
    run, search_address, word_page_address, Category, FetchError, HarvestControls, HttpBackend,
    HttpReply, Query,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

const BASE: &str = "http://dict.test";

const EMPTY_FEED: &str = r#"{"meta":{"status":200},"data":[]}"#;

/// Scripted transport: explicit routes, a default empty feed for every other
/// search address, 404 for everything else, and an ordered request log.
struct ScriptedService {
    routes: HashMap<String, (u16, Vec<u8>)>,
    log: Mutex<Vec<String>>,
}

impl ScriptedService {
    fn new() -> Self {
        Self {
            routes: HashMap::new(),
            log: Mutex::new(Vec::new()),
        }
    }

    fn route(&mut self, address: String, status: u16, body: &str) {
        self.routes
            .insert(address, (status, body.as_bytes().to_vec()));
    }

    fn requests_for(&self, address: &str) -> usize {
        self.log
            .lock()
            .expect("request log")
            .iter()
            .filter(|seen| seen.as_str() == address)
            .count()
    }
}

#[async_trait]
impl HttpBackend for ScriptedService {
    async fn get(&self, address: &str) -> Result<HttpReply, FetchError> {
        self.log
            .lock()
            .expect("request log")
            .push(address.to_string());

        if let Some((status, body)) = self.routes.get(address) {
            return Ok(HttpReply {
                status: *status,
                body: body.clone(),
            });
        }
        if address.starts_with(&format!("{BASE}/api/v1/search/words")) {
            return Ok(HttpReply {
                status: 200,
                body: EMPTY_FEED.as_bytes().to_vec(),
            });
        }
        Ok(HttpReply {
            status: 404,
            body: Vec::new(),
        })
    }
}

fn feed_page(category: Category, page: usize) -> String {
    Query { category, page }.address(BASE)
}

/// The scripted upstream: 猫 (with a same-key variant) on the n5 feed, 犬 on
/// the n4 feed, 猫 repeated on the n3 feed. 猫's page lists one collocation
/// and two audio sources, one of which is missing upstream.
fn scripted_service() -> ScriptedService {
    let mut service = ScriptedService::new();

    let neko = r#"{"is_common":true,"tags":["wanikani8"],
        "japanese":[{"word":"猫","reading":"ねこ"}],
        "senses":[{"english_definitions":["cat"],"parts_of_speech":["Noun"]}],
        "attribution":{"jmdict":true,"jmnedict":false,"dbpedia":false}}"#;
    let neko_variant = r#"{"japanese":[{"word":"猫","reading":"びょう"}]}"#;
    let inu = r#"{"is_common":true,
        "japanese":[{"word":"犬","reading":"いぬ"}],
        "senses":[{"english_definitions":["dog"],"parts_of_speech":["Noun"]}],
        "attribution":{"jmdict":true,"jmnedict":false,"dbpedia":false}}"#;
    let nekonote = r#"{"japanese":[{"word":"猫の手","reading":"ねこのて"}]}"#;

    service.route(
        feed_page(Category::Level(5), 1),
        200,
        &format!(r#"{{"meta":{{"status":200}},"data":[{neko},{neko_variant}]}}"#),
    );
    service.route(
        feed_page(Category::Level(4), 1),
        200,
        &format!(r#"{{"meta":{{"status":200}},"data":[{inu}]}}"#),
    );
    service.route(
        feed_page(Category::Level(3), 1),
        200,
        &format!(r#"{{"meta":{{"status":200}},"data":[{neko}]}}"#),
    );
    service.route(
        search_address(BASE, "猫の手"),
        200,
        &format!(r#"{{"meta":{{"status":200}},"data":[{nekonote}]}}"#),
    );

    service.route(
        word_page_address(BASE, "猫"),
        200,
        include_str!("fixtures/neko-page.html"),
    );
    service.route(
        word_page_address(BASE, "犬"),
        200,
        include_str!("fixtures/inu-page.html"),
    );
    service.route(
        word_page_address(BASE, "猫の手"),
        200,
        include_str!("fixtures/nekonote-page.html"),
    );

    service.route(
        "http://media.dict.test/audio/neko.mp3".to_string(),
        200,
        "neko-mp3",
    );
    service.route(
        "http://media.dict.test/audio/inu.mp3".to_string(),
        200,
        "inu-mp3",
    );
    service.route(
        "http://media.dict.test/audio/nekonote.mp3".to_string(),
        200,
        "nekonote-mp3",
    );

    service
}

fn controls(workspace: &tempfile::TempDir) -> (HarvestControls, PathBuf) {
    let audio_dir = workspace.path().join("audio");
    let controls = HarvestControls::new(
        BASE.to_string(),
        workspace.path().join("cache"),
        audio_dir.clone(),
        10,
    );
    (controls, audio_dir)
}

#[tokio::test]
async fn harvest_dedupes_enriches_and_downloads() {
    let workspace = tempfile::tempdir().expect("tempdir");
    let (controls, audio_dir) = controls(&workspace);
    let service = Arc::new(scripted_service());

    let words = run(&controls, service.clone()).await.expect("harvest");

    let keys: Vec<&str> = words.keys().map(String::as_str).collect();
    assert_eq!(keys, ["犬", "猫"]);

    let neko = &words["猫"];
    assert_eq!(neko.word_page, "猫");
    assert_eq!(neko.japanese[0].reading, "ねこ");
    assert!(neko.is_common);

    // The 404 source is gone; the downloaded one carries its local name.
    assert_eq!(neko.audios.len(), 1);
    assert_eq!(neko.audios["audio/mpeg"].filename, "neko.mp3");
    assert!(audio_dir.join("neko.mp3").exists());

    let collocation = &neko.collocations[0];
    assert_eq!(collocation.raw, "猫の手");
    let nested = collocation.word.as_deref().expect("nested word");
    assert_eq!(nested.word_page, "猫の手");
    assert_eq!(nested.audios["audio/mpeg"].filename, "nekonote.mp3");
    assert!(audio_dir.join("nekonote.mp3").exists());

    let inu = &words["犬"];
    assert_eq!(inu.word_page, "犬");
    assert_eq!(inu.audios["audio/mpeg"].filename, "inu.mp3");
    assert!(inu.collocations.is_empty());

    // The discarded same-key variant was never probed for enrichment.
    assert_eq!(service.requests_for(&word_page_address(BASE, "びょう")), 0);
}

#[tokio::test]
async fn second_run_reuses_the_cache_but_reprobes_missing_assets() {
    let workspace = tempfile::tempdir().expect("tempdir");
    let (controls, _audio_dir) = controls(&workspace);
    let service = Arc::new(scripted_service());

    let first = run(&controls, service.clone()).await.expect("first run");
    let second = run(&controls, service.clone()).await.expect("second run");

    let first_keys: Vec<&String> = first.keys().collect();
    let second_keys: Vec<&String> = second.keys().collect();
    assert_eq!(first_keys, second_keys);

    // Feeds and pages were memoized on disk; only one network access each.
    assert_eq!(service.requests_for(&feed_page(Category::Level(5), 1)), 1);
    assert_eq!(service.requests_for(&word_page_address(BASE, "猫")), 1);

    // "Not found" answers are deliberately not memoized.
    assert_eq!(
        service.requests_for("http://media.dict.test/audio/neko.ogg"),
        2
    );
}

#[tokio::test]
async fn upstream_failure_aborts_the_run() {
    let workspace = tempfile::tempdir().expect("tempdir");
    let (controls, _audio_dir) = controls(&workspace);

    let mut service = scripted_service();
    service.route(feed_page(Category::Level(2), 4), 500, "upstream down");

    let result = run(&controls, Arc::new(service)).await;
    assert!(result.is_err());
}
