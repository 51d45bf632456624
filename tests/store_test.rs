//! Store behavior across ingestion: persistence, atomic replacement and eviction.

mod common;

use assert2::{check, let_assert};
use common::{HangingGenerator, RustdocFixture, TempWorkspace, demo_crate, primitive, std_crate};
use rust_docs_mcp::error::DocsError;
use rust_docs_mcp::ingest::Ingestor;
use rust_docs_mcp::normalize::normalize;
use rust_docs_mcp::raw;
use rust_docs_mcp::search::{SearchEngine, SearchOptions};
use rust_docs_mcp::store::{DocStore, EvictionPolicy, ScopeFilter};
use rust_docs_mcp::types::DocItem;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime};

const TIMEOUT: Duration = Duration::from_secs(30);

fn normalized_items(fixture: &RustdocFixture) -> Vec<DocItem> {
    let tree = raw::parse(&fixture.to_bytes()).unwrap();
    normalize(&tree, &fixture.scope()).unwrap().items
}

#[tokio::test]
async fn ingested_scopes_survive_reopen() {
    let workspace = TempWorkspace::new();
    let dir = workspace.path().join("store");

    {
        let store = Arc::new(DocStore::open(&dir).unwrap());
        let ingestor = Ingestor::new(store, Arc::new(HangingGenerator), TIMEOUT);
        let fixture = demo_crate();
        ingestor.ingest_json(fixture.scope(), fixture.to_bytes()).await.unwrap();
    }

    let store = Arc::new(DocStore::open(&dir).unwrap());
    check!(store.contains_scope(&demo_crate().scope()));
    let add = store.find_path("demo::add").unwrap();
    check!(add.item.signature.as_deref() == Some("fn add(a: i32, b: i32) -> i32"));

    let engine = SearchEngine::new(store, SearchOptions::default());
    let outcome = engine.search("ad", &ScopeFilter::for_crate("demo"), 5).unwrap();
    check!(outcome.results[0].item_path == "demo::add");
}

#[test]
fn readers_never_see_a_partial_scope() {
    let store = Arc::new(DocStore::in_memory());
    let small = demo_crate();
    let mut large = demo_crate();
    let mul = large.function(
        "mul",
        "Multiplies two numbers.",
        &[("a", primitive("i32")), ("b", primitive("i32"))],
        Some(primitive("i32")),
    );
    large.at_root(&[mul]);

    let small_items = normalized_items(&small);
    let large_items = normalized_items(&large);
    let scope = small.scope();
    store.replace_scope(&scope, small_items.clone()).unwrap();

    let done = Arc::new(AtomicBool::new(false));
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = store.clone();
            let done = done.clone();
            std::thread::spawn(move || {
                let mut observed = Vec::new();
                while !done.load(Ordering::SeqCst) {
                    let items = store.scan(&ScopeFilter::for_crate("demo")).unwrap();
                    observed.push(items.len());
                }
                observed
            })
        })
        .collect();

    for round in 0..200 {
        let items = if round % 2 == 0 { &large_items } else { &small_items };
        store.replace_scope(&scope, items.clone()).unwrap();
    }
    done.store(true, Ordering::SeqCst);

    for reader in readers {
        let observed = reader.join().unwrap();
        check!(observed.iter().all(|&len| len == small_items.len() || len == large_items.len()));
    }
}

#[tokio::test]
async fn eviction_removes_whole_scopes() {
    let store = Arc::new(DocStore::in_memory());
    let ingestor = Ingestor::new(store.clone(), Arc::new(HangingGenerator), TIMEOUT);
    for fixture in [demo_crate(), std_crate()] {
        ingestor.ingest_json(fixture.scope(), fixture.to_bytes()).await.unwrap();
    }

    let held = store.scan(&ScopeFilter::all()).unwrap();
    let held_len = held.len();

    let policy = EvictionPolicy {
        max_age: Some(Duration::ZERO),
        max_bytes: None,
    };
    let report = store
        .evict_at(&policy, SystemTime::now() + Duration::from_secs(1))
        .unwrap();
    check!(report.removed.len() == 2);
    check!(report.remaining_bytes == 0);

    // A scan taken before eviction keeps its snapshot.
    check!(held.len() == held_len);
    check!(held.iter().count() == held_len);

    check!(store.scan(&ScopeFilter::all()).unwrap().is_empty());
    let_assert!(Err(DocsError::UnknownScope { .. }) = store.scan(&ScopeFilter::for_crate("demo")));
    let_assert!(Err(DocsError::NotFound { .. }) = store.find_path("demo::add"));
}

#[tokio::test]
async fn size_limit_evicts_oldest_scope_first() {
    let store = Arc::new(DocStore::in_memory());
    let ingestor = Ingestor::new(store.clone(), Arc::new(HangingGenerator), TIMEOUT);

    let std_fixture = std_crate();
    ingestor.ingest_json(std_fixture.scope(), std_fixture.to_bytes()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    let demo = demo_crate();
    ingestor.ingest_json(demo.scope(), demo.to_bytes()).await.unwrap();

    let demo_size = store
        .scopes()
        .into_iter()
        .find(|info| info.scope == demo.scope())
        .map(|info| info.size_bytes)
        .unwrap();

    let policy = EvictionPolicy {
        max_age: None,
        max_bytes: Some(demo_size),
    };
    let report = store.evict(&policy).unwrap();
    check!(report.removed == vec![std_fixture.scope()]);
    check!(store.contains_scope(&demo.scope()));
    check!(!store.contains_scope(&std_fixture.scope()));
}
