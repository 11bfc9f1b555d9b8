//! End-to-end cache behavior: parse, persist, reopen, invalidate.

use folio_engine::{
    Address, DocCache, Document, EngineConfig, Fingerprint, ImportSink, Importer, OpenOutcome,
    Result, TocItem, DOM_VERSION_CURRENT,
};

const PLAIN_TEXT_FLAGS: u32 = 0x02;

/// Minimal importer: one paragraph per source line, a chapter attribute on
/// every tenth paragraph, and a TOC entry per chapter
struct LineImporter;

impl Importer for LineImporter {
    fn populate(
        &mut self,
        doc: &mut Document,
        source: &[u8],
        sink: &mut dyn ImportSink,
    ) -> Result<()> {
        if !sink.format_detected(PLAIN_TEXT_FLAGS) {
            return Ok(());
        }
        let text = String::from_utf8_lossy(source);
        let body = doc.create_element(doc.root(), "body", None)?;
        for (i, line) in text.lines().enumerate() {
            let p = doc.create_element(body, "p", None)?;
            if i % 10 == 0 {
                doc.set_attribute(p, "chapter", &format!("ch{}", i / 10))?;
            }
            doc.create_text(p, line)?;
        }
        for i in 0..(doc.child_count(body) / 10) {
            let target = doc.child(body, i * 10).unwrap();
            let addr = Address::from_node(doc, target, None);
            doc.toc_mut()
                .push(TocItem::new(format!("Chapter {i}"), addr));
        }
        Ok(())
    }
}

fn source_lines(n: usize) -> Vec<u8> {
    (0..n)
        .map(|i| format!("Paragraph number {i} with some text."))
        .collect::<Vec<_>>()
        .join("\n")
        .into_bytes()
}

fn config(dom_version: u32) -> EngineConfig {
    EngineConfig {
        dom_version_requested: dom_version,
        caching_enabled: true,
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[test]
fn test_open_parse_then_open_from_cache() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let mut cache = DocCache::init(dir.path(), 10 << 20).unwrap();
    // 100 paragraphs = 202 nodes counting root and body
    let source = source_lines(100);

    let (doc, outcome) = Document::open(
        &source,
        &mut LineImporter,
        Some(&mut cache),
        config(DOM_VERSION_CURRENT),
    )
    .unwrap();
    assert_eq!(outcome, OpenOutcome::Parsed);
    assert_eq!(doc.node_count(), 202);

    let (cached, outcome) = Document::open(
        &source,
        &mut LineImporter,
        Some(&mut cache),
        config(DOM_VERSION_CURRENT),
    )
    .unwrap();
    assert_eq!(outcome, OpenOutcome::FromCache);

    // tree contents match the pre-save document
    assert_eq!(cached.node_count(), doc.node_count());
    assert_eq!(cached.subtree_text(cached.root()), doc.subtree_text(doc.root()));
    let body = cached.children(cached.root())[0];
    let p20 = cached.child(body, 20).unwrap();
    assert_eq!(cached.attribute(p20, "chapter").as_deref(), Some("ch2"));

    // addresses saved before the round trip still resolve to the same text
    let addr = Address::from_path_string(&doc, "/body/p[42]/text()");
    let node = addr.resolve(&cached).unwrap();
    assert_eq!(
        cached.text(node).as_deref(),
        Some("Paragraph number 41 with some text.")
    );

    // TOC survived alongside the arena
    assert_eq!(cached.toc().len(), 10);
    assert_eq!(cached.toc()[3].label, "Chapter 3");
    assert!(cached.toc()[3].address.resolve(&cached).is_some());
}

#[test]
fn test_dom_version_mismatch_reparses() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let mut cache = DocCache::init(dir.path(), 10 << 20).unwrap();
    let source = source_lines(100);

    let (_, outcome) = Document::open(
        &source,
        &mut LineImporter,
        Some(&mut cache),
        config(DOM_VERSION_CURRENT),
    )
    .unwrap();
    assert_eq!(outcome, OpenOutcome::Parsed);

    // a requested version below the compatibility threshold invalidates
    // the cached entry
    let (doc, outcome) = Document::open(&source, &mut LineImporter, Some(&mut cache), config(1))
        .unwrap();
    assert_eq!(outcome, OpenOutcome::ReparsedCacheInvalid);
    assert_eq!(doc.node_count(), 202);
}

#[test]
fn test_different_source_bytes_miss_cache() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let mut cache = DocCache::init(dir.path(), 10 << 20).unwrap();

    let (_, outcome) = Document::open(
        &source_lines(50),
        &mut LineImporter,
        Some(&mut cache),
        config(DOM_VERSION_CURRENT),
    )
    .unwrap();
    assert_eq!(outcome, OpenOutcome::Parsed);

    let (_, outcome) = Document::open(
        &source_lines(51),
        &mut LineImporter,
        Some(&mut cache),
        config(DOM_VERSION_CURRENT),
    )
    .unwrap();
    assert_eq!(outcome, OpenOutcome::Parsed);
    assert_eq!(cache.entry_count(), 2);
}

#[test]
fn test_caching_disabled_always_parses() {
    init_tracing();
    let source = source_lines(10);
    let cfg = EngineConfig {
        dom_version_requested: DOM_VERSION_CURRENT,
        caching_enabled: false,
    };
    let (doc, outcome) = Document::open(&source, &mut LineImporter, None, cfg).unwrap();
    assert_eq!(outcome, OpenOutcome::Parsed);
    assert_eq!(doc.node_count(), 22);
}

#[test]
fn test_corrupted_entry_falls_back_to_reparse() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let source = source_lines(30);
    {
        let mut cache = DocCache::init(dir.path(), 10 << 20).unwrap();
        Document::open(
            &source,
            &mut LineImporter,
            Some(&mut cache),
            config(DOM_VERSION_CURRENT),
        )
        .unwrap();
    }
    // trash the entry header
    let entry = std::fs::read_dir(dir.path())
        .unwrap()
        .flatten()
        .find(|e| e.file_name().to_string_lossy().ends_with(".cf"))
        .unwrap()
        .path();
    let mut bytes = std::fs::read(&entry).unwrap();
    for b in &mut bytes[8..16] {
        *b ^= 0xff;
    }
    std::fs::write(&entry, &bytes).unwrap();

    let mut cache = DocCache::init(dir.path(), 10 << 20).unwrap();
    let (doc, outcome) = Document::open(
        &source,
        &mut LineImporter,
        Some(&mut cache),
        config(DOM_VERSION_CURRENT),
    )
    .unwrap();
    // never a crash, never trusted data: the document is rebuilt from source
    assert_eq!(outcome, OpenOutcome::ReparsedCacheInvalid);
    assert_eq!(doc.node_count(), 62);
}

#[test]
fn test_resave_keeps_swapped_parts() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let mut cache = DocCache::init(dir.path(), 10 << 20).unwrap();
    // enough paragraphs that text payloads span more than one arena part
    let source = source_lines(1100);

    Document::open(
        &source,
        &mut LineImporter,
        Some(&mut cache),
        config(DOM_VERSION_CURRENT),
    )
    .unwrap();
    let (mut doc, outcome) = Document::open(
        &source,
        &mut LineImporter,
        Some(&mut cache),
        config(DOM_VERSION_CURRENT),
    )
    .unwrap();
    assert_eq!(outcome, OpenOutcome::FromCache);

    // touch only the first part, then persist a fresh entry over the old one
    let first = Address::from_path_string(&doc, "/body/p/text()")
        .resolve(&doc)
        .unwrap();
    doc.set_text(first, "edited opening line").unwrap();
    let mut entry = cache
        .create_new(&Fingerprint::of(&source), PLAIN_TEXT_FLAGS, DOM_VERSION_CURRENT)
        .unwrap();
    doc.save_to_cache(&mut entry).unwrap();
    cache.publish(entry).unwrap();
    drop(doc);

    let (doc2, outcome) = Document::open(
        &source,
        &mut LineImporter,
        Some(&mut cache),
        config(DOM_VERSION_CURRENT),
    )
    .unwrap();
    assert_eq!(outcome, OpenOutcome::FromCache);
    // payloads that were still swapped out at save time survive the rewrite
    let late = Address::from_path_string(&doc2, "/body/p[1090]/text()")
        .resolve(&doc2)
        .unwrap();
    assert_eq!(
        doc2.text(late).as_deref(),
        Some("Paragraph number 1089 with some text.")
    );
    let first = Address::from_path_string(&doc2, "/body/p/text()")
        .resolve(&doc2)
        .unwrap();
    assert_eq!(doc2.text(first).as_deref(), Some("edited opening line"));
}

#[test]
fn test_swap_out_and_lazy_reload() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let mut cache = DocCache::init(dir.path(), 10 << 20).unwrap();
    let source = source_lines(100);

    let (mut doc, _) = Document::open(
        &source,
        &mut LineImporter,
        Some(&mut cache),
        config(DOM_VERSION_CURRENT),
    )
    .unwrap();
    assert!(doc.swap_out_all());

    // payload access transparently reloads from the cache file
    let addr = Address::from_path_string(&doc, "/body/p[7]/text()");
    let node = addr.resolve(&doc).unwrap();
    assert_eq!(
        doc.text(node).as_deref(),
        Some("Paragraph number 6 with some text.")
    );
}
