use tempfile::TempDir;

use c4rag_core::types::Passage;
use c4rag_text::{Bm25Searcher, PassageTextIndexer};

fn passage(doc: &str, start: usize, title: &str, text: &str) -> Passage {
    Passage {
        id: Passage::make_id(doc, start),
        document_id: doc.to_string(),
        title: title.to_string(),
        text: text.to_string(),
        start_offset: start,
        end_offset: start + text.chars().count(),
        chunk_index: 0,
        total_chunks: 1,
    }
}

fn corpus() -> Vec<Passage> {
    vec![
        passage("fire", 0, "Firecraft", "Build a fire with dry tinder and kindling. A fire needs oxygen."),
        passage("water", 0, "Water", "Boil water to make it safe. Filters remove sediment."),
        passage("shelter", 0, "Shelter", "A lean-to shelter keeps rain off while the fire burns nearby."),
        passage("radio", 0, "Radio", "Networking radios over long distances needs antennas."),
    ]
}

#[test]
fn bm25_ranks_term_frequency_first() {
    let searcher = Bm25Searcher::in_memory(&corpus()).expect("index");
    assert_eq!(searcher.num_passages(), 4);

    let hits = searcher.search("fire", 10).expect("search");
    let ids: Vec<_> = hits.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids.first(), Some(&"fire:0"));
    assert!(ids.contains(&"shelter:0"));
    assert!(!ids.contains(&"water:0"));
    for pair in hits.windows(2) { assert!(pair[0].score >= pair[1].score); }
}

#[test]
fn natural_language_questions_do_not_fail_to_parse() {
    let searcher = Bm25Searcher::in_memory(&corpus()).expect("index");
    let hits = searcher.search("how do I boil water? (quickly: \"safe\"", 3).expect("lenient parse");
    assert_eq!(hits.first().map(|h| h.id.as_str()), Some("water:0"));
    assert!(searcher.search("the of and", 3).expect("stopwords only").is_empty());
    assert!(searcher.search("fire", 0).expect("k=0").is_empty());
}

#[test]
fn equal_scores_keep_lowest_ids_at_the_cutoff() {
    let text = "The river floods every spring.";
    let passages: Vec<_> = ["z", "m", "a"].iter().map(|d| passage(d, 0, "River", text)).collect();
    let searcher = Bm25Searcher::in_memory(&passages).expect("index");

    let all: Vec<_> = searcher.search("river", 3).unwrap().into_iter().map(|h| h.id).collect();
    assert_eq!(all, ["a:0", "m:0", "z:0"]);
    let top1 = searcher.search("river", 1).unwrap();
    assert_eq!(top1.len(), 1);
    assert_eq!(top1[0].id, "a:0");
    let top2: Vec<_> = searcher.search("river", 2).unwrap().into_iter().map(|h| h.id).collect();
    assert_eq!(top2, ["a:0", "m:0"]);
}

#[test]
fn disk_index_is_searchable_after_reopen() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("tantivy");
    let all = corpus();

    let mut indexer = PassageTextIndexer::create(&dir).expect("create");
    indexer.add(&all[..2]).unwrap();
    indexer.commit().unwrap();
    indexer.add(&all[2..]).unwrap();
    indexer.commit().unwrap();
    drop(indexer);

    let searcher = Bm25Searcher::open(&dir).expect("open");
    assert_eq!(searcher.num_passages(), 4);
    let hits = searcher.search("antennas", 5).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "radio:0");

    let recreated = PassageTextIndexer::create(&dir).expect("recreate");
    drop(recreated);
    assert_eq!(Bm25Searcher::open(&dir).expect("reopen").num_passages(), 0);
}
