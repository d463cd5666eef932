use super::*;

fn splitter(chunk_size: usize, chunk_overlap: usize) -> TextSplitter {
    TextSplitter::new(ChunkingConfig {
        chunk_size,
        chunk_overlap,
    })
}

fn numbered_words(count: usize) -> String {
    (0..count)
        .map(|i| format!("w{i}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Length of the longest suffix of `prev` that is also a prefix of `next`
fn overlap_len(prev: &str, next: &str) -> usize {
    (1..=prev.len().min(next.len()))
        .rev()
        .find(|&k| next.get(..k).is_some_and(|prefix| prev.ends_with(prefix)))
        .unwrap_or(0)
}

#[test]
fn short_text_is_single_chunk() {
    let chunks = splitter(500, 100).split_text("A short policy statement.");
    assert_eq!(chunks, vec!["A short policy statement.".to_string()]);
}

#[test]
fn empty_and_whitespace_text_produce_no_chunks() {
    let splitter = splitter(50, 10);
    assert!(splitter.split_text("").is_empty());
    assert!(splitter.split_text("   \n\n  \n ").is_empty());
}

#[test]
fn splits_on_paragraphs_first() {
    let text = "First paragraph here.\n\nSecond paragraph text.";
    let chunks = splitter(30, 0).split_text(text);

    assert_eq!(
        chunks,
        vec![
            "First paragraph here.".to_string(),
            "Second paragraph text.".to_string()
        ]
    );
}

#[test]
fn chunks_never_exceed_chunk_size() {
    let text = format!(
        "{}\n\n{}\n{}",
        numbered_words(120),
        numbered_words(40),
        "x".repeat(75)
    );
    let chunks = splitter(60, 15).split_text(&text);

    assert!(chunks.len() > 1);
    for chunk in &chunks {
        assert!(
            chunk.chars().count() <= 60,
            "chunk too long ({}): {chunk:?}",
            chunk.chars().count()
        );
    }
}

#[test]
fn falls_back_to_characters_for_unbroken_text() {
    let chunks = splitter(10, 2).split_text(&"a".repeat(25));

    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[0].len(), 10);
    assert_eq!(chunks[1].len(), 10);
    assert_eq!(chunks[2].len(), 9);
}

#[test]
fn consecutive_chunks_overlap_within_limit() {
    let chunk_overlap = 12;
    let chunks = splitter(50, chunk_overlap).split_text(&numbered_words(200));

    assert!(chunks.len() > 2);
    for pair in chunks.windows(2) {
        let overlap = overlap_len(&pair[0], &pair[1]);
        assert!(
            overlap > 0,
            "expected overlap between {:?} and {:?}",
            pair[0],
            pair[1]
        );
        assert!(
            overlap <= chunk_overlap,
            "overlap of {overlap} exceeds {chunk_overlap} between {:?} and {:?}",
            pair[0],
            pair[1]
        );
    }
}

#[test]
fn zero_overlap_shares_nothing() {
    let chunks = splitter(50, 0).split_text(&numbered_words(100));

    assert!(chunks.len() > 1);
    for pair in chunks.windows(2) {
        let first_word = pair[1].split_whitespace().next().expect("chunk has words");
        assert!(!pair[0].split_whitespace().any(|w| w == first_word));
    }
}

#[test]
fn splitting_is_deterministic() {
    let text = format!("{}\n\n{}", numbered_words(300), numbered_words(80));
    let splitter = splitter(120, 30);

    let first = splitter.split_text(&text);
    let second = splitter.split_text(&text);

    assert_eq!(first.len(), second.len());
    assert_eq!(first, second);
}

#[test]
fn counts_characters_not_bytes() {
    let text = "é".repeat(30);
    let chunks = splitter(10, 0).split_text(&text);

    assert_eq!(chunks.len(), 3);
    assert!(chunks.iter().all(|c| c.chars().count() == 10));
}

#[test]
fn split_pages_keeps_metadata() {
    let pages = vec![
        PdfPage {
            source: "docs/policy.pdf".to_string(),
            page: 0,
            text: numbered_words(40),
        },
        PdfPage {
            source: "docs/policy.pdf".to_string(),
            page: 1,
            text: String::new(),
        },
        PdfPage {
            source: "docs/policy.pdf".to_string(),
            page: 2,
            text: "Final page.".to_string(),
        },
    ];

    let chunks = splitter(50, 10).split_pages(&pages);

    assert!(chunks.len() > 2);
    assert!(chunks.iter().all(|c| c.source == "docs/policy.pdf"));
    assert!(chunks.iter().all(|c| c.page != 1));
    for (i, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.chunk_index, i);
    }

    let last = chunks.last().expect("chunks exist");
    assert_eq!(last.page, 2);
    assert_eq!(last.content, "Final page.");
}

#[test]
fn default_config_matches_pipeline_constants() {
    let config = ChunkingConfig::default();
    assert_eq!(config.chunk_size, 500);
    assert_eq!(config.chunk_overlap, 100);
}
