//! Batching against the real BPE encodings.
//!
//! The unit tests in `src/batch.rs` pin exact split points with a
//! one-token-per-char counter; these check the same guarantees hold with
//! tiktoken's `cl100k_base` counts.

use edgequake_ocrbatch::{
    Attachment, BatchConfig, Batcher, BpeTokenCounter, Role, TokenCounter, TokenEncoding,
};

fn sample_text(words: usize) -> String {
    const VOCAB: &[&str] = &[
        "invoice", "total", "12.50", "EUR", "Rechnung", "paid", "on", "2024-03-01",
        "thank", "you", "for", "your", "business", "—", "ref#A-1129",
    ];
    (0..words)
        .map(|i| VOCAB[i % VOCAB.len()])
        .collect::<Vec<_>>()
        .join(if words % 2 == 0 { " " } else { "\n" })
}

fn cl100k(ceiling: usize) -> Batcher {
    Batcher::new(BpeTokenCounter::new(TokenEncoding::Cl100kBase).unwrap(), ceiling)
}

#[test]
fn default_config_is_cl100k_at_4000() {
    let batcher = Batcher::from_config(&BatchConfig::default()).unwrap();
    assert_eq!(batcher.ceiling(), 4000);
    assert_eq!(batcher.counter().encoding(), TokenEncoding::Cl100kBase);
}

#[test]
fn every_multi_word_batch_fits_the_ceiling() {
    let batcher = cl100k(50);
    let text = sample_text(1000);
    let batches = batcher.batch(&text, &[]);

    assert!(batches.len() > 1, "expected several batches");
    for (i, b) in batches.iter().enumerate() {
        assert_eq!(b.role, Role::User);
        assert!(!b.content.is_empty());
        // The first batch is measured as it was checked, with a leading space.
        let measured = if i == 0 {
            format!(" {}", b.content)
        } else {
            b.content.clone()
        };
        let tokens = batcher.counter().count_tokens(&measured);
        if b.content.contains(' ') {
            assert!(tokens <= 50, "batch has {tokens} tokens: {:?}", b.content);
        }
    }
}

#[test]
fn batching_preserves_every_word_in_order() {
    let batcher = cl100k(40);
    let text = sample_text(777);
    let batches = batcher.batch(&text, &[]);

    let rebuilt: Vec<&str> = batches
        .iter()
        .flat_map(|b| b.content.split(' '))
        .collect();
    let original: Vec<&str> = text.split_whitespace().collect();
    assert_eq!(rebuilt, original);
}

#[test]
fn batches_are_greedy() {
    // Adding the next batch's first word to any batch would break the ceiling.
    let batcher = cl100k(30);
    let batches = batcher.batch(&sample_text(300), &[]);

    assert!(batches.len() > 1);
    for (i, pair) in batches.windows(2).enumerate() {
        let next_word = pair[1].content.split(' ').next().unwrap();
        // Only the first batch was measured with a leading space.
        let grown = if i == 0 {
            format!(" {} {}", pair[0].content, next_word)
        } else {
            format!("{} {}", pair[0].content, next_word)
        };
        assert!(batcher.counter().count_tokens(&grown) > 30);
    }
}

#[test]
fn over_long_word_is_emitted_whole() {
    let batcher = cl100k(10);
    let word = "qzxwvjkpfh".repeat(20);
    assert!(batcher.counter().count_tokens(&word) > 10);

    let text = format!("short start {word} short end");
    let batches = batcher.batch(&text, &[]);

    let contents: Vec<&str> = batches.iter().map(|b| b.content.as_str()).collect();
    assert_eq!(contents, vec!["short start", word.as_str(), "short end"]);
}

#[test]
fn small_text_is_a_single_batch() {
    let batches = cl100k(4000).batch("Hello world,\n\nthis is page one.\n", &[]);
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].content, "Hello world, this is page one.");
}

#[test]
fn whitespace_only_text_yields_nothing() {
    assert!(cl100k(4000).batch("  \n\n\t ", &[]).is_empty());
}

#[test]
fn attachments_follow_all_text_batches() {
    let batcher = cl100k(20);
    let attachments = [
        Attachment::new("data:image/png;base64,AAAA"),
        Attachment {
            url: "https://files.example.com/scan.pdf".into(),
            name: Some("scan.pdf".into()),
            content_type: Some("application/pdf".into()),
        },
    ];
    let batches = batcher.batch(&sample_text(200), &attachments);

    let last = batches.last().unwrap();
    assert_eq!(
        last.content,
        "data:image/png;base64,AAAA\nhttps://files.example.com/scan.pdf"
    );
    assert!(batches[..batches.len() - 1]
        .iter()
        .all(|b| !b.content.contains("https://files.example.com")));
}

#[test]
fn other_encodings_are_available() {
    for encoding in [TokenEncoding::P50kBase, TokenEncoding::R50kBase] {
        let counter = BpeTokenCounter::new(encoding).unwrap();
        assert_eq!(counter.count_tokens(""), 0);
        assert!(counter.count_tokens("hello world") >= 2);
        assert_eq!(counter.encoding(), encoding);
    }
}
