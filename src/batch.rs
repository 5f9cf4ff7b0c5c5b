//! Token-aware batching of text and attachment references.
//!
//! [`Batcher::batch`] splits text on whitespace and packs words greedily into
//! chat messages whose token count stays at or under the ceiling. If there
//! are attachments, exactly one more message follows the text batches,
//! listing their URLs one per line.
//!
//! Two behaviours are deliberate:
//!
//! * A word is never split. A single word over the ceiling is emitted alone,
//!   and that batch exceeds the ceiling.
//! * Each word's speculative check measures `current + " " + word`, so the
//!   first word of the first batch is measured with a leading space. That
//!   costs at most one token of headroom on the first batch.

use crate::config::BatchConfig;
use crate::error::Error;
use crate::tokens::{BpeTokenCounter, TokenCounter};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Author of a chat message. Batches are always sent as the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
}

/// One bounded chunk of content, sent as a single downstream message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub role: Role,
    pub content: String,
}

impl Batch {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Content accompanying a text request, referenced by URL and never modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl Attachment {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: None,
            content_type: None,
        }
    }
}

/// Splits text into batches of at most `ceiling` tokens.
#[derive(Debug)]
pub struct Batcher<C = BpeTokenCounter> {
    counter: C,
    ceiling: usize,
}

impl Batcher<BpeTokenCounter> {
    /// Batcher using the BPE encoding and ceiling from `config`.
    pub fn from_config(config: &BatchConfig) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self::new(BpeTokenCounter::new(config.encoding)?, config.ceiling))
    }
}

impl<C: TokenCounter> Batcher<C> {
    pub fn new(counter: C, ceiling: usize) -> Self {
        Self { counter, ceiling }
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    pub fn counter(&self) -> &C {
        &self.counter
    }

    /// Split `text` into token-bounded user messages, followed by one
    /// attachment message if `attachments` is non-empty.
    ///
    /// Empty or whitespace-only text with no attachments yields no batches.
    pub fn batch(&self, text: &str, attachments: &[Attachment]) -> Vec<Batch> {
        let (mut batches, current) = words(text).fold(
            (Vec::new(), String::new()),
            |(mut batches, current), word| {
                let candidate = format!("{current} {word}");
                if self.counter.count_tokens(&candidate) <= self.ceiling {
                    return (batches, candidate);
                }
                let finished = current.trim();
                // An over-long first word overflows with nothing buffered yet.
                if !finished.is_empty() {
                    batches.push(Batch::user(finished));
                }
                (batches, word.to_string())
            },
        );

        let last = current.trim();
        if !last.is_empty() {
            batches.push(Batch::user(last));
        }
        let text_batches = batches.len();

        if !attachments.is_empty() {
            let urls: Vec<&str> = attachments.iter().map(|a| a.url.as_str()).collect();
            batches.push(Batch::user(urls.join("\n")));
        }

        debug!(
            "Batched {} bytes into {} text batches (+{} attachment batch) at ceiling {}",
            text.len(),
            text_batches,
            batches.len() - text_batches,
            self.ceiling
        );
        batches
    }
}

/// Whitespace-separated words. U+FEFF counts as a separator, so a byte-order
/// mark at the start of OCR output never glues onto the first word.
fn words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| c.is_whitespace() || c == '\u{feff}')
        .filter(|w| !w.is_empty())
}
