//! Token counting under a fixed BPE scheme.
//!
//! The batcher's ceiling guarantee is only as good as the agreement between
//! this counter and the tokenizer the downstream endpoint enforces its
//! context limit with. [`BpeTokenCounter`] uses the same BPE tables as the
//! OpenAI-family models; `cl100k_base` is the default.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use tiktoken_rs::CoreBPE;

/// Measures the token length of a text span.
///
/// Implementations must be pure: the same text always yields the same count.
pub trait TokenCounter: Send + Sync {
    fn count_tokens(&self, text: &str) -> usize;
}

/// BPE vocabulary used for counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenEncoding {
    /// GPT-3.5 / GPT-4 family. (default)
    #[default]
    Cl100kBase,
    /// Codex and `text-davinci-002/003`.
    P50kBase,
    /// GPT-3 (`davinci`) family.
    R50kBase,
}

impl fmt::Display for TokenEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TokenEncoding::Cl100kBase => "cl100k_base",
            TokenEncoding::P50kBase => "p50k_base",
            TokenEncoding::R50kBase => "r50k_base",
        })
    }
}

/// [`TokenCounter`] backed by tiktoken BPE tables.
pub struct BpeTokenCounter {
    encoding: TokenEncoding,
    bpe: CoreBPE,
}

impl BpeTokenCounter {
    /// Load the BPE tables for `encoding`. The tables ship inside the
    /// `tiktoken-rs` crate; nothing is downloaded.
    pub fn new(encoding: TokenEncoding) -> Result<Self, Error> {
        let bpe = match encoding {
            TokenEncoding::Cl100kBase => tiktoken_rs::cl100k_base(),
            TokenEncoding::P50kBase => tiktoken_rs::p50k_base(),
            TokenEncoding::R50kBase => tiktoken_rs::r50k_base(),
        }
        .map_err(|e| Error::Tokenizer {
            encoding: encoding.to_string(),
            detail: e.to_string(),
        })?;

        Ok(Self { encoding, bpe })
    }

    pub fn encoding(&self) -> TokenEncoding {
        self.encoding
    }
}

impl TokenCounter for BpeTokenCounter {
    /// Special-token markers such as `<|endoftext|>` are counted as plain
    /// text rather than rejected.
    fn count_tokens(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }
}

impl fmt::Debug for BpeTokenCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BpeTokenCounter")
            .field("encoding", &self.encoding)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cl100k() -> BpeTokenCounter {
        BpeTokenCounter::new(TokenEncoding::Cl100kBase).expect("cl100k tables load")
    }

    #[test]
    fn empty_text_has_no_tokens() {
        assert_eq!(cl100k().count_tokens(""), 0);
    }

    #[test]
    fn known_counts() {
        let c = cl100k();
        assert_eq!(c.count_tokens("hello"), 1);
        assert_eq!(c.count_tokens(" hello"), 1);
        assert_eq!(c.count_tokens("hello world"), 2);
    }

    #[test]
    fn counting_is_deterministic() {
        let c = cl100k();
        let text = "The quick brown fox jumps over the lazy dog.";
        assert_eq!(c.count_tokens(text), c.count_tokens(text));
    }

    #[test]
    fn special_tokens_are_plain_text() {
        let c = cl100k();
        assert!(c.count_tokens("<|endoftext|>") > 1);
    }

    #[test]
    fn all_encodings_load() {
        for enc in [
            TokenEncoding::Cl100kBase,
            TokenEncoding::P50kBase,
            TokenEncoding::R50kBase,
        ] {
            let c = BpeTokenCounter::new(enc).unwrap();
            assert_eq!(c.encoding(), enc);
            assert!(c.count_tokens("tokenizer") >= 1);
        }
    }

    #[test]
    fn encoding_serde_names() {
        assert_eq!(
            serde_json::to_string(&TokenEncoding::Cl100kBase).unwrap(),
            "\"cl100k_base\""
        );
        assert_eq!(TokenEncoding::P50kBase.to_string(), "p50k_base");
    }
}
