//! Roast corpus loading and random selection.

use std::path::Path;

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::warn;

/// Sent when the corpus has no usable lines.
pub const EMPTY_CORPUS: &str = "I'm out of roasts right now. Consider yourself lucky.";
/// Sent when the corpus file cannot be read.
pub const CORPUS_UNAVAILABLE: &str = "My roast book went missing, so you get a free pass today.";

/// Non-blank lines of `content`, trimmed, in file order.
pub fn parse_corpus(content: &str) -> Vec<&str> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

/// Pick one line uniformly at random, or the empty-corpus fallback.
pub fn pick<'a, R: Rng + ?Sized>(corpus: &[&'a str], rng: &mut R) -> &'a str {
    corpus.choose(rng).copied().unwrap_or(EMPTY_CORPUS)
}

/// Read the corpus fresh from `path` and pick a roast. Never fails.
pub async fn select_roast(path: &Path) -> String {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => {
            let corpus = parse_corpus(&content);
            pick(&corpus, &mut rand::thread_rng()).to_string()
        }
        Err(e) => {
            warn!("Failed to read roast corpus {}: {e}", path.display());
            CORPUS_UNAVAILABLE.to_string()
        }
    }
}
