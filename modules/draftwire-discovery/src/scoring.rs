//! Relevance scoring against the editorial rubric.
//!
//! The oracle is a black box; any failure or unparseable response degrades
//! to the default score so discovery always has a usable result.

use tracing::warn;

use ai_client::util::{strip_code_blocks, truncate_to_char_boundary};
use ai_client::TextOracle;
use draftwire_common::Candidate;

/// Score used when the oracle fails or returns nothing parseable.
pub const DEFAULT_SCORE: u32 = 50;

/// Scores are clamped into [0, MAX_SCORE].
pub const MAX_SCORE: u32 = 100;

const SUMMARY_BUDGET: usize = 2_000;

/// Build the scoring prompt for a candidate in a category.
pub fn score_prompt(candidate: &Candidate, category: &str) -> String {
    format!(
        "Rate how relevant this item is for a technical publication's \"{category}\" \
         section, considering novelty, depth, and practical value to working \
         developers.\n\n\
         Title: {title}\n\
         Summary: {summary}\n\n\
         Respond with a single integer from 0 to 100 and nothing else.",
        category = category,
        title = candidate.title,
        summary = truncate_to_char_boundary(&candidate.summary, SUMMARY_BUDGET),
    )
}

/// Pull the first integer out of an oracle response, clamped to the score
/// range. None when the response has no digits at all.
pub fn parse_score(response: &str) -> Option<u32> {
    let cleaned = strip_code_blocks(response);
    let digits: String = cleaned
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse::<u32>().ok().map(|n| n.min(MAX_SCORE))
}

/// Score one candidate. Never fails.
pub async fn score_candidate<O: TextOracle>(
    oracle: &O,
    candidate: &Candidate,
    category: &str,
) -> u32 {
    let prompt = score_prompt(candidate, category);
    match oracle.complete(&prompt, 0.0).await {
        Ok(response) => parse_score(&response).unwrap_or_else(|| {
            warn!(
                title = candidate.title.as_str(),
                response = truncate_to_char_boundary(&response, 200),
                "Unparseable score response, using default"
            );
            DEFAULT_SCORE
        }),
        Err(e) => {
            warn!(
                title = candidate.title.as_str(),
                error = %e,
                "Scoring oracle failed, using default"
            );
            DEFAULT_SCORE
        }
    }
}
