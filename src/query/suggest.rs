//! "Did you mean" suggestions.
//!
//! One phrase suggester per field plus one term suggester per field and
//! word. Phrase corrections win; otherwise each word is replaced by its best
//! term correction when that is confident enough.

use crate::backend::{SuggestEntry, SuggestOption};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Minimum score for a term correction to replace a word.
pub const SUGGESTION_CONFIDENCE_FLOOR: f64 = 0.75;

const PHRASE_MARKER: &str = "_phrase_";
const TERM_MARKER: &str = "_term_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub text: String,
    pub score: f64,
}

impl From<&SuggestOption> for Suggestion {
    fn from(option: &SuggestOption) -> Self {
        Suggestion {
            text: option.text.clone(),
            score: option.score,
        }
    }
}

fn words(term: &str) -> Vec<&str> {
    term.split(' ').collect()
}

/// The `suggest` section of a search request.
pub fn build_suggest_request(term: &str, fields: &[String], max_suggestions: usize) -> Map<String, Value> {
    let mut suggest = Map::new();
    suggest.insert("text".into(), json!(term));

    for field in fields {
        suggest.insert(
            format!("{}{}suggestions", field, PHRASE_MARKER),
            json!({ "phrase": { "field": field, "size": max_suggestions } }),
        );
        for (position, word) in words(term).iter().enumerate() {
            suggest.insert(
                format!("{}{}suggestions_{}", field, TERM_MARKER, position),
                json!({
                    "text": word,
                    "term": { "field": field, "size": max_suggestions }
                }),
            );
        }
    }
    suggest
}

/// Resolve suggester output into ranked suggestions.
///
/// Phrase options from every field are ranked by score and the top
/// `max_suggestions` returned. Without any, `term` is rebuilt word by word
/// from term corrections scoring at least [`SUGGESTION_CONFIDENCE_FLOOR`]
/// and returned as a single suggestion with score 1.0.
pub fn resolve_suggestions(
    term: &str,
    response: &IndexMap<String, Vec<SuggestEntry>>,
    max_suggestions: usize,
) -> Vec<Suggestion> {
    let mut phrases: Vec<Suggestion> = response
        .iter()
        .filter(|(name, _)| name.contains(PHRASE_MARKER))
        .flat_map(|(_, entries)| entries.iter())
        .flat_map(|entry| entry.options.iter().map(Suggestion::from))
        .collect();
    phrases.sort_by(|a, b| b.score.total_cmp(&a.score));
    phrases.truncate(max_suggestions);
    if !phrases.is_empty() {
        return phrases;
    }

    let mut corrections: IndexMap<String, Vec<&SuggestOption>> = IndexMap::new();
    for (name, entries) in response {
        if !name.contains(TERM_MARKER) {
            continue;
        }
        for entry in entries {
            corrections
                .entry(entry.text.to_lowercase())
                .or_default()
                .extend(entry.options.iter());
        }
    }

    let rebuilt: Vec<String> = words(term)
        .into_iter()
        .map(|word| {
            let best = corrections
                .get(&word.to_lowercase())
                .and_then(|options| options.iter().max_by(|a, b| a.score.total_cmp(&b.score)));
            match best {
                Some(option) if option.score >= SUGGESTION_CONFIDENCE_FLOOR => option.text.clone(),
                _ => word.to_string(),
            }
        })
        .collect();

    vec![Suggestion {
        text: rebuilt.join(" "),
        score: 1.0,
    }]
}
