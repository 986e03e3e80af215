use super::eval::{tokenize, token_similarity};
use crate::backend::{SuggestEntry, SuggestOption};
use crate::types::Document;
use indexmap::{IndexMap, IndexSet};
use serde_json::{Map, Value};
use std::collections::HashMap;

const MAX_TERM_EDITS: usize = 2;
const PHRASE_CANDIDATE_FLOOR: f64 = 0.5;

/// Run every suggester in a `suggest` request body against `documents`.
pub(super) fn suggest(
    request: &Map<String, Value>,
    documents: &IndexMap<String, Document>,
) -> IndexMap<String, Vec<SuggestEntry>> {
    let global_text = request.get("text").and_then(Value::as_str).unwrap_or("");
    let mut out = IndexMap::new();

    for (name, spec) in request {
        if name == "text" {
            continue;
        }
        let text = spec
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or(global_text);

        if let Some(term) = spec.get("term") {
            let Some(field) = term.get("field").and_then(Value::as_str) else {
                continue;
            };
            let size = suggester_size(term);
            let vocabulary = vocabulary(documents, field);
            out.insert(name.clone(), term_entries(text, &vocabulary, size));
        } else if let Some(phrase) = spec.get("phrase") {
            let Some(field) = phrase.get("field").and_then(Value::as_str) else {
                continue;
            };
            let vocabulary = vocabulary(documents, field);
            out.insert(name.clone(), vec![phrase_entry(text, &vocabulary)]);
        }
    }

    out
}

fn suggester_size(spec: &Value) -> usize {
    spec.get("size").and_then(Value::as_u64).unwrap_or(5) as usize
}

/// Distinct tokens of `field` with their document frequency.
fn vocabulary(documents: &IndexMap<String, Document>, field: &str) -> HashMap<String, u64> {
    let mut vocabulary = HashMap::new();
    for doc in documents.values() {
        let text = match doc.get(field) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => continue,
            Some(other) => other.to_string(),
        };
        let distinct: IndexSet<String> = tokenize(&text).into_iter().collect();
        for token in distinct {
            *vocabulary.entry(token).or_insert(0) += 1;
        }
    }
    vocabulary
}

fn candidates(token: &str, vocabulary: &HashMap<String, u64>) -> Vec<SuggestOption> {
    let mut options: Vec<SuggestOption> = vocabulary
        .iter()
        .filter(|(word, _)| word.as_str() != token)
        .filter(|(word, _)| strsim::levenshtein(token, word) <= MAX_TERM_EDITS)
        .map(|(word, freq)| {
            let distance = strsim::levenshtein(token, word);
            let longest = token.chars().count().max(word.chars().count()).max(1);
            SuggestOption {
                text: word.clone(),
                score: 1.0 - distance as f64 / longest as f64,
                freq: Some(*freq),
            }
        })
        .collect();
    options.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| b.freq.cmp(&a.freq))
            .then_with(|| a.text.cmp(&b.text))
    });
    options
}

fn term_entries(text: &str, vocabulary: &HashMap<String, u64>, size: usize) -> Vec<SuggestEntry> {
    let mut entries = Vec::new();
    let mut offset = 0;
    for token in tokenize(text) {
        // terms already in the index get no suggestions
        let options = if vocabulary.contains_key(&token) {
            Vec::new()
        } else {
            candidates(&token, vocabulary).into_iter().take(size).collect()
        };
        let length = token.chars().count();
        entries.push(SuggestEntry {
            text: token,
            offset,
            length,
            options,
        });
        offset += length + 1;
    }
    entries
}

fn phrase_entry(text: &str, vocabulary: &HashMap<String, u64>) -> SuggestEntry {
    let tokens = tokenize(text);
    let mut corrected = Vec::with_capacity(tokens.len());
    let mut score = 1.0;
    let mut changed = false;

    for token in &tokens {
        if vocabulary.contains_key(token) {
            corrected.push(token.clone());
            continue;
        }
        match candidates(token, vocabulary).into_iter().next() {
            Some(best) if best.score >= PHRASE_CANDIDATE_FLOOR => {
                score *= best.score;
                corrected.push(best.text);
                changed = true;
            }
            _ => corrected.push(token.clone()),
        }
    }

    let options = if changed {
        vec![SuggestOption {
            text: corrected.join(" "),
            score,
            freq: None,
        }]
    } else {
        Vec::new()
    };

    SuggestEntry {
        text: text.to_string(),
        offset: 0,
        length: text.chars().count(),
        options,
    }
}
