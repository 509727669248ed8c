use std::collections::HashMap;
use uuid::Uuid;

const K1: f32 = 1.2;
const B: f32 = 0.75;

/// Lowercase alphanumeric words longer than one character.
pub(crate) fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() > 1)
        .map(str::to_lowercase)
        .collect()
}

/// Inverted index scoring notes against a query with BM25.
#[derive(Debug, Clone, Default)]
pub struct KeywordIndex {
    /// term -> (note -> occurrences)
    postings: HashMap<String, HashMap<Uuid, f32>>,
    /// note -> token count
    lengths: HashMap<Uuid, f32>,
    total_length: f32,
}

impl KeywordIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index `text` under `id`, replacing any earlier text for that id.
    pub fn insert(&mut self, id: Uuid, text: &str) {
        self.remove(id);
        let tokens = tokenize(text);
        for token in &tokens {
            *self
                .postings
                .entry(token.clone())
                .or_default()
                .entry(id)
                .or_insert(0.0) += 1.0;
        }
        let len = tokens.len() as f32;
        self.lengths.insert(id, len);
        self.total_length += len;
    }

    pub fn remove(&mut self, id: Uuid) {
        let Some(len) = self.lengths.remove(&id) else {
            return;
        };
        self.total_length -= len;
        self.postings.retain(|_, notes| {
            notes.remove(&id);
            !notes.is_empty()
        });
    }

    /// Up to `top_k` `(id, score)` pairs with a positive score, best first.
    ///
    /// Ties are broken by id so results are deterministic.
    pub fn search(&self, query: &str, top_k: usize) -> Vec<(Uuid, f32)> {
        if self.lengths.is_empty() || top_k == 0 {
            return Vec::new();
        }
        let mut terms = tokenize(query);
        terms.sort();
        terms.dedup();

        let n = self.lengths.len() as f32;
        let avg_len = (self.total_length / n).max(1.0);
        let mut scores: HashMap<Uuid, f32> = HashMap::new();
        for term in &terms {
            let Some(notes) = self.postings.get(term) else {
                continue;
            };
            let df = notes.len() as f32;
            let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();
            for (id, &tf) in notes {
                let len = self.lengths.get(id).copied().unwrap_or(0.0);
                let norm = tf + K1 * (1.0 - B + B * len / avg_len);
                *scores.entry(*id).or_insert(0.0) += idf * tf * (K1 + 1.0) / norm;
            }
        }

        let mut ranked: Vec<(Uuid, f32)> = scores.into_iter().filter(|(_, s)| *s > 0.0).collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(top_k);
        ranked
    }

    pub fn len(&self) -> usize {
        self.lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lengths.is_empty()
    }
}
