//! In-process TF-IDF vectorization.
//!
//! Backs both the tfidf embedding provider and the deterministic keyword
//! extraction used for fallback titles and insights. Rows are l2-normalized
//! so cosine similarity reduces to a dot product.

use std::collections::HashMap;

/// English stop words filtered out during keyword extraction.
pub const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
    "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
    "by", "can", "cannot", "could", "did", "do", "does", "doing", "down", "during", "each",
    "few", "for", "from", "further", "had", "has", "have", "having", "he", "her", "here",
    "hers", "herself", "him", "himself", "his", "how", "i", "if", "in", "into", "is", "it",
    "its", "itself", "just", "me", "more", "most", "my", "myself", "no", "nor", "not", "now",
    "of", "off", "on", "once", "only", "or", "other", "our", "ours", "ourselves", "out",
    "over", "own", "same", "she", "should", "so", "some", "such", "than", "that", "the",
    "their", "theirs", "them", "themselves", "then", "there", "these", "they", "this",
    "those", "through", "to", "too", "under", "until", "up", "very", "was", "we", "were",
    "what", "when", "where", "which", "while", "who", "whom", "why", "will", "with", "would",
    "you", "your", "yours", "yourself", "yourselves",
];

/// Dense TF-IDF document-term matrix.
///
/// `terms` is the vocabulary in alphabetical order; `rows` holds one
/// l2-normalized vector per input document (all-zero rows stay zero).
#[derive(Debug, Clone)]
pub struct TfidfMatrix {
    pub terms: Vec<String>,
    pub rows: Vec<Vec<f32>>,
}

impl TfidfMatrix {
    /// Mean TF-IDF score per term across all documents, used for stable
    /// keyword ranking.
    pub fn mean_scores(&self) -> Vec<f32> {
        if self.rows.is_empty() {
            return vec![0.0; self.terms.len()];
        }
        let n = self.rows.len() as f32;
        let mut means = vec![0.0f32; self.terms.len()];
        for row in &self.rows {
            for (idx, value) in row.iter().enumerate() {
                means[idx] += value;
            }
        }
        for value in means.iter_mut() {
            *value /= n;
        }
        means
    }
}

/// TF-IDF vectorizer over word ngrams.
///
/// Tokens are lowercased runs of at least two alphanumeric characters.
/// Stop words (when set) are removed before ngrams are formed. The idf is
/// smoothed (`ln((1+n)/(1+df)) + 1`) and each row is l2-normalized.
#[derive(Debug, Clone)]
pub struct TfidfVectorizer {
    pub ngram_range: (usize, usize),
    pub max_features: Option<usize>,
    pub stop_words: Option<&'static [&'static str]>,
}

impl TfidfVectorizer {
    pub fn fit_transform(&self, texts: &[String]) -> TfidfMatrix {
        if texts.is_empty() {
            return TfidfMatrix {
                terms: Vec::new(),
                rows: Vec::new(),
            };
        }

        let documents: Vec<Vec<String>> = texts.iter().map(|t| self.ngrams(t)).collect();

        // Corpus-wide term counts drive max_features selection; document
        // frequency drives the idf.
        let mut corpus_counts: HashMap<String, usize> = HashMap::new();
        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        for terms in &documents {
            let mut seen: Vec<&str> = Vec::new();
            for term in terms {
                *corpus_counts.entry(term.clone()).or_insert(0) += 1;
                if !seen.contains(&term.as_str()) {
                    seen.push(term);
                    *doc_freq.entry(term.clone()).or_insert(0) += 1;
                }
            }
        }

        let mut vocabulary: Vec<String> = corpus_counts.keys().cloned().collect();
        if let Some(cap) = self.max_features {
            if vocabulary.len() > cap {
                vocabulary.sort_by(|a, b| {
                    corpus_counts[b]
                        .cmp(&corpus_counts[a])
                        .then_with(|| a.cmp(b))
                });
                vocabulary.truncate(cap);
            }
        }
        vocabulary.sort();

        let term_index: HashMap<&str, usize> = vocabulary
            .iter()
            .enumerate()
            .map(|(idx, term)| (term.as_str(), idx))
            .collect();

        let n_docs = documents.len() as f32;
        let idf: Vec<f32> = vocabulary
            .iter()
            .map(|term| {
                let df = *doc_freq.get(term).unwrap_or(&0) as f32;
                ((1.0 + n_docs) / (1.0 + df)).ln() + 1.0
            })
            .collect();

        let rows: Vec<Vec<f32>> = documents
            .iter()
            .map(|terms| {
                let mut row = vec![0.0f32; vocabulary.len()];
                for term in terms {
                    if let Some(&idx) = term_index.get(term.as_str()) {
                        row[idx] += idf[idx];
                    }
                }
                l2_normalize(&mut row);
                row
            })
            .collect();

        TfidfMatrix {
            terms: vocabulary,
            rows,
        }
    }

    fn tokenize(&self, text: &str) -> Vec<String> {
        text.to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| w.chars().count() >= 2)
            .filter(|w| match self.stop_words {
                Some(stop) => !stop.contains(w),
                None => true,
            })
            .map(|w| w.to_string())
            .collect()
    }

    fn ngrams(&self, text: &str) -> Vec<String> {
        let tokens = self.tokenize(text);
        let (lo, hi) = self.ngram_range;
        let mut grams = Vec::new();
        for n in lo..=hi {
            if n == 0 || n > tokens.len() {
                continue;
            }
            for window in tokens.windows(n) {
                grams.push(window.join(" "));
            }
        }
        grams
    }
}

fn l2_normalize(row: &mut [f32]) {
    let norm: f32 = row.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in row.iter_mut() {
            *x /= norm;
        }
    }
}
