/*!
 * Text similarity for translation memory ranking.
 *
 * Candidates are scored with normalized Levenshtein distance over
 * lowercased, whitespace-collapsed text and ranked best first.
 */

/// Scores and ranks translation memory candidates
#[derive(Debug, Clone)]
pub struct SimilarityScorer {
    /// Minimum similarity (0.0-1.0) for a candidate to be kept
    threshold: f64,
}

impl Default for SimilarityScorer {
    fn default() -> Self {
        Self { threshold: 0.5 }
    }
}

impl SimilarityScorer {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold: threshold.clamp(0.0, 1.0),
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Similarity between two texts (0.0-1.0)
    pub fn similarity(&self, a: &str, b: &str) -> f64 {
        let a = normalize(a);
        let b = normalize(b);

        if a.is_empty() && b.is_empty() {
            return 1.0;
        }
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }

        let distance = levenshtein_distance(&a, &b);
        let max_len = a.chars().count().max(b.chars().count());

        1.0 - (distance as f64 / max_len as f64)
    }

    /// Keep candidates at or above the threshold, best first, at most `limit`
    ///
    /// Ties keep their input order.
    pub fn rank<T>(&self, text: &str, candidates: Vec<T>, candidate_text: impl Fn(&T) -> &str, limit: usize) -> Vec<(T, f64)> {
        let mut scored: Vec<(T, f64)> = candidates
            .into_iter()
            .map(|c| {
                let score = self.similarity(text, candidate_text(&c));
                (c, score)
            })
            .filter(|(_, score)| *score >= self.threshold)
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(limit);
        scored
    }
}

fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Calculate Levenshtein distance between two strings
fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    if a_chars.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a_chars.len();
    }

    // Two rows are enough
    let mut prev_row: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr_row: Vec<usize> = vec![0; b_chars.len() + 1];

    for (i, a_char) in a_chars.iter().enumerate() {
        curr_row[0] = i + 1;

        for (j, b_char) in b_chars.iter().enumerate() {
            let cost = usize::from(a_char != b_char);
            curr_row[j + 1] = (prev_row[j + 1] + 1)
                .min(curr_row[j] + 1)
                .min(prev_row[j] + cost);
        }

        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[b_chars.len()]
}
