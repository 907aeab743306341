//! Text normalization and word-level edit distance.

/// Normalize a short answer for equality comparison: trim, strip
/// trailing punctuation, lowercase.
pub fn normalize_answer(raw: &str) -> String {
    raw.trim()
        .trim_end_matches(|c: char| c.is_ascii_punctuation())
        .trim()
        .to_lowercase()
}

/// Normalize free text into word tokens: lowercase, strip punctuation,
/// collapse whitespace.
pub fn normalize_tokens(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| !c.is_ascii_punctuation())
                .collect::<String>()
        })
        .filter(|word| !word.is_empty())
        .collect()
}

/// Levenshtein distance over word tokens (insertions + deletions +
/// substitutions), two-row dynamic programming.
pub fn edit_distance(target: &[String], candidate: &[String]) -> usize {
    if target.is_empty() {
        return candidate.len();
    }
    if candidate.is_empty() {
        return target.len();
    }

    let mut previous: Vec<usize> = (0..=candidate.len()).collect();
    let mut current = vec![0usize; candidate.len() + 1];

    for (i, target_word) in target.iter().enumerate() {
        current[0] = i + 1;
        for (j, candidate_word) in candidate.iter().enumerate() {
            let substitution_cost = usize::from(target_word != candidate_word);
            current[j + 1] = (previous[j] + substitution_cost)
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[candidate.len()]
}
