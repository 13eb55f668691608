//! String helpers shared by diagnostics: edit distance and candidate
//! formatting for "did you mean" style messages.

/// Levenshtein distance with unit costs, compared on lowercased input.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut cur = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        cur[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            cur[j + 1] = (prev[j + 1] + 1).min(cur[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

/// The closest `n` candidates to `target`, at most `threshold` edits away,
/// ordered by ascending distance with input order breaking ties.
pub fn top_n_levenshtein<'a, I>(available: I, target: &str, n: usize, threshold: usize) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut scored: Vec<(usize, usize, &str)> = available
        .into_iter()
        .enumerate()
        .map(|(idx, s)| (levenshtein(s, target), idx, s))
        .filter(|(d, _, _)| *d <= threshold)
        .collect();
    scored.sort_by_key(|(d, idx, _)| (*d, *idx));
    scored.truncate(n);
    scored.into_iter().map(|(_, _, s)| s.to_string()).collect()
}

/// Format a candidate list, e.g. `\nDid you mean: "a", "b"`. Empty input
/// yields an empty string.
pub fn candidates_message(candidates: &[String], prefix: &str) -> String {
    if candidates.is_empty() {
        return String::new();
    }
    let quoted: Vec<String> = candidates.iter().map(|c| format!("\"{c}\"")).collect();
    format!("\n{prefix}: {}", quoted.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_basics() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", "abc"), 0);
        assert_eq!(levenshtein("custmers", "customers"), 1);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
    }

    #[test]
    fn distance_ignores_case() {
        assert_eq!(levenshtein("ABC", "abc"), 0);
    }

    #[test]
    fn top_n_ranks_and_filters() {
        let names = ["orders", "customers", "lineitem"];
        let top = top_n_levenshtein(names.iter().copied(), "oders", 5, 3);
        assert_eq!(top, vec!["orders".to_string()]);
    }

    #[test]
    fn candidates_message_format() {
        let msg = candidates_message(&["threads".into(), "thread_count".into()], "Did you mean");
        assert_eq!(msg, "\nDid you mean: \"threads\", \"thread_count\"");
        assert_eq!(candidates_message(&[], "Did you mean"), "");
    }
}
