//! Windowed snippet extraction around query matches
//!
//! Snippet order is a public contract: the n-th snippet containing the
//! term corresponds to the n-th occurrence of the term on the rendered
//! page, which deep links address as `?highlight=<term>&occurrence=<n>`.
//! Matches stay in document order, never overlap, and are never
//! deduplicated.

/// Extract up to `max_count` snippets around case-insensitive matches of
/// `term`. Windows span `radius` characters on each side of a match;
/// assembled snippets longer than `max_len` characters are cut to
/// `max_len - 1` plus an ellipsis.
pub fn extract_snippets(
    text: &str,
    term: &str,
    max_count: usize,
    radius: usize,
    max_len: usize,
) -> Vec<String> {
    let term = term.trim();
    if text.is_empty() || term.is_empty() {
        return Vec::new();
    }
    let needle = term.to_lowercase();
    let mut snippets = Vec::new();
    let mut cursor = 0;
    while snippets.len() < max_count {
        let Some((start, end)) = find_from(text, &needle, cursor) else {
            break;
        };
        snippets.push(window_around(text, start, end, radius, max_len));
        cursor = end;
    }
    snippets
}

/// Locate the next case-insensitive occurrence of `needle_lower` at or
/// after byte offset `from`. The returned range indexes the original
/// text, so case folds that change byte length never shift positions.
fn find_from(text: &str, needle_lower: &str, from: usize) -> Option<(usize, usize)> {
    let tail = text.get(from..)?;
    for (offset, _) in tail.char_indices() {
        if let Some(len) = fold_match_len(&tail[offset..], needle_lower) {
            return Some((from + offset, from + offset + len));
        }
    }
    None
}

/// Byte length of the prefix of `haystack` whose lowercase form equals
/// `needle_lower`, if any. Folds ending mid-character do not count.
fn fold_match_len(haystack: &str, needle_lower: &str) -> Option<usize> {
    let mut wanted = needle_lower.chars();
    let mut next = wanted.next();
    for (idx, c) in haystack.char_indices() {
        for folded in c.to_lowercase() {
            match next {
                Some(w) if w == folded => next = wanted.next(),
                _ => return None,
            }
        }
        if next.is_none() {
            return Some(idx + c.len_utf8());
        }
    }
    None
}

fn window_around(text: &str, start: usize, end: usize, radius: usize, max_len: usize) -> String {
    let mut win_start = start;
    for _ in 0..radius {
        match text[..win_start].chars().next_back() {
            Some(c) => win_start -= c.len_utf8(),
            None => break,
        }
    }
    let mut win_end = end;
    let mut ahead = text[end..].chars();
    for _ in 0..radius {
        match ahead.next() {
            Some(c) => win_end += c.len_utf8(),
            None => break,
        }
    }

    let mut snippet = text[win_start..win_end].trim().to_string();
    if win_start > 0 {
        snippet = format!("… {}", snippet);
    }
    if win_end < text.len() {
        snippet = format!("{} …", snippet);
    }
    if snippet.chars().count() > max_len {
        let cut: String = snippet.chars().take(max_len.saturating_sub(1)).collect();
        snippet = format!("{}…", cut);
    }
    snippet
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(text: &str, term: &str) -> Vec<String> {
        extract_snippets(text, term, 10, 80, 160)
    }

    #[test]
    fn test_empty_inputs() {
        assert!(extract("", "rust").is_empty());
        assert!(extract("some text", "").is_empty());
        assert!(extract("some text", "   ").is_empty());
        assert!(extract("nothing here", "zzz").is_empty());
    }

    #[test]
    fn test_short_text_no_ellipsis() {
        assert_eq!(extract("Rust is fast", "rust"), vec!["Rust is fast"]);
    }

    #[test]
    fn test_match_keeps_original_casing() {
        assert_eq!(
            extract("Deploying with KUBERNETES today", "kubernetes"),
            vec!["Deploying with KUBERNETES today"]
        );
    }

    #[test]
    fn test_occurrence_count_capped() {
        let text = "alpha beta alpha gamma alpha";
        assert_eq!(extract_snippets(text, "alpha", 2, 80, 160).len(), 2);
        assert_eq!(extract(text, "alpha").len(), 3);
    }

    #[test]
    fn test_non_overlapping_matches() {
        // scanning resumes after each match, so "aaaa" holds two "aa" hits
        assert_eq!(extract_snippets("aaaa", "aa", 10, 80, 160).len(), 2);
    }

    #[test]
    fn test_snippets_follow_document_order() {
        // the n-th snippet is built around the n-th occurrence
        let snippets = extract_snippets("one alpha two alpha three alpha", "alpha", 10, 4, 160);
        assert_eq!(
            snippets,
            vec!["one alpha two …", "… two alpha thr …", "… ree alpha"]
        );
    }

    #[test]
    fn test_window_ellipses() {
        let text = format!("{}needle{}", "x".repeat(100), "y".repeat(100));
        let snippets = extract_snippets(&text, "needle", 10, 80, 400);
        assert_eq!(snippets.len(), 1);
        let s = &snippets[0];
        assert!(s.starts_with("… "));
        assert!(s.ends_with(" …"));
        assert!(s.contains("needle"));
        // 80 chars each side, the 6-char term, 4 chars of ellipsis markers
        assert_eq!(s.chars().count(), 170);
    }

    #[test]
    fn test_truncation_to_max_len() {
        let text = format!("{}needle{}", "x".repeat(100), "y".repeat(100));
        let snippets = extract_snippets(&text, "needle", 10, 80, 160);
        assert_eq!(snippets[0].chars().count(), 160);
        assert!(snippets[0].ends_with('…'));
    }

    #[test]
    fn test_multibyte_window_boundaries() {
        let text = "héllo wörld héllo café héllo";
        assert_eq!(extract(text, "héllo").len(), 3);
        assert_eq!(
            extract_snippets(text, "wörld", 10, 2, 160),
            vec!["… o wörld h …"]
        );
    }

    #[test]
    fn test_fold_match_spans_original_bytes() {
        // 'Ö' lowercases to 'ö'; the range must index the original string
        assert_eq!(
            extract_snippets("GRÖSSE matters", "grösse", 10, 80, 160),
            vec!["GRÖSSE matters"]
        );
    }
}
