//! Path patterns for selecting model objects.
//!
//! Object paths look like `/cyt/A`. A pattern is matched segment by segment:
//!
//! - `##` matches any number of segments, including none
//! - `#` matches exactly one segment
//! - within a segment, `*` matches any run of characters and `?` a single character
//!
//! Several patterns can be joined with `,`; an object matches if any of them does.

/// Returns `true` if `path` matches `pattern`.
pub fn matches(pattern: &str, path: &str) -> bool {
    pattern
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .any(|p| {
            let pat: Vec<&str> = segments(p).collect();
            let target: Vec<&str> = segments(path).collect();
            match_segments(&pat, &target)
        })
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

fn match_segments(pattern: &[&str], path: &[&str]) -> bool {
    match pattern.split_first() {
        None => path.is_empty(),
        Some((&"##", rest)) => (0..=path.len()).any(|skip| match_segments(rest, &path[skip..])),
        Some((head, rest)) => match path.split_first() {
            Some((seg, path_rest)) => {
                (*head == "#" || glob(head.as_bytes(), seg.as_bytes()))
                    && match_segments(rest, path_rest)
            }
            None => false,
        },
    }
}

fn glob(pattern: &[u8], text: &[u8]) -> bool {
    match pattern.split_first() {
        None => text.is_empty(),
        Some((b'*', rest)) => (0..=text.len()).any(|skip| glob(rest, &text[skip..])),
        Some((b'?', rest)) => !text.is_empty() && glob(rest, &text[1..]),
        Some((c, rest)) => text.first() == Some(c) && glob(rest, &text[1..]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_hash_matches_any_depth() {
        assert!(matches("/cyt/##", "/cyt/A"));
        assert!(matches("/cyt/##", "/cyt/sub/B"));
        assert!(matches("/##", "/dend/A"));
        assert!(!matches("/cyt/##", "/dend/A"));
    }

    #[test]
    fn single_hash_matches_one_segment() {
        assert!(matches("/#/A", "/cyt/A"));
        assert!(!matches("/#/A", "/cyt/sub/A"));
        assert!(!matches("/cyt/#", "/cyt"));
    }

    #[test]
    fn glob_characters_match_within_a_segment() {
        assert!(matches("/cyt/r*", "/cyt/reac1"));
        assert!(matches("/cyt/?", "/cyt/A"));
        assert!(!matches("/cyt/?", "/cyt/AB"));
        assert!(!matches("/cyt/r*", "/cyt/A"));
    }

    #[test]
    fn comma_separated_patterns_are_alternatives() {
        assert!(matches("/cyt/A, /dend/B", "/dend/B"));
        assert!(!matches("/cyt/A,/dend/B", "/dend/A"));
    }

    #[test]
    fn exact_path_matches_itself() {
        assert!(matches("/cyt/A", "/cyt/A"));
        assert!(matches("cyt/A", "/cyt/A"));
    }
}
