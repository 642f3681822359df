/// Byte span of one path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentSpan {
    pub start: usize,
    pub len: usize,
}

impl SegmentSpan {
    #[must_use]
    pub fn text<'a>(&self, path: &'a str) -> &'a str {
        path.get(self.start..self.start + self.len).unwrap_or("")
    }
}

/// Split a request path into segments. The leading `/` is skipped, a
/// trailing `/` produces no segment, and empty inner segments are kept
/// (`/a//b` has three segments).
#[must_use]
pub fn tokenize(path: &str) -> Vec<SegmentSpan> {
    let mut segments = Vec::new();
    let mut start = usize::from(path.starts_with('/'));
    while start < path.len() {
        match path[start..].find('/') {
            Some(len) => {
                segments.push(SegmentSpan { start, len });
                start += len + 1;
            }
            None => {
                segments.push(SegmentSpan {
                    start,
                    len: path.len() - start,
                });
                break;
            }
        }
    }
    segments
}

/// Case-insensitive comparison of path text, folding every character with
/// its Unicode lower-case mapping.
#[must_use]
pub fn eq_ignore_case(a: &str, b: &str) -> bool {
    if a.is_ascii() && b.is_ascii() {
        return a.eq_ignore_ascii_case(b);
    }
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

/// The key [`eq_ignore_case`] compares by.
#[must_use]
pub fn fold_case(text: &str) -> String {
    if text.is_ascii() {
        text.to_ascii_lowercase()
    } else {
        text.chars().flat_map(char::to_lowercase).collect()
    }
}

fn char_eq_ignore_case(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

/// Byte length of the prefix of `text` that equals `prefix` ignoring case.
fn prefix_len_ignore_case(text: &str, prefix: &str) -> Option<usize> {
    let mut chars = text.char_indices();
    for expected in prefix.chars() {
        let (_, c) = chars.next()?;
        if !char_eq_ignore_case(c, expected) {
            return None;
        }
    }
    Some(chars.next().map_or(text.len(), |(i, _)| i))
}

/// Byte range of the last occurrence of `needle` lying entirely within
/// `haystack[..end]`, ignoring case.
#[must_use]
pub fn rfind_ignore_case(haystack: &str, needle: &str, end: usize) -> Option<(usize, usize)> {
    let hay = haystack.get(..end)?;
    hay.char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(hay.len()))
        .rev()
        .find_map(|i| prefix_len_ignore_case(&hay[i..], needle).map(|len| (i, i + len)))
}

#[must_use]
pub fn ends_with_ignore_case(text: &str, suffix: &str) -> bool {
    text.char_indices()
        .map(|(i, _)| i)
        .rev()
        .any(|i| prefix_len_ignore_case(&text[i..], suffix) == Some(text.len() - i))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(path: &str) -> Vec<&str> {
        tokenize(path).iter().map(|s| s.text(path)).collect()
    }

    #[test]
    fn root_and_empty_paths_have_no_segments() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("/").is_empty());
    }

    #[test]
    fn trailing_slash_is_ignored() {
        assert_eq!(texts("/a/b/"), ["a", "b"]);
        assert_eq!(texts("/a/b"), ["a", "b"]);
    }

    #[test]
    fn empty_inner_segments_are_kept() {
        assert_eq!(texts("/a//b"), ["a", "", "b"]);
        assert_eq!(texts("//"), [""]);
    }

    #[test]
    fn case_folding_covers_non_ascii_letters() {
        assert!(eq_ignore_case("Ä", "ä"));
        assert!(eq_ignore_case("ÉCOLE", "école"));
        assert!(eq_ignore_case("Home", "hOME"));
        assert!(!eq_ignore_case("a", "ä"));
        assert_eq!(fold_case("Straße-ÄB"), "straße-äb");
        assert_eq!(rfind_ignore_case("x.TAR.tar", ".tar", 9), Some((5, 9)));
        assert_eq!(rfind_ignore_case("x.TAR.tar", ".tar", 8), Some((1, 5)));
        assert_eq!(rfind_ignore_case("Ärger-ä", "Ä", 9), Some((7, 9)));
        assert_eq!(rfind_ignore_case("abc", "d", 3), None);
        assert!(ends_with_ignore_case("archive.ÄX", ".äx"));
        assert!(!ends_with_ignore_case("archive", ".äx"));
    }

    #[test]
    fn relative_paths_are_accepted() {
        assert_eq!(texts("a/b"), ["a", "b"]);
    }
}
