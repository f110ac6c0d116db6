use std::cmp::Ordering;

use feruca::Collator;

/// A piece of a cell's text, emphasized when it matched the committed search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment<'a> {
    pub text: &'a str,
    pub emphasized: bool,
}

/// Lowercases `text` char by char and remembers, for every byte of the folded string,
/// the byte offset of the char it came from in `text`.
fn fold(text: &str) -> (String, Vec<usize>) {
    let mut folded = String::with_capacity(text.len());
    let mut origin = Vec::with_capacity(text.len());
    for (idx, ch) in text.char_indices() {
        for lc in ch.to_lowercase() {
            folded.push(lc);
            origin.extend(std::iter::repeat_n(idx, lc.len_utf8()));
        }
    }
    (folded, origin)
}

fn fold_str(text: &str) -> String {
    text.chars().flat_map(char::to_lowercase).collect()
}

/// Case-insensitive containment. An empty query matches everything.
pub fn contains_folded(value: &str, query: &str) -> bool {
    query.is_empty() || fold_str(value).contains(&fold_str(query))
}

/// Categorical match: true if no values are selected or `value` contains any of them.
pub fn contains_any(value: &str, selected: &[String]) -> bool {
    selected.is_empty() || selected.iter().any(|s| value.contains(s.as_str()))
}

/// Split `text` into plain and emphasized segments for every non-overlapping,
/// case-insensitive occurrence of `query`.
pub fn highlight_segments<'a>(text: &'a str, query: &str) -> Vec<Segment<'a>> {
    if text.is_empty() {
        return Vec::new();
    }
    let plain = |text: &'a str| Segment {
        text,
        emphasized: false,
    };
    if query.is_empty() {
        return vec![plain(text)];
    }

    let (folded, origin) = fold(text);
    let needle = fold_str(query);
    let mut segments = Vec::new();
    let mut last = 0;
    for (start, m) in folded.match_indices(&needle) {
        let from = origin[start];
        let tail = origin[start + m.len() - 1];
        let to = tail + text[tail..].chars().next().map_or(0, char::len_utf8);
        // Folding can merge chars; skip matches that would overlap the previous one.
        if from < last {
            continue;
        }
        if from > last {
            segments.push(plain(&text[last..from]));
        }
        segments.push(Segment {
            text: &text[from..to],
            emphasized: true,
        });
        last = to;
    }
    if last < text.len() {
        segments.push(plain(&text[last..]));
    }
    segments
}

/// Locale-aware string order: the Unicode collation algorithm with the CLDR root
/// tailoring, so accented names sort next to their base letters.
#[derive(Default)]
pub struct Collation(Collator);

impl Collation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compare(&mut self, a: &str, b: &str) -> Ordering {
        self.0.collate(a, b)
    }
}
