use crate::text::RawText;

pub const ESCAPE: char = '\\';

/// Delimiters a backslash may escape inside link syntax.
pub const ESCAPABLE: [char; 4] = ['(', ')', '[', ']'];

/// Finds the delimiter that closes the one at `open_index`.
///
/// Same-kind delimiters nest by depth, and a backslash directly before either
/// delimiter hides it from the count. Returns `None` when `open_index` does not
/// hold `open`, or when the text ends before the depth returns to zero.
pub fn find_closing(chars: &[char], open_index: usize, open: char, close: char) -> Option<usize> {
    if chars.get(open_index) != Some(&open) {
        return None;
    }

    let mut depth = 0usize;
    let mut index = open_index;

    while index < chars.len() {
        let ch = chars[index];
        if ch == ESCAPE && chars.get(index + 1).is_some_and(|&next| next == open || next == close) {
            index += 2;
            continue;
        }

        if ch == open {
            depth += 1;
        } else if ch == close {
            depth -= 1;
            if depth == 0 {
                return Some(index);
            }
        }

        index += 1;
    }

    None
}

/// Removes the backslash in front of every escaped delimiter.
pub fn unescape(chars: &[char]) -> String {
    let mut output = String::with_capacity(chars.len());
    let mut index = 0;

    while index < chars.len() {
        let ch = chars[index];
        if ch == ESCAPE && chars.get(index + 1).is_some_and(|next| ESCAPABLE.contains(next)) {
            output.push(chars[index + 1]);
            index += 2;
            continue;
        }
        output.push(ch);
        index += 1;
    }

    output
}

/// Precomputed lookups over one text: closing positions for parentheses and
/// square brackets, and the next position holding whitespace, non-whitespace
/// or a square bracket.
///
/// Every table is built in a single pass, so matchers can probe every opening
/// delimiter in constant time instead of rescanning the rest of the text.
/// Closing positions agree with [`find_closing`] for every opening position.
pub struct Scanner<'a> {
    text: &'a RawText,
    parens: Vec<Option<usize>>,
    brackets: Vec<Option<usize>>,
    // One entry per char plus a trailing entry; `len` means "none further".
    next_whitespace: Vec<usize>,
    next_non_whitespace: Vec<usize>,
    next_square: Vec<usize>,
}

impl<'a> Scanner<'a> {
    pub fn new(text: &'a RawText) -> Self {
        let chars = text.chars();
        Self {
            text,
            parens: pair_delimiters(chars, '(', ')'),
            brackets: pair_delimiters(chars, '[', ']'),
            next_whitespace: next_positions(chars, char::is_whitespace),
            next_non_whitespace: next_positions(chars, |ch| !ch.is_whitespace()),
            next_square: next_positions(chars, |ch| matches!(ch, '[' | ']')),
        }
    }

    pub fn text(&self) -> &'a RawText {
        self.text
    }

    /// Closing partner of the `(` or `[` at `open_index`, if balanced.
    pub fn closing(&self, open_index: usize) -> Option<usize> {
        match self.text.char_at(open_index)? {
            '(' => self.parens[open_index],
            '[' => self.brackets[open_index],
            _ => None,
        }
    }

    /// First whitespace position at or after `from`, or the text length.
    pub fn next_whitespace(&self, from: usize) -> usize {
        lookup(&self.next_whitespace, from)
    }

    /// First non-whitespace position at or after `from`, or the text length.
    pub fn next_non_whitespace(&self, from: usize) -> usize {
        lookup(&self.next_non_whitespace, from)
    }

    pub fn has_whitespace(&self, start: usize, end: usize) -> bool {
        self.next_whitespace(start) < end
    }

    /// Whether `start..end` holds nothing but whitespace.
    pub fn is_blank(&self, start: usize, end: usize) -> bool {
        self.next_non_whitespace(start) >= end
    }

    /// Whether `start..end` holds a `[` or `]`, escaped or not.
    pub fn has_square_bracket(&self, start: usize, end: usize) -> bool {
        lookup(&self.next_square, start) < end
    }
}

fn lookup(table: &[usize], from: usize) -> usize {
    table.get(from).copied().unwrap_or(table.len().saturating_sub(1))
}

fn next_positions(chars: &[char], wanted: impl Fn(char) -> bool) -> Vec<usize> {
    let mut next = vec![chars.len(); chars.len() + 1];
    for index in (0..chars.len()).rev() {
        next[index] = if wanted(chars[index]) {
            index
        } else {
            next[index + 1]
        };
    }
    next
}

fn pair_delimiters(chars: &[char], open: char, close: char) -> Vec<Option<usize>> {
    let mut pairs = vec![None; chars.len()];
    let mut stack = Vec::new();
    let mut index = 0;

    while index < chars.len() {
        let ch = chars[index];
        if ch == ESCAPE && chars.get(index + 1).is_some_and(|&next| next == open || next == close) {
            index += 2;
            continue;
        }

        if ch == open {
            stack.push(index);
        } else if ch == close
            && let Some(opened) = stack.pop()
        {
            pairs[opened] = Some(index);
        }

        index += 1;
    }

    pairs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(text: &str) -> Vec<char> {
        text.chars().collect()
    }

    #[test]
    fn nested_brackets_close_at_matching_depth() {
        let text = chars("[a [b] c] tail");
        assert_eq!(find_closing(&text, 0, '[', ']'), Some(8));
        assert_eq!(find_closing(&text, 3, '[', ']'), Some(5));
    }

    #[test]
    fn escaped_delimiters_do_not_count() {
        let text = chars(r"[and \[ paired] x]");
        assert_eq!(find_closing(&text, 0, '[', ']'), Some(17));

        let text = chars(r"[only \] escaped]");
        assert_eq!(find_closing(&text, 0, '[', ']'), Some(16));
    }

    #[test]
    fn unterminated_scan_is_not_found() {
        let text = chars("(never closed [x]");
        assert_eq!(find_closing(&text, 0, '(', ')'), None);
        assert_eq!(find_closing(&text, 1, '(', ')'), None);
    }

    #[test]
    fn unescape_drops_backslash_before_delimiters_only() {
        let text = chars(r"a \[b\] \(c\) \n");
        assert_eq!(unescape(&text), r"a [b] (c) \n");
    }

    #[test]
    fn scanner_agrees_with_single_scan() {
        let raw = RawText::new(r"(x [y \[ (z)] w) [[Topic]] (open [a\]b]");
        let scanner = Scanner::new(&raw);

        for (index, ch) in raw.chars().iter().enumerate() {
            if raw.is_escaped(index) {
                assert_eq!(scanner.closing(index), None);
                continue;
            }
            let expected = match ch {
                '(' => find_closing(raw.chars(), index, '(', ')'),
                '[' => find_closing(raw.chars(), index, '[', ']'),
                _ => None,
            };
            assert_eq!(scanner.closing(index), expected, "mismatch at {index}");
        }
    }

    #[test]
    fn lookahead_tables_answer_range_queries() {
        let raw = RawText::new("[a b]  x[y]");
        let scanner = Scanner::new(&raw);

        assert_eq!(scanner.next_whitespace(0), 2);
        assert_eq!(scanner.next_whitespace(7), raw.len());
        assert_eq!(scanner.next_non_whitespace(5), 7);
        assert!(scanner.has_whitespace(1, 4));
        assert!(!scanner.has_whitespace(3, 5));
        assert!(scanner.is_blank(5, 7));
        assert!(!scanner.is_blank(5, 8));
        assert!(scanner.has_square_bracket(6, 9));
        assert!(!scanner.has_square_bracket(1, 4));
        assert_eq!(scanner.next_non_whitespace(99), raw.len());
    }
}
