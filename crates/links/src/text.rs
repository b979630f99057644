/// Immutable chat text addressed by character offsets.
///
/// Link ranges are expressed in characters so they stay stable no matter how the
/// text is later encoded. Byte offsets are kept alongside for slicing and for
/// mapping regex matches back onto character positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawText {
    text: String,
    chars: Vec<char>,
    // One entry per char plus a trailing entry equal to `text.len()`.
    byte_offsets: Vec<usize>,
}

impl RawText {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut chars = Vec::with_capacity(text.len());
        let mut byte_offsets = Vec::with_capacity(text.len() + 1);

        for (offset, ch) in text.char_indices() {
            chars.push(ch);
            byte_offsets.push(offset);
        }
        byte_offsets.push(text.len());

        Self {
            text,
            chars,
            byte_offsets,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    /// Number of characters, not bytes.
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn char_at(&self, index: usize) -> Option<char> {
        self.chars.get(index).copied()
    }

    /// Returns the text between two character offsets, clamped to the text bounds.
    pub fn slice(&self, start: usize, end: usize) -> &str {
        let end = end.min(self.chars.len());
        let start = start.min(end);
        &self.text[self.byte_offsets[start]..self.byte_offsets[end]]
    }

    /// Maps a byte offset on a char boundary to its character offset.
    pub fn char_index(&self, byte_offset: usize) -> usize {
        match self.byte_offsets.binary_search(&byte_offset) {
            Ok(index) => index,
            Err(index) => index.min(self.chars.len()),
        }
    }

    #[cfg(test)]
    pub(crate) fn is_escaped(&self, index: usize) -> bool {
        index > 0 && self.chars[index - 1] == crate::scanner::ESCAPE
    }
}

impl From<&str> for RawText {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RawText {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slices_by_character_not_byte() {
        let text = RawText::new("héllo #日本");
        assert_eq!(text.len(), 9);
        assert_eq!(text.slice(0, 5), "héllo");
        assert_eq!(text.slice(6, 9), "#日本");
    }

    #[test]
    fn maps_byte_offsets_back_to_chars() {
        let text = RawText::new("é https://x.io");
        let byte_offset = text.as_str().find("https").unwrap_or_default();
        assert_eq!(byte_offset, 3);
        assert_eq!(text.char_index(byte_offset), 2);
        assert_eq!(text.char_index(text.as_str().len()), text.len());
    }

    #[test]
    fn slice_is_clamped() {
        let text = RawText::new("abc");
        assert_eq!(text.slice(1, 99), "bc");
        assert_eq!(text.slice(5, 2), "");
    }
}
