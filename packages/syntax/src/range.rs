use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Half-open byte range into a source document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

impl TextRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn empty(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// True when `other` lies entirely inside this range.
    pub fn contains_range(&self, other: &TextRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    pub fn intersects(&self, other: &TextRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn cover(&self, other: &TextRange) -> TextRange {
        TextRange::new(self.start.min(other.start), self.end.max(other.end))
    }
}

impl fmt::Display for TextRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

impl From<std::ops::Range<usize>> for TextRange {
    fn from(range: std::ops::Range<usize>) -> Self {
        Self::new(range.start, range.end)
    }
}

impl From<TextRange> for std::ops::Range<usize> {
    fn from(range: TextRange) -> Self {
        range.start..range.end
    }
}

/// A single replacement of `range` by `new_text`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextEdit {
    pub range: TextRange,
    pub new_text: String,
}

impl TextEdit {
    pub fn replace(range: TextRange, new_text: impl Into<String>) -> Self {
        Self {
            range,
            new_text: new_text.into(),
        }
    }

    pub fn insert(offset: usize, text: impl Into<String>) -> Self {
        Self::replace(TextRange::empty(offset), text)
    }

    pub fn delete(range: TextRange) -> Self {
        Self::replace(range, String::new())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("Edit range {range} is outside the document (length {len})")]
    OutOfBounds { range: TextRange, len: usize },

    #[error("Edit range {range} does not fall on a character boundary")]
    NotCharBoundary { range: TextRange },

    #[error("Edits overlap at {first} and {second}")]
    Overlapping { first: TextRange, second: TextRange },
}

/// Apply a batch of non-overlapping edits expressed against the original text.
///
/// Edits are applied back to front so earlier offsets stay valid. Two pure
/// insertions at the same offset keep their input order.
pub fn apply_edits(source: &str, edits: &[TextEdit]) -> Result<String, EditError> {
    let mut ordered: Vec<(usize, &TextEdit)> = edits.iter().enumerate().collect();
    ordered.sort_by(|(ia, a), (ib, b)| {
        a.range
            .start
            .cmp(&b.range.start)
            .then(a.range.end.cmp(&b.range.end))
            .then(ia.cmp(ib))
    });

    for (_, edit) in &ordered {
        let range = edit.range;
        if range.start > range.end || range.end > source.len() {
            return Err(EditError::OutOfBounds {
                range,
                len: source.len(),
            });
        }
        if !source.is_char_boundary(range.start) || !source.is_char_boundary(range.end) {
            return Err(EditError::NotCharBoundary { range });
        }
    }

    for pair in ordered.windows(2) {
        let (first, second) = (pair[0].1.range, pair[1].1.range);
        if first.end > second.start {
            return Err(EditError::Overlapping { first, second });
        }
    }

    let mut out = String::with_capacity(source.len());
    let mut cursor = 0;
    for (_, edit) in &ordered {
        out.push_str(&source[cursor..edit.range.start]);
        out.push_str(&edit.new_text);
        cursor = edit.range.end;
    }
    out.push_str(&source[cursor..]);
    Ok(out)
}

/// Zero-based line and column (in chars) of a byte offset.
pub fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(source.len());
    let before = &source[..floor_char_boundary(source, offset)];
    let line = before.matches('\n').count();
    let col = match before.rfind('\n') {
        Some(nl) => before[nl + 1..].chars().count(),
        None => before.chars().count(),
    };
    (line, col)
}

fn floor_char_boundary(source: &str, mut offset: usize) -> usize {
    while offset > 0 && !source.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}
