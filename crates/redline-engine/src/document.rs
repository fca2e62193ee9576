//! Rope-backed document buffer and the edit record markers are remapped
//! through.
//!
//! This is the engine's stand-in for the host editor's buffer: byte-offset
//! slicing, line-aligned range expansion, and mutations that return an
//! [`Edit`] describing what changed. All offsets are UTF-8 byte offsets.

use std::ops::Range;

use ropey::Rope;
use smol_str::{SmolStr, ToSmolStr};

/// One document change: `deleted` bytes at `at` replaced by `inserted`
/// bytes. Insertions have `deleted == 0`, deletions `inserted == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edit {
    pub at: usize,
    pub deleted: usize,
    pub inserted: usize,
}

impl Edit {
    /// End of the replaced span in pre-edit offsets.
    pub fn old_end(&self) -> usize {
        self.at + self.deleted
    }

    /// End of the inserted span in post-edit offsets.
    pub fn new_end(&self) -> usize {
        self.at + self.inserted
    }

    /// Net length change applied to offsets at or after the edit.
    pub fn net_delta(&self) -> isize {
        self.inserted as isize - self.deleted as isize
    }

    /// The pre-edit span this edit touched (closed-interval semantics are
    /// the caller's concern).
    pub fn old_range(&self) -> Range<usize> {
        self.at..self.old_end()
    }

    /// Map a pre-edit offset to its post-edit position.
    ///
    /// Offsets inside the replaced span collapse to the edit point.
    pub fn map_offset(&self, offset: usize) -> usize {
        if offset <= self.at {
            offset
        } else if offset >= self.old_end() {
            offset - self.deleted + self.inserted
        } else {
            self.at
        }
    }
}

/// In-memory document with O(log n) edits, as the host buffer would give us.
#[derive(Debug, Clone, Default)]
pub struct DocumentBuffer {
    rope: Rope,
}

impl DocumentBuffer {
    pub fn from_str(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
        }
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.rope.len_bytes()
    }

    pub fn is_empty(&self) -> bool {
        self.rope.len_bytes() == 0
    }

    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    /// Slice by byte range. Returns `None` when the range is out of bounds
    /// or not aligned to character boundaries.
    pub fn slice(&self, range: Range<usize>) -> Option<SmolStr> {
        if range.end > self.len() || range.start > range.end {
            return None;
        }
        let start = self.rope.try_byte_to_char(range.start).ok()?;
        let end = self.rope.try_byte_to_char(range.end).ok()?;
        if self.rope.char_to_byte(start) != range.start
            || self.rope.char_to_byte(end) != range.end
        {
            return None;
        }
        Some(self.rope.slice(start..end).to_smolstr())
    }

    /// Replace `range` with `text`, returning the edit record.
    pub fn replace(&mut self, range: Range<usize>, text: &str) -> Edit {
        let start = self.rope.byte_to_char(range.start);
        let end = self.rope.byte_to_char(range.end);
        self.rope.remove(start..end);
        self.rope.insert(start, text);
        Edit {
            at: range.start,
            deleted: range.end - range.start,
            inserted: text.len(),
        }
    }

    pub fn insert(&mut self, at: usize, text: &str) -> Edit {
        self.replace(at..at, text)
    }

    pub fn delete(&mut self, range: Range<usize>) -> Edit {
        self.replace(range, "")
    }

    /// Expand a byte range to whole lines, giving the checker sentence
    /// context around the edited region.
    ///
    /// A multi-line list item counts as one unit: a range landing on an
    /// indented continuation line pulls in the item's first line, and
    /// continuation lines below the range are pulled in too, so a partial
    /// re-check never cuts a list item's sentence in half.
    pub fn expand_to_lines(&self, range: Range<usize>) -> Range<usize> {
        let len = self.len();
        let start = range.start.min(len);
        let end = range.end.min(len);

        let mut start_line = self.rope.byte_to_line(start);
        while start_line > 0 && is_item_continuation(&self.line_str(start_line)) {
            start_line -= 1;
            if is_item_start(&self.line_str(start_line)) {
                break;
            }
        }
        let line_start = self.rope.line_to_byte(start_line);

        let mut end_line = self.rope.byte_to_line(end);
        while end_line + 1 < self.rope.len_lines()
            && is_item_continuation(&self.line_str(end_line + 1))
        {
            end_line += 1;
        }
        let line_end = if end_line + 1 < self.rope.len_lines() {
            // Through the end of the line, excluding the newline itself.
            self.rope.line_to_byte(end_line + 1).saturating_sub(1)
        } else {
            len
        };
        line_start..line_end.max(end)
    }

    fn line_str(&self, line: usize) -> String {
        self.rope.line(line).to_string()
    }
}

/// A line opening a bullet or ordered list item.
fn is_item_start(line: &str) -> bool {
    let trimmed = line.trim_start();
    if let Some(rest) = trimmed.strip_prefix(['-', '*', '+']) {
        return rest.starts_with(' ');
    }
    let digits = trimmed.len() - trimmed.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits > 0 {
        let rest = &trimmed[digits..];
        return (rest.starts_with('.') || rest.starts_with(')')) && rest[1..].starts_with(' ');
    }
    false
}

/// An indented continuation of the list item on a line above. Nested items
/// open their own unit and do not count.
fn is_item_continuation(line: &str) -> bool {
    (line.starts_with(' ') || line.starts_with('\t'))
        && !line.trim().is_empty()
        && !is_item_start(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_map_offset() {
        // "hello world" -> replace 5..6 (the space) with ", cruel "
        let edit = Edit {
            at: 5,
            deleted: 1,
            inserted: 8,
        };
        assert_eq!(edit.map_offset(3), 3); // before: unchanged
        assert_eq!(edit.map_offset(5), 5); // at the edit point
        assert_eq!(edit.map_offset(6), 13); // after: shifted by +7
        assert_eq!(edit.net_delta(), 7);
    }

    #[test]
    fn test_offset_inside_deleted_span_collapses() {
        let edit = Edit {
            at: 2,
            deleted: 6,
            inserted: 0,
        };
        assert_eq!(edit.map_offset(5), 2);
        assert_eq!(edit.map_offset(8), 2);
        assert_eq!(edit.map_offset(9), 3);
    }

    #[test]
    fn test_replace_returns_edit() {
        let mut doc = DocumentBuffer::from_str("hello world");
        let edit = doc.replace(6..11, "rust");
        assert_eq!(doc.text(), "hello rust");
        assert_eq!(
            edit,
            Edit {
                at: 6,
                deleted: 5,
                inserted: 4
            }
        );
    }

    #[test]
    fn test_slice_bounds_and_boundaries() {
        let doc = DocumentBuffer::from_str("héllo");
        assert_eq!(doc.slice(0..1).as_deref(), Some("h"));
        // 'é' is two bytes at 1..3; a cut at 2 is mid-character.
        assert_eq!(doc.slice(0..2), None);
        assert_eq!(doc.slice(0..3).as_deref(), Some("hé"));
        assert_eq!(doc.slice(0..100), None);
    }

    #[test]
    fn test_expand_to_lines() {
        let doc = DocumentBuffer::from_str("first line\nsecond line\nthird line");
        // A range inside "second" expands to the whole second line.
        assert_eq!(doc.expand_to_lines(13..16), 11..22);
        // A range spanning lines one and two expands to both.
        assert_eq!(doc.expand_to_lines(4..16), 0..22);
        // Last line has no trailing newline.
        assert_eq!(doc.expand_to_lines(25..26), 23..33);
    }

    #[test]
    fn test_expand_covers_whole_list_item() {
        let doc = DocumentBuffer::from_str(
            "- item one\n  continues here\n- item two\n",
        );
        // A range on the continuation line pulls in the item's first line.
        assert_eq!(doc.expand_to_lines(13..16), 0..27);
        // A range on the first line pulls in the continuation below.
        assert_eq!(doc.expand_to_lines(2..6), 0..27);
        // The sibling item is its own unit.
        assert_eq!(doc.expand_to_lines(30..34), 28..38);
    }

    #[test]
    fn test_expand_treats_nested_item_as_own_unit() {
        let doc = DocumentBuffer::from_str("1. outer item\n   - nested item\nplain\n");
        // The nested bullet opens a new item; expansion from it does not
        // climb into the parent.
        assert_eq!(doc.expand_to_lines(20..26), 14..30);
    }
}
