//! The live decoration store: underlines and ignored ranges keyed by source
//! range, remapped through edits, filtered on insertion.

use std::collections::BTreeSet;
use std::ops::Range;

use redline_check::Match;

use crate::document::Edit;
use crate::exclusions::ExclusionZones;

/// A live marker rendering one [`Match`] on the document. Created when a
/// match is accepted into the store, moved only by edit remapping, and
/// destroyed by acceptance, ignore, clearing, or an edit inside its range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Underline {
    pub range: Range<usize>,
    pub inner: Match,
}

/// Inclusive-endpoint overlap: a zero-width caret exactly at a marker
/// boundary still counts as touching it.
pub fn spans_touch(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start <= b.end && b.start <= a.end
}

/// Versioned collection of underlines and user-suppressed ranges.
#[derive(Debug, Clone, Default)]
pub struct DecorationStore {
    underlines: Vec<Underline>,
    /// Spans where the user dismissed a suggestion; they carry no match and
    /// exist purely to suppress re-insertion at that exact span until the
    /// text there changes.
    ignored: Vec<Range<usize>>,
}

impl DecorationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn underlines(&self) -> &[Underline] {
        &self.underlines
    }

    pub fn ignored_ranges(&self) -> &[Range<usize>] {
        &self.ignored
    }

    pub fn len(&self) -> usize {
        self.underlines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.underlines.is_empty()
    }

    /// Insert a match as an underline, unless a filter rejects it.
    ///
    /// Rejection reasons, in order: a marker already occupies the identical
    /// range; the range touches a structurally excluded zone; the range is
    /// listed as ignored; the match is a spelling hit whose exact text is
    /// in the personal dictionary. Returns whether the underline was added.
    pub fn add_underline(
        &mut self,
        m: Match,
        zones: &ExclusionZones,
        dictionary: &BTreeSet<String>,
    ) -> bool {
        if self.underlines.iter().any(|u| u.range == m.range) {
            tracing::debug!(target: "redline::store", range = ?m.range, "duplicate range");
            return false;
        }
        if zones.is_excluded(&m.range) {
            return false;
        }
        if self.ignored.iter().any(|r| spans_touch(r, &m.range)) {
            return false;
        }
        if m.is_spelling() && dictionary.contains(&m.text.to_lowercase()) {
            return false;
        }
        self.underlines.push(Underline {
            range: m.range.clone(),
            inner: m,
        });
        true
    }

    /// Remap every stored range through an edit.
    ///
    /// Ranges entirely after the edit shift by its net delta; ranges before
    /// it are untouched. A range the edit touches is invalidated when the
    /// edit also intersects the current selection (the user typed into or
    /// next to the suggestion, so the text it described is gone); touched
    /// ranges from selection-free edits are remapped with endpoint collapse
    /// and dropped if they collapse to nothing.
    pub fn apply_edit(&mut self, edit: &Edit, selection: Option<&Range<usize>>) {
        let selection_hit =
            selection.is_some_and(|sel| spans_touch(sel, &edit.old_range()));
        self.underlines
            .retain_mut(|u| remap(&mut u.range, edit, selection_hit));
        self.ignored.retain_mut(|r| remap(r, edit, selection_hit));
    }

    /// Drop every marker immediately.
    pub fn clear_all(&mut self) {
        self.underlines.clear();
        self.ignored.clear();
    }

    /// Drop underlines overlapping `range` (used after the user accepts a
    /// replacement or a sub-range is re-checked). Ignored ranges are left
    /// alone: a re-check of the surrounding text must not resurface a
    /// dismissed suggestion, so only edit remapping invalidates them.
    pub fn clear_in_range(&mut self, range: &Range<usize>) {
        self.underlines.retain(|u| !spans_touch(&u.range, range));
    }

    /// Remove every underline whose match satisfies `predicate` (e.g.
    /// retract spelling markers after a word joins the dictionary).
    pub fn clear_matching(&mut self, predicate: impl Fn(&Match) -> bool) {
        self.underlines.retain(|u| !predicate(&u.inner));
    }

    /// Move the underline at exactly `range` into the ignored set,
    /// suppressing re-proposals for that span.
    pub fn ignore(&mut self, range: &Range<usize>) -> bool {
        let before = self.underlines.len();
        self.underlines.retain(|u| u.range != *range);
        if self.underlines.len() == before {
            return false;
        }
        self.ignored.push(range.clone());
        true
    }

    /// The underline (if any) covering `offset`, for suggestion tooltips.
    pub fn underline_at(&self, offset: usize) -> Option<&Underline> {
        self.underlines
            .iter()
            .find(|u| u.range.start <= offset && offset <= u.range.end)
    }
}

/// Remap one range in place; returns false when the marker is invalidated.
fn remap(range: &mut Range<usize>, edit: &Edit, selection_hit: bool) -> bool {
    if edit.old_end() <= range.start {
        // Entirely before: shift by the net delta.
        let delta = edit.net_delta();
        range.start = (range.start as isize + delta) as usize;
        range.end = (range.end as isize + delta) as usize;
        return true;
    }
    if edit.at >= range.end {
        // Entirely after: untouched.
        return true;
    }
    // The edit touches the range.
    if selection_hit {
        return false;
    }
    range.start = edit.map_offset(range.start);
    range.end = edit.map_offset(range.end);
    range.start < range.end
}

#[cfg(test)]
mod tests {
    use super::*;
    use redline_check::Match;
    use smol_str::SmolStr;

    fn spelling_match(range: Range<usize>, text: &str) -> Match {
        Match {
            text: SmolStr::new(text),
            range,
            title: "Possible typo".into(),
            message: "Possible spelling mistake found.".into(),
            replacements: vec!["fixed".into()],
            category_id: "TYPOS".into(),
            rule_id: "MORFOLOGIK_RULE_EN_US".into(),
        }
    }

    fn grammar_match(range: Range<usize>) -> Match {
        Match {
            text: "was".into(),
            range,
            title: "Agreement".into(),
            message: "Subject and verb disagree.".into(),
            replacements: vec!["were".into()],
            category_id: "GRAMMAR".into(),
            rule_id: "AGREEMENT_RULE".into(),
        }
    }

    fn no_zones() -> ExclusionZones {
        ExclusionZones::default()
    }

    #[test]
    fn test_identical_range_inserted_once() {
        let mut store = DecorationStore::new();
        let dict = BTreeSet::new();
        assert!(store.add_underline(grammar_match(5..10), &no_zones(), &dict));
        assert!(!store.add_underline(grammar_match(5..10), &no_zones(), &dict));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_excluded_zone_rejects() {
        let src = "text `code span` more";
        let zones = ExclusionZones::scan(src);
        let mut store = DecorationStore::new();
        let code = src.find("code").unwrap();
        assert!(!store.add_underline(
            grammar_match(code..code + 4),
            &zones,
            &BTreeSet::new()
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_dictionary_suppresses_spelling_only() {
        let mut store = DecorationStore::new();
        let dict: BTreeSet<String> = ["obsidian".to_owned()].into();
        assert!(!store.add_underline(
            spelling_match(0..8, "Obsidian"),
            &no_zones(),
            &dict
        ));
        // Grammar hits on a dictionary word still show.
        assert!(store.add_underline(grammar_match(0..8), &no_zones(), &dict));
    }

    #[test]
    fn test_edit_before_shifts_range() {
        let mut store = DecorationStore::new();
        store.add_underline(grammar_match(20..25), &no_zones(), &BTreeSet::new());

        // Insert 3 bytes at offset 5, selection elsewhere.
        let edit = Edit {
            at: 5,
            deleted: 0,
            inserted: 3,
        };
        store.apply_edit(&edit, Some(&(5..5)));
        assert_eq!(store.underlines()[0].range, 23..28);

        // Delete 2 bytes before it: shift back.
        let edit = Edit {
            at: 0,
            deleted: 2,
            inserted: 0,
        };
        store.apply_edit(&edit, Some(&(0..0)));
        assert_eq!(store.underlines()[0].range, 21..26);
    }

    #[test]
    fn test_edit_after_leaves_range_alone() {
        let mut store = DecorationStore::new();
        store.add_underline(grammar_match(5..10), &no_zones(), &BTreeSet::new());
        let edit = Edit {
            at: 30,
            deleted: 1,
            inserted: 4,
        };
        store.apply_edit(&edit, Some(&(30..30)));
        assert_eq!(store.underlines()[0].range, 5..10);
    }

    #[test]
    fn test_edit_inside_range_invalidates() {
        let mut store = DecorationStore::new();
        store.add_underline(grammar_match(5..10), &no_zones(), &BTreeSet::new());
        // Typing at offset 7, caret there.
        let edit = Edit {
            at: 7,
            deleted: 0,
            inserted: 1,
        };
        store.apply_edit(&edit, Some(&(7..7)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_ignored_range_survives_edits_and_blocks_reinsert() {
        let mut store = DecorationStore::new();
        let dict = BTreeSet::new();
        store.add_underline(grammar_match(10..15), &no_zones(), &dict);
        assert!(store.ignore(&(10..15)));
        assert!(store.is_empty());

        // Remap the ignored range through an earlier insertion.
        let edit = Edit {
            at: 0,
            deleted: 0,
            inserted: 5,
        };
        store.apply_edit(&edit, Some(&(0..0)));

        // The same suggestion at the remapped span is suppressed.
        assert!(!store.add_underline(grammar_match(15..20), &no_zones(), &dict));
    }

    #[test]
    fn test_ignore_survives_recheck_of_its_line() {
        let mut store = DecorationStore::new();
        let dict = BTreeSet::new();
        store.add_underline(grammar_match(10..15), &no_zones(), &dict);
        assert!(store.ignore(&(10..15)));

        // A re-check clears and re-applies the whole line. The dismissed
        // span must stay suppressed even though nothing there changed.
        store.clear_in_range(&(0..40));
        assert_eq!(store.ignored_ranges(), &[10..15]);
        assert!(!store.add_underline(grammar_match(10..15), &no_zones(), &dict));
    }

    #[test]
    fn test_clear_in_range_is_overlap_scoped() {
        let mut store = DecorationStore::new();
        let dict = BTreeSet::new();
        store.add_underline(grammar_match(0..5), &no_zones(), &dict);
        store.add_underline(grammar_match(20..25), &no_zones(), &dict);
        store.clear_in_range(&(3..10));
        assert_eq!(store.len(), 1);
        assert_eq!(store.underlines()[0].range, 20..25);
    }

    #[test]
    fn test_clear_matching_retracts_spelling() {
        let mut store = DecorationStore::new();
        let dict = BTreeSet::new();
        store.add_underline(spelling_match(0..4, "teh"), &no_zones(), &dict);
        store.add_underline(grammar_match(10..13), &no_zones(), &dict);
        store.clear_matching(|m| m.is_spelling() && m.text == "teh");
        assert_eq!(store.len(), 1);
        assert_eq!(store.underlines()[0].inner.category_id, "GRAMMAR");
    }

    #[test]
    fn test_underline_at_boundary_is_inclusive() {
        let mut store = DecorationStore::new();
        store.add_underline(grammar_match(5..10), &no_zones(), &BTreeSet::new());
        assert!(store.underline_at(5).is_some());
        assert!(store.underline_at(10).is_some());
        assert!(store.underline_at(4).is_none());
        assert!(store.underline_at(11).is_none());
    }
}
