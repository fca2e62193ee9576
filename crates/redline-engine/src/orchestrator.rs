//! The check orchestrator: owns the document, the decoration store, and the
//! checker client, and sequences edits, debounced checks, and user actions
//! over them.
//!
//! Everything here runs on one task; the only await points are the checker
//! requests, and results landing after further edits are handled by the
//! out-of-bounds drop in match translation plus range remapping.

use std::ops::Range;

use redline_annotate::annotate;
use redline_check::{CheckerClient, Match};
use tokio::time::{Duration, Instant};

use crate::config::Config;
use crate::dictionary;
use crate::document::{DocumentBuffer, Edit};
use crate::error::EngineError;
use crate::exclusions::ExclusionZones;
use crate::store::DecorationStore;

/// Debounce state for pending checks. Pure bookkeeping: callers decide when
/// to sleep and when to fire, which keeps it testable under paused time.
#[derive(Debug, Default)]
pub struct PendingCheck {
    region: Option<Range<usize>>,
    due_at: Option<Instant>,
}

impl PendingCheck {
    /// Fold an edit into the pending region and push the deadline out.
    ///
    /// An already-pending region is first remapped through the edit so its
    /// offsets stay valid, then unioned with the edit's new span.
    pub fn record_edit(&mut self, edit: &Edit, debounce: Duration) {
        let touched = edit.at..edit.new_end();
        let region = match self.region.take() {
            Some(prev) => {
                let start = edit.map_offset(prev.start).min(touched.start);
                let end = edit.map_offset(prev.end).max(touched.end);
                start..end
            }
            None => touched,
        };
        self.region = Some(region);
        self.due_at = Some(Instant::now() + debounce);
    }

    /// Request a check of an explicit region, due immediately.
    pub fn request(&mut self, region: Range<usize>) {
        let region = match self.region.take() {
            Some(prev) => prev.start.min(region.start)..prev.end.max(region.end),
            None => region,
        };
        self.region = Some(region);
        self.due_at = Some(Instant::now());
    }

    /// When the pending check should fire, if one is pending.
    pub fn due_at(&self) -> Option<Instant> {
        self.due_at
    }

    /// Take the pending region if its quiet period has elapsed.
    pub fn take_due(&mut self) -> Option<Range<usize>> {
        if self.due_at.is_some_and(|due| Instant::now() >= due) {
            self.due_at = None;
            self.region.take()
        } else {
            None
        }
    }

    pub fn cancel(&mut self) {
        self.region = None;
        self.due_at = None;
    }
}

/// Coordinates the live checking loop for one open document.
pub struct CheckOrchestrator {
    client: CheckerClient,
    config: Config,
    document: DocumentBuffer,
    store: DecorationStore,
    zones: ExclusionZones,
    pending: PendingCheck,
}

impl CheckOrchestrator {
    pub fn new(config: Config) -> Result<Self, EngineError> {
        let client = CheckerClient::new(&config.endpoint)
            .map_err(EngineError::Check)?
            .with_credentials(config.credentials.clone());
        Ok(Self {
            client,
            config,
            document: DocumentBuffer::from_str(""),
            store: DecorationStore::new(),
            zones: ExclusionZones::default(),
            pending: PendingCheck::default(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn document(&self) -> &DocumentBuffer {
        &self.document
    }

    pub fn store(&self) -> &DecorationStore {
        &self.store
    }

    fn debounce(&self) -> Duration {
        Duration::from_millis(self.config.debounce_ms)
    }

    /// Replace the document wholesale, drop every marker, and queue a full
    /// check. Used on open and on external file changes.
    pub fn open(&mut self, text: &str) {
        self.document = DocumentBuffer::from_str(text);
        self.zones = ExclusionZones::scan(text);
        self.store.clear_all();
        self.pending.cancel();
        if !self.document.is_empty() {
            self.pending.request(0..self.document.len());
        }
    }

    /// Apply one editor edit: mutate the buffer, remap markers, rescan
    /// exclusion zones, and restart the debounce window.
    pub fn apply_edit(
        &mut self,
        range: Range<usize>,
        text: &str,
        selection: Option<&Range<usize>>,
    ) -> Edit {
        let edit = self.document.replace(range, text);
        self.store.apply_edit(&edit, selection);
        self.zones = ExclusionZones::scan(&self.document.text());
        self.pending.record_edit(&edit, self.debounce());
        edit
    }

    /// Run the pending check if its quiet period has elapsed. Returns the
    /// number of underlines inserted, or `None` when nothing was due.
    pub async fn run_pending(&mut self) -> Result<Option<usize>, EngineError> {
        match self.pending.take_due() {
            Some(region) => self.check_range(region).await.map(Some),
            None => Ok(None),
        }
    }

    /// Check the whole document now.
    pub async fn check_all(&mut self) -> Result<usize, EngineError> {
        self.pending.cancel();
        self.check_range(0..self.document.len()).await
    }

    /// Check a sub-range now, expanded to whole lines so the checker sees
    /// complete sentences of context.
    pub async fn check_range(&mut self, range: Range<usize>) -> Result<usize, EngineError> {
        let len = self.document.len();
        if range.start > len || range.end > len {
            return Err(EngineError::RegionOutOfBounds {
                start: range.start,
                end: range.end,
                len,
            });
        }
        let region = self.document.expand_to_lines(range);
        if region.start >= region.end {
            return Ok(0);
        }
        let Some(slice) = self.document.slice(region.clone()) else {
            return Err(EngineError::RegionOutOfBounds {
                start: region.start,
                end: region.end,
                len,
            });
        };

        let annotated = annotate(&slice)?;
        let raw = match self.client.check(&annotated, &self.config.options).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(
                    target: "redline::orchestrator",
                    error = %e,
                    "check request failed, keeping existing markers"
                );
                return Err(e.into());
            }
        };

        // Translate before touching the store so a failed request leaves
        // existing markers in place. Untranslatable matches are dropped.
        let matches: Vec<Match> = raw
            .iter()
            .filter_map(|r| Match::from_raw(r, &annotated, &slice, region.start))
            .collect();
        tracing::debug!(
            target: "redline::orchestrator",
            region = ?region,
            raw = raw.len(),
            translated = matches.len(),
            "check finished"
        );

        self.store.clear_in_range(&region);
        let mut added = 0;
        for m in matches {
            if self
                .store
                .add_underline(m, &self.zones, &self.config.dictionary)
            {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Apply the `index`-th suggestion of the underline at exactly `range`:
    /// the marker goes away, the text is rewritten, and surrounding markers
    /// remap through the resulting edit. `None` when there is no such marker
    /// or suggestion.
    pub fn accept_replacement(&mut self, range: Range<usize>, index: usize) -> Option<Edit> {
        let replacement = self
            .store
            .underlines()
            .iter()
            .find(|u| u.range == range)?
            .inner
            .replacements
            .get(index)?
            .clone();
        self.store.clear_in_range(&range);
        let edit = self.document.replace(range, &replacement);
        self.store.apply_edit(&edit, None);
        self.zones = ExclusionZones::scan(&self.document.text());
        self.pending.record_edit(&edit, self.debounce());
        Some(edit)
    }

    /// Dismiss the underline at `range`; the span stays suppressed until
    /// the text there changes.
    pub fn ignore(&mut self, range: &Range<usize>) -> bool {
        self.store.ignore(range)
    }

    /// Drop every marker, including ignored spans.
    pub fn clear_all(&mut self) {
        self.store.clear_all();
    }

    /// Drop underlines overlapping `range`.
    pub fn clear_in_range(&mut self, range: &Range<usize>) {
        self.store.clear_in_range(range);
    }

    /// Add a word to the personal dictionary, retract its spelling markers,
    /// and push it to the checker account when sync is enabled.
    pub async fn add_to_dictionary(&mut self, word: &str) -> Result<(), EngineError> {
        let word = word.to_lowercase();
        if !self.config.dictionary.insert(word.clone()) {
            return Ok(());
        }
        self.store
            .clear_matching(|m| m.is_spelling() && m.text.to_lowercase() == word);
        if self.config.sync_dictionary {
            self.sync_dictionary().await?;
        }
        Ok(())
    }

    /// Reconcile the personal dictionary with the checker account and, on
    /// success, advance the merge snapshot. Returns whether anything moved.
    pub async fn sync_dictionary(&mut self) -> Result<bool, EngineError> {
        let outcome = dictionary::reconcile(
            &self.client,
            &self.config.last_synced,
            &self.config.dictionary,
        )
        .await?;
        self.config.dictionary = outcome.merged.clone();
        self.config.last_synced = outcome.merged;
        Ok(outcome.changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orchestrator(text: &str) -> CheckOrchestrator {
        let mut o = CheckOrchestrator::new(Config::default()).unwrap();
        o.open(text);
        o
    }

    #[tokio::test(start_paused = true)]
    async fn test_edits_coalesce_into_one_pending_region() {
        let mut pending = PendingCheck::default();
        let debounce = Duration::from_millis(1000);

        pending.record_edit(
            &Edit {
                at: 10,
                deleted: 0,
                inserted: 1,
            },
            debounce,
        );
        tokio::time::advance(Duration::from_millis(400)).await;
        assert!(pending.take_due().is_none());

        // Second keystroke before the deadline restarts the window and
        // extends the region.
        pending.record_edit(
            &Edit {
                at: 11,
                deleted: 0,
                inserted: 1,
            },
            debounce,
        );
        tokio::time::advance(Duration::from_millis(900)).await;
        assert!(pending.take_due().is_none());

        tokio::time::advance(Duration::from_millis(100)).await;
        assert_eq!(pending.take_due(), Some(10..12));
        assert!(pending.take_due().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_region_remaps_through_earlier_edit() {
        let mut pending = PendingCheck::default();
        let debounce = Duration::from_millis(1000);

        pending.record_edit(
            &Edit {
                at: 20,
                deleted: 0,
                inserted: 5,
            },
            debounce,
        );
        // An insertion before the pending region shifts it.
        pending.record_edit(
            &Edit {
                at: 0,
                deleted: 0,
                inserted: 3,
            },
            debounce,
        );
        tokio::time::advance(debounce).await;
        assert_eq!(pending.take_due(), Some(0..28));
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_queues_full_check() {
        let o = orchestrator("Some text.\n");
        tokio::time::advance(Duration::from_millis(1)).await;
        let mut pending = o.pending;
        assert_eq!(pending.take_due(), Some(0..11));
    }

    #[tokio::test]
    async fn test_apply_edit_remaps_markers() {
        use redline_check::Match;
        use std::collections::BTreeSet;

        let mut o = orchestrator("alpha beta gamma\n");
        let m = Match {
            text: "beta".into(),
            range: 6..10,
            title: "t".into(),
            message: "m".into(),
            replacements: vec![],
            category_id: "GRAMMAR".into(),
            rule_id: "R".into(),
        };
        assert!(o.store.add_underline(m, &o.zones, &BTreeSet::new()));

        // Type at the front, caret there: the marker shifts.
        o.apply_edit(0..0, "x", Some(&(0..0)));
        assert_eq!(o.store().underlines()[0].range, 7..11);
        assert_eq!(o.document().text(), "xalpha beta gamma\n");

        // Type inside the marker: it goes away.
        o.apply_edit(8..8, "y", Some(&(8..8)));
        assert!(o.store().is_empty());
    }

    #[tokio::test]
    async fn test_accept_replacement_rewrites_and_clears() {
        use redline_check::Match;
        use std::collections::BTreeSet;

        let mut o = orchestrator("teh cat\n");
        let m = Match {
            text: "teh".into(),
            range: 0..3,
            title: "Possible typo".into(),
            message: "m".into(),
            replacements: vec!["the".to_owned()],
            category_id: "TYPOS".into(),
            rule_id: "MORFOLOGIK_RULE_EN_US".into(),
        };
        o.store.add_underline(m, &o.zones, &BTreeSet::new());

        let edit = o.accept_replacement(0..3, 0).unwrap();
        assert_eq!(o.document().text(), "the cat\n");
        assert_eq!(edit.net_delta(), 0);
        assert!(o.store().is_empty());

        // No marker there anymore.
        assert!(o.accept_replacement(0..3, 0).is_none());
    }

    #[tokio::test]
    async fn test_add_to_dictionary_retracts_spelling_markers() {
        use redline_check::Match;
        use std::collections::BTreeSet;

        let mut o = orchestrator("Smolstr is a crate.\n");
        let m = Match {
            text: "Smolstr".into(),
            range: 0..7,
            title: "Possible typo".into(),
            message: "m".into(),
            replacements: vec![],
            category_id: "TYPOS".into(),
            rule_id: "MORFOLOGIK_RULE_EN_US".into(),
        };
        o.store.add_underline(m, &o.zones, &BTreeSet::new());

        o.add_to_dictionary("Smolstr").await.unwrap();
        assert!(o.store().is_empty());
        assert!(o.config().dictionary.contains("smolstr"));
    }

    #[tokio::test]
    async fn test_clear_surface_keeps_ignored_spans() {
        use redline_check::Match;
        use std::collections::BTreeSet;

        let mut o = orchestrator("alpha beta gamma\n");
        let m = Match {
            text: "beta".into(),
            range: 6..10,
            title: "t".into(),
            message: "m".into(),
            replacements: vec![],
            category_id: "GRAMMAR".into(),
            rule_id: "R".into(),
        };
        o.store.add_underline(m.clone(), &o.zones, &BTreeSet::new());
        assert!(o.ignore(&(6..10)));

        // A UI-driven clear of the line drops underlines only; the
        // dismissed span stays suppressed.
        o.clear_in_range(&(0..17));
        assert!(!o.store.add_underline(m, &o.zones, &BTreeSet::new()));

        o.clear_all();
        assert!(o.store().ignored_ranges().is_empty());
    }

    #[tokio::test]
    async fn test_check_range_rejects_out_of_bounds() {
        let mut o = orchestrator("short\n");
        let err = o.check_range(0..100).await.unwrap_err();
        assert!(matches!(err, EngineError::RegionOutOfBounds { len: 6, .. }));
    }
}
