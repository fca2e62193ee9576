//! Request options and the wire/value types of the checker contract.

use std::ops::Range;

use redline_annotate::AnnotatedText;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Parameters sent along with every check request. Stored in configuration,
/// so serde round-trippable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CheckOptions {
    /// Target language code, or `"auto"` for server-side detection.
    pub language: String,
    /// The writer's native language, for false-friend rules.
    pub mother_tongue: Option<String>,
    /// Ask for the picky rule level instead of the default.
    pub picky: bool,
    pub enabled_rules: Vec<String>,
    pub disabled_rules: Vec<String>,
    pub enabled_categories: Vec<String>,
    pub disabled_categories: Vec<String>,
    /// Preferred regional variants; only meaningful with language `"auto"`.
    pub preferred_variants: Vec<String>,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            language: "auto".to_owned(),
            mother_tongue: None,
            picky: false,
            enabled_rules: Vec::new(),
            disabled_rules: Vec::new(),
            enabled_categories: Vec::new(),
            disabled_categories: Vec::new(),
            preferred_variants: Vec::new(),
        }
    }
}

/// Top-level check response body.
#[derive(Debug, Deserialize)]
pub struct CheckResponse {
    #[serde(default)]
    pub matches: Vec<RawMatch>,
}

/// One issue as the checker reports it: offsets relative to the interpreted
/// stream, not the source document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMatch {
    pub offset: usize,
    pub length: usize,
    #[serde(default)]
    pub short_message: String,
    pub message: String,
    #[serde(default)]
    pub replacements: Vec<Replacement>,
    pub rule: Rule,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Replacement {
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Rule {
    pub id: String,
    pub category: Category,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Category {
    pub id: String,
}

/// Spelling rule families: matches from these may be suppressed by the
/// personal dictionary.
const SPELLING_CATEGORY: &str = "TYPOS";
const SPELLING_RULE_PREFIXES: &[&str] = &["MORFOLOGIK_", "HUNSPELL", "SPELLER_"];

/// One checker issue translated to source-document offsets. Immutable value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// The exact source text the issue covers.
    pub text: SmolStr,
    /// Source byte range, document-relative.
    pub range: Range<usize>,
    /// Short human title (the checker's shortMessage).
    pub title: SmolStr,
    pub message: String,
    pub replacements: Vec<String>,
    pub category_id: SmolStr,
    pub rule_id: SmolStr,
}

impl Match {
    /// Translate a stream-relative raw match into source offsets.
    ///
    /// `region` is the source slice the annotation was built from and
    /// `region_start` its offset within the document. Returns `None` for
    /// matches that fall off the stream or lie wholly inside markup; those
    /// are dropped per match, never an error, since the checker may lag the
    /// document.
    pub fn from_raw(
        raw: &RawMatch,
        annotated: &AnnotatedText,
        region: &str,
        region_start: usize,
    ) -> Option<Self> {
        let local = annotated.source_range(raw.offset, raw.length)?;
        let text = region.get(local.clone())?;
        Some(Self {
            text: SmolStr::new(text),
            range: region_start + local.start..region_start + local.end,
            title: SmolStr::new(&raw.short_message),
            message: raw.message.clone(),
            replacements: raw.replacements.iter().map(|r| r.value.clone()).collect(),
            category_id: SmolStr::new(&raw.rule.category.id),
            rule_id: SmolStr::new(&raw.rule.id),
        })
    }

    /// Whether this match comes from a spelling rule, and so may be
    /// suppressed by the personal dictionary.
    pub fn is_spelling(&self) -> bool {
        self.category_id == SPELLING_CATEGORY
            || SPELLING_RULE_PREFIXES
                .iter()
                .any(|p| self.rule_id.starts_with(p))
    }
}
