//! Structural exclusion zones.
//!
//! Classifies source spans where suggestions must never be offered: front
//! matter, code, math, templater syntax, block IDs, hashtags, and internal
//! links. The store consults this before inserting an underline.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

/// Spans of the document whose structural classification excludes them from
/// checking. Rebuilt per check application; cheap relative to the network
/// round trip.
#[derive(Debug, Clone, Default)]
pub struct ExclusionZones {
    zones: Vec<Range<usize>>,
}

static FRONT_MATTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\A---\r?\n(?s:.*?)\r?\n---(?:\r?\n|\z)").unwrap());
static FENCED_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?ms)^(?:```|~~~)[^\n]*\n.*?^(?:```|~~~)[^\n]*$").unwrap());
static INLINE_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`[^`\n]+`").unwrap());
static MATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\$\$.+?\$\$|\$[^$\n]+\$").unwrap());
static TEMPLATER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<%.*?%>").unwrap());
static BLOCK_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)\^[A-Za-z0-9-]+[ \t]*$").unwrap());
static HASHTAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\s)(#[\w/-]+)").unwrap());
static INTERNAL_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[[^\]\n]+\]\]").unwrap());

impl ExclusionZones {
    /// Scan `source` and record every structurally excluded span.
    pub fn scan(source: &str) -> Self {
        let mut zones = Vec::new();

        if let Some(m) = FRONT_MATTER.find(source) {
            zones.push(m.range());
        }
        for m in FENCED_CODE.find_iter(source) {
            zones.push(m.range());
        }
        for m in INLINE_CODE.find_iter(source) {
            zones.push(m.range());
        }
        for m in MATH.find_iter(source) {
            zones.push(m.range());
        }
        for m in TEMPLATER.find_iter(source) {
            zones.push(m.range());
        }
        for line_match in BLOCK_ID.find_iter(source) {
            zones.push(line_match.range());
        }
        for caps in HASHTAG.captures_iter(source) {
            if let Some(tag) = caps.get(1) {
                zones.push(tag.range());
            }
        }
        for m in INTERNAL_LINK.find_iter(source) {
            zones.push(m.range());
        }

        zones.sort_by_key(|r| (r.start, r.end));
        Self { zones }
    }

    /// Whether `range` touches any excluded span (inclusive endpoints, the
    /// same overlap rule the store uses).
    pub fn is_excluded(&self, range: &Range<usize>) -> bool {
        self.zones
            .iter()
            .any(|z| z.start <= range.end && range.start <= z.end)
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}
