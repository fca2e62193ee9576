//! Segments: the atomic units of annotated text.

use serde::Serialize;
use smol_str::SmolStr;

/// One atomic unit of an [`AnnotatedText`](crate::AnnotatedText).
///
/// All offsets in this crate are source/stream *byte* offsets. Segments are
/// only ever split at character boundaries, so translated ranges always land
/// on boundaries too.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Verbatim prose forwarded to the checker unchanged.
    Text { content: SmolStr },
    /// Structural source text the checker must not read literally.
    ///
    /// `raw` occupies `raw.len()` source bytes; the checker instead sees
    /// `interpret_as` (often a newline, a bullet glyph, or nothing), whose
    /// length may differ from `raw`.
    Markup {
        raw: SmolStr,
        interpret_as: Option<SmolStr>,
    },
}

impl Segment {
    /// Number of source bytes this segment covers.
    pub fn source_len(&self) -> usize {
        match self {
            Segment::Text { content } => content.len(),
            Segment::Markup { raw, .. } => raw.len(),
        }
    }

    /// The text the checker sees for this segment.
    pub fn interpreted(&self) -> &str {
        match self {
            Segment::Text { content } => content,
            Segment::Markup { interpret_as, .. } => {
                interpret_as.as_deref().unwrap_or("")
            }
        }
    }

    /// Length of [`interpreted`](Self::interpreted) in bytes.
    pub fn interpreted_len(&self) -> usize {
        self.interpreted().len()
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Segment::Text { .. })
    }
}

/// Wire shape for one segment in the checker request payload.
///
/// Text segments serialize as `{"text": …}`, markup segments as
/// `{"markup": …}` with an optional `interpretAs` field.
#[derive(Serialize)]
#[serde(untagged)]
pub(crate) enum WireSegment<'a> {
    Text {
        text: &'a str,
    },
    Markup {
        markup: &'a str,
        #[serde(rename = "interpretAs", skip_serializing_if = "Option::is_none")]
        interpret_as: Option<&'a str>,
    },
}

impl<'a> From<&'a Segment> for WireSegment<'a> {
    fn from(seg: &'a Segment) -> Self {
        match seg {
            Segment::Text { content } => WireSegment::Text { text: content },
            Segment::Markup { raw, interpret_as } => WireSegment::Markup {
                markup: raw,
                interpret_as: interpret_as.as_deref(),
            },
        }
    }
}
