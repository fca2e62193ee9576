//! The annotated-text algebra: building, compacting, slicing, and the
//! stream-to-source offset translation.

use std::ops::Range;

use serde::Serialize;
use smol_str::{SmolStr, format_smolstr};

use crate::segment::{Segment, WireSegment};
use crate::AnnotateError;

/// Which way to resolve a stream offset that lands inside markup.
///
/// A checker match that starts or ends inside markup is attributed to the
/// nearest enclosing text: the start snaps forward past the markup's source
/// bytes, the end snaps backward to where the markup began.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bias {
    Forward,
    Backward,
}

/// An ordered sequence of [`Segment`]s representing one checked region.
///
/// Invariants:
/// - the segments' source lengths sum to the region's byte length
/// - concatenating every segment's interpreted content yields exactly the
///   stream sent to the checker
///
/// Built fresh per check request, immutable once handed to the client, and
/// discarded after its matches are mapped back to source offsets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotatedText {
    segments: Vec<Segment>,
}

impl AnnotatedText {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validating constructor for pre-built segment lists.
    ///
    /// A segment that occupies no source bytes and produces no stream bytes
    /// is a programming error: it cannot be located from either side of the
    /// mapping and would mask offset drift, so construction fails fast.
    pub fn from_segments(segments: Vec<Segment>) -> Result<Self, AnnotateError> {
        for (index, seg) in segments.iter().enumerate() {
            if seg.source_len() == 0 && seg.interpreted_len() == 0 {
                return Err(AnnotateError::EmptySegment { index });
            }
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Append verbatim prose. No-op for the empty string.
    pub fn push_text(&mut self, content: &str) {
        if content.is_empty() {
            return;
        }
        self.segments.push(Segment::Text {
            content: SmolStr::new(content),
        });
    }

    /// Append markup covering `raw` source bytes, shown to the checker as
    /// `interpret_as`. No-op when both sides are empty.
    pub fn push_markup(&mut self, raw: &str, interpret_as: Option<&str>) {
        let interp_empty = interpret_as.is_none_or(str::is_empty);
        if raw.is_empty() && interp_empty {
            return;
        }
        self.segments.push(Segment::Markup {
            raw: SmolStr::new(raw),
            interpret_as: interpret_as.filter(|s| !s.is_empty()).map(SmolStr::new),
        });
    }

    /// Sum of source byte lengths. Must equal the annotated region's length.
    pub fn source_len(&self) -> usize {
        self.segments.iter().map(Segment::source_len).sum()
    }

    /// Length of the stream the checker will see, in bytes.
    pub fn interpreted_len(&self) -> usize {
        self.segments.iter().map(Segment::interpreted_len).sum()
    }

    /// Reference flattening: the full stream the checker will see.
    pub fn interpreted(&self) -> String {
        let mut out = String::with_capacity(self.interpreted_len());
        for seg in &self.segments {
            out.push_str(seg.interpreted());
        }
        out
    }

    /// Merge adjacent same-kind segments in place.
    ///
    /// Two text segments always merge; two markup segments merge only while
    /// the earlier one carries no interpretation (its stream contribution is
    /// empty, so concatenating raw spans changes nothing). Pure compaction:
    /// neither the interpreted stream nor the source length changes, and
    /// running it twice is the same as running it once.
    pub fn optimize(&mut self) {
        let segments = std::mem::take(&mut self.segments);
        let mut merged: Vec<Segment> = Vec::with_capacity(segments.len());
        for seg in segments {
            if let Some(prev) = merged.last_mut() {
                if let Some(combined) = merge_pair(prev, &seg) {
                    *prev = combined;
                    continue;
                }
            }
            merged.push(seg);
        }
        self.segments = merged;
    }

    /// Slice the interpreted stream at `[from, to)`, trimmed.
    ///
    /// Returns `None` when the stream is shorter than `to`. Single linear
    /// scan: leading segments wholly before `from` are skipped without
    /// materializing their content.
    pub fn extract_slice(&self, from: usize, to: usize) -> Option<String> {
        if from > to || to > self.interpreted_len() {
            return None;
        }
        let mut out = String::with_capacity(to - from);
        let mut pos = 0usize;
        for seg in &self.segments {
            let s = seg.interpreted();
            let end = pos + s.len();
            if end <= from {
                pos = end;
                continue;
            }
            if pos >= to {
                break;
            }
            let a = floor_boundary(s, from.saturating_sub(pos));
            let b = floor_boundary(s, (to - pos).min(s.len()));
            out.push_str(&s[a..b]);
            pos = end;
        }
        Some(out.trim().to_string())
    }

    /// Translate one interpreted-stream offset to a source offset.
    ///
    /// Returns `None` when the offset lies beyond the stream.
    pub fn stream_to_source(&self, pos: usize, bias: Bias) -> Option<usize> {
        if pos > self.interpreted_len() {
            return None;
        }
        let mut src = 0usize;
        let mut stream = 0usize;
        for seg in &self.segments {
            let s_len = seg.interpreted_len();
            let inside = match bias {
                Bias::Forward => pos < stream + s_len,
                Bias::Backward => s_len > 0 && pos <= stream + s_len,
            };
            if inside {
                return Some(match (seg, bias) {
                    (Segment::Text { .. }, _) => src + (pos - stream),
                    (Segment::Markup { .. }, Bias::Forward) => src + seg.source_len(),
                    (Segment::Markup { .. }, Bias::Backward) => src,
                });
            }
            src += seg.source_len();
            stream += s_len;
        }
        Some(src)
    }

    /// Translate a checker match (stream offset + length) into the source
    /// byte range it describes.
    ///
    /// Returns `None` when the match falls beyond the stream or lies wholly
    /// inside markup.
    pub fn source_range(&self, offset: usize, length: usize) -> Option<Range<usize>> {
        let start = self.stream_to_source(offset, Bias::Forward)?;
        let end = self.stream_to_source(offset.checked_add(length)?, Bias::Backward)?;
        if end <= start {
            return None;
        }
        Some(start..end)
    }

    /// Serialize the ordered segment list for the checker request.
    pub fn stringify(&self) -> String {
        #[derive(Serialize)]
        struct Payload<'a> {
            annotation: Vec<WireSegment<'a>>,
        }
        let payload = Payload {
            annotation: self.segments.iter().map(WireSegment::from).collect(),
        };
        // Only string data, cannot fail to serialize.
        serde_json::to_string(&payload).unwrap_or_default()
    }
}

/// Merge two adjacent segments when compaction is lossless.
fn merge_pair(prev: &Segment, next: &Segment) -> Option<Segment> {
    match (prev, next) {
        (Segment::Text { content: a }, Segment::Text { content: b }) => Some(Segment::Text {
            content: format_smolstr!("{a}{b}"),
        }),
        (
            Segment::Markup {
                raw: a,
                interpret_as: None,
            },
            Segment::Markup {
                raw: b,
                interpret_as,
            },
        ) => Some(Segment::Markup {
            raw: format_smolstr!("{a}{b}"),
            interpret_as: interpret_as.clone(),
        }),
        _ => None,
    }
}

/// Largest char boundary in `s` at or below `idx`.
fn floor_boundary(s: &str, mut idx: usize) -> usize {
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}
