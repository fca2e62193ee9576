//! Markdown-to-annotation conversion.
//!
//! Walks the offset-ranged markdown event stream left to right, keeping a
//! running source cursor. Prose becomes text segments; everything else
//! (delimiters, indentation, fences, whole code blocks) is absorbed as
//! markup so that not a single source byte is lost. The checker sees a
//! plain-text stream with paragraph and list structure expressed as
//! newlines and bullet glyphs.

use pulldown_cmark::{Event, LinkType, Options, Parser, Tag, TagEnd};

use crate::annotated::AnnotatedText;
use crate::AnnotateError;

/// Stand-in word for links with no checkable children (autolinks), so the
/// surrounding sentence keeps a plausible noun where the URL was.
const LINK_STAND_IN: &str = "link";

fn parser_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_MATH
        | Options::ENABLE_YAML_STYLE_METADATA_BLOCKS
}

/// Flatten markdown `source` into an [`AnnotatedText`].
///
/// The returned annotation's source lengths sum to exactly `source.len()`;
/// any inconsistency between the parser's spans and the rendered text is a
/// hard error, never a silent recovery.
pub fn annotate(source: &str) -> Result<AnnotatedText, AnnotateError> {
    let events = Parser::new_ext(source, parser_options()).into_offset_iter();
    let mut walker = Walker {
        source,
        out: AnnotatedText::new(),
        cursor: 0,
        skip_until: None,
    };

    for (event, range) in events {
        tracing::trace!(
            target: "redline::annotate",
            event = ?event,
            byte_range = ?range,
            "processing event"
        );

        // Events inside a span already consumed whole (code block, image,
        // front matter, autolink) are skipped until the matching end tag.
        if let Some(end) = walker.skip_until {
            if range.end < end {
                continue;
            }
            if range.end == end {
                if matches!(event, Event::End(_)) {
                    walker.skip_until = None;
                }
                continue;
            }
            walker.skip_until = None;
        }

        walker.process(event, range)?;
    }

    walker.finish()
}

struct Walker<'a> {
    source: &'a str,
    out: AnnotatedText,
    /// Source byte cursor: everything before it has been emitted.
    cursor: usize,
    /// End of a span consumed whole; events inside it are skipped.
    skip_until: Option<usize>,
}

impl<'a> Walker<'a> {
    fn process(
        &mut self,
        event: Event<'a>,
        range: std::ops::Range<usize>,
    ) -> Result<(), AnnotateError> {
        // End events absorb their trailing delimiters (closing emphasis
        // markers, the newline that terminates a block) up to range.end;
        // everything else absorbs the gap up to its own start.
        if matches!(event, Event::End(_)) {
            self.emit_gap(range.end);
        } else {
            self.emit_gap(range.start);
        }

        match event {
            Event::Start(tag) => {
                self.start_tag(tag, range);
                Ok(())
            }
            Event::End(tag) => {
                self.end_tag(tag);
                Ok(())
            }
            Event::Text(text) => self.text_node(&text, range),
            // Inline code: interpreted as the code text itself, so grammar
            // rules still see short inline code, but it is never escaped or
            // line-broken.
            Event::Code(code) => {
                self.emit_markup(range, Some(&code));
                Ok(())
            }
            Event::SoftBreak | Event::HardBreak => {
                self.emit_markup(range, Some("\n"));
                Ok(())
            }
            Event::Rule => {
                self.emit_markup(range, Some("\n\n"));
                Ok(())
            }
            Event::InlineHtml(_) | Event::Html(_) => {
                self.emit_markup(range, None);
                Ok(())
            }
            Event::InlineMath(_) | Event::DisplayMath(_) => {
                self.emit_markup(range, None);
                Ok(())
            }
            Event::FootnoteReference(_) | Event::TaskListMarker(_) => {
                self.emit_markup(range, None);
                Ok(())
            }
        }
    }

    fn start_tag(&mut self, tag: Tag<'a>, range: std::ops::Range<usize>) {
        match tag {
            // Paragraph boundaries become sentence boundaries for the
            // checker.
            Tag::Paragraph => self.out.push_markup("", Some("\n\n")),
            Tag::Item => self.out.push_markup("", Some("• ")),
            // Consumed whole, never shown to the checker.
            Tag::CodeBlock(_) | Tag::HtmlBlock | Tag::Image { .. } | Tag::MetadataBlock(_) => {
                self.consume(range, None);
            }
            Tag::Link { link_type, .. } => {
                // Autolinks have no checkable children; a stand-in word
                // keeps the sentence grammatical. Everything else is
                // transparent (delimiters fall out as gaps).
                if matches!(link_type, LinkType::Autolink | LinkType::Email) {
                    self.consume(range, Some(LINK_STAND_IN));
                }
            }
            // Transparent containers: children are processed normally.
            _ => {}
        }
    }

    fn end_tag(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::List(_) | TagEnd::Table => {
                self.out.push_markup("", Some("\n\n"));
            }
            // Items and table cells/rows are separated by single newlines
            // so per-item and per-cell sentences never join.
            TagEnd::Item | TagEnd::TableCell | TagEnd::TableRow | TagEnd::TableHead => {
                self.out.push_markup("", Some("\n"));
            }
            _ => {}
        }
    }

    /// A text node. The rendered value normally occupies exactly its span;
    /// when it is shorter, the span contains backslash escapes or entity
    /// references that must be split out as markup. Longer is a parser
    /// invariant violation.
    fn text_node(
        &mut self,
        text: &str,
        range: std::ops::Range<usize>,
    ) -> Result<(), AnnotateError> {
        let raw = &self.source[range.clone()];
        if text == raw {
            self.push_plain_text(raw);
            self.cursor = range.end;
            return Ok(());
        }
        if text.len() > raw.len() {
            return Err(AnnotateError::NodeOverrun {
                start: range.start,
                end: range.end,
                rendered: text.len(),
                span: raw.len(),
                raw: raw.to_string(),
            });
        }
        self.push_escaped_text(raw, text, &range)?;
        self.cursor = range.end;
        Ok(())
    }

    /// Equal-length text, split on internal newlines so that indentation on
    /// continuation lines stays markup and column accounting holds.
    fn push_plain_text(&mut self, text: &str) {
        let mut first = true;
        for line in text.split('\n') {
            if first {
                self.out.push_text(line);
                first = false;
                continue;
            }
            self.out.push_markup("\n", Some("\n"));
            let indent = line.len() - line.trim_start_matches(' ').len();
            if indent > 0 {
                self.out.push_markup(&line[..indent], None);
            }
            self.out.push_text(&line[indent..]);
        }
    }

    /// Rendered-shorter text: align `text` against `raw`, emitting literal
    /// runs as text, backslashes as one-byte markup, and entity references
    /// as markup interpreted as the character they decode to.
    fn push_escaped_text(
        &mut self,
        raw: &str,
        text: &str,
        range: &std::ops::Range<usize>,
    ) -> Result<(), AnnotateError> {
        let mismatch = || AnnotateError::EscapeMismatch {
            start: range.start,
            end: range.end,
            rendered: text.to_string(),
            raw: raw.to_string(),
        };

        let mut r = 0usize;
        let mut t = 0usize;
        let mut lit_start = 0usize;
        while let (Some(rc), Some(tc)) = (raw[r..].chars().next(), text[t..].chars().next()) {
            if rc == tc {
                r += rc.len_utf8();
                t += tc.len_utf8();
                continue;
            }
            self.out.push_text(&text[lit_start..t]);
            if rc == '\\' && raw[r + 1..].starts_with(tc) {
                self.out.push_markup("\\", None);
                self.out.push_text(&text[t..t + tc.len_utf8()]);
                r += 1 + tc.len_utf8();
                t += tc.len_utf8();
            } else if rc == '&' {
                let semi = raw[r..].find(';').ok_or_else(mismatch)?;
                self.out
                    .push_markup(&raw[r..r + semi + 1], Some(&text[t..t + tc.len_utf8()]));
                r += semi + 1;
                t += tc.len_utf8();
            } else {
                return Err(mismatch());
            }
            lit_start = t;
        }
        self.out.push_text(&text[lit_start..t]);
        // Rendered text left over after the span is exhausted means the
        // node rendered more than its span holds.
        if t < text.len() {
            return Err(mismatch());
        }
        // Trailing raw bytes with no rendered counterpart (e.g. a lone
        // backslash at end of line) stay markup.
        if r < raw.len() {
            self.out.push_markup(&raw[r..], None);
        }
        Ok(())
    }

    /// Emit the unconsumed source between the cursor and `until` as
    /// uninterpreted markup (delimiters, indentation, blockquote prefixes).
    fn emit_gap(&mut self, until: usize) {
        if until > self.cursor {
            self.out.push_markup(&self.source[self.cursor..until], None);
            self.cursor = until;
        }
    }

    /// Absorb `range` whole as one markup segment and skip its inner events.
    fn consume(&mut self, range: std::ops::Range<usize>, interpret_as: Option<&str>) {
        self.out
            .push_markup(&self.source[range.clone()], interpret_as);
        self.cursor = range.end;
        self.skip_until = Some(range.end);
    }

    /// Emit `range` as a single markup segment (no inner events expected).
    fn emit_markup(&mut self, range: std::ops::Range<usize>, interpret_as: Option<&str>) {
        self.out
            .push_markup(&self.source[range.clone()], interpret_as);
        self.cursor = range.end;
    }

    fn finish(mut self) -> Result<AnnotatedText, AnnotateError> {
        // Trailing trivia the parser never reported (final newlines,
        // trailing spaces) is absorbed as gap padding.
        self.emit_gap(self.source.len());

        let actual = self.out.source_len();
        if actual != self.source.len() {
            return Err(AnnotateError::LengthMismatch {
                expected: self.source.len(),
                actual,
            });
        }
        self.out.optimize();
        Ok(self.out)
    }
}
