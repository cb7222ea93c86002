//! Prismic rich text - plain text projection and HTML rendering
//!
//! Blocks are translated into `pulldown_cmark` events and written out with
//! its HTML writer, which takes care of escaping.

use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, HeadingLevel, LinkType, Tag, TagEnd};
use serde::{Deserialize, Serialize};

/// An ordered sequence of rich-text blocks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RichText(pub Vec<Block>);

/// One block (paragraph, heading, list item, ...)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub spans: Vec<Span>,
    /// Image source
    #[serde(default)]
    pub url: Option<String>,
    /// Image alternative text
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(default)]
    pub oembed: Option<serde_json::Value>,
}

/// Inline formatting over a character range of a block's text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Paragraph,
    Heading(HeadingLevel),
    Preformatted,
    ListItem,
    OrderedListItem,
    Image,
    Embed,
    Unknown,
}

impl Block {
    pub fn paragraph(text: &str) -> Self {
        Self {
            kind: "paragraph".to_string(),
            text: text.to_string(),
            ..Self::default()
        }
    }

    fn block_kind(&self) -> BlockKind {
        match self.kind.as_str() {
            "paragraph" => BlockKind::Paragraph,
            "heading1" => BlockKind::Heading(HeadingLevel::H1),
            "heading2" => BlockKind::Heading(HeadingLevel::H2),
            "heading3" => BlockKind::Heading(HeadingLevel::H3),
            "heading4" => BlockKind::Heading(HeadingLevel::H4),
            "heading5" => BlockKind::Heading(HeadingLevel::H5),
            "heading6" => BlockKind::Heading(HeadingLevel::H6),
            "preformatted" => BlockKind::Preformatted,
            "list-item" => BlockKind::ListItem,
            "o-list-item" => BlockKind::OrderedListItem,
            "image" => BlockKind::Image,
            "embed" => BlockKind::Embed,
            _ => BlockKind::Unknown,
        }
    }
}

impl RichText {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Text of every block, joined by a single space
    pub fn as_text(&self) -> String {
        self.0
            .iter()
            .filter(|b| !matches!(b.block_kind(), BlockKind::Image | BlockKind::Embed))
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Render to HTML
    pub fn as_html(&self) -> String {
        let mut events: Vec<Event<'static>> = Vec::new();
        let mut open_list: Option<bool> = None;

        for block in &self.0 {
            let kind = block.block_kind();

            // Consecutive list items share one list element
            let wants_list = match kind {
                BlockKind::ListItem => Some(false),
                BlockKind::OrderedListItem => Some(true),
                _ => None,
            };
            if open_list.is_some() && open_list != wants_list {
                if let Some(ordered) = open_list.take() {
                    events.push(Event::End(TagEnd::List(ordered)));
                }
            }
            if let Some(ordered) = wants_list {
                if open_list.is_none() {
                    events.push(Event::Start(Tag::List(ordered.then_some(1))));
                    open_list = Some(ordered);
                }
            }

            match kind {
                BlockKind::Paragraph => {
                    events.push(Event::Start(Tag::Paragraph));
                    push_inline(&mut events, block);
                    events.push(Event::End(TagEnd::Paragraph));
                }
                BlockKind::Heading(level) => {
                    events.push(Event::Start(Tag::Heading {
                        level,
                        id: None,
                        classes: Vec::new(),
                        attrs: Vec::new(),
                    }));
                    push_inline(&mut events, block);
                    events.push(Event::End(TagEnd::Heading(level)));
                }
                BlockKind::Preformatted => {
                    events.push(Event::Start(Tag::CodeBlock(CodeBlockKind::Indented)));
                    events.push(Event::Text(CowStr::from(format!("{}\n", block.text))));
                    events.push(Event::End(TagEnd::CodeBlock));
                }
                BlockKind::ListItem | BlockKind::OrderedListItem => {
                    events.push(Event::Start(Tag::Item));
                    push_inline(&mut events, block);
                    events.push(Event::End(TagEnd::Item));
                }
                BlockKind::Image => {
                    let Some(src) = block.url.clone() else {
                        continue;
                    };
                    events.push(Event::Start(Tag::Paragraph));
                    events.push(Event::Start(Tag::Image {
                        link_type: LinkType::Inline,
                        dest_url: CowStr::from(src),
                        title: CowStr::from(""),
                        id: CowStr::from(""),
                    }));
                    if let Some(alt) = block.alt.clone() {
                        events.push(Event::Text(CowStr::from(alt)));
                    }
                    events.push(Event::End(TagEnd::Image));
                    events.push(Event::End(TagEnd::Paragraph));
                }
                BlockKind::Embed => {
                    let embed = block
                        .oembed
                        .as_ref()
                        .and_then(|o| o.get("html"))
                        .and_then(|h| h.as_str());
                    if let Some(embed) = embed {
                        events.push(Event::Html(CowStr::from(format!(
                            "<div class=\"embed\">{}</div>\n",
                            embed
                        ))));
                    }
                }
                BlockKind::Unknown => {
                    tracing::debug!("Skipping rich text block of type {:?}", block.kind);
                }
            }
        }

        if let Some(ordered) = open_list {
            events.push(Event::End(TagEnd::List(ordered)));
        }

        let mut output = String::new();
        html::push_html(&mut output, events.into_iter());
        output
    }
}

/// Emit a block's text with its spans applied
///
/// Span offsets count characters. The text is cut at every span boundary
/// and each piece is wrapped in the spans covering it.
fn push_inline(events: &mut Vec<Event<'static>>, block: &Block) {
    let chars: Vec<char> = block.text.chars().collect();
    let len = chars.len();

    let spans: Vec<&Span> = block
        .spans
        .iter()
        .filter(|s| s.start < s.end && s.start < len)
        .collect();

    let mut cuts: Vec<usize> = vec![0, len];
    for span in &spans {
        cuts.push(span.start);
        cuts.push(span.end.min(len));
    }
    cuts.sort_unstable();
    cuts.dedup();

    for pair in cuts.windows(2) {
        let (from, to) = (pair[0], pair[1]);
        let mut active: Vec<&Span> = spans
            .iter()
            .copied()
            .filter(|s| s.start <= from && s.end >= to)
            .collect();
        active.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

        for span in &active {
            events.push(open_span(span));
        }
        let piece: String = chars[from..to].iter().collect();
        push_text(events, &piece);
        for span in active.iter().rev() {
            events.push(close_span(span));
        }
    }
}

/// Text with line breaks turned into `<br />`
fn push_text(events: &mut Vec<Event<'static>>, text: &str) {
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            events.push(Event::HardBreak);
        }
        if !line.is_empty() {
            events.push(Event::Text(CowStr::from(line.to_string())));
        }
    }
}

fn open_span(span: &Span) -> Event<'static> {
    match span.kind.as_str() {
        "strong" => Event::Start(Tag::Strong),
        "em" => Event::Start(Tag::Emphasis),
        "hyperlink" => {
            let url = span
                .data
                .as_ref()
                .and_then(|d| d.get("url"))
                .and_then(|u| u.as_str())
                .unwrap_or("#");
            Event::Start(Tag::Link {
                link_type: LinkType::Inline,
                dest_url: CowStr::from(url.to_string()),
                title: CowStr::from(""),
                id: CowStr::from(""),
            })
        }
        _ => Event::InlineHtml(CowStr::from(format!(
            "<span class=\"{}\">",
            label_class(span)
        ))),
    }
}

fn close_span(span: &Span) -> Event<'static> {
    match span.kind.as_str() {
        "strong" => Event::End(TagEnd::Strong),
        "em" => Event::End(TagEnd::Emphasis),
        "hyperlink" => Event::End(TagEnd::Link),
        _ => Event::InlineHtml(CowStr::from("</span>")),
    }
}

/// CSS class of a label span, restricted to safe characters
fn label_class(span: &Span) -> String {
    let label = span
        .data
        .as_ref()
        .and_then(|d| d.get("label"))
        .and_then(|l| l.as_str())
        .unwrap_or(&span.kind);
    label
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect()
}
