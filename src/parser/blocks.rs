use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

static STRUCTURE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1, h2, h3, ul, ol, p, blockquote, dd").unwrap());
static INLINE_WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\S\n]+").unwrap());
static LINE_BREAK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*\n\s*").unwrap());

const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template"];
const LIST_TAGS: &[&str] = &["ul", "ol"];
const TEXT_CONTAINERS: &[&str] = &["li", "p", "blockquote", "dd"];

/// One structural element of a document, in document order.
///
/// `heading` on lists and text blocks is the index of the nearest preceding
/// `Element::Heading` in the same sequence, if there is one.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Heading {
        level: u8,
        text: String,
        /// Position of this heading in the element sequence.
        order_index: usize,
    },
    List {
        items: Vec<String>,
        heading: Option<usize>,
    },
    Text {
        text: String,
        heading: Option<usize>,
    },
}

/// Parse raw markup into headings (h1–h3), list blocks and paragraph-like
/// blocks. Content that does not look like HTML yields an empty sequence.
pub fn parse_elements(markup: &str) -> Vec<Element> {
    if !looks_like_markup(markup) {
        debug!(len = markup.len(), "content is not HTML, no structure extracted");
        return Vec::new();
    }

    let document = Html::parse_document(markup);
    let mut elements = Vec::new();

    for el in document.select(&STRUCTURE_SEL) {
        let name = el.value().name();
        match name {
            "h1" | "h2" | "h3" => {
                let text = collapse_inline(&own_text(el, &[]));
                if text.is_empty() {
                    continue;
                }
                let order_index = elements.len();
                elements.push(Element::Heading {
                    level: name.as_bytes()[1] - b'0',
                    text,
                    order_index,
                });
            }
            "ul" | "ol" => {
                let items: Vec<String> = el
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|child| child.value().name() == "li")
                    .map(|li| collapse_inline(&own_text(li, LIST_TAGS)))
                    .filter(|t| !t.is_empty())
                    .collect();
                if items.is_empty() {
                    continue;
                }
                let heading = preceding_heading(&elements);
                elements.push(Element::List { items, heading });
            }
            _ => {
                // Paragraphs nested in list items or other blocks are already
                // covered by their container.
                if has_ancestor(el, TEXT_CONTAINERS) {
                    continue;
                }
                let text = normalize_block(&own_text(el, LIST_TAGS));
                if text.is_empty() {
                    continue;
                }
                let heading = preceding_heading(&elements);
                elements.push(Element::Text { text, heading });
            }
        }
    }

    elements
}

fn looks_like_markup(markup: &str) -> bool {
    markup.contains('<') && !markup.contains('\0')
}

/// Scan backward to the nearest heading already emitted.
fn preceding_heading(elements: &[Element]) -> Option<usize> {
    elements
        .iter()
        .rposition(|e| matches!(e, Element::Heading { .. }))
}

fn has_ancestor(el: ElementRef, names: &[&str]) -> bool {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|a| names.contains(&a.value().name()))
}

/// Text of `el` with a space between text nodes, `<br>` as a newline, and
/// the subtrees named in `skip` left out.
fn own_text(el: ElementRef, skip: &[&str]) -> String {
    let mut out = String::new();
    push_text(el, skip, &mut out);
    out
}

fn push_text(el: ElementRef, skip: &[&str], out: &mut String) {
    for child in el.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
            out.push(' ');
        } else if let Some(child_el) = ElementRef::wrap(child) {
            let name = child_el.value().name();
            if name == "br" {
                out.push('\n');
            } else if !skip.contains(&name) && !SKIPPED_TAGS.contains(&name) {
                push_text(child_el, skip, out);
            }
        }
    }
}

/// Single-line form: every whitespace run becomes one space.
pub fn collapse_inline(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Multi-line form: spaces collapsed within lines, line breaks kept.
fn normalize_block(s: &str) -> String {
    let spaced = INLINE_WS_RE.replace_all(s.trim(), " ");
    LINE_BREAK_RE.replace_all(&spaced, "\n").trim().to_string()
}
