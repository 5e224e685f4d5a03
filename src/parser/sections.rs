use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::blocks::Element;

/// Sentence and bullet-like separators inside running text: period before
/// whitespace or end, newline, bullet glyphs, semicolon, colon, and a hyphen
/// or dash standing between spaces.
static SEGMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.(?:\s+|$)|\n|[•·▪●◦‣]|;|:|\s[-–—]\s").unwrap());

const BULLET_MARKS: [char; 4] = ['-', '–', '—', '*'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Heading,
    ListItem,
    SegmentedText,
    Keyword,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub raw_text: String,
    pub origin: Origin,
    pub associated_product: String,
}

impl Candidate {
    pub fn new(raw_text: impl Into<String>, origin: Origin, product: impl Into<String>) -> Self {
        Candidate {
            raw_text: raw_text.into(),
            origin,
            associated_product: product.into(),
        }
    }
}

/// Everything attributed to one heading (or to the fallback bucket when
/// `heading` is `None`).
#[derive(Debug, Clone)]
pub struct Section {
    pub product: String,
    pub heading: Option<Candidate>,
    pub features: Vec<Candidate>,
    /// Raw text blocks, kept whole for enrichment.
    pub texts: Vec<String>,
}

impl Section {
    fn new(product: String, heading: Option<Candidate>) -> Self {
        Section {
            product,
            heading,
            features: Vec::new(),
            texts: Vec::new(),
        }
    }

    /// Point the section and all its feature candidates at another product.
    pub fn retarget(&mut self, product: &str) {
        self.product = product.to_string();
        for c in &mut self.features {
            c.associated_product = product.to_string();
        }
    }
}

/// Group the element stream into one section per retained heading, in
/// document order. Lists and text blocks preceding every heading go to a
/// leading `fallback` section, which exists only if it has content.
pub fn cluster_sections(elements: &[Element], fallback: &str) -> Vec<Section> {
    let mut sections: Vec<Section> = Vec::new();
    // element index of a heading → its section
    let mut by_heading: Vec<Option<usize>> = vec![None; elements.len()];
    let mut fallback_idx: Option<usize> = None;

    for element in elements {
        match element {
            Element::Heading { level, text, order_index } => {
                debug!(level, order_index, heading = %text, "section");
                by_heading[*order_index] = Some(sections.len());
                sections.push(Section::new(
                    text.clone(),
                    Some(Candidate::new(text.clone(), Origin::Heading, text.clone())),
                ));
            }
            Element::List { items, heading } => {
                let section = section_for(*heading, &by_heading, &mut sections, &mut fallback_idx, fallback);
                let product = section.product.clone();
                section
                    .features
                    .extend(items.iter().map(|item| Candidate::new(item.clone(), Origin::ListItem, product.clone())));
            }
            Element::Text { text, heading } => {
                let section = section_for(*heading, &by_heading, &mut sections, &mut fallback_idx, fallback);
                let product = section.product.clone();
                section.features.extend(
                    segment_text(text)
                        .into_iter()
                        .map(|frag| Candidate::new(frag, Origin::SegmentedText, product.clone())),
                );
                section.texts.push(text.clone());
            }
        }
    }

    sections
}

fn section_for<'a>(
    heading: Option<usize>,
    by_heading: &[Option<usize>],
    sections: &'a mut Vec<Section>,
    fallback_idx: &mut Option<usize>,
    fallback: &str,
) -> &'a mut Section {
    let idx = match heading.and_then(|h| by_heading.get(h).copied().flatten()) {
        Some(idx) => idx,
        None => *fallback_idx.get_or_insert_with(|| {
            sections.push(Section::new(fallback.to_string(), None));
            sections.len() - 1
        }),
    };
    &mut sections[idx]
}

/// Split running text into independent fragments on sentence and bullet
/// delimiters. Fragments are trimmed, line-leading dash bullets removed;
/// empty ones are dropped.
pub fn segment_text(text: &str) -> Vec<String> {
    SEGMENT_RE
        .split(text)
        .map(|frag| {
            frag.trim()
                .trim_start_matches(BULLET_MARKS)
                .trim()
                .trim_end_matches(['!', '?', ','])
                .trim()
        })
        .filter(|frag| !frag.is_empty())
        .map(str::to_string)
        .collect()
}
