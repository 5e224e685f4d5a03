use std::sync::Arc;

use itertools::Itertools;
use tracing::trace;

use crate::aggregate::FeatureList;
use crate::config::WordLimits;

use super::lexicon::{detect_language, LinguisticFilter};
use super::sections::{Candidate, Origin};

const MIN_WORDS: usize = 1;

const MONTHS: &[&str] = &[
    "janvier", "février", "fevrier", "mars", "avril", "mai", "juin", "juillet", "août", "aout",
    "septembre", "octobre", "novembre", "décembre", "decembre", "january", "february", "march",
    "april", "may", "june", "july", "august", "september", "october", "november", "december",
];

const BOILERPLATE: &[&str] = &[
    "lancement", "annonce", "annonces", "mise à jour", "mises à jour", "nouveauté", "nouveautés",
    "actualité", "actualités", "communiqué", "communiqué de presse", "en savoir plus", "lire la suite",
    "launch", "launches", "announcement", "announcements", "update", "updates", "news", "release",
    "releases", "press release", "read more", "learn more", "blog",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Empty,
    TooLong,
    TooShort,
    SelfReference,
    Stoplisted,
    NotNounish,
    Duplicate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterVerdict {
    Accepted,
    Rejected(RejectReason),
}

impl FilterVerdict {
    pub fn is_accepted(self) -> bool {
        matches!(self, FilterVerdict::Accepted)
    }
}

/// Ordered heuristic acceptance chain; the first failing rule wins.
pub struct CandidateFilter {
    limits: WordLimits,
    linguistics: Arc<dyn LinguisticFilter>,
}

impl CandidateFilter {
    pub fn new(limits: WordLimits, linguistics: Arc<dyn LinguisticFilter>) -> Self {
        CandidateFilter { limits, linguistics }
    }

    /// Verdict for a feature candidate against the features its product
    /// already holds.
    pub fn check(&self, candidate: &Candidate, entity: &str, existing: &FeatureList) -> FilterVerdict {
        let text = candidate.raw_text.trim();
        if let Some(reason) = self.shape(text, candidate.origin) {
            return FilterVerdict::Rejected(reason);
        }
        if mentions(text, entity) || mentions(text, &candidate.associated_product) {
            return FilterVerdict::Rejected(RejectReason::SelfReference);
        }
        if is_stoplisted(text) {
            return FilterVerdict::Rejected(RejectReason::Stoplisted);
        }
        if !self.is_nounish(text) {
            return FilterVerdict::Rejected(RejectReason::NotNounish);
        }
        if existing.contains(text) {
            return FilterVerdict::Rejected(RejectReason::Duplicate);
        }
        FilterVerdict::Accepted
    }

    /// Verdict for a heading as a product name: emptiness, length, entity
    /// mention and stoplists only.
    pub fn check_heading(&self, text: &str, entity: &str) -> FilterVerdict {
        let text = text.trim();
        if let Some(reason) = self.shape(text, Origin::Heading) {
            return FilterVerdict::Rejected(reason);
        }
        if mentions(text, entity) {
            return FilterVerdict::Rejected(RejectReason::SelfReference);
        }
        if is_stoplisted(text) {
            return FilterVerdict::Rejected(RejectReason::Stoplisted);
        }
        FilterVerdict::Accepted
    }

    fn shape(&self, text: &str, origin: Origin) -> Option<RejectReason> {
        if text.is_empty() {
            return Some(RejectReason::Empty);
        }
        let words = text.split_whitespace().count();
        if words > self.word_limit(origin) {
            Some(RejectReason::TooLong)
        } else if words < MIN_WORDS {
            Some(RejectReason::TooShort)
        } else {
            None
        }
    }

    fn word_limit(&self, origin: Origin) -> usize {
        match origin {
            Origin::Heading => self.limits.heading,
            Origin::ListItem => self.limits.list_item,
            Origin::SegmentedText => self.limits.segmented_text,
            Origin::Keyword => self.limits.keyword,
        }
    }

    /// Fails open when no model covers the detected language.
    fn is_nounish(&self, text: &str) -> bool {
        match self.linguistics.tag(text, detect_language(text)) {
            Some(tokens) => {
                let nounish = tokens.iter().any(|t| t.role.is_nounish() && !t.stop_word);
                if !nounish {
                    trace!(tokens = %tokens.iter().map(|t| format!("{}/{:?}", t.text, t.role)).join(" "), "no noun");
                }
                nounish
            }
            None => true,
        }
    }
}

fn mentions(text: &str, needle: &str) -> bool {
    let needle = needle.trim();
    !needle.is_empty() && text.to_lowercase().contains(&needle.to_lowercase())
}

fn is_stoplisted(text: &str) -> bool {
    let lower = text.to_lowercase();
    MONTHS.contains(&lower.as_str()) || BOILERPLATE.contains(&lower.as_str())
}
