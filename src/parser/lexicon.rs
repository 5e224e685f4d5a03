//! Word lists and the rule-based part-of-speech tagger used by the
//! "nounish" filter rule and by the keyword extractor.

use std::sync::LazyLock;

use regex::Regex;

static TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{L}\p{N}]+(?:-[\p{L}\p{N}]+)*").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    French,
    English,
}

/// Accented Latin letters select French, anything else English.
pub fn detect_language(text: &str) -> Language {
    const ACCENTED: &str = "àâäçéèêëîïôöùûüÿœæÀÂÄÇÉÈÊËÎÏÔÖÙÛÜŸŒÆ";
    if text.chars().any(|c| ACCENTED.contains(c)) {
        Language::French
    } else {
        Language::English
    }
}

/// Word tokens in order; apostrophes split elisions (`l'offre` → `l`, `offre`).
pub fn tokenize(text: &str) -> Vec<&str> {
    TOKEN_RE.find_iter(text).map(|m| m.as_str()).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Noun,
    ProperNoun,
    Adjective,
    Verb,
    Adverb,
    Determiner,
    Pronoun,
    Adposition,
    Conjunction,
    Number,
}

impl Role {
    pub fn is_nounish(self) -> bool {
        matches!(self, Role::Noun | Role::ProperNoun | Role::Adjective)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedToken {
    pub text: String,
    pub role: Role,
    pub stop_word: bool,
}

/// Grammatical tagging capability. `None` means no model is loaded for
/// `lang`, in which case callers skip whatever rule depends on it.
pub trait LinguisticFilter: Send + Sync {
    fn tag(&self, text: &str, lang: Language) -> Option<Vec<TaggedToken>>;
}

/// Selected when linguistic filtering is switched off.
pub struct NoLinguistics;

impl LinguisticFilter for NoLinguistics {
    fn tag(&self, _text: &str, _lang: Language) -> Option<Vec<TaggedToken>> {
        None
    }
}

const FR_DETERMINERS: &[&str] = &[
    "le", "la", "les", "l", "un", "une", "des", "du", "de", "d", "au", "aux", "ce", "cet",
    "cette", "ces", "mon", "ma", "mes", "ton", "ta", "tes", "son", "sa", "ses", "notre", "nos",
    "votre", "vos", "leur", "leurs", "chaque", "tout", "toute", "tous", "toutes", "quelques",
    "plusieurs", "aucun", "aucune",
];
const FR_PRONOUNS: &[&str] = &[
    "je", "j", "tu", "il", "elle", "on", "nous", "vous", "ils", "elles", "me", "m", "te", "t",
    "se", "s", "lui", "y", "en", "qui", "que", "qu", "quoi", "dont", "où", "ceci", "cela", "ça",
    "celui", "celle", "ceux", "celles",
];
const FR_ADPOSITIONS: &[&str] = &[
    "à", "dans", "par", "pour", "sur", "sous", "avec", "sans", "chez", "vers", "entre", "contre",
    "depuis", "pendant", "selon", "avant", "après", "jusqu",
];
const FR_CONJUNCTIONS: &[&str] = &[
    "et", "ou", "mais", "donc", "or", "ni", "car", "si", "comme", "lorsque", "quand", "puis",
];
const FR_VERBS: &[&str] = &[
    "est", "sont", "était", "être", "a", "ont", "avait", "avoir", "fait", "faire", "peut",
    "peuvent", "permet", "permettent", "voir", "lire", "savoir", "découvrir", "cliquez",
    "télécharger", "essayer", "acheter", "contacter", "va", "sera", "seront",
];
const FR_ADVERBS: &[&str] = &[
    "ne", "n", "pas", "plus", "moins", "très", "trop", "bien", "aussi", "encore", "déjà",
    "toujours", "jamais", "ici", "là", "maintenant", "ensuite", "enfin", "ainsi",
];

const EN_DETERMINERS: &[&str] = &[
    "the", "a", "an", "this", "that", "these", "those", "my", "your", "his", "her", "its", "our",
    "their", "each", "every", "some", "any", "no", "all", "both", "few", "many", "much", "most",
    "several",
];
const EN_PRONOUNS: &[&str] = &[
    "i", "you", "he", "she", "it", "we", "they", "me", "him", "us", "them", "who", "whom",
    "which", "what", "whose", "there", "here",
];
const EN_ADPOSITIONS: &[&str] = &[
    "of", "in", "on", "at", "by", "for", "with", "without", "from", "to", "into", "onto", "over",
    "under", "about", "across", "through", "between", "via", "per", "up", "down", "out",
];
const EN_CONJUNCTIONS: &[&str] =
    &["and", "or", "but", "nor", "so", "yet", "if", "than", "as", "because", "while", "when"];
const EN_VERBS: &[&str] = &[
    "is", "are", "was", "were", "be", "been", "being", "has", "have", "had", "do", "does", "did",
    "can", "could", "will", "would", "should", "may", "might", "must", "read", "click", "learn",
    "see", "get", "go", "view", "download", "sign", "log", "try", "buy", "contact", "watch",
    "discover", "let", "lets", "make", "makes",
];
const EN_ADVERBS: &[&str] = &[
    "not", "more", "less", "very", "too", "also", "just", "now", "then", "again", "still",
    "already", "always", "never", "even", "only",
];

fn closed_class(word: &str, lang: Language) -> Option<Role> {
    let tables: [(&[&str], Role); 6] = match lang {
        Language::French => [
            (FR_DETERMINERS, Role::Determiner),
            (FR_PRONOUNS, Role::Pronoun),
            (FR_ADPOSITIONS, Role::Adposition),
            (FR_CONJUNCTIONS, Role::Conjunction),
            (FR_VERBS, Role::Verb),
            (FR_ADVERBS, Role::Adverb),
        ],
        Language::English => [
            (EN_DETERMINERS, Role::Determiner),
            (EN_PRONOUNS, Role::Pronoun),
            (EN_ADPOSITIONS, Role::Adposition),
            (EN_CONJUNCTIONS, Role::Conjunction),
            (EN_VERBS, Role::Verb),
            (EN_ADVERBS, Role::Adverb),
        ],
    };
    tables
        .iter()
        .find(|(words, _)| words.contains(&word))
        .map(|(_, role)| *role)
}

/// Closed-class words of `lang` are its stop-words.
pub fn is_stop_word(word: &str, lang: Language) -> bool {
    closed_class(&word.to_lowercase(), lang).is_some()
}

/// Suffix-based guess for open-class words.
fn open_class(word: &str, lang: Language) -> Role {
    let len = word.chars().count();
    let ends = |suffixes: &[&str]| suffixes.iter().any(|s| word.ends_with(s));
    match lang {
        Language::English => {
            if len > 4 && word.ends_with("ly") {
                Role::Adverb
            } else if len > 4 && word.ends_with("ed") {
                Role::Verb
            } else if len > 4 && ends(&["able", "ible", "ous", "ful", "ive", "less", "al", "ic"]) {
                Role::Adjective
            } else {
                Role::Noun
            }
        }
        Language::French => {
            if len > 6 && ends(&["amment", "emment"]) {
                Role::Adverb
            } else if len > 3 && ends(&["ez", "ons"]) {
                Role::Verb
            } else if len > 4 && ends(&["er", "ir"]) && !word.ends_with("ier") {
                Role::Verb
            } else if len > 4
                && ends(&["eux", "euse", "ique", "able", "ible", "if", "ive", "elle", "al", "ale"])
            {
                Role::Adjective
            } else {
                Role::Noun
            }
        }
    }
}

/// Rule-based tagger backed by the closed-class tables above.
pub struct LexiconTagger {
    languages: Vec<Language>,
}

impl LexiconTagger {
    pub fn new() -> Self {
        LexiconTagger {
            languages: vec![Language::French, Language::English],
        }
    }

    #[cfg(test)]
    pub fn with_languages(languages: Vec<Language>) -> Self {
        LexiconTagger { languages }
    }

    fn tag_token(&self, token: &str, index: usize, lang: Language) -> TaggedToken {
        let lower = token.to_lowercase();
        let (role, stop_word) = if token.chars().all(|c| c.is_numeric()) {
            (Role::Number, false)
        } else if let Some(role) = closed_class(&lower, lang) {
            (role, true)
        } else if is_proper(token, index) {
            (Role::ProperNoun, false)
        } else {
            (open_class(&lower, lang), false)
        };
        TaggedToken {
            text: token.to_string(),
            role,
            stop_word,
        }
    }
}

impl Default for LexiconTagger {
    fn default() -> Self {
        Self::new()
    }
}

fn is_proper(token: &str, index: usize) -> bool {
    let mut chars = token.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    let acronym = token.chars().count() > 1 && token.chars().all(|c| !c.is_lowercase());
    (index > 0 && first.is_uppercase()) || acronym
}

impl LinguisticFilter for LexiconTagger {
    fn tag(&self, text: &str, lang: Language) -> Option<Vec<TaggedToken>> {
        if !self.languages.contains(&lang) {
            return None;
        }
        Some(
            tokenize(text)
                .into_iter()
                .enumerate()
                .map(|(i, t)| self.tag_token(t, i, lang))
                .collect(),
        )
    }
}
