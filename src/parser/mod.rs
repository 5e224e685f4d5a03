pub mod blocks;
pub mod enrich;
pub mod filter;
pub mod lexicon;
pub mod sections;

use std::sync::Arc;

use tracing::{debug, warn};

use crate::aggregate::{FeatureList, ProductMap};
use crate::config::Settings;
use crate::fetch::Document;
use enrich::TextEnricher;
use filter::{CandidateFilter, FilterVerdict};
use lexicon::LinguisticFilter;
use sections::{Candidate, Origin, Section};

/// Four-pass pipeline for one document: markup → elements → sections →
/// filtered features (+ optional enrichment).
pub struct Extractor {
    settings: Settings,
    filter: CandidateFilter,
    enricher: Arc<dyn TextEnricher>,
}

impl Extractor {
    pub fn new(
        settings: Settings,
        linguistics: Arc<dyn LinguisticFilter>,
        enricher: Arc<dyn TextEnricher>,
    ) -> Self {
        let filter = CandidateFilter::new(settings.word_limits.clone(), linguistics);
        Extractor {
            settings,
            filter,
            enricher,
        }
    }

    /// Product → features for one fetched document. Documents that are not
    /// a successful HTML response contribute nothing.
    pub fn extract_document(&self, doc: &Document, entity: &str, advanced: bool) -> ProductMap {
        if let Err(e) = doc.ensure_html() {
            warn!("Skipping document: {}", e);
            return ProductMap::new();
        }
        let map = self.extract_markup(&doc.raw_markup, entity, advanced);
        debug!(
            url = %doc.source_url,
            products = map.len(),
            features = map.feature_count(),
            "extracted"
        );
        map
    }

    pub fn extract_markup(&self, markup: &str, entity: &str, advanced: bool) -> ProductMap {
        let fallback = self.settings.fallback_bucket.as_str();
        let elements = blocks::parse_elements(markup);
        let mut sections = sections::cluster_sections(&elements, fallback);

        let mut map = ProductMap::new();
        // product → text blocks, in first-seen product order
        let mut texts: Vec<(String, Vec<String>)> = Vec::new();

        for section in &mut sections {
            self.resolve_product(section, entity);
            let entry = map.entry(&section.product);
            for candidate in &section.features {
                self.accept(candidate, entity, &mut entry.features);
            }
            if !section.texts.is_empty() {
                match texts.iter_mut().find(|(p, _)| *p == section.product) {
                    Some((_, buf)) => buf.extend(section.texts.iter().cloned()),
                    None => texts.push((section.product.clone(), section.texts.clone())),
                }
            }
        }

        if advanced && self.enricher.is_available() {
            for (product, buffer) in &texts {
                self.enrich(product, buffer, entity, &mut map);
            }
        }

        // The fallback bucket is only worth showing when something landed in it.
        map.retain(|e| e.name != fallback || !e.features.is_empty());
        map
    }

    /// Decide which product a section's features belong to. A heading that
    /// fails the heading rules hands its section to the fallback bucket.
    fn resolve_product(&self, section: &mut Section, entity: &str) {
        let Some(heading) = &section.heading else {
            return;
        };
        if !self.settings.filter_headings {
            return;
        }
        let verdict = self.filter.check_heading(&heading.raw_text, entity);
        if let FilterVerdict::Rejected(reason) = verdict {
            debug!(heading = %heading.raw_text, ?reason, "heading rejected as product");
            let fallback = self.settings.fallback_bucket.clone();
            section.retarget(&fallback);
        }
    }

    fn accept(&self, candidate: &Candidate, entity: &str, features: &mut FeatureList) -> bool {
        let verdict = self.filter.check(candidate, entity, features);
        if verdict.is_accepted() {
            return features.insert(candidate.raw_text.trim().to_string());
        }
        debug!(text = %candidate.raw_text, ?verdict, origin = ?candidate.origin, "candidate rejected");
        false
    }

    fn enrich(&self, product: &str, buffer: &[String], entity: &str, map: &mut ProductMap) {
        let keywords = match enrich::enrich_product(
            self.enricher.as_ref(),
            buffer,
            self.settings.enrich_max_chars,
            self.settings.summary_sentences,
            self.settings.keyword_count,
        ) {
            Ok(k) => k,
            Err(e) => {
                debug!(product, "no enrichment: {}", e);
                return;
            }
        };
        let entry = map.entry(product);
        for keyword in keywords {
            let candidate = Candidate::new(keyword, Origin::Keyword, product);
            self.accept(&candidate, entity, &mut entry.features);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EnrichError;
    use enrich::{FrequencyEnricher, NoEnricher};
    use lexicon::{Language, LexiconTagger, NoLinguistics};

    fn extractor() -> Extractor {
        Extractor::new(Settings::default(), Arc::new(LexiconTagger::new()), Arc::new(FrequencyEnricher))
    }

    fn features(map: &ProductMap, product: &str) -> Vec<String> {
        map.get(product)
            .map(|e| e.features.as_slice().to_vec())
            .unwrap_or_default()
    }

    #[test]
    fn duplicate_list_items_collapse() {
        let html = "<h2>Produit X</h2><ul><li>Fonction A</li><li>Fonction B</li><li>Fonction A</li></ul>";
        let map = extractor().extract_markup(html, "Acme", false);
        assert_eq!(map.len(), 1);
        assert_eq!(features(&map, "Produit X"), vec!["Fonction A", "Fonction B"]);
    }

    #[test]
    fn list_without_heading_goes_to_fallback_bucket() {
        let html = "<ul><li>Export PDF</li><li>Signature électronique</li></ul>";
        let map = extractor().extract_markup(html, "Acme", false);
        assert_eq!(
            features(&map, "Fonctionnalités diverses"),
            vec!["Export PDF", "Signature électronique"]
        );
    }

    #[test]
    fn configured_fallback_name_is_used() {
        let settings = Settings {
            fallback_bucket: "Misc".into(),
            ..Settings::default()
        };
        let ex = Extractor::new(settings, Arc::new(NoLinguistics), Arc::new(NoEnricher));
        let map = ex.extract_markup("<ol><li>Export</li></ol>", "Acme", false);
        assert_eq!(features(&map, "Misc"), vec!["Export"]);
    }

    #[test]
    fn features_keep_generation_order() {
        let html = "<h2>Produit Z</h2><ul><li>Zèbre</li><li>Alpha</li></ul><p>Moyen terme. Beta</p>";
        let map = extractor().extract_markup(html, "Acme", false);
        assert_eq!(features(&map, "Produit Z"), vec!["Zèbre", "Alpha", "Moyen terme", "Beta"]);
    }

    #[test]
    fn dash_bullets_in_text_dedup_against_list_items() {
        let html = "<h2>Coffre</h2><ul><li>Synchronisation</li></ul>\
            <p>Fonctions :<br>- Synchronisation<br>- Partage</p>";
        let map = extractor().extract_markup(html, "Acme", false);
        assert_eq!(features(&map, "Coffre"), vec!["Synchronisation", "Fonctions", "Partage"]);
    }

    #[test]
    fn heading_over_word_limit_hands_features_to_fallback() {
        let heading = "Un titre beaucoup trop long pour être un vrai nom de produit";
        assert_eq!(heading.split_whitespace().count(), 12);
        let html = format!("<h2>{}</h2><ul><li>Export</li><li>Import</li></ul>", heading);
        let map = extractor().extract_markup(&html, "Acme", false);
        assert!(map.get(heading).is_none());
        assert_eq!(map.len(), 1);
        assert_eq!(features(&map, "Fonctionnalités diverses"), vec!["Export", "Import"]);
    }

    #[test]
    fn heading_without_features_is_kept() {
        let map = extractor().extract_markup("<h2>Produit Vide</h2>", "Acme", false);
        assert!(map.get("Produit Vide").is_some_and(|e| e.features.is_empty()));
    }

    #[test]
    fn entity_heading_hands_features_to_fallback() {
        let html = "<h1>Acme en bref</h1><ul><li>Support client</li></ul>";
        let map = extractor().extract_markup(html, "Acme", false);
        assert!(map.get("Acme en bref").is_none());
        assert_eq!(features(&map, "Fonctionnalités diverses"), vec!["Support client"]);
    }

    #[test]
    fn heading_filtering_can_be_disabled() {
        let settings = Settings {
            filter_headings: false,
            ..Settings::default()
        };
        let ex = Extractor::new(settings, Arc::new(NoLinguistics), Arc::new(NoEnricher));
        let map = ex.extract_markup("<h1>Acme en bref</h1><ul><li>Support client</li></ul>", "Acme", false);
        assert_eq!(features(&map, "Acme en bref"), vec!["Support client"]);
    }

    #[test]
    fn empty_fallback_bucket_is_dropped() {
        let html = "<p>Janvier</p><h2>Produit Z</h2><ul><li>Export</li></ul>";
        let map = extractor().extract_markup(html, "Acme", false);
        assert!(map.get("Fonctionnalités diverses").is_none());
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn self_references_are_filtered() {
        let html = "<h2>Acme Cloud</h2><ul><li>Acme Cloud is great</li><li>Backups</li></ul>";
        let map = extractor().extract_markup(html, "Globex", false);
        assert_eq!(features(&map, "Acme Cloud"), vec!["Backups"]);
    }

    #[test]
    fn non_html_document_yields_empty_map() {
        let doc = Document {
            content_type: Some("application/json".into()),
            ..Document::local("https://x.example/api", "<h2>P</h2><ul><li>A</li></ul>")
        };
        assert!(extractor().extract_document(&doc, "Acme", false).is_empty());

        let doc = Document {
            status: 500,
            ..Document::local("https://x.example/", "<h2>P</h2><ul><li>A</li></ul>")
        };
        assert!(extractor().extract_document(&doc, "Acme", false).is_empty());
    }

    #[test]
    fn advanced_mode_adds_filtered_keywords() {
        let html = "<h2>Coffre</h2>\
            <p>Le stockage chiffré protège vos fichiers. Le stockage est synchronisé sur vos appareils. \
            Le partage de fichiers chiffré reste simple pour Acme.</p>";
        let ex = extractor();
        let plain = features(&ex.extract_markup(html, "Acme", false), "Coffre");
        let enriched = features(&ex.extract_markup(html, "Acme", true), "Coffre");
        assert!(enriched.len() > plain.len());
        assert_eq!(&enriched[..plain.len()], plain.as_slice());
        assert!(enriched.contains(&"stockage".to_string()));
        assert!(!enriched.iter().any(|f| f.eq_ignore_ascii_case("acme")));
    }

    struct Exploding;

    impl TextEnricher for Exploding {
        fn summarize(&self, _: &str, _: Language, _: usize) -> Result<String, EnrichError> {
            Err(EnrichError::NoSentences)
        }

        fn keywords(&self, _: &str, _: Language, _: usize) -> Result<Vec<String>, EnrichError> {
            Err(EnrichError::NoSentences)
        }
    }

    #[test]
    fn enrichment_failure_keeps_structural_features() {
        let html = "<h2>Produit Z</h2><ul><li>Export</li></ul><p>Texte libre ici.</p><h2>Produit Q</h2><ul><li>Import</li></ul>";
        let ex = Extractor::new(Settings::default(), Arc::new(LexiconTagger::new()), Arc::new(Exploding));
        let map = ex.extract_markup(html, "Acme", true);
        assert_eq!(features(&map, "Produit Z"), vec!["Export", "Texte libre ici"]);
        assert_eq!(features(&map, "Produit Q"), vec!["Import"]);
    }

    #[test]
    fn product_page_fixture() {
        let html = std::fs::read_to_string("tests/fixtures/product_page.html").unwrap();
        let map = extractor().extract_markup(&html, "Nimbus", false);
        let names: Vec<_> = map.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Fonctionnalités diverses", "Coffre", "Messagerie", "Tarifs"]);
        assert_eq!(
            features(&map, "Coffre"),
            vec!["Stockage illimité", "Partage de dossiers", "Historique des versions", "Accès hors ligne"]
        );
    }
}
