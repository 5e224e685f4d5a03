use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::aggregate::{AggregateMap, ProductMap};
use crate::config::Settings;
use crate::error::RunError;
use crate::fetch::{Document, Fetcher};
use crate::parser::Extractor;
use crate::search::{compose_query, SearchBackend};
use crate::tree::{self, MindMapTree};

const PROGRESS_TEMPLATE: &str = "[{elapsed_precise}] {bar:40} {pos}/{len} {wide_msg}";

/// What the caller asks for: one entity, one year.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub entity: String,
    pub year: String,
    pub max_documents: usize,
    pub advanced: bool,
}

/// Document stats returned after a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DocumentStats {
    pub total: usize,
    pub ok: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub entity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    pub generated_at: DateTime<Utc>,
    pub documents: DocumentStats,
    pub products: usize,
    pub features: usize,
    pub tree: MindMapTree,
}

impl RunReport {
    pub fn new(
        entity: &str,
        year: Option<&str>,
        query: Option<String>,
        documents: DocumentStats,
        map: &AggregateMap,
        label_max_chars: usize,
    ) -> Self {
        RunReport {
            entity: entity.to_string(),
            year: year.map(str::to_string),
            query,
            generated_at: Utc::now(),
            documents,
            products: map.len(),
            features: map.feature_count(),
            tree: tree::build(entity, map, label_max_chars),
        }
    }

    /// No product at all: a valid outcome, reported as "nothing found".
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }
}

/// Search → fetch → extract → merge → tree, one document at a time.
pub struct Pipeline {
    settings: Settings,
    search: Option<Box<dyn SearchBackend>>,
    fetcher: Box<dyn Fetcher>,
    extractor: Extractor,
}

impl Pipeline {
    pub fn new(
        settings: Settings,
        search: Option<Box<dyn SearchBackend>>,
        fetcher: Box<dyn Fetcher>,
        extractor: Extractor,
    ) -> Self {
        Pipeline {
            settings,
            search,
            fetcher,
            extractor,
        }
    }

    pub async fn run(&self, request: &RunRequest) -> Result<RunReport, RunError> {
        let entity = request.entity.trim();
        let year = request.year.trim();
        if entity.is_empty() || year.is_empty() {
            return Err(RunError::Config("entity and year are both required".into()));
        }
        if request.max_documents == 0 {
            return Err(RunError::Config("at least one document is required".into()));
        }
        let search = self.search.as_ref().ok_or(RunError::NoSearchBackend)?;

        let query = compose_query(entity, year, self.settings.query_language);
        let urls = search.search(&query, request.max_documents).await?;
        if urls.is_empty() {
            info!("No results for \"{}\"", query);
        }

        let mut map = AggregateMap::new();
        let mut stats = DocumentStats {
            total: urls.len(),
            ..DocumentStats::default()
        };

        let pb = progress_bar(urls.len());
        for url in &urls {
            pb.set_message(url.clone());
            match self.fetch_html(url).await {
                Some(doc) => {
                    let incoming = self.extractor.extract_markup(&doc.raw_markup, entity, request.advanced);
                    let added = map.merge(incoming);
                    debug!(url = %url, added, "merged");
                    stats.ok += 1;
                }
                None => stats.failed += 1,
            }
            pb.inc(1);
        }
        pb.finish_and_clear();

        info!(
            "Processed {} documents ({} ok, {} failed): {} products, {} features",
            stats.total,
            stats.ok,
            stats.failed,
            map.len(),
            map.feature_count()
        );

        Ok(RunReport::new(
            entity,
            Some(year),
            Some(query),
            stats,
            &map,
            self.settings.label_max_chars,
        ))
    }

    /// `None` means the document is skipped; the reason has been logged.
    async fn fetch_html(&self, url: &str) -> Option<Document> {
        let doc = match self.fetcher.fetch(url).await {
            Ok(doc) => doc,
            Err(e) => {
                warn!("Skipping document: {}", e);
                return None;
            }
        };
        if let Err(e) = doc.ensure_html() {
            warn!("Skipping document: {}", e);
            return None;
        }
        Some(doc)
    }
}

/// Extract local documents (in parallel when the `rayon` feature is on)
/// and merge them sequentially in input order.
pub fn aggregate_documents(
    extractor: &Extractor,
    docs: &[Document],
    entity: &str,
    advanced: bool,
) -> (AggregateMap, DocumentStats) {
    #[cfg(feature = "rayon")]
    let maps: Vec<ProductMap> = {
        use rayon::prelude::*;
        docs.par_iter()
            .map(|doc| extractor.extract_document(doc, entity, advanced))
            .collect()
    };
    #[cfg(not(feature = "rayon"))]
    let maps: Vec<ProductMap> = docs
        .iter()
        .map(|doc| extractor.extract_document(doc, entity, advanced))
        .collect();

    let mut map = AggregateMap::new();
    let mut stats = DocumentStats {
        total: docs.len(),
        ..DocumentStats::default()
    };
    for (doc, incoming) in docs.iter().zip(maps) {
        if doc.ensure_html().is_ok() {
            stats.ok += 1;
        } else {
            stats.failed += 1;
        }
        map.merge(incoming);
    }
    (map, stats)
}

fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    let style = ProgressStyle::with_template(PROGRESS_TEMPLATE)
        .map(|s| s.progress_chars("=> "))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::error::FetchError;
    use crate::parser::enrich::FrequencyEnricher;
    use crate::parser::lexicon::LexiconTagger;
    use crate::search::StaticUrls;

    /// URL → HTML; any other URL fails like an unreachable host.
    struct FakeWeb(HashMap<&'static str, Document>);

    impl FakeWeb {
        fn new(pages: &[(&'static str, &'static str)]) -> Self {
            FakeWeb(
                pages
                    .iter()
                    .map(|(url, html)| (*url, Document::local(*url, *html)))
                    .collect(),
            )
        }

        fn with(mut self, url: &'static str, doc: Document) -> Self {
            self.0.insert(url, doc);
            self
        }
    }

    #[async_trait]
    impl Fetcher for FakeWeb {
        async fn fetch(&self, url: &str) -> Result<Document, FetchError> {
            self.0.get(url).cloned().ok_or_else(|| FetchError::Transport {
                url: url.to_string(),
                message: "connection refused".into(),
            })
        }
    }

    struct DownSearch;

    #[async_trait]
    impl SearchBackend for DownSearch {
        async fn search(&self, _query: &str, _max: usize) -> Result<Vec<String>, RunError> {
            Err(RunError::SearchUnavailable("503".into()))
        }
    }

    fn extractor() -> Extractor {
        Extractor::new(Settings::default(), Arc::new(LexiconTagger::new()), Arc::new(FrequencyEnricher))
    }

    fn pipeline(urls: &[&str], web: FakeWeb) -> Pipeline {
        let search = StaticUrls(urls.iter().map(|u| u.to_string()).collect());
        Pipeline::new(Settings::default(), Some(Box::new(search)), Box::new(web), extractor())
    }

    fn request(entity: &str, year: &str) -> RunRequest {
        RunRequest {
            entity: entity.into(),
            year: year.into(),
            max_documents: 10,
            advanced: false,
        }
    }

    fn feature_set(report: &RunReport, product: &str) -> Vec<String> {
        let mut topics: Vec<String> = report
            .tree
            .products()
            .iter()
            .find(|p| p.topic == product)
            .map(|p| p.children.iter().map(|f| f.topic.clone()).collect())
            .unwrap_or_default();
        topics.sort();
        topics
    }

    const DOC_A: &str = "<h2>Produit X</h2><ul><li>Fonction A</li></ul>";
    const DOC_AB: &str = "<h2>Produit X</h2><ul><li>Fonction A</li><li>Fonction B</li></ul>";

    #[tokio::test]
    async fn one_failed_fetch_out_of_three_is_skipped() {
        let web = FakeWeb::new(&[
            ("https://a.example", "<h2>Produit X</h2><ul><li>Fonction A</li></ul>"),
            ("https://c.example", "<h2>Produit Y</h2><ul><li>Fonction C</li></ul>"),
        ]);
        let p = pipeline(&["https://a.example", "https://down.example", "https://c.example"], web);

        let report = p.run(&request("Acme", "2024")).await.unwrap();
        assert_eq!(report.documents, DocumentStats { total: 3, ok: 2, failed: 1 });
        assert_eq!(feature_set(&report, "Produit X"), vec!["Fonction A"]);
        assert_eq!(feature_set(&report, "Produit Y"), vec!["Fonction C"]);
        assert_eq!((report.products, report.features), (2, 2));
    }

    #[tokio::test]
    async fn aggregate_is_order_independent_as_a_set() {
        let web = || FakeWeb::new(&[("https://1.example", DOC_A), ("https://2.example", DOC_AB)]);
        let forward = pipeline(&["https://1.example", "https://2.example"], web());
        let backward = pipeline(&["https://2.example", "https://1.example"], web());

        let f = forward.run(&request("Acme", "2024")).await.unwrap();
        let b = backward.run(&request("Acme", "2024")).await.unwrap();
        assert_eq!(feature_set(&f, "Produit X"), vec!["Fonction A", "Fonction B"]);
        assert_eq!(feature_set(&f, "Produit X"), feature_set(&b, "Produit X"));
    }

    #[tokio::test]
    async fn non_html_documents_count_as_failed() {
        let pdf = Document {
            content_type: Some("application/pdf".into()),
            ..Document::local("https://x.example/doc.pdf", "%PDF-1.4")
        };
        let web = FakeWeb::new(&[("https://a.example", DOC_A)]).with("https://x.example/doc.pdf", pdf);
        let p = pipeline(&["https://x.example/doc.pdf", "https://a.example"], web);

        let report = p.run(&request("Acme", "2024")).await.unwrap();
        assert_eq!(report.documents, DocumentStats { total: 2, ok: 1, failed: 1 });
        assert_eq!(report.products, 1);
    }

    #[tokio::test]
    async fn report_carries_query_and_tree() {
        let p = pipeline(&["https://a.example"], FakeWeb::new(&[("https://a.example", DOC_AB)]));
        let report = p.run(&request(" Acme ", "2024")).await.unwrap();
        assert_eq!(report.entity, "Acme");
        assert_eq!(report.query.as_deref(), Some("Acme produits fonctionnalités 2024"));
        assert_eq!(report.tree.root.topic, "Acme");
        assert_eq!(report.tree.node_ids(), vec!["root", "product0", "product0_feat0", "product0_feat1"]);
    }

    #[tokio::test]
    async fn zero_results_is_an_empty_report() {
        let p = pipeline(&[], FakeWeb::new(&[]));
        let report = p.run(&request("Acme", "2024")).await.unwrap();
        assert!(report.is_empty());
        assert_eq!(report.documents, DocumentStats::default());
    }

    #[tokio::test]
    async fn missing_search_backend_is_a_configuration_failure() {
        let p = Pipeline::new(Settings::default(), None, Box::new(FakeWeb::new(&[])), extractor());
        let err = p.run(&request("Acme", "2024")).await.unwrap_err();
        assert!(matches!(err, RunError::NoSearchBackend));
    }

    #[tokio::test]
    async fn unavailable_search_propagates() {
        let p = Pipeline::new(Settings::default(), Some(Box::new(DownSearch)), Box::new(FakeWeb::new(&[])), extractor());
        let err = p.run(&request("Acme", "2024")).await.unwrap_err();
        assert!(matches!(err, RunError::SearchUnavailable(_)));
    }

    #[tokio::test]
    async fn blank_inputs_are_rejected() {
        let p = pipeline(&[], FakeWeb::new(&[]));
        for (entity, year) in [("", "2024"), ("Acme", "  ")] {
            let err = p.run(&request(entity, year)).await.unwrap_err();
            assert!(matches!(err, RunError::Config(_)));
        }
    }

    #[tokio::test]
    async fn max_documents_caps_the_run() {
        let web = FakeWeb::new(&[("https://1.example", DOC_A), ("https://2.example", DOC_AB)]);
        let p = pipeline(&["https://1.example", "https://2.example"], web);
        let report = p
            .run(&RunRequest {
                max_documents: 1,
                ..request("Acme", "2024")
            })
            .await
            .unwrap();
        assert_eq!(report.documents.total, 1);
        assert_eq!(feature_set(&report, "Produit X"), vec!["Fonction A"]);
    }

    #[test]
    fn offline_aggregation_merges_in_input_order() {
        let docs = vec![
            Document::local("b.html", "<h2>Produit Y</h2><ul><li>Fonction C</li></ul>"),
            Document::local("a.html", DOC_AB),
            Document::local("c.html", DOC_A),
        ];
        let (map, stats) = aggregate_documents(&extractor(), &docs, "Acme", false);
        let names: Vec<_> = map.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Produit Y", "Produit X"]);
        assert_eq!(map.get("Produit X").unwrap().features.as_slice(), &["Fonction A", "Fonction B"]);
        assert_eq!(stats, DocumentStats { total: 3, ok: 3, failed: 0 });
    }

    #[test]
    fn report_serializes_counts_and_tree() {
        let (map, stats) = aggregate_documents(&extractor(), &[Document::local("a.html", DOC_A)], "Acme", false);
        let report = RunReport::new("Acme", None, None, stats, &map, 50);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["documents"]["ok"], 1);
        assert_eq!(json["features"], 1);
        assert!(json.get("year").is_none());
        assert_eq!(json["tree"]["root"]["children"][0]["topic"], "Produit X");
    }
}
