//! Output formats for a finished run. The tree is the only input; nothing
//! here feeds back into extraction.

use serde_json::{json, Value};

use crate::pipeline::RunReport;
use crate::tree::{MindMapTree, TreeNode};

const ROOT_COLOR: &str = "#E4572E";
const PRODUCT_COLOR: &str = "#4E79A7";
const FEATURE_COLOR: &str = "#76B041";
const VIS_NETWORK_URL: &str = "https://unpkg.com/vis-network@9.1.9/standalone/umd/vis-network.min.js";

pub fn to_json(report: &RunReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

/// Indented terminal outline with full (untruncated) labels.
pub fn to_outline(tree: &MindMapTree) -> String {
    let mut out = String::new();
    out.push_str(full_label(&tree.root));
    out.push('\n');
    let products = tree.products();
    for (i, product) in products.iter().enumerate() {
        let last_product = i + 1 == products.len();
        let (branch, indent) = if last_product { ("└── ", "    ") } else { ("├── ", "│   ") };
        out.push_str(branch);
        out.push_str(full_label(product));
        out.push('\n');
        for (j, feature) in product.children.iter().enumerate() {
            let twig = if j + 1 == product.children.len() { "└── " } else { "├── " };
            out.push_str(indent);
            out.push_str(twig);
            out.push_str(full_label(feature));
            out.push('\n');
        }
    }
    out
}

/// Self-contained vis-network page. Nodes show the (possibly truncated)
/// topic; the tooltip carries the full text.
pub fn to_html(report: &RunReport) -> serde_json::Result<String> {
    let (nodes, edges) = graph(&report.tree);
    let nodes = script_safe(&serde_json::to_string(&nodes)?);
    let edges = script_safe(&serde_json::to_string(&edges)?);
    let title = match &report.year {
        Some(year) => format!("{} ({})", report.entity, year),
        None => report.entity.clone(),
    };
    let title = escape_html(&title);

    Ok(format!(
        r##"<!DOCTYPE html>
<html lang="fr">
<head>
<meta charset="utf-8">
<title>Carte mentale : {title}</title>
<script src="{VIS_NETWORK_URL}"></script>
<style>
  html, body {{ margin: 0; height: 100%; font-family: sans-serif; }}
  header {{ padding: 8px 16px; border-bottom: 1px solid #ddd; }}
  #mindmap {{ width: 100%; height: calc(100% - 64px); }}
</style>
</head>
<body>
<header><strong>{title}</strong> | {products} produits, {features} fonctionnalités</header>
<div id="mindmap"></div>
<script>
  const nodes = new vis.DataSet({nodes});
  const edges = new vis.DataSet({edges});
  new vis.Network(document.getElementById("mindmap"), {{ nodes, edges }}, {{
    nodes: {{ shape: "box", font: {{ color: "#ffffff" }} }},
    edges: {{ arrows: "to", smooth: true }},
    physics: {{ solver: "barnesHut", barnesHut: {{ springLength: 150 }} }}
  }});
</script>
</body>
</html>
"##,
        products = report.products,
        features = report.features,
    ))
}

/// `mindmap_<entity>_<year>.html` with anything but letters, digits, `-`
/// and `_` replaced.
pub fn output_file_name(entity: &str, year: &str) -> String {
    let clean = |s: &str| -> String {
        s.trim()
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect()
    };
    format!("mindmap_{}_{}.html", clean(entity), clean(year))
}

fn graph(tree: &MindMapTree) -> (Vec<Value>, Vec<Value>) {
    let mut nodes = vec![node(&tree.root, ROOT_COLOR)];
    let mut edges = Vec::new();
    for product in tree.products() {
        nodes.push(node(product, PRODUCT_COLOR));
        edges.push(json!({ "from": tree.root.id, "to": product.id }));
        for feature in &product.children {
            nodes.push(node(feature, FEATURE_COLOR));
            edges.push(json!({ "from": product.id, "to": feature.id }));
        }
    }
    (nodes, edges)
}

fn node(n: &TreeNode, color: &str) -> Value {
    json!({
        "id": n.id,
        "label": n.topic,
        "title": full_label(n),
        "color": color,
    })
}

fn full_label(n: &TreeNode) -> &str {
    n.detail.as_deref().unwrap_or(&n.topic)
}

/// JSON embedded in a `<script>` must not close the element early.
fn script_safe(json: &str) -> String {
    json.replace("</", "<\\/")
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
