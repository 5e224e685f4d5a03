use serde::Serialize;

use crate::aggregate::AggregateMap;

const ELLIPSIS: char = '…';

/// `{id, topic, children}` node. `detail` carries the full text when the
/// topic had to be truncated for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeNode {
    pub id: String,
    pub topic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    fn labeled(id: String, text: &str, max_chars: usize) -> Self {
        let topic = truncate_label(text, max_chars);
        let detail = (topic != text).then(|| text.to_string());
        TreeNode {
            id,
            topic,
            detail,
            children: Vec::new(),
        }
    }
}

/// Entity → products → features.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MindMapTree {
    pub root: TreeNode,
}

impl MindMapTree {
    pub fn products(&self) -> &[TreeNode] {
        &self.root.children
    }

    pub fn is_empty(&self) -> bool {
        self.root.children.is_empty()
    }

    /// Every node id, depth-first from the root.
    #[cfg(test)]
    pub fn node_ids(&self) -> Vec<&str> {
        fn walk<'a>(node: &'a TreeNode, out: &mut Vec<&'a str>) {
            out.push(&node.id);
            for child in &node.children {
                walk(child, out);
            }
        }
        let mut ids = Vec::new();
        walk(&self.root, &mut ids);
        ids
    }
}

/// Ids are positional (`root`, `product<i>`, `product<i>_feat<j>`, zero
/// based) so they never depend on label text.
pub fn build(entity: &str, map: &AggregateMap, label_max_chars: usize) -> MindMapTree {
    let mut root = TreeNode::labeled("root".to_string(), entity, label_max_chars);
    root.children = map
        .iter()
        .enumerate()
        .map(|(i, product)| {
            let mut node = TreeNode::labeled(format!("product{}", i), &product.name, label_max_chars);
            node.children = product
                .features
                .iter()
                .enumerate()
                .map(|(j, feature)| {
                    TreeNode::labeled(format!("product{}_feat{}", i, j), feature, label_max_chars)
                })
                .collect();
            node
        })
        .collect();
    MindMapTree { root }
}

/// Display form of `s`: at most `max` characters, the last replaced by an
/// ellipsis when cut.
pub fn truncate_label(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut truncated: String = s.chars().take(max.saturating_sub(1)).collect();
        truncated.truncate(truncated.trim_end().len());
        truncated.push(ELLIPSIS);
        truncated
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::aggregate::product_map;

    #[test]
    fn three_levels_in_map_order() {
        let map = product_map([("X", vec!["A", "B"]), ("Y", vec![])]);
        let tree = build("Acme", &map, 50);
        assert_eq!(tree.root.id, "root");
        assert_eq!(tree.root.topic, "Acme");
        let topics: Vec<_> = tree.products().iter().map(|p| p.topic.as_str()).collect();
        assert_eq!(topics, vec!["X", "Y"]);
        assert_eq!(tree.products()[0].children[1].id, "product0_feat1");
        assert_eq!(tree.products()[0].children[1].topic, "B");
        assert!(tree.products()[1].children.is_empty());
    }

    #[test]
    fn ids_unique_even_with_identical_labels() {
        let map = product_map([
            ("X", vec!["Same", "Other"]),
            ("Y", vec!["Same"]),
            ("Z", vec!["a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l"]),
        ]);
        let tree = build("Acme", &map, 50);
        let ids = tree.node_ids();
        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(ids.len(), 1 + 3 + 2 + 1 + 12);
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn ids_are_stable_across_builds() {
        let map = product_map([("X", vec!["A"]), ("Y", vec!["B"])]);
        assert_eq!(build("Acme", &map, 50), build("Acme", &map, 50));
    }

    #[test]
    fn long_labels_truncated_for_display_only() {
        let long = "Synchronisation automatique de tous les documents partagés en temps réel";
        let map = product_map([("X", vec![long])]);
        let tree = build("Acme", &map, 50);
        let node = &tree.products()[0].children[0];
        assert_eq!(node.topic.chars().count(), 50);
        assert!(node.topic.ends_with('…'));
        assert_eq!(node.detail.as_deref(), Some(long));
        assert_eq!(map.get("X").unwrap().features.as_slice(), &[long]);
    }

    #[test]
    fn short_labels_untouched() {
        assert_eq!(truncate_label("court", 50), "court");
        assert_eq!(truncate_label("exactement", 10), "exactement");
    }

    #[test]
    fn serializes_as_id_topic_children() {
        let map = product_map([("X", vec!["A"])]);
        let json = serde_json::to_value(build("Acme", &map, 50)).unwrap();
        assert_eq!(json["root"]["children"][0]["children"][0]["id"], "product0_feat0");
        assert!(json["root"]["children"][0]["children"][0].get("children").is_none());
    }
}
