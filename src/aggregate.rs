use std::collections::{HashMap, HashSet};

/// Insertion-ordered set of feature strings, exact-string deduplicated.
#[derive(Debug, Clone, Default)]
pub struct FeatureList {
    items: Vec<String>,
    seen: HashSet<String>,
}

impl FeatureList {
    /// Appends `feature` unless already present; returns whether it was new.
    pub fn insert(&mut self, feature: String) -> bool {
        if self.seen.contains(&feature) {
            return false;
        }
        self.seen.insert(feature.clone());
        self.items.push(feature);
        true
    }

    pub fn contains(&self, feature: &str) -> bool {
        self.seen.contains(feature)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.items.iter()
    }

    #[cfg(test)]
    pub fn as_slice(&self) -> &[String] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl PartialEq for FeatureList {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<S: Into<String>> FromIterator<S> for FeatureList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut list = FeatureList::default();
        for f in iter {
            list.insert(f.into());
        }
        list
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProductEntry {
    pub name: String,
    pub features: FeatureList,
}

/// Product name → features, iterated in first-insertion order. Used both
/// for one document's result and for the run-wide aggregate.
#[derive(Debug, Clone, Default)]
pub struct ProductMap {
    entries: Vec<ProductEntry>,
    index: HashMap<String, usize>,
}

pub type AggregateMap = ProductMap;

impl ProductMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// The entry for `name`, inserted empty if absent.
    pub fn entry(&mut self, name: &str) -> &mut ProductEntry {
        let idx = match self.index.get(name) {
            Some(&idx) => idx,
            None => {
                self.entries.push(ProductEntry {
                    name: name.to_string(),
                    features: FeatureList::default(),
                });
                self.index.insert(name.to_string(), self.entries.len() - 1);
                self.entries.len() - 1
            }
        };
        &mut self.entries[idx]
    }

    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<&ProductEntry> {
        self.index.get(name).map(|&idx| &self.entries[idx])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ProductEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn feature_count(&self) -> usize {
        self.entries.iter().map(|e| e.features.len()).sum()
    }

    /// Keep only entries matching `keep`, preserving order.
    pub fn retain<F>(&mut self, keep: F)
    where
        F: Fn(&ProductEntry) -> bool,
    {
        self.entries.retain(|e| keep(e));
        self.index = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.name.clone(), i))
            .collect();
    }

    /// Fold one document's map into this one. New products are appended;
    /// known products gain only features they do not hold yet. Returns the
    /// number of features actually added.
    pub fn merge(&mut self, incoming: ProductMap) -> usize {
        let mut added = 0;
        for product in incoming.entries {
            let entry = self.entry(&product.name);
            for feature in product.features.items {
                if entry.features.insert(feature) {
                    added += 1;
                }
            }
        }
        added
    }
}

impl PartialEq for ProductMap {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<'a> IntoIterator for &'a ProductMap {
    type Item = &'a ProductEntry;
    type IntoIter = std::slice::Iter<'a, ProductEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
pub fn product_map<P, F, S>(pairs: impl IntoIterator<Item = (P, F)>) -> ProductMap
where
    P: AsRef<str>,
    F: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut map = ProductMap::new();
    for (product, features) in pairs {
        let entry = map.entry(product.as_ref());
        for f in features {
            entry.features.insert(f.into());
        }
    }
    map
}
