//! Product listing types.
//!
//! A [`SearchResultItem`] is one listing from a search. A [`CandidateSet`] is
//! the accumulated, deduplicated listings for one pipeline run: no two items
//! share a normalized title, and the first occurrence always wins.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::search::RawSearchHit;

/// One listing or discussion result, tagged with the domain it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResultItem {
    pub title: String,
    pub link: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub domain: String,
}

impl SearchResultItem {
    /// Tag a raw search hit with its source domain.
    pub fn from_hit(hit: RawSearchHit, domain: impl Into<String>) -> Self {
        Self {
            title: hit.title,
            link: hit.link,
            snippet: hit.snippet,
            image: hit.image_url,
            domain: domain.into(),
        }
    }

    /// The dedup key for this item.
    pub fn key(&self) -> String {
        normalize_title(&self.title)
    }
}

/// Normalize a title for dedup comparisons: trimmed and lowercased.
pub fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}

/// Ordered, title-deduplicated listings owned by one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CandidateSet {
    items: Vec<SearchResultItem>,
}

impl CandidateSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from items in order, dropping later duplicates.
    pub fn from_items(items: impl IntoIterator<Item = SearchResultItem>) -> Self {
        let mut set = Self::new();
        set.extend(items);
        set
    }

    /// Append an item unless its title is already present. Returns whether it
    /// was added.
    pub fn push(&mut self, item: SearchResultItem) -> bool {
        let key = item.key();
        if self.items.iter().any(|existing| existing.key() == key) {
            return false;
        }
        self.items.push(item);
        true
    }

    /// Append items in order, dropping duplicates.
    pub fn extend(&mut self, items: impl IntoIterator<Item = SearchResultItem>) {
        let mut seen: HashSet<String> = self.items.iter().map(SearchResultItem::key).collect();
        for item in items {
            if seen.insert(item.key()) {
                self.items.push(item);
            }
        }
    }

    /// Union another set into this one; this set's items take precedence.
    pub fn union(&mut self, other: CandidateSet) {
        self.extend(other.items);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[SearchResultItem] {
        &self.items
    }

    pub fn into_items(self) -> Vec<SearchResultItem> {
        self.items
    }
}

impl IntoIterator for CandidateSet {
    type Item = SearchResultItem;
    type IntoIter = std::vec::IntoIter<SearchResultItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// Deserialized sets go through the same dedup as built ones.
impl<'de> Deserialize<'de> for CandidateSet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<SearchResultItem>::deserialize(deserializer).map(Self::from_items)
    }
}

impl FromIterator<SearchResultItem> for CandidateSet {
    fn from_iter<I: IntoIterator<Item = SearchResultItem>>(iter: I) -> Self {
        Self::from_items(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(title: &str, domain: &str) -> SearchResultItem {
        SearchResultItem {
            title: title.into(),
            link: format!("https://{domain}/{}", title.replace(' ', "-")),
            snippet: format!("snippet from {domain}"),
            image: None,
            domain: domain.into(),
        }
    }

    #[test]
    fn dedup_is_case_insensitive_and_keeps_first() {
        let set = CandidateSet::from_items(vec![
            item("Gaming Chair X", "amazon.com"),
            item("gaming chair x", "shopee.com.my"),
            item("  GAMING CHAIR X ", "lazada.com.my"),
            item("Desk Lamp", "amazon.com"),
        ]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.items()[0].domain, "amazon.com");
        assert_eq!(set.items()[1].title, "Desk Lamp");
    }

    #[test]
    fn no_two_items_share_a_normalized_title() {
        let titles = ["A", "b", "B", "a ", "c", "C", "d"];
        let set: CandidateSet = titles.iter().map(|t| item(t, "x.com")).collect();
        let keys: HashSet<String> = set.items().iter().map(SearchResultItem::key).collect();
        assert_eq!(keys.len(), set.len());
        assert_eq!(set.len(), 4);
    }

    #[test]
    fn push_reports_duplicates() {
        let mut set = CandidateSet::new();
        assert!(set.push(item("Phone", "a.com")));
        assert!(!set.push(item("PHONE", "b.com")));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn union_prefers_existing_items() {
        let mut first = CandidateSet::from_items(vec![item("Chair", "first.com")]);
        let second = CandidateSet::from_items(vec![item("chair", "second.com"), item("Table", "second.com")]);
        first.union(second);
        assert_eq!(first.len(), 2);
        assert_eq!(first.items()[0].domain, "first.com");
    }

    #[test]
    fn from_hit_tags_domain() {
        let hit = RawSearchHit {
            title: "Oppo A70".into(),
            link: "https://shopee.com.my/oppo-a70".into(),
            snippet: "Budget phone".into(),
            image_url: Some("https://img/1.png".into()),
        };
        let item = SearchResultItem::from_hit(hit, "shopee.com.my");
        assert_eq!(item.domain, "shopee.com.my");
        assert_eq!(item.image.as_deref(), Some("https://img/1.png"));
    }

    #[test]
    fn deserializing_drops_duplicate_titles() {
        let json = serde_json::json!([
            {"title": "Chair", "link": "https://a.com/chair", "domain": "a.com"},
            {"title": " CHAIR ", "link": "https://b.com/chair", "domain": "b.com"},
            {"title": "Desk", "link": "https://b.com/desk", "domain": "b.com"}
        ]);
        let set: CandidateSet = serde_json::from_value(json).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.items()[0].domain, "a.com");
        assert_eq!(set.items()[1].title, "Desk");
    }

    #[test]
    fn candidate_set_serializes_as_array() {
        let set = CandidateSet::from_items(vec![item("Chair", "a.com")]);
        let json = serde_json::to_value(&set).unwrap();
        assert!(json.is_array());
    }
}
