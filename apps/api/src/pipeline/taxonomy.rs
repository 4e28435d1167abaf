//! Taxonomy Aggregator: folds classified postings into
//! industry → function → domain → seniority → descriptions.
//!
//! Sampling policy: each leaf keeps the first `LEAF_CAPACITY` descriptions in
//! input order. Later results for a full leaf are dropped, never queued or
//! reassigned. Descriptions are not deduplicated.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::posting::ExtractionResult;

/// Maximum number of descriptions sampled per taxonomy path.
pub const LEAF_CAPACITY: usize = 7;

type SeniorityLevel = BTreeMap<String, Vec<String>>;
type DomainLevel = BTreeMap<String, SeniorityLevel>;
type FunctionLevel = BTreeMap<String, DomainLevel>;

/// Four-level nested grouping. Serializes as nested JSON objects ending in
/// string arrays, which is the `tree.json` document format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaxonomyTree(BTreeMap<String, FunctionLevel>);

impl TaxonomyTree {
    /// Places one result, creating missing levels. Returns `false` when the
    /// leaf was already at capacity and the description was dropped.
    pub fn insert(&mut self, result: &ExtractionResult) -> bool {
        let leaf = self
            .0
            .entry(result.industry.clone())
            .or_default()
            .entry(result.function.clone())
            .or_default()
            .entry(result.domain.clone())
            .or_default()
            .entry(result.seniority.clone())
            .or_default();

        if leaf.len() >= LEAF_CAPACITY {
            return false;
        }
        leaf.push(result.description.clone());
        true
    }

    #[cfg(test)]
    pub fn leaf(
        &self,
        industry: &str,
        function: &str,
        domain: &str,
        seniority: &str,
    ) -> Option<&[String]> {
        self.0
            .get(industry)?
            .get(function)?
            .get(domain)?
            .get(seniority)
            .map(Vec::as_slice)
    }

    /// Every leaf with its `[industry, function, domain, seniority]` path.
    pub fn leaves(&self) -> impl Iterator<Item = ([&str; 4], &[String])> + '_ {
        self.0.iter().flat_map(|(industry, functions)| {
            functions.iter().flat_map(move |(function, domains)| {
                domains.iter().flat_map(move |(domain, seniorities)| {
                    seniorities.iter().map(move |(seniority, descriptions)| {
                        (
                            [
                                industry.as_str(),
                                function.as_str(),
                                domain.as_str(),
                                seniority.as_str(),
                            ],
                            descriptions.as_slice(),
                        )
                    })
                })
            })
        })
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Builds the tree from results in input order. Pure; equal input gives an
/// equal tree.
pub fn build_tree(results: &[ExtractionResult]) -> TaxonomyTree {
    let mut tree = TaxonomyTree::default();
    for result in results {
        tree.insert(result);
    }
    tree
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result(
        industry: &str,
        function: &str,
        domain: &str,
        seniority: &str,
        description: &str,
    ) -> ExtractionResult {
        ExtractionResult {
            industry: industry.to_string(),
            function: function.to_string(),
            domain: domain.to_string(),
            company_type: None,
            title: "Engineer".to_string(),
            description: description.to_string(),
            seniority: seniority.to_string(),
            company_name: "Acme".to_string(),
            employment_type: "FT".to_string(),
        }
    }

    #[test]
    fn test_single_result_builds_full_path() {
        let tree = build_tree(&[result(
            "Construction",
            "Engineering",
            "Structural",
            "Senior",
            "builds bridges",
        )]);

        assert_eq!(
            serde_json::to_value(&tree).unwrap(),
            json!({ "Construction": { "Engineering": { "Structural": { "Senior": ["builds bridges"] } } } })
        );
    }

    #[test]
    fn test_leaf_capped_at_seven_first_seen_wins() {
        let results: Vec<_> = (0..20)
            .map(|i| result("Retail", "Sales", "B2B", "Junior", &format!("posting {i}")))
            .collect();

        let tree = build_tree(&results);
        let leaf = tree.leaf("Retail", "Sales", "B2B", "Junior").unwrap();

        assert_eq!(leaf.len(), LEAF_CAPACITY);
        let expected: Vec<String> = (0..7).map(|i| format!("posting {i}")).collect();
        assert_eq!(leaf, expected.as_slice());
    }

    #[test]
    fn test_insert_reports_drop_at_capacity() {
        let mut tree = TaxonomyTree::default();
        let r = result("Retail", "Sales", "B2B", "Junior", "same");
        for _ in 0..LEAF_CAPACITY {
            assert!(tree.insert(&r));
        }
        assert!(!tree.insert(&r));
    }

    #[test]
    fn test_duplicates_are_kept() {
        let r = result("Banking", "Finance", "Auditing", "Mid", "audits ledgers");
        let tree = build_tree(&[r.clone(), r.clone(), r]);
        assert_eq!(
            tree.leaf("Banking", "Finance", "Auditing", "Mid").unwrap().len(),
            3
        );
    }

    #[test]
    fn test_cap_is_per_path_not_global() {
        let mut results: Vec<_> = (0..10)
            .map(|i| result("Retail", "Sales", "B2B", "Junior", &format!("junior {i}")))
            .collect();
        results.extend((0..3).map(|i| result("Retail", "Sales", "B2B", "Senior", &format!("senior {i}"))));

        let tree = build_tree(&results);
        assert_eq!(tree.leaf("Retail", "Sales", "B2B", "Junior").unwrap().len(), 7);
        assert_eq!(tree.leaf("Retail", "Sales", "B2B", "Senior").unwrap().len(), 3);
        assert_eq!(tree.leaves().count(), 2);
    }

    #[test]
    fn test_company_type_does_not_affect_placement() {
        let mut with_type = result("Energy & Utilities", "Operations", "Grid", "Lead", "a");
        with_type.company_type = Some("Large Enterprises".to_string());
        let without_type = result("Energy & Utilities", "Operations", "Grid", "Lead", "b");

        let tree = build_tree(&[with_type, without_type]);
        assert_eq!(
            tree.leaf("Energy & Utilities", "Operations", "Grid", "Lead").unwrap(),
            ["a".to_string(), "b".to_string()].as_slice()
        );
    }

    #[test]
    fn test_build_tree_is_deterministic() {
        let results = vec![
            result("Retail", "Sales", "B2B", "Junior", "x"),
            result("Healthcare", "Design", "UX", "Senior", "y"),
            result("Retail", "Marketing", "Ads", "Mid", "z"),
        ];
        assert_eq!(build_tree(&results), build_tree(&results));
    }

    #[test]
    fn test_empty_input_gives_empty_tree() {
        let tree = build_tree(&[]);
        assert!(tree.is_empty());
        assert_eq!(serde_json::to_value(&tree).unwrap(), json!({}));
    }
}
