//! Flattening of the nested page-URL report.
//!
//! `Actions.getPageUrls` with `expanded=1` returns one node per top-level path
//! segment, each optionally carrying a `subtable` of deeper segments. The
//! exporter publishes one series per full path, so the tree is folded into a
//! `path -> visits` map.

use std::collections::BTreeMap;

use matomo_api::PageNode;

/// Full slash-joined page path to visit count.
pub type PageVisits = BTreeMap<String, u64>;

/// Flatten a page forest into a map keyed by full path.
///
/// Every node with a non-empty label and a visit count is recorded under
/// `parent + "/" + label`, internal nodes included. Children are recorded
/// before their parent, so on a path collision the parent's count wins; between
/// unrelated nodes the later one in input order wins.
pub fn flatten(forest: &[PageNode]) -> PageVisits {
    forest
        .iter()
        .fold(PageVisits::new(), |visits, node| flatten_node(node, "", visits))
}

fn flatten_node(node: &PageNode, parent: &str, visits: PageVisits) -> PageVisits {
    let label = node.label.as_deref().unwrap_or_default();
    let path = join_path(parent, label);

    let mut visits = node
        .subtable
        .iter()
        .fold(visits, |visits, child| flatten_node(child, &path, visits));

    if !label.is_empty() {
        if let Some(count) = node.nb_visits {
            visits.insert(path, count);
        }
    }

    visits
}

/// Matomo page labels sometimes carry their own leading slash (`/index`);
/// it is not doubled. An empty label adds no segment.
fn join_path(parent: &str, label: &str) -> String {
    if label.is_empty() {
        return parent.to_string();
    }
    let segment = label.strip_prefix('/').unwrap_or(label);
    format!("{}/{}", parent, segment)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn visits(entries: &[(&str, u64)]) -> PageVisits {
        entries
            .iter()
            .map(|(path, count)| (path.to_string(), *count))
            .collect()
    }

    #[test]
    fn empty_forest_yields_empty_map() {
        assert!(flatten(&[]).is_empty());
    }

    #[test]
    fn single_leaf_is_prefixed_with_slash() {
        let forest = vec![PageNode::leaf("home", 10)];
        assert_eq!(flatten(&forest), visits(&[("/home", 10)]));
    }

    #[test]
    fn subtable_records_children_and_parent() {
        let forest = vec![PageNode::branch(
            "blog",
            5,
            vec![PageNode::leaf("post-1", 3)],
        )];
        assert_eq!(
            flatten(&forest),
            visits(&[("/blog/post-1", 3), ("/blog", 5)])
        );
    }

    #[test]
    fn empty_subtable_is_a_leaf() {
        let forest = vec![PageNode::branch("about", 4, Vec::new())];
        assert_eq!(flatten(&forest), visits(&[("/about", 4)]));
    }

    #[test]
    fn deep_nesting_builds_full_paths() {
        let forest = vec![PageNode::branch(
            "docs",
            20,
            vec![
                PageNode::branch(
                    "api",
                    12,
                    vec![PageNode::leaf("/v1", 7), PageNode::leaf("/v2", 5)],
                ),
                PageNode::leaf("/faq", 8),
            ],
        )];

        assert_eq!(
            flatten(&forest),
            visits(&[
                ("/docs", 20),
                ("/docs/api", 12),
                ("/docs/api/v1", 7),
                ("/docs/api/v2", 5),
                ("/docs/faq", 8),
            ])
        );
    }

    #[test]
    fn leading_slash_in_label_is_not_doubled() {
        let forest = vec![PageNode::leaf("/index", 9), PageNode::leaf("/", 2)];
        assert_eq!(flatten(&forest), visits(&[("/index", 9), ("/", 2)]));
    }

    #[test]
    fn node_without_count_is_skipped_but_children_are_kept() {
        let forest = vec![PageNode {
            label: Some("shop".to_string()),
            nb_visits: None,
            subtable: vec![PageNode::leaf("cart", 6)],
        }];
        assert_eq!(flatten(&forest), visits(&[("/shop/cart", 6)]));
    }

    #[test]
    fn node_with_empty_label_passes_parent_path_to_children() {
        let forest = vec![PageNode::branch(
            "news",
            3,
            vec![PageNode {
                label: None,
                nb_visits: Some(99),
                subtable: vec![PageNode::leaf("today", 1)],
            }],
        )];
        assert_eq!(
            flatten(&forest),
            visits(&[("/news", 3), ("/news/today", 1)])
        );
    }

    #[test]
    fn later_alias_wins() {
        let forest = vec![PageNode::leaf("home", 1), PageNode::leaf("/home", 2)];
        assert_eq!(flatten(&forest), visits(&[("/home", 2)]));
    }

    #[test]
    fn empty_label_leaf_is_not_recorded() {
        let forest = vec![PageNode::branch(
            "a",
            10,
            vec![PageNode {
                label: Some(String::new()),
                nb_visits: Some(1),
                subtable: vec![],
            }],
        )];
        assert_eq!(flatten(&forest), visits(&[("/a", 10)]));
    }

    #[test]
    fn output_size_is_bounded_by_node_count() {
        let forest = vec![
            PageNode::branch("x", 1, vec![PageNode::leaf("y", 1), PageNode::leaf("z", 1)]),
            PageNode::leaf("w", 1),
        ];
        assert_eq!(flatten(&forest).len(), 4);
    }
}
