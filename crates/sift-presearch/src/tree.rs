//! Query trees.
//!
//! A [`QueryTree`] is the weighted representation of a query used to decide which terms
//! to index for presearch filtering. Trees are immutable: weights are computed when a node
//! is built and [`QueryTree::advance_phase`] returns a new tree instead of mutating.

use std::{collections::BTreeSet, fmt};

use crate::{term::QueryTerm, weight::TreeWeightor};

/// Decides whether a subtree may be dropped on the next multi-pass indexing phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TreeAdvancer {
    /// Never advances.
    NoOp,
    /// Advances over subtrees weighing strictly more than the threshold.
    MinWeight(f32),
}

impl Default for TreeAdvancer {
    fn default() -> Self {
        Self::MinWeight(0.0)
    }
}

impl TreeAdvancer {
    /// Returns true if the subtree can be skipped in favour of a sibling.
    pub fn can_advance_over(&self, tree: &QueryTree) -> bool {
        match self {
            Self::NoOp => false,
            Self::MinWeight(min) => tree.weight() > *min,
        }
    }
}

/// A weighted query tree.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryTree {
    /// A leaf term. `Any` terms make the node an any-node.
    Term {
        /// The extracted term.
        term: QueryTerm,
        /// Term weight.
        weight: f32,
    },
    /// All children must match; any single child is a sufficient filter.
    Conjunction {
        /// Children, never containing any-nodes unless every child is one.
        children: Vec<Self>,
        /// Maximum child weight.
        weight: f32,
    },
    /// At least one child must match; every child must be represented in the filter.
    Disjunction {
        /// Children.
        children: Vec<Self>,
        /// Combined child weight.
        weight: f32,
        /// Whether any child is an any-node.
        any: bool,
    },
}

impl QueryTree {
    /// Creates a weighted leaf.
    pub fn term(term: QueryTerm, weightor: &TreeWeightor) -> Self {
        let weight = weightor.weigh(&term);
        Self::Term { term, weight }
    }

    /// Creates an any-node recording why no filter term could be extracted.
    pub fn any(reason: impl Into<String>, weightor: &TreeWeightor) -> Self {
        Self::term(QueryTerm::any(reason), weightor)
    }

    /// Builds a conjunction.
    ///
    /// Any-node children are dropped since another child always provides a filter. A
    /// single remaining child is returned unwrapped, and if every child is an any-node
    /// the first one is returned.
    pub fn conjunction(children: Vec<Self>, weightor: &TreeWeightor) -> Self {
        if children.len() <= 1 {
            return children
                .into_iter()
                .next()
                .unwrap_or_else(|| Self::any("EMPTY CONJUNCTION", weightor));
        }

        let mut restricted: Vec<Self> = Vec::with_capacity(children.len());
        let mut first_any = None;
        for child in children {
            if !child.is_any() {
                restricted.push(child);
            } else if first_any.is_none() {
                first_any = Some(child);
            }
        }

        match restricted.len() {
            0 => first_any.unwrap_or_else(|| Self::any("EMPTY CONJUNCTION", weightor)),
            1 => restricted.remove(0),
            _ => {
                let weight = restricted
                    .iter()
                    .map(Self::weight)
                    .fold(f32::NEG_INFINITY, f32::max);
                Self::Conjunction {
                    children: restricted,
                    weight,
                }
            }
        }
    }

    /// Builds a disjunction. A single child is returned unwrapped.
    pub fn disjunction(mut children: Vec<Self>, weightor: &TreeWeightor) -> Self {
        match children.len() {
            0 => Self::any("EMPTY DISJUNCTION", weightor),
            1 => children.remove(0),
            _ => {
                let weights: Vec<f32> = children.iter().map(Self::weight).collect();
                let any = children.iter().any(Self::is_any);
                Self::Disjunction {
                    weight: weightor.combine(&weights),
                    children,
                    any,
                }
            }
        }
    }

    /// Returns the node weight.
    pub fn weight(&self) -> f32 {
        match self {
            Self::Term { weight, .. }
            | Self::Conjunction { weight, .. }
            | Self::Disjunction { weight, .. } => *weight,
        }
    }

    /// Returns true if no document can be excluded on the basis of this subtree.
    pub fn is_any(&self) -> bool {
        match self {
            Self::Term { term, .. } => term.is_any(),
            Self::Conjunction { children, .. } => children.iter().all(Self::is_any),
            Self::Disjunction { any, .. } => *any,
        }
    }

    /// Returns the child nodes (empty for leaves).
    pub fn children(&self) -> &[Self] {
        match self {
            Self::Term { .. } => &[],
            Self::Conjunction { children, .. } | Self::Disjunction { children, .. } => children,
        }
    }

    /// Returns the set of terms a document must contain one of to be a candidate.
    pub fn terms(&self) -> BTreeSet<QueryTerm> {
        let mut out = BTreeSet::new();
        self.collect_terms(&mut out);
        out
    }

    /// Accumulates the filter terms of this subtree.
    pub fn collect_terms(&self, out: &mut BTreeSet<QueryTerm>) {
        match self {
            Self::Term { term, .. } => {
                out.insert(term.clone());
            }
            Self::Conjunction { children, .. } => {
                if let Some(selected) = children.get(selected_index(children)) {
                    selected.collect_terms(out);
                }
            }
            Self::Disjunction { children, any, .. } => {
                if *any {
                    out.insert(QueryTerm::any("DISJUNCTION WITH ANYTOKEN"));
                    return;
                }
                for child in children {
                    child.collect_terms(out);
                }
            }
        }
    }

    /// Moves the tree to its next indexing phase.
    ///
    /// A conjunction first advances its selected child; failing that, it drops the
    /// selected child when more than one child can be advanced over and the selected
    /// child is one of them, so the next term collection picks a different child.
    /// Disjunctions advance every child. Returns `None` once a fixed point is reached.
    pub fn advance_phase(&self, weightor: &TreeWeightor, advancer: &TreeAdvancer) -> Option<Self> {
        match self {
            Self::Term { .. } => None,
            Self::Conjunction { children, .. } => {
                let selected = selected_index(children);
                if let Some(advanced) = children[selected].advance_phase(weightor, advancer) {
                    let mut next = children.clone();
                    next[selected] = advanced;
                    return Some(Self::conjunction(next, weightor));
                }

                let advanceable = children
                    .iter()
                    .filter(|c| advancer.can_advance_over(c))
                    .count();
                if advanceable > 1 && advancer.can_advance_over(&children[selected]) {
                    let mut next = children.clone();
                    next.remove(selected);
                    return Some(Self::conjunction(next, weightor));
                }

                None
            }
            Self::Disjunction { children, .. } => {
                let mut changed = false;
                let next: Vec<Self> = children
                    .iter()
                    .map(|child| match child.advance_phase(weightor, advancer) {
                        Some(advanced) => {
                            changed = true;
                            advanced
                        }
                        None => child.clone(),
                    })
                    .collect();
                changed.then(|| Self::disjunction(next, weightor))
            }
        }
    }

    /// Formats the tree with one node per line.
    fn fmt_tree(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let indent = "  ".repeat(depth);
        match self {
            Self::Term { term, weight } => writeln!(f, "{indent}{term} ^{weight:.3}"),
            Self::Conjunction { children, weight } => {
                let selected = selected_index(children);
                writeln!(f, "{indent}Conjunction[{}] ^{weight:.3}", children.len())?;
                for (i, child) in children.iter().enumerate() {
                    if i == selected {
                        write!(f, "*")?;
                    }
                    child.fmt_tree(f, depth + 1)?;
                }
                Ok(())
            }
            Self::Disjunction {
                children,
                weight,
                any,
            } => {
                let marker = if *any { " ANY" } else { "" };
                writeln!(
                    f,
                    "{indent}Disjunction[{}] ^{weight:.3}{marker}",
                    children.len()
                )?;
                for child in children {
                    child.fmt_tree(f, depth + 1)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for QueryTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_tree(f, 0)
    }
}

/// Index of the highest-weighted child; ties go to the earliest child.
fn selected_index(children: &[QueryTree]) -> usize {
    let mut selected = 0;
    for (i, child) in children.iter().enumerate().skip(1) {
        if child.weight() > children[selected].weight() {
            selected = i;
        }
    }
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::TermKind;

    fn leaf(text: &str, weightor: &TreeWeightor) -> QueryTree {
        QueryTree::term(QueryTerm::exact("f", text), weightor)
    }

    fn texts(tree: &QueryTree) -> Vec<String> {
        tree.terms().into_iter().map(|t| t.text).collect()
    }

    #[test]
    fn conjunction_selects_heaviest_child() {
        let w = TreeWeightor::default();
        let tree = QueryTree::conjunction(vec![leaf("a", &w), leaf("longest", &w)], &w);
        assert_eq!(texts(&tree), vec!["longest"]);
    }

    #[test]
    fn conjunction_ties_go_to_first_child() {
        let w = TreeWeightor::default();
        let tree = QueryTree::conjunction(vec![leaf("abc", &w), leaf("xyz", &w)], &w);
        assert_eq!(texts(&tree), vec!["abc"]);
    }

    #[test]
    fn conjunction_drops_any_children() {
        let w = TreeWeightor::default();
        let tree = QueryTree::conjunction(vec![QueryTree::any("RANGE", &w), leaf("a", &w)], &w);
        assert_eq!(tree, leaf("a", &w));
    }

    #[test]
    fn conjunction_of_only_any_is_any() {
        let w = TreeWeightor::default();
        let tree = QueryTree::conjunction(
            vec![QueryTree::any("first", &w), QueryTree::any("second", &w)],
            &w,
        );
        assert!(tree.is_any());
        let terms = tree.terms();
        let term = terms.iter().next().unwrap();
        assert_eq!(term.payload.as_deref(), Some("first"));
    }

    #[test]
    fn disjunction_collects_every_child() {
        let w = TreeWeightor::default();
        let tree = QueryTree::disjunction(vec![leaf("a", &w), leaf("bb", &w)], &w);
        assert_eq!(texts(&tree), vec!["a", "bb"]);
        assert_eq!(tree.weight(), leaf("a", &w).weight());
    }

    #[test]
    fn disjunction_with_any_child_collects_single_any() {
        let w = TreeWeightor::default();
        let tree = QueryTree::disjunction(vec![leaf("a", &w), QueryTree::any("RANGE", &w)], &w);
        assert!(tree.is_any());
        let terms = tree.terms();
        assert_eq!(terms.len(), 1);
        assert_eq!(terms.iter().next().unwrap().kind, TermKind::Any);
    }

    #[test]
    fn advance_removes_selected_child() {
        let w = TreeWeightor::default();
        let advancer = TreeAdvancer::MinWeight(0.0);
        let tree = QueryTree::conjunction(
            vec![leaf("hello", &w), leaf("there", &w), leaf("world", &w)],
            &w,
        );
        assert_eq!(texts(&tree), vec!["hello"]);

        let second = tree.advance_phase(&w, &advancer).unwrap();
        assert_eq!(texts(&second), vec!["there"]);

        let third = second.advance_phase(&w, &advancer).unwrap();
        assert_eq!(texts(&third), vec!["world"]);

        assert!(third.advance_phase(&w, &advancer).is_none());
    }

    #[test]
    fn advance_respects_threshold() {
        let w = TreeWeightor::default();
        let tree = QueryTree::conjunction(vec![leaf("a", &w), leaf("longer", &w)], &w);
        let threshold = leaf("a", &w).weight();
        assert!(tree.advance_phase(&w, &TreeAdvancer::MinWeight(threshold)).is_none());
        assert!(tree.advance_phase(&w, &TreeAdvancer::NoOp).is_none());
    }

    #[test]
    fn advance_recurses_into_selected_child_first() {
        let w = TreeWeightor::default();
        let advancer = TreeAdvancer::default();
        let inner = QueryTree::conjunction(vec![leaf("badger", &w), leaf("cormorant", &w)], &w);
        let tree = QueryTree::conjunction(vec![leaf("foo", &w), inner], &w);
        assert_eq!(texts(&tree), vec!["cormorant"]);

        let next = tree.advance_phase(&w, &advancer).unwrap();
        assert_eq!(texts(&next), vec!["badger"]);
    }

    #[test]
    fn disjunction_advances_all_children() {
        let w = TreeWeightor::default();
        let advancer = TreeAdvancer::default();
        let left = QueryTree::conjunction(vec![leaf("hello", &w), leaf("world", &w)], &w);
        let right = QueryTree::conjunction(vec![leaf("this", &w), leaf("that", &w)], &w);
        let tree = QueryTree::disjunction(vec![left, right], &w);
        assert_eq!(texts(&tree), vec!["hello", "this"]);

        let next = tree.advance_phase(&w, &advancer).unwrap();
        assert_eq!(texts(&next), vec!["that", "world"]);
    }

    #[test]
    fn display_marks_selected_child() {
        let w = TreeWeightor::default();
        let tree = QueryTree::conjunction(vec![leaf("a", &w), leaf("longest", &w)], &w);
        let rendered = tree.to_string();
        assert!(rendered.starts_with("Conjunction[2]"));
        assert!(rendered.contains("*  f:longest"));
    }
}
