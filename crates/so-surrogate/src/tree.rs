//! Regression tree representation and traversal.

use crate::dataset::category_code;

/// How a split node routes a feature value.
#[derive(Debug, Clone, PartialEq)]
pub enum SplitRule {
    /// Numeric split: `value <= threshold` goes left. NaN goes right.
    Threshold(f64),
    /// Categorical split: codes in the (sorted) set go left, everything
    /// else, including categories never seen in training, goes right.
    Categories(Vec<u32>),
}

impl SplitRule {
    #[inline]
    pub fn goes_left(&self, value: f64) -> bool {
        match self {
            Self::Threshold(threshold) => value <= *threshold,
            Self::Categories(left) => category_code(value)
                .map_or(false, |code| left.binary_search(&code).is_ok()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        rule: SplitRule,
        left: usize,
        right: usize,
    },
}

/// A binary regression tree stored as a flat node array; node 0 is the root.
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    #[cfg(test)]
    pub(crate) fn leaf(value: f64) -> Self {
        Self {
            nodes: vec![Node::Leaf { value }],
        }
    }

    pub(crate) fn from_nodes(nodes: Vec<Node>) -> Self {
        debug_assert!(!nodes.is_empty());
        Self { nodes }
    }

    pub(crate) fn set_leaf_value(&mut self, node: usize, value: f64) {
        if let Node::Leaf { value: slot } = &mut self.nodes[node] {
            *slot = value;
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    #[cfg(test)]
    pub(crate) fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    rule,
                    left,
                    right,
                } => {
                    idx = if rule.goes_left(row[*feature]) {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump() -> RegressionTree {
        RegressionTree::from_nodes(vec![
            Node::Split {
                feature: 0,
                rule: SplitRule::Threshold(1.5),
                left: 1,
                right: 2,
            },
            Node::Leaf { value: -1.0 },
            Node::Split {
                feature: 1,
                rule: SplitRule::Categories(vec![0, 2]),
                left: 3,
                right: 4,
            },
            Node::Leaf { value: 2.0 },
            Node::Leaf { value: 3.0 },
        ])
    }

    #[test]
    fn traversal() {
        let tree = stump();
        assert_eq!(tree.predict_row(&[1.0, 0.0]), -1.0);
        assert_eq!(tree.predict_row(&[2.0, 2.0]), 2.0);
        assert_eq!(tree.predict_row(&[2.0, 1.0]), 3.0);
        // unseen category and NaN both route right
        assert_eq!(tree.predict_row(&[2.0, 9.0]), 3.0);
        assert_eq!(tree.predict_row(&[f64::NAN, 0.0]), 2.0);
        assert_eq!(tree.n_leaves(), 3);
        assert_eq!(tree.depth(), 2);
    }

    #[test]
    fn single_leaf() {
        let mut tree = RegressionTree::leaf(0.5);
        assert_eq!(tree.predict_row(&[123.0]), 0.5);
        tree.set_leaf_value(0, 1.5);
        assert_eq!(tree.predict_row(&[]), 1.5);
        assert_eq!(tree.depth(), 0);
    }
}
