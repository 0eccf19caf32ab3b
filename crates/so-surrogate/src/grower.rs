//! Leaf-wise tree growth with exact split search.
//!
//! The training sets this crate sees are small (tens to a few thousand rows),
//! so split search scans sorted feature values directly instead of building
//! histograms. Growth is best-first: the open leaf with the largest gain is
//! split next until `num_leaves` is reached or no leaf has positive gain.

use std::collections::BTreeMap;

use crate::dataset::{category_code, Dataset};
use crate::gain::GainParams;
use crate::loss::GradPair;
use crate::tree::{Node, RegressionTree, SplitRule};

/// Gains at or below this are float noise, not structure.
const MIN_SPLIT_GAIN: f64 = 1e-10;

#[derive(Debug, Clone)]
pub(crate) struct GrowerParams {
    pub num_leaves: usize,
    pub max_depth: Option<usize>,
    /// Categorical features with at most this many observed categories are
    /// split one-vs-rest; larger ones use gradient-ordered partitions.
    pub max_onehot_cats: usize,
    /// Smoothing added to the hessian when ordering categories.
    pub cat_smooth: f64,
    pub gain: GainParams,
}

/// A grown tree plus the training rows that landed in each leaf.
#[derive(Debug)]
pub(crate) struct GrownTree {
    pub tree: RegressionTree,
    pub leaves: Vec<(usize, Vec<usize>)>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SplitCandidate {
    pub feature: usize,
    pub rule: SplitRule,
    pub gain: f64,
}

struct OpenLeaf {
    node: usize,
    depth: usize,
    rows: Vec<usize>,
    best: Option<SplitCandidate>,
}

pub(crate) struct TreeGrower<'a> {
    dataset: &'a Dataset,
    params: &'a GrowerParams,
}

impl<'a> TreeGrower<'a> {
    pub(crate) fn new(dataset: &'a Dataset, params: &'a GrowerParams) -> Self {
        Self { dataset, params }
    }

    /// Grow one tree against `grads`. Leaf values are left at zero for the
    /// caller to fill in.
    pub(crate) fn grow(&self, grads: &[GradPair]) -> GrownTree {
        let rows: Vec<usize> = (0..self.dataset.n_rows()).collect();
        let mut nodes = vec![Node::Leaf { value: 0.0 }];
        let root_best = self.best_split_for(&rows, grads, 0);
        let mut open = vec![OpenLeaf {
            node: 0,
            depth: 0,
            rows,
            best: root_best,
        }];

        let mut n_leaves = 1;
        while n_leaves < self.params.num_leaves {
            let pick = open
                .iter()
                .enumerate()
                .filter_map(|(i, leaf)| leaf.best.as_ref().map(|s| (i, s.gain)))
                .max_by(|a, b| a.1.total_cmp(&b.1));
            let Some((idx, _)) = pick else {
                break;
            };

            let OpenLeaf {
                node,
                depth,
                rows,
                best,
            } = open.swap_remove(idx);
            let Some(split) = best else {
                break;
            };

            let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
                .into_iter()
                .partition(|&r| split.rule.goes_left(self.dataset.features().get(r, split.feature)));

            let left = nodes.len();
            let right = left + 1;
            nodes.push(Node::Leaf { value: 0.0 });
            nodes.push(Node::Leaf { value: 0.0 });
            nodes[node] = Node::Split {
                feature: split.feature,
                rule: split.rule,
                left,
                right,
            };

            for (child, child_rows) in [(left, left_rows), (right, right_rows)] {
                let best = self.best_split_for(&child_rows, grads, depth + 1);
                open.push(OpenLeaf {
                    node: child,
                    depth: depth + 1,
                    rows: child_rows,
                    best,
                });
            }
            n_leaves += 1;
        }

        GrownTree {
            tree: RegressionTree::from_nodes(nodes),
            leaves: open.into_iter().map(|leaf| (leaf.node, leaf.rows)).collect(),
        }
    }

    fn best_split_for(
        &self,
        rows: &[usize],
        grads: &[GradPair],
        depth: usize,
    ) -> Option<SplitCandidate> {
        if self.params.max_depth.map_or(false, |max| depth >= max) {
            return None;
        }
        self.find_best_split(rows, grads)
    }

    pub(crate) fn find_best_split(
        &self,
        rows: &[usize],
        grads: &[GradPair],
    ) -> Option<SplitCandidate> {
        if rows.len() < 2 * self.params.gain.min_samples_leaf.max(1) {
            return None;
        }

        let mut best: Option<SplitCandidate> = None;
        for feature in 0..self.dataset.n_features() {
            let candidate = if self.dataset.is_categorical(feature) {
                self.best_categorical_split(feature, rows, grads)
            } else {
                self.best_numeric_split(feature, rows, grads)
            };
            if let Some(c) = candidate {
                if best.as_ref().map_or(true, |b| c.gain > b.gain) {
                    best = Some(c);
                }
            }
        }
        best.filter(|b| b.gain > MIN_SPLIT_GAIN)
    }

    fn best_numeric_split(
        &self,
        feature: usize,
        rows: &[usize],
        grads: &[GradPair],
    ) -> Option<SplitCandidate> {
        let features = self.dataset.features();
        let gain = &self.params.gain;

        // NaN rows always route right, so they never join a left prefix.
        let mut entries = Vec::with_capacity(rows.len());
        let (mut nan_grad, mut nan_hess) = (0.0, 0.0);
        for &r in rows {
            let x = features.get(r, feature);
            if x.is_nan() {
                nan_grad += grads[r].grad;
                nan_hess += grads[r].hess;
            } else {
                entries.push((x, grads[r]));
            }
        }
        if entries.len() < 2 {
            return None;
        }
        entries.sort_by(|a, b| a.0.total_cmp(&b.0));

        let grad_total: f64 = entries.iter().map(|e| e.1.grad).sum::<f64>() + nan_grad;
        let hess_total: f64 = entries.iter().map(|e| e.1.hess).sum::<f64>() + nan_hess;

        let mut best: Option<SplitCandidate> = None;
        let (mut grad_left, mut hess_left) = (0.0, 0.0);
        for i in 0..entries.len() - 1 {
            grad_left += entries[i].1.grad;
            hess_left += entries[i].1.hess;

            let (x, next) = (entries[i].0, entries[i + 1].0);
            if x == next {
                continue;
            }
            let count_left = i + 1;
            let count_right = rows.len() - count_left;
            let grad_right = grad_total - grad_left;
            let hess_right = hess_total - hess_left;
            if !gain.is_valid_split(hess_left, hess_right, count_left, count_right) {
                continue;
            }

            let split_gain = gain.compute_gain(grad_left, hess_left, grad_right, hess_right);
            if best.as_ref().map_or(true, |b| split_gain > b.gain) {
                best = Some(SplitCandidate {
                    feature,
                    rule: SplitRule::Threshold(midpoint(x, next)),
                    gain: split_gain,
                });
            }
        }
        best
    }

    fn best_categorical_split(
        &self,
        feature: usize,
        rows: &[usize],
        grads: &[GradPair],
    ) -> Option<SplitCandidate> {
        let features = self.dataset.features();
        let gain = &self.params.gain;

        // code -> (grad, hess, count)
        let mut stats: BTreeMap<u32, (f64, f64, usize)> = BTreeMap::new();
        for &r in rows {
            if let Some(code) = category_code(features.get(r, feature)) {
                let entry = stats.entry(code).or_insert((0.0, 0.0, 0));
                entry.0 += grads[r].grad;
                entry.1 += grads[r].hess;
                entry.2 += 1;
            }
        }
        if stats.len() < 2 {
            return None;
        }

        let grad_total: f64 = stats.values().map(|s| s.0).sum();
        let hess_total: f64 = stats.values().map(|s| s.1).sum();
        let count_total: usize = stats.values().map(|s| s.2).sum();

        let mut order: Vec<(u32, (f64, f64, usize))> = stats.into_iter().collect();
        let partitions: Vec<usize> = if order.len() <= self.params.max_onehot_cats {
            Vec::new()
        } else {
            let smooth = self.params.cat_smooth;
            order.sort_by(|a, b| {
                let ra = a.1 .0 / (a.1 .1 + smooth);
                let rb = b.1 .0 / (b.1 .1 + smooth);
                ra.total_cmp(&rb)
            });
            (1..order.len()).collect()
        };

        let evaluate = |left: Vec<u32>, g: f64, h: f64, n: usize| -> Option<SplitCandidate> {
            let (gr, hr, nr) = (grad_total - g, hess_total - h, count_total - n);
            if !gain.is_valid_split(h, hr, n, nr) {
                return None;
            }
            let mut left = left;
            left.sort_unstable();
            Some(SplitCandidate {
                feature,
                rule: SplitRule::Categories(left),
                gain: gain.compute_gain(g, h, gr, hr),
            })
        };

        let mut best: Option<SplitCandidate> = None;
        let mut consider = |candidate: Option<SplitCandidate>| {
            if let Some(c) = candidate {
                if best.as_ref().map_or(true, |b| c.gain > b.gain) {
                    best = Some(c);
                }
            }
        };

        if partitions.is_empty() {
            // one-vs-rest
            for &(code, (g, h, n)) in &order {
                consider(evaluate(vec![code], g, h, n));
            }
        } else {
            let (mut g, mut h, mut n) = (0.0, 0.0, 0usize);
            for prefix in partitions {
                let (_, (cg, ch, cn)) = order[prefix - 1];
                g += cg;
                h += ch;
                n += cn;
                let left = order[..prefix].iter().map(|(code, _)| *code).collect();
                consider(evaluate(left, g, h, n));
            }
        }
        best
    }
}

/// Threshold halfway between two distinct sorted values, falling back to the
/// lower value when the midpoint is not strictly below the upper one.
fn midpoint(lower: f64, upper: f64) -> f64 {
    let mid = lower + (upper - lower) / 2.0;
    if mid.is_finite() && mid >= lower && mid < upper {
        mid
    } else {
        lower
    }
}
