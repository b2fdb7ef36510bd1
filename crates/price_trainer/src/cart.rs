//! CART (Classification and Regression Tree) builder
//!
//! Exact-greedy regression tree growth on first and second order gradients,
//! with XGBoost-style regularised gain and leaf weights.

use cropprice_core::{Node, Tree};
use std::cmp::Ordering;

use crate::deterministic::SplitTieBreaker;

/// Training parameters for a single tree
#[derive(Clone, Debug)]
pub struct TreeConfig {
    pub max_depth: usize,
    /// Minimum hessian sum required in each child
    pub min_child_weight: f64,
    /// L2 regularisation on leaf weights
    pub lambda: f64,
    /// Shrinkage folded into every leaf value
    pub learning_rate: f64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 5,
            min_child_weight: 1.0,
            lambda: 1.0,
            learning_rate: 0.1,
        }
    }
}

/// Split candidate with gain and tie-breaker
#[derive(Debug, Clone)]
struct SplitCandidate {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
    tie_breaker: SplitTieBreaker,
}

impl SplitCandidate {
    fn beats(&self, other: &SplitCandidate) -> bool {
        match self.gain.partial_cmp(&other.gain) {
            Some(Ordering::Greater) => true,
            Some(Ordering::Equal) => self.tie_breaker < other.tie_breaker,
            _ => false,
        }
    }
}

/// Grow one regression tree over borrowed rows and gradient statistics
pub struct CartBuilder<'a> {
    config: TreeConfig,
    features: &'a [Vec<f64>],
    gradients: &'a [f64],
    hessians: &'a [f64],
}

impl<'a> CartBuilder<'a> {
    pub fn new(
        features: &'a [Vec<f64>],
        gradients: &'a [f64],
        hessians: &'a [f64],
        config: TreeConfig,
    ) -> Self {
        debug_assert_eq!(features.len(), gradients.len());
        debug_assert_eq!(features.len(), hessians.len());

        Self {
            config,
            features,
            gradients,
            hessians,
        }
    }

    /// Build a tree from the sampled `rows`, splitting only on `columns`
    pub fn build(&self, rows: &[usize], columns: &[usize]) -> Tree {
        let mut nodes = Vec::new();
        self.build_node(rows, columns, 0, &mut nodes);
        Tree::new(nodes)
    }

    fn build_node(
        &self,
        rows: &[usize],
        columns: &[usize],
        depth: usize,
        nodes: &mut Vec<Node>,
    ) -> i32 {
        let current_idx = nodes.len();
        let (sum_g, sum_h) = self.sum_gradients_hessians(rows);

        let split = if depth >= self.config.max_depth || rows.len() < 2 {
            None
        } else {
            self.find_best_split(rows, columns, sum_g, sum_h)
        };

        let Some(split) = split else {
            nodes.push(Node::leaf(current_idx as i32, self.leaf_value(sum_g, sum_h)));
            return current_idx as i32;
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .copied()
            .partition(|&row| self.features[row][split.feature_idx] <= split.threshold);

        // Reserve space for current node; children follow in preorder
        nodes.push(Node::internal(
            current_idx as i32,
            split.feature_idx as i32,
            split.threshold,
            -1,
            -1,
            split.gain,
        ));

        let left_idx = self.build_node(&left_rows, columns, depth + 1, nodes);
        let right_idx = self.build_node(&right_rows, columns, depth + 1, nodes);

        nodes[current_idx].left = left_idx;
        nodes[current_idx].right = right_idx;

        current_idx as i32
    }

    /// Exact greedy search over every boundary between distinct values
    fn find_best_split(
        &self,
        rows: &[usize],
        columns: &[usize],
        sum_g: f64,
        sum_h: f64,
    ) -> Option<SplitCandidate> {
        let lambda = self.config.lambda;
        let parent_score = sum_g * sum_g / (sum_h + lambda);
        let mut best: Option<SplitCandidate> = None;
        let mut sorted = rows.to_vec();

        for &feature_idx in columns {
            let value = |row: usize| self.features[row][feature_idx];
            sorted.sort_by(|&a, &b| value(a).total_cmp(&value(b)).then(a.cmp(&b)));

            let mut g_left = 0.0;
            let mut h_left = 0.0;
            for position in 0..sorted.len() - 1 {
                let row = sorted[position];
                g_left += self.gradients[row];
                h_left += self.hessians[row];

                let lo = value(row);
                let hi = value(sorted[position + 1]);
                if lo == hi {
                    continue;
                }

                let g_right = sum_g - g_left;
                let h_right = sum_h - h_left;
                if h_left < self.config.min_child_weight || h_right < self.config.min_child_weight {
                    continue;
                }

                let gain = 0.5
                    * (g_left * g_left / (h_left + lambda) + g_right * g_right / (h_right + lambda)
                        - parent_score);
                if !(gain > 0.0 && gain.is_finite()) {
                    continue;
                }

                let candidate = SplitCandidate {
                    feature_idx,
                    threshold: midpoint(lo, hi),
                    gain,
                    tie_breaker: SplitTieBreaker::new(feature_idx, position),
                };
                if best.as_ref().map_or(true, |current| candidate.beats(current)) {
                    best = Some(candidate);
                }
            }
        }

        best
    }

    fn sum_gradients_hessians(&self, rows: &[usize]) -> (f64, f64) {
        rows.iter().fold((0.0, 0.0), |(g, h), &row| {
            (g + self.gradients[row], h + self.hessians[row])
        })
    }

    /// Optimal leaf weight `-G / (H + lambda)`, scaled by the learning rate
    fn leaf_value(&self, sum_g: f64, sum_h: f64) -> f64 {
        let denom = sum_h + self.config.lambda;
        if denom <= 0.0 {
            return 0.0;
        }
        -sum_g / denom * self.config.learning_rate
    }
}

/// Threshold strictly below `hi` so that `<=` sends `lo` left and `hi` right
fn midpoint(lo: f64, hi: f64) -> f64 {
    let mid = lo + (hi - lo) / 2.0;
    if mid >= lo && mid < hi {
        mid
    } else {
        lo
    }
}
