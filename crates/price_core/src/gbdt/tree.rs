//! Regression tree structures
//!
//! Nodes are stored in a flat vector with the root at index 0. Children are
//! always stored after their parent, which rules out cycles.

use serde::{Deserialize, Serialize};

/// A decision tree node (internal or leaf)
///
/// For internal nodes:
/// - `feature_idx >= 0`: index into the feature vector
/// - `left` and `right` point to child node indices
/// - `leaf` is `None`
///
/// For leaf nodes:
/// - `feature_idx == -1`
/// - `leaf` contains the (learning-rate scaled) output
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    pub id: i32,

    /// Left child index (-1 for leaf nodes)
    pub left: i32,

    /// Right child index (-1 for leaf nodes)
    pub right: i32,

    #[serde(rename = "feature_idx", alias = "feature")]
    pub feature_idx: i32,

    /// Go left when `feature <= threshold`
    pub threshold: f64,

    pub leaf: Option<f64>,

    /// Loss reduction of this split; 0 for leaves
    #[serde(default)]
    pub gain: f64,
}

impl Node {
    pub fn internal(
        id: i32,
        feature_idx: i32,
        threshold: f64,
        left: i32,
        right: i32,
        gain: f64,
    ) -> Self {
        Self {
            id,
            left,
            right,
            feature_idx,
            threshold,
            leaf: None,
            gain,
        }
    }

    pub fn leaf(id: i32, value: f64) -> Self {
        Self {
            id,
            left: -1,
            right: -1,
            feature_idx: -1,
            threshold: 0.0,
            leaf: Some(value),
            gain: 0.0,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.feature_idx == -1 || self.leaf.is_some()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// Walk the tree for one feature vector.
    ///
    /// `None` if the structure is broken or a split references a feature
    /// outside `features`.
    pub fn evaluate(&self, features: &[f64]) -> Option<f64> {
        let mut idx = 0usize;
        // A valid walk visits at most every node once
        for _ in 0..self.nodes.len() {
            let node = self.nodes.get(idx)?;
            if node.is_leaf() {
                return node.leaf;
            }
            let value = *features.get(usize::try_from(node.feature_idx).ok()?)?;
            let next = if value <= node.threshold { node.left } else { node.right };
            idx = usize::try_from(next).ok()?;
        }
        None
    }

    /// Largest feature index referenced by a split
    pub fn max_feature_index(&self) -> Option<usize> {
        self.nodes
            .iter()
            .filter(|n| !n.is_leaf())
            .filter_map(|n| usize::try_from(n.feature_idx).ok())
            .max()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }

        for (i, node) in self.nodes.iter().enumerate() {
            if node.is_leaf() {
                match node.leaf {
                    Some(value) if value.is_finite() => {}
                    Some(value) => {
                        return Err(format!("node {i}: leaf value {value} is not finite"))
                    }
                    None => return Err(format!("node {i}: leaf without value")),
                }
                continue;
            }

            if node.feature_idx < 0 {
                return Err(format!("node {i}: invalid feature index {}", node.feature_idx));
            }
            if !node.threshold.is_finite() {
                return Err(format!("node {i}: threshold is not finite"));
            }
            for child in [node.left, node.right] {
                if child <= i as i32 || child as usize >= self.nodes.len() {
                    return Err(format!("node {i}: child index {child} out of order or range"));
                }
            }
        }

        Ok(())
    }
}
