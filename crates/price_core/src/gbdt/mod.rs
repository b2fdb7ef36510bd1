//! Gradient Boosted Decision Tree (GBDT) regression model
//!
//! - Flat-vector trees with deterministic `<=` traversal
//! - Learning rate folded into leaf values, so prediction is a plain sum
//! - Split gains kept on internal nodes for feature attribution
//! - Canonical JSON serialization and BLAKE3 hashing
//!
//! # Usage
//!
//! ```rust
//! use cropprice_core::gbdt::{Model, Node, Tree};
//!
//! let tree = Tree::new(vec![
//!     Node::internal(0, 0, 50.0, 1, 2, 1.0),
//!     Node::leaf(1, -10.0),
//!     Node::leaf(2, 10.0),
//! ]);
//! let model = Model::new(vec![tree], 100.0, 1);
//!
//! assert_eq!(model.predict(&[30.0]).unwrap(), 90.0);
//! ```

pub mod model;
pub mod params;
pub mod tree;

pub use model::{Model, ModelError, MODEL_FORMAT_VERSION};
pub use params::Hyperparameters;
pub use tree::{Node, Tree};
