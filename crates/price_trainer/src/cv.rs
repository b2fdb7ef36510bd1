//! K-fold cross-validation splits

use crate::errors::{Result, TrainerError};

/// Index sets for one fold
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub train: Vec<usize>,
    pub validation: Vec<usize>,
}

/// Contiguous, unshuffled k-fold partition of `0..n`.
///
/// The first `n % k` folds hold one extra row. Every index is validated on
/// exactly once.
pub fn k_fold(n: usize, k: usize) -> Result<Vec<Fold>> {
    if k < 2 {
        return Err(TrainerError::InsufficientData(format!(
            "k-fold needs at least 2 folds, got {k}"
        )));
    }
    if n < k {
        return Err(TrainerError::InsufficientData(format!(
            "{n} rows cannot be split into {k} folds"
        )));
    }

    let base = n / k;
    let extra = n % k;
    let mut folds = Vec::with_capacity(k);
    let mut start = 0;

    for fold_idx in 0..k {
        let size = base + usize::from(fold_idx < extra);
        let end = start + size;
        folds.push(Fold {
            train: (0..start).chain(end..n).collect(),
            validation: (start..end).collect(),
        });
        start = end;
    }

    Ok(folds)
}
