//! Categorical label encoding
//!
//! Codes follow the lexicographic order of the distinct values observed while
//! fitting, so identical inputs always produce identical codes. The fitted
//! state is an immutable value: fitting builds a new one, transforming only
//! reads it.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Sorted category list for one column; the code of a value is its index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCodes {
    pub categories: Vec<String>,
}

impl CategoryCodes {
    /// Fit codes from the observed values of one column
    pub fn fit<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let distinct: BTreeSet<&str> = values.into_iter().collect();
        Self {
            categories: distinct.into_iter().map(str::to_owned).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Code of an observed value
    pub fn code(&self, value: &str) -> Option<u32> {
        self.categories
            .binary_search_by(|category| category.as_str().cmp(value))
            .ok()
            .map(|idx| idx as u32)
    }

    /// Value behind a code
    pub fn decode(&self, code: u32) -> Option<&str> {
        self.categories.get(code as usize).map(String::as_str)
    }

    /// Codes are positions in `categories`, so it must be strictly ascending.
    pub fn validate(&self) -> Result<(), String> {
        match self.categories.windows(2).position(|pair| pair[0] >= pair[1]) {
            Some(i) => Err(format!(
                "categories not strictly ascending at {i}: {:?} then {:?}",
                self.categories[i],
                self.categories[i + 1]
            )),
            None => Ok(()),
        }
    }

    /// Code reserved for values that were not seen during fitting.
    ///
    /// It sits one past the last observed code and never decodes.
    pub fn unknown_code(&self) -> u32 {
        self.categories.len() as u32
    }
}

/// Fitted encoding for every categorical column, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodingState {
    pub columns: BTreeMap<String, CategoryCodes>,
}

impl EncodingState {
    pub fn new(columns: BTreeMap<String, CategoryCodes>) -> Self {
        Self { columns }
    }

    pub fn column(&self, name: &str) -> Option<&CategoryCodes> {
        self.columns.get(name)
    }

    /// Encode an observed value; `None` for unknown columns or unseen values
    pub fn encode(&self, column: &str, value: &str) -> Option<u32> {
        self.column(column)?.code(value)
    }

    pub fn decode(&self, column: &str, code: u32) -> Option<&str> {
        self.column(column)?.decode(code)
    }

    /// Check every column's codes; the error names the column
    pub fn validate(&self) -> Result<(), String> {
        for (name, codes) in &self.columns {
            codes.validate().map_err(|e| format!("column `{name}`: {e}"))?;
        }
        Ok(())
    }

    /// Number of categories per column
    pub fn category_counts(&self) -> BTreeMap<String, usize> {
        self.columns
            .iter()
            .map(|(name, codes)| (name.clone(), codes.len()))
            .collect()
    }
}
