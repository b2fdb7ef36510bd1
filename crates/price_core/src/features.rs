//! Raw table schema and the feature-engineering transform
//!
//! Turns raw agronomic records into a numeric feature matrix:
//! - Label-encodes `State` and `Crop` (lexicographic codes)
//! - Synthesizes four ratio/interaction features with `+1` smoothing
//! - Drops the categorical strings and the collinear `CostCultivation2`
//!
//! The output column order is fixed by the input header and never depends on
//! the data, so the same order is reproduced at inference time.

use crate::analysis::pearson;
use crate::encoding::{CategoryCodes, EncodingState};
use crate::errors::{FeatureError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, instrument, warn};

pub const STATE: &str = "State";
pub const CROP: &str = "Crop";
pub const PRODUCTION: &str = "Production";
pub const YIELD: &str = "Yield";
pub const RAINFALL_ANNUAL: &str = "RainFall_Annual";
pub const TEMPERATURE: &str = "Temperature";
pub const COST_CULTIVATION: &str = "CostCultivation";
pub const COST_CULTIVATION2: &str = "CostCultivation2";
pub const PRICE: &str = "Price";

/// Header spelling of `RainFall_Annual` used by the published dataset
pub const RAINFALL_ANNUAL_ALIAS: &str = "RainFall Annual";

pub const STATE_ENCODED: &str = "State_Encoded";
pub const CROP_ENCODED: &str = "Crop_Encoded";
pub const COST_EFFICIENCY: &str = "Cost_Efficiency";
pub const YIELD_RAINFALL_RATIO: &str = "Yield_Rainfall_Ratio";
pub const TEMP_RAIN_INTERACTION: &str = "Temp_Rain_Interaction";
pub const TOTAL_COST_AVG: &str = "Total_Cost_Avg";

pub const CATEGORICAL_COLUMNS: [&str; 2] = [STATE, CROP];

pub const NUMERIC_COLUMNS: [&str; 6] = [
    PRODUCTION,
    YIELD,
    RAINFALL_ANNUAL,
    TEMPERATURE,
    COST_CULTIVATION,
    COST_CULTIVATION2,
];

/// Raw columns that never reach the feature matrix
pub const DROPPED_COLUMNS: [&str; 3] = [STATE, CROP, COST_CULTIVATION2];

/// Features appended after the pass-through columns, in output order
pub const APPENDED_FEATURES: [&str; 6] = [
    STATE_ENCODED,
    CROP_ENCODED,
    COST_EFFICIENCY,
    YIELD_RAINFALL_RATIO,
    TEMP_RAIN_INTERACTION,
    TOTAL_COST_AVG,
];

fn canonical_column_name(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed == RAINFALL_ANNUAL_ALIAS {
        RAINFALL_ANNUAL.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Raw tabular input: a header and one string cell per column per row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Build a table, canonicalising header names
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            columns: columns.iter().map(|c| canonical_column_name(c)).collect(),
            rows,
        }
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|column| canonical_column_name(column) == name)
    }
}

/// Model-ready feature matrix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineeredDataset {
    pub feature_names: Vec<String>,
    pub rows: Vec<Vec<f64>>,
    /// `Price` per row when the input carried it
    pub target: Option<Vec<f64>>,
}

impl EngineeredDataset {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn feature_count(&self) -> usize {
        self.feature_names.len()
    }

    pub fn feature_index(&self, name: &str) -> Option<usize> {
        self.feature_names.iter().position(|n| n == name)
    }

    /// Copy of one feature column
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.feature_index(name)?;
        Some(self.rows.iter().map(|row| row[idx]).collect())
    }
}

/// Diagnostics produced while fitting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformReport {
    pub rows: usize,
    pub feature_count: usize,
    /// Pearson correlation of `CostCultivation` with `CostCultivation2`
    pub cost_correlation: Option<f64>,
    pub dropped_columns: Vec<String>,
    pub category_counts: BTreeMap<String, usize>,
}

/// Result of [`FeatureTransformer::fit_transform`]
#[derive(Debug, Clone, PartialEq)]
pub struct FittedFeatures {
    pub dataset: EngineeredDataset,
    pub encoding: EncodingState,
    pub report: TransformReport,
}

/// Header positions resolved once per table
struct ColumnLayout {
    width: usize,
    state: usize,
    crop: usize,
    production: usize,
    yield_: usize,
    rainfall: usize,
    temperature: usize,
    cost: usize,
    cost2: usize,
    price: Option<usize>,
    passthrough: Vec<(String, usize)>,
    /// Every column parsed as a number, in header order
    numeric: Vec<usize>,
}

impl ColumnLayout {
    fn resolve(table: &RawTable, require_target: bool) -> Result<Self> {
        let find = |name: &str| {
            table.column_index(name).ok_or_else(|| FeatureError::Schema {
                column: name.to_string(),
            })
        };

        let state = find(STATE)?;
        let crop = find(CROP)?;
        let production = find(PRODUCTION)?;
        let yield_ = find(YIELD)?;
        let rainfall = find(RAINFALL_ANNUAL)?;
        let temperature = find(TEMPERATURE)?;
        let cost = find(COST_CULTIVATION)?;
        let cost2 = find(COST_CULTIVATION2)?;
        let price = match table.column_index(PRICE) {
            Some(idx) => Some(idx),
            None if require_target => {
                return Err(FeatureError::Schema {
                    column: PRICE.to_string(),
                })
            }
            None => None,
        };

        let passthrough: Vec<(String, usize)> = table
            .columns
            .iter()
            .enumerate()
            .filter_map(|(idx, raw)| {
                let name = canonical_column_name(raw);
                if DROPPED_COLUMNS.contains(&name.as_str()) || name == PRICE {
                    None
                } else {
                    Some((name, idx))
                }
            })
            .collect();

        let mut numeric: Vec<usize> = passthrough.iter().map(|(_, idx)| *idx).collect();
        numeric.push(cost2);
        numeric.extend(price);
        numeric.sort_unstable();

        Ok(Self {
            width: table.columns.len(),
            state,
            crop,
            production,
            yield_,
            rainfall,
            temperature,
            cost,
            cost2,
            price,
            passthrough,
            numeric,
        })
    }

    fn feature_names(&self) -> Vec<String> {
        self.passthrough
            .iter()
            .map(|(name, _)| name.clone())
            .chain(APPENDED_FEATURES.iter().map(|name| name.to_string()))
            .collect()
    }

    fn check_rows(&self, table: &RawTable) -> Result<()> {
        for (i, row) in table.rows.iter().enumerate() {
            if row.len() != self.width {
                return Err(FeatureError::RaggedRow {
                    row: i + 1,
                    expected: self.width,
                    actual: row.len(),
                });
            }
        }
        Ok(())
    }
}

fn parse_numeric(row: usize, column: &str, raw: &str) -> Result<f64> {
    let trimmed = raw.trim();
    if trimmed.len() != raw.len() {
        debug!(row, column, "trimmed whitespace around numeric cell");
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(FeatureError::Type {
            row,
            column: column.to_string(),
            value: raw.to_string(),
        }),
    }
}

fn check_derived(row: usize, feature: &str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(FeatureError::Type {
            row,
            column: feature.to_string(),
            value: value.to_string(),
        })
    }
}

/// Encoded rows plus the raw cost pairs needed for the collinearity report
struct Built {
    dataset: EngineeredDataset,
    cost_pairs: (Vec<f64>, Vec<f64>),
}

fn codes_for<'a>(encoding: &'a EncodingState, column: &str) -> Result<&'a CategoryCodes> {
    encoding
        .column(column)
        .ok_or_else(|| FeatureError::MissingEncoding {
            column: column.to_string(),
        })
}

fn build(layout: &ColumnLayout, table: &RawTable, encoding: &EncodingState) -> Result<Built> {
    let state_codes = codes_for(encoding, STATE)?;
    let crop_codes = codes_for(encoding, CROP)?;

    let mut rows = Vec::with_capacity(table.len());
    let mut target = layout.price.map(|_| Vec::with_capacity(table.len()));
    let mut costs = Vec::with_capacity(table.len());
    let mut costs2 = Vec::with_capacity(table.len());
    let mut unseen: BTreeSet<(&'static str, String)> = BTreeSet::new();

    for (i, cells) in table.rows.iter().enumerate() {
        let row_no = i + 1;

        let mut parsed = vec![f64::NAN; layout.width];
        for &idx in &layout.numeric {
            parsed[idx] = parse_numeric(row_no, &table.columns[idx], &cells[idx])?;
        }

        let mut encode = |column: &'static str, codes: &CategoryCodes, raw: &str| -> f64 {
            let value = raw.trim();
            match codes.code(value) {
                Some(code) => code as f64,
                None => {
                    if unseen.insert((column, value.to_string())) {
                        warn!(
                            column,
                            value,
                            code = codes.unknown_code(),
                            "unseen category mapped to reserved code"
                        );
                    }
                    codes.unknown_code() as f64
                }
            }
        };
        let state_code = encode(STATE, state_codes, &cells[layout.state]);
        let crop_code = encode(CROP, crop_codes, &cells[layout.crop]);

        let production = parsed[layout.production];
        let yield_ = parsed[layout.yield_];
        let rainfall = parsed[layout.rainfall];
        let temperature = parsed[layout.temperature];
        let cost = parsed[layout.cost];
        let cost2 = parsed[layout.cost2];

        let mut features: Vec<f64> = layout
            .passthrough
            .iter()
            .map(|(_, idx)| parsed[*idx])
            .collect();
        features.push(state_code);
        features.push(crop_code);
        features.push(check_derived(row_no, COST_EFFICIENCY, production / (cost + 1.0))?);
        features.push(check_derived(row_no, YIELD_RAINFALL_RATIO, yield_ / (rainfall + 1.0))?);
        features.push(check_derived(row_no, TEMP_RAIN_INTERACTION, temperature * rainfall)?);
        features.push(check_derived(row_no, TOTAL_COST_AVG, (cost + cost2) / 2.0)?);

        if let (Some(targets), Some(price_idx)) = (target.as_mut(), layout.price) {
            targets.push(parsed[price_idx]);
        }
        costs.push(cost);
        costs2.push(cost2);
        rows.push(features);
    }

    Ok(Built {
        dataset: EngineeredDataset {
            feature_names: layout.feature_names(),
            rows,
            target,
        },
        cost_pairs: (costs, costs2),
    })
}

/// Deterministic raw-to-feature transform.
///
/// Holds no fitted state: fitting returns an [`EncodingState`] that callers
/// keep and hand back to [`FeatureTransformer::transform`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureTransformer;

impl FeatureTransformer {
    pub fn new() -> Self {
        Self
    }

    /// Fit the categorical encoding on `table` and transform it.
    ///
    /// `Price` is required and becomes the dataset target.
    #[instrument(skip(self, table), fields(rows = table.len()))]
    pub fn fit_transform(&self, table: &RawTable) -> Result<FittedFeatures> {
        let layout = ColumnLayout::resolve(table, true)?;
        layout.check_rows(table)?;

        let mut columns = BTreeMap::new();
        for (name, idx) in [(STATE, layout.state), (CROP, layout.crop)] {
            let codes = CategoryCodes::fit(table.rows.iter().map(|row| row[idx].trim()));
            info!(column = name, categories = codes.len(), "encoded categorical column");
            columns.insert(name.to_string(), codes);
        }
        let encoding = EncodingState::new(columns);

        let Built { dataset, cost_pairs } = build(&layout, table, &encoding)?;

        let cost_correlation = pearson(&cost_pairs.0, &cost_pairs.1);
        match cost_correlation {
            Some(r) => info!(correlation = r, "correlation between cost features"),
            None => info!(
                "correlation between cost features undefined (constant column or too few rows)"
            ),
        }
        info!(
            removed = ?DROPPED_COLUMNS,
            features = dataset.feature_count(),
            "feature selection complete"
        );

        let report = TransformReport {
            rows: dataset.len(),
            feature_count: dataset.feature_count(),
            cost_correlation,
            dropped_columns: DROPPED_COLUMNS.iter().map(|c| c.to_string()).collect(),
            category_counts: encoding.category_counts(),
        };

        Ok(FittedFeatures {
            dataset,
            encoding,
            report,
        })
    }

    /// Transform `table` with a previously fitted encoding.
    ///
    /// `Price` is optional here. Categories absent from `encoding` receive the
    /// column's reserved unknown code.
    #[instrument(skip_all, fields(rows = table.len()))]
    pub fn transform(
        &self,
        encoding: &EncodingState,
        table: &RawTable,
    ) -> Result<EngineeredDataset> {
        encoding.validate().map_err(FeatureError::InvalidEncoding)?;
        let layout = ColumnLayout::resolve(table, false)?;
        layout.check_rows(table)?;
        Ok(build(&layout, table, encoding)?.dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> Vec<String> {
        [
            "State",
            "Crop",
            "CostCultivation",
            "CostCultivation2",
            "Production",
            "Yield",
            "Temperature",
            "RainFall Annual",
            "Price",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    fn sample_table() -> RawTable {
        RawTable::new(
            header(),
            vec![
                row(&["Punjab", "Wheat", "100", "120", "4000", "3.5", "25", "600", "2100"]),
                row(&["Bihar", "Rice", "80", "90", "3000", "2.5", "30", "1200", "1900"]),
                row(&["Kerala", "Wheat", "120", "130", "5000", "4.0", "28", "2800", "2500"]),
            ],
        )
    }

    #[test]
    fn column_order_is_passthrough_then_appended() {
        let fitted = FeatureTransformer::new().fit_transform(&sample_table()).unwrap();
        assert_eq!(
            fitted.dataset.feature_names,
            vec![
                "CostCultivation",
                "Production",
                "Yield",
                "Temperature",
                "RainFall_Annual",
                "State_Encoded",
                "Crop_Encoded",
                "Cost_Efficiency",
                "Yield_Rainfall_Ratio",
                "Temp_Rain_Interaction",
                "Total_Cost_Avg",
            ]
        );
    }

    #[test]
    fn derived_features_use_smoothing() {
        let fitted = FeatureTransformer::new().fit_transform(&sample_table()).unwrap();
        let ds = &fitted.dataset;
        let first = &ds.rows[0];

        let at = |name: &str| first[ds.feature_index(name).unwrap()];
        assert_eq!(at(COST_EFFICIENCY), 4000.0 / 101.0);
        assert_eq!(at(YIELD_RAINFALL_RATIO), 3.5 / 601.0);
        assert_eq!(at(TEMP_RAIN_INTERACTION), 25.0 * 600.0);
        assert_eq!(at(TOTAL_COST_AVG), 110.0);
    }

    #[test]
    fn categorical_codes_are_sorted() {
        let fitted = FeatureTransformer::new().fit_transform(&sample_table()).unwrap();
        let states = fitted.dataset.column(STATE_ENCODED).unwrap();
        // Bihar=0, Kerala=1, Punjab=2
        assert_eq!(states, vec![2.0, 0.0, 1.0]);
        let crops = fitted.dataset.column(CROP_ENCODED).unwrap();
        assert_eq!(crops, vec![1.0, 0.0, 1.0]);
    }

    #[test]
    fn collinear_cost_column_is_dropped() {
        let fitted = FeatureTransformer::new().fit_transform(&sample_table()).unwrap();
        assert!(fitted.dataset.feature_index(COST_CULTIVATION2).is_none());
        assert!(fitted.dataset.feature_index(STATE).is_none());
        assert!(fitted.dataset.feature_index(PRICE).is_none());
        assert_eq!(fitted.dataset.target, Some(vec![2100.0, 1900.0, 2500.0]));
        assert!(fitted.report.cost_correlation.unwrap() > 0.9);
    }

    #[test]
    fn missing_column_is_schema_error() {
        let mut table = sample_table();
        let idx = table.column_index(YIELD).unwrap();
        table.columns.remove(idx);
        for row in &mut table.rows {
            row.remove(idx);
        }
        let err = FeatureTransformer::new().fit_transform(&table).unwrap_err();
        assert_eq!(
            err,
            FeatureError::Schema {
                column: YIELD.to_string()
            }
        );
    }

    #[test]
    fn missing_price_only_fails_when_fitting() {
        let mut table = sample_table();
        let idx = table.column_index(PRICE).unwrap();
        table.columns.remove(idx);
        for row in &mut table.rows {
            row.remove(idx);
        }
        let transformer = FeatureTransformer::new();
        assert!(matches!(
            transformer.fit_transform(&table),
            Err(FeatureError::Schema { .. })
        ));

        let fitted = transformer.fit_transform(&sample_table()).unwrap();
        let ds = transformer.transform(&fitted.encoding, &table).unwrap();
        assert_eq!(ds.target, None);
        assert_eq!(ds.feature_names, fitted.dataset.feature_names);
    }

    #[test]
    fn non_numeric_cell_is_type_error() {
        let mut table = sample_table();
        table.rows[1][4] = "lots".to_string();
        let err = FeatureTransformer::new().fit_transform(&table).unwrap_err();
        assert_eq!(
            err,
            FeatureError::Type {
                row: 2,
                column: PRODUCTION.to_string(),
                value: "lots".to_string(),
            }
        );
    }

    #[test]
    fn nan_and_empty_cells_are_rejected() {
        for bad in ["NaN", "inf", ""] {
            let mut table = sample_table();
            table.rows[0][6] = bad.to_string();
            assert!(matches!(
                FeatureTransformer::new().fit_transform(&table),
                Err(FeatureError::Type { row: 1, .. })
            ));
        }
    }

    #[test]
    fn non_finite_derived_feature_is_type_error() {
        let mut table = sample_table();
        table.rows[0][2] = "-1".to_string();
        let err = FeatureTransformer::new().fit_transform(&table).unwrap_err();
        assert!(matches!(err, FeatureError::Type { ref column, .. } if column == COST_EFFICIENCY));
    }

    #[test]
    fn ragged_row_is_rejected() {
        let mut table = sample_table();
        table.rows[2].pop();
        assert_eq!(
            FeatureTransformer::new().fit_transform(&table).unwrap_err(),
            FeatureError::RaggedRow {
                row: 3,
                expected: 9,
                actual: 8
            }
        );
    }

    #[test]
    fn unseen_category_gets_reserved_code() {
        let transformer = FeatureTransformer::new();
        let fitted = transformer.fit_transform(&sample_table()).unwrap();

        let table = RawTable::new(
            header(),
            vec![row(&["Goa", "Wheat", "100", "120", "4000", "3.5", "25", "600", "0"])],
        );
        let ds = transformer.transform(&fitted.encoding, &table).unwrap();
        assert_eq!(ds.column(STATE_ENCODED).unwrap(), vec![3.0]);
        assert_eq!(ds.column(CROP_ENCODED).unwrap(), vec![1.0]);
    }

    #[test]
    fn transform_without_encoding_for_column_fails() {
        let err = FeatureTransformer::new()
            .transform(&EncodingState::default(), &sample_table())
            .unwrap_err();
        assert_eq!(
            err,
            FeatureError::MissingEncoding {
                column: STATE.to_string()
            }
        );
    }

    #[test]
    fn unsorted_stored_encoding_is_rejected() {
        let transformer = FeatureTransformer::new();
        let mut encoding = transformer.fit_transform(&sample_table()).unwrap().encoding;
        encoding.columns.get_mut(CROP).unwrap().categories.reverse();

        assert!(matches!(
            transformer.transform(&encoding, &sample_table()),
            Err(FeatureError::InvalidEncoding(_))
        ));
    }

    #[test]
    fn extra_numeric_columns_pass_through() {
        let mut table = sample_table();
        table.columns.push("Area".to_string());
        for (i, row) in table.rows.iter_mut().enumerate() {
            row.push(format!("{}", 10 * (i + 1)));
        }
        let fitted = FeatureTransformer::new().fit_transform(&table).unwrap();
        let area = fitted.dataset.feature_index("Area").unwrap();
        assert_eq!(area, 5);
        assert_eq!(fitted.dataset.column("Area").unwrap(), vec![10.0, 20.0, 30.0]);
    }
}
