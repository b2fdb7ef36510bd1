use cropprice_core::features::{COST_CULTIVATION2, CROP, STATE, TOTAL_COST_AVG};
use cropprice_core::{FeatureError, FeatureTransformer, RawTable};
use proptest::prelude::*;

// Property tests for the feature-engineering transform

const STATES: [&str; 5] = ["Punjab", "Bihar", "Kerala", "Gujarat", "Assam"];
const CROPS: [&str; 4] = ["Wheat", "Rice", "Maize", "Cotton"];

#[derive(Debug, Clone)]
struct Record {
    state: &'static str,
    crop: &'static str,
    cost: u32,
    cost2: u32,
    production: u32,
    yield_tenths: u32,
    temperature: u32,
    rainfall: u32,
    price: u32,
}

fn arbitrary_record() -> impl Strategy<Value = Record> {
    (
        prop::sample::select(STATES.to_vec()),
        prop::sample::select(CROPS.to_vec()),
        0u32..50_000,
        0u32..50_000,
        0u32..1_000_000,
        0u32..100,
        0u32..45,
        0u32..4_000,
        100u32..10_000,
    )
        .prop_map(
            |(state, crop, cost, cost2, production, yield_tenths, temperature, rainfall, price)| {
                Record {
                    state,
                    crop,
                    cost,
                    cost2,
                    production,
                    yield_tenths,
                    temperature,
                    rainfall,
                    price,
                }
            },
        )
}

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

fn table(records: &[Record]) -> RawTable {
    let rows = records
        .iter()
        .map(|r| {
            vec![
                r.state.to_string(),
                r.crop.to_string(),
                r.cost.to_string(),
                r.cost2.to_string(),
                r.production.to_string(),
                format!("{}.{}", r.yield_tenths / 10, r.yield_tenths % 10),
                r.temperature.to_string(),
                r.rainfall.to_string(),
                r.price.to_string(),
            ]
        })
        .collect();
    RawTable::new(header(), rows)
}

proptest! {
    #[test]
    fn transform_is_deterministic(records in prop::collection::vec(arbitrary_record(), 1..40)) {
        let transformer = FeatureTransformer::new();
        let input = table(&records);

        let first = transformer.fit_transform(&input).unwrap();
        let second = transformer.fit_transform(&input).unwrap();

        prop_assert_eq!(&first.encoding, &second.encoding);
        prop_assert_eq!(&first.dataset.feature_names, &second.dataset.feature_names);
        prop_assert_eq!(&first.dataset.rows, &second.dataset.rows);
    }

    #[test]
    fn encoding_round_trips_every_seen_value(
        records in prop::collection::vec(arbitrary_record(), 1..40),
    ) {
        let fitted = FeatureTransformer::new().fit_transform(&table(&records)).unwrap();

        for record in &records {
            for (column, value) in [(STATE, record.state), (CROP, record.crop)] {
                let code = fitted.encoding.encode(column, value);
                prop_assert!(code.is_some());
                prop_assert_eq!(fitted.encoding.decode(column, code.unwrap()), Some(value));
            }
        }
    }

    #[test]
    fn redundant_cost_column_is_pruned(
        records in prop::collection::vec(arbitrary_record(), 1..40),
    ) {
        let fitted = FeatureTransformer::new().fit_transform(&table(&records)).unwrap();
        let dataset = &fitted.dataset;

        prop_assert!(dataset.feature_index(COST_CULTIVATION2).is_none());
        let averages = dataset.column(TOTAL_COST_AVG).unwrap();
        for (record, avg) in records.iter().zip(averages) {
            prop_assert_eq!(avg, (record.cost as f64 + record.cost2 as f64) / 2.0);
        }
    }

    #[test]
    fn stored_encoding_reproduces_training_features(
        records in prop::collection::vec(arbitrary_record(), 1..40),
    ) {
        let transformer = FeatureTransformer::new();
        let input = table(&records);
        let fitted = transformer.fit_transform(&input).unwrap();

        let replayed = transformer.transform(&fitted.encoding, &input).unwrap();
        prop_assert_eq!(replayed, fitted.dataset);
    }
}

#[test]
fn unseen_category_gets_reserved_code() {
    let transformer = FeatureTransformer::new();
    let train = table(&[Record {
        state: "Punjab",
        crop: "Wheat",
        cost: 100,
        cost2: 110,
        production: 4_000,
        yield_tenths: 35,
        temperature: 25,
        rainfall: 600,
        price: 2_100,
    }]);
    let fitted = transformer.fit_transform(&train).unwrap();

    let mut unseen = table(&[Record {
        state: "Odisha",
        crop: "Wheat",
        cost: 100,
        cost2: 110,
        production: 4_000,
        yield_tenths: 35,
        temperature: 25,
        rainfall: 600,
        price: 2_100,
    }]);
    unseen.columns.pop();
    for row in &mut unseen.rows {
        row.pop();
    }

    let dataset = transformer.transform(&fitted.encoding, &unseen).unwrap();
    let state_idx = dataset.feature_index("State_Encoded").unwrap();
    let crop_idx = dataset.feature_index("Crop_Encoded").unwrap();
    assert_eq!(dataset.rows[0][state_idx], 1.0);
    assert_eq!(dataset.rows[0][crop_idx], 0.0);
    assert!(dataset.target.is_none());
}

#[test]
fn missing_column_is_a_schema_error() {
    let mut input = table(&[]);
    input.columns.retain(|c| c != "Temperature");
    match FeatureTransformer::new().fit_transform(&input) {
        Err(FeatureError::Schema { column }) => assert_eq!(column, "Temperature"),
        other => panic!("expected schema error, got {other:?}"),
    }
}
