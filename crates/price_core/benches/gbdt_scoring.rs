use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use cropprice_core::{Model, Node, Tree};

const ROW_COUNT: usize = 1024;
const FEATURE_COUNT: usize = 12;
const TREE_COUNT: usize = 200;

/// Complete depth-3 tree splitting on rotating features
fn balanced_tree(seed: usize) -> Tree {
    let mut nodes = Vec::with_capacity(15);
    for id in 0..7 {
        let feature = ((seed + id) % FEATURE_COUNT) as i32;
        let threshold = 100.0 * ((seed * 7 + id) % 13) as f64;
        nodes.push(Node::internal(
            id as i32,
            feature,
            threshold,
            2 * id as i32 + 1,
            2 * id as i32 + 2,
            1.0,
        ));
    }
    for id in 7..15 {
        let value = ((seed + id) % 9) as f64 - 4.0;
        nodes.push(Node::leaf(id as i32, value));
    }
    Tree::new(nodes)
}

fn benchmark_model() -> Model {
    Model::new((0..TREE_COUNT).map(balanced_tree).collect(), 2_500.0, FEATURE_COUNT)
}

fn generate_rows(count: usize) -> Vec<Vec<f64>> {
    (0..count)
        .map(|idx| {
            (0..FEATURE_COUNT)
                .map(|f| ((idx * 31 + f * 17) % 1_300) as f64)
                .collect()
        })
        .collect()
}

fn benchmark_gbdt_scoring(c: &mut Criterion) {
    let model = benchmark_model();
    let rows = generate_rows(ROW_COUNT);

    let mut group = c.benchmark_group("gbdt_scoring");
    group.throughput(Throughput::Elements(ROW_COUNT as u64));
    group.bench_function("predict_batch_1024_rows_200_trees", |b| {
        b.iter(|| {
            let predictions = model.predict_batch(&rows);
            criterion::black_box(predictions)
        });
    });
    group.bench_function("feature_importance_200_trees", |b| {
        b.iter(|| criterion::black_box(model.feature_importance()));
    });
    group.finish();
}

criterion_group!(benches, benchmark_gbdt_scoring);
criterion_main!(benches);
