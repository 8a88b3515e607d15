use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ensemble_bench::config::{BenchConfig, DatasetSource};
use ensemble_bench::experiment::{classifiers, load_data, LoadedData};
use ensemble_bench::optimizer::GridSearch;
use ensemble_bench::training::{
    DecisionTree, KNNClassifier, KernelKind, Model, NeighborAlgorithm, SVMClassifier, SVMConfig,
};

fn bundled() -> LoadedData {
    let config = BenchConfig::default().with_dataset(DatasetSource::Bundled);
    load_data(&config).unwrap()
}

fn bench_fit(c: &mut Criterion) {
    let data = bundled();
    let (x, y) = (&data.split.x_train, &data.split.y_train);

    let mut group = c.benchmark_group("fit");
    group.sample_size(20);

    for depth in [2, 4] {
        group.bench_with_input(BenchmarkId::new("decision_tree", depth), &depth, |b, &depth| {
            b.iter(|| {
                let mut tree = DecisionTree::new().with_max_depth(depth).with_random_state(42);
                tree.fit(black_box(x), black_box(y)).unwrap();
                tree
            })
        });
    }

    for kernel in [KernelKind::Linear, KernelKind::Rbf] {
        group.bench_with_input(BenchmarkId::new("svm", kernel), &kernel, |b, &kernel| {
            b.iter(|| {
                let mut svm = SVMClassifier::new(SVMConfig::default()).with_kernel(kernel);
                svm.fit(black_box(x), black_box(y)).unwrap();
                svm
            })
        });
    }

    group.finish();
}

fn bench_knn_predict(c: &mut Criterion) {
    let data = bundled();
    let mut group = c.benchmark_group("knn_predict");

    for algorithm in [NeighborAlgorithm::Brute, NeighborAlgorithm::KdTree, NeighborAlgorithm::BallTree] {
        let mut knn = KNNClassifier::with_k(5).with_algorithm(algorithm);
        knn.fit(&data.split.x_train, &data.split.y_train).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(algorithm), &knn, |b, knn| {
            b.iter(|| knn.predict(black_box(&data.split.x_test)).unwrap())
        });
    }

    group.finish();
}

fn bench_grid_search(c: &mut Criterion) {
    let data = bundled();
    let suite = classifiers(42);
    let search = GridSearch::new(10);
    let (x, y) = (&data.split.x_train, &data.split.y_train);

    let mut group = c.benchmark_group("grid_search");
    group.sample_size(10);

    group.bench_function("dt", |b| b.iter(|| search.fit(&suite.dt, x, y).unwrap().best_score));
    group.bench_function("knn", |b| b.iter(|| search.fit(&suite.knn, x, y).unwrap().best_score));

    group.finish();
}

criterion_group!(benches, bench_fit, bench_knn_predict, bench_grid_search);
criterion_main!(benches);
