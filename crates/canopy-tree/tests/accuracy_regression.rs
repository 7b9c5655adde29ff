//! Accuracy regression tests for canopy-tree.
//!
//! These tests verify that algorithmic changes do not degrade tree and
//! ensemble accuracy on deterministic synthetic datasets.

use canopy_tree::{
    BranchTable, Dataset, Ensemble, EnsembleConfig, MaxFeatures, TreeConfig, accuracy, synthetic,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn training_accuracy(tree: &BranchTable, data: &Dataset) -> f64 {
    let predictions = tree.predict_dataset(data).unwrap();
    accuracy(data.labels(), &predictions).unwrap()
}

fn variance(values: &[f64]) -> f64 {
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}

// ---------------------------------------------------------------------------
// a) checkerboard_training_accuracy
// ---------------------------------------------------------------------------

/// A depth-4 tree must recover the 3×3 checkerboard to better than 90%.
#[test]
fn checkerboard_training_accuracy() {
    let data = synthetic::checkerboard(1000, 42);
    let tree = TreeConfig::new()
        .with_max_depth(4)
        .with_gini_threshold(0.0)
        .with_min_observations(1)
        .fit(&data)
        .unwrap();

    let acc = training_accuracy(&tree, &data);
    assert!(acc > 0.90, "checkerboard training accuracy {acc} <= 0.90");
}

// ---------------------------------------------------------------------------
// b) angled_boundary_is_approximated_by_rectangles
// ---------------------------------------------------------------------------

/// A diagonal boundary at depth 2 is a four-rectangle staircase and must
/// fall clearly short of the depth-4 checkerboard fit.
#[test]
fn angled_boundary_is_approximated_by_rectangles() {
    let checker = synthetic::checkerboard(1000, 42);
    let checker_acc = training_accuracy(&TreeConfig::new().fit(&checker).unwrap(), &checker);

    let angled = synthetic::angled(1000, 42);
    let shallow = TreeConfig::new().with_max_depth(2).fit(&angled).unwrap();
    let angled_acc = training_accuracy(&shallow, &angled);

    assert!(angled_acc < 0.92, "angled depth-2 accuracy {angled_acc} >= 0.92");
    assert!(
        angled_acc < checker_acc,
        "angled {angled_acc} not worse than checkerboard {checker_acc}"
    );

    let deep = TreeConfig::new().with_max_depth(8).fit(&angled).unwrap();
    assert!(training_accuracy(&deep, &angled) > angled_acc);
}

// ---------------------------------------------------------------------------
// c) bagging_reduces_accuracy_variance
// ---------------------------------------------------------------------------

/// Across reseeded runs, a 50-tree bag must vary less in test accuracy than
/// a single tree grown on one bootstrap sample.
#[test]
fn bagging_reduces_accuracy_variance() {
    let train = synthetic::noisy_imbalanced(500, 5, 0.25, 0.15, 1);
    let test = synthetic::noisy_imbalanced(500, 5, 0.25, 0.15, 2);
    let test_rows = test.rows();

    let run = |n_trees: usize, seed: u64| -> f64 {
        let prediction = EnsembleConfig::bagging(n_trees)
            .unwrap()
            .with_max_depth(4)
            .with_seed(seed)
            .fit_predict(&train, &test_rows)
            .unwrap();
        accuracy(test.labels(), &prediction.defined_scores().unwrap()).unwrap()
    };

    let seeds: Vec<u64> = (100..110).collect();
    let single: Vec<f64> = seeds.iter().map(|&s| run(1, s)).collect();
    let bagged: Vec<f64> = seeds.iter().map(|&s| run(50, s)).collect();

    let (single_var, bagged_var) = (variance(&single), variance(&bagged));
    assert!(
        bagged_var < single_var,
        "bagged variance {bagged_var} >= single-tree variance {single_var}"
    );
}

// ---------------------------------------------------------------------------
// d) branch_ids_respect_max_depth
// ---------------------------------------------------------------------------

/// No branch id may be longer than `max_depth`, and every non-root branch's
/// parent must be recorded.
#[test]
fn branch_ids_respect_max_depth() {
    let data = synthetic::noisy_imbalanced(400, 4, 0.4, 0.1, 7);
    for max_depth in [1, 2, 3, 5, 7] {
        let tree = TreeConfig::new().with_max_depth(max_depth).fit(&data).unwrap();
        assert!(tree.depth() <= max_depth);
        for branch in tree.iter() {
            assert!(branch.id.depth() <= max_depth);
            if let Some(parent) = branch.id.parent() {
                assert!(tree.contains(&parent), "orphan branch {}", branch.id);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// e) deterministic_predictions
// ---------------------------------------------------------------------------

/// Same config and seed must produce identical predictions across two runs.
#[test]
fn deterministic_predictions() {
    let data = synthetic::noisy_imbalanced(300, 6, 0.3, 0.1, 3);
    let config = EnsembleConfig::random_forest(20).unwrap().with_seed(42);

    let first = config.fit(&data).unwrap().predict_dataset(&data).unwrap();
    let second = config.fit(&data).unwrap().predict_dataset(&data).unwrap();

    assert_eq!(
        first.scores(),
        second.scores(),
        "predictions differ across runs with the same seed"
    );
}

// ---------------------------------------------------------------------------
// f) forest_accuracy_on_held_out_data
// ---------------------------------------------------------------------------

/// A random forest must beat the majority-class baseline on held-out data.
#[test]
fn forest_accuracy_on_held_out_data() {
    let train = synthetic::noisy_imbalanced(600, 6, 0.3, 0.05, 11);
    let test = synthetic::noisy_imbalanced(400, 6, 0.3, 0.05, 12);

    let ensemble = EnsembleConfig::random_forest(40)
        .unwrap()
        .with_max_depth(5)
        .fit(&train)
        .unwrap();
    assert_eq!(ensemble.max_features(), MaxFeatures::SqrtAtLeastTwo);

    let scores = ensemble.predict_dataset(&test).unwrap().defined_scores().unwrap();
    let acc = accuracy(test.labels(), &scores).unwrap();

    let positive_share = test.labels().iter().sum::<f64>() / test.n_observations() as f64;
    let baseline = positive_share.max(1.0 - positive_share);
    assert!(acc > baseline, "forest accuracy {acc} <= baseline {baseline}");
}

// ---------------------------------------------------------------------------
// g) forest_restricts_feature_search_per_branch
// ---------------------------------------------------------------------------

/// Column 0 separates the classes perfectly; column 1 is uniform noise.
fn one_informative_column(n: usize, seed: u64) -> Dataset {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let labels: Vec<f64> = (0..n).map(|i| (i % 2) as f64).collect();
    let rows: Vec<Vec<f64>> = labels
        .iter()
        .map(|&label| vec![10.0 * label + rng.r#gen::<f64>(), rng.r#gen::<f64>()])
        .collect();
    Dataset::from_rows(vec!["signal".into(), "noise".into()], &rows, &labels).unwrap()
}

fn split_features(ensemble: &Ensemble) -> Vec<usize> {
    ensemble
        .replicates()
        .iter()
        .filter_map(|r| r.tree())
        .flat_map(|tree| tree.iter().map(|b| b.feature.index()))
        .collect()
}

/// With one feature drawn per branch, some forest branches must split on the
/// noise column. Bagging searches every feature and always finds the signal.
#[test]
fn forest_restricts_feature_search_per_branch() {
    let data = one_informative_column(100, 21);

    let bagged = EnsembleConfig::bagging(20).unwrap().fit(&data).unwrap();
    let bagged_features = split_features(&bagged);
    assert!(!bagged_features.is_empty());
    assert!(
        bagged_features.iter().all(|&f| f == 0),
        "bagging split on noise: {bagged_features:?}"
    );

    let forest = EnsembleConfig::random_forest(20)
        .unwrap()
        .with_max_features(MaxFeatures::Fixed(1))
        .fit(&data)
        .unwrap();
    let forest_features = split_features(&forest);
    assert!(
        forest_features.contains(&1),
        "no forest branch split on the noise column: {forest_features:?}"
    );
}
