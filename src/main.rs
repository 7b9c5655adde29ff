use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing::{info, warn};

use canopy_io::{
    EvaluationReport, ExperimentName, LabelledCsvReader, LabelledTable, ResultWriter, write_table,
};
use canopy_tree::{
    ConfusionMatrix, DEFAULT_CUTOFF, Dataset, EnsembleConfig, MaxFeatures, SavedModel,
    TreeConfig, synthetic,
};

#[derive(Parser)]
#[command(name = "canopy")]
#[command(about = "Gini decision trees, bagging and random forests for binary classification")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for reproducibility
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

/// Shared growth parameters for trees and ensembles.
#[derive(Args, Debug, Clone)]
struct TreeArgs {
    /// Maximum branch depth (the root is depth 1)
    #[arg(long, default_value_t = 4)]
    max_depth: usize,

    /// Stop splitting once the split impurity is at or below this value
    #[arg(long, default_value_t = 0.0)]
    gini_threshold: f64,

    /// Minimum observations on each side of a split for growth to continue
    #[arg(long, default_value_t = 1)]
    min_observations: usize,

    /// Number of evenly spaced candidate thresholds per feature
    #[arg(long, default_value_t = 50)]
    n_candidates: usize,
}

#[derive(Subcommand)]
enum Command {
    /// Fit a model on a random train split and score it on the held-out rows
    Fit {
        /// Path to the input CSV file
        #[arg(long)]
        data: PathBuf,

        /// Name of the 0/1 label column
        #[arg(long)]
        label: String,

        /// Model kind: "tree", "bag", or "forest"
        #[arg(long, default_value = "forest")]
        method: String,

        /// Experiment name for output files (must match [a-zA-Z0-9_-]+)
        #[arg(long)]
        experiment: String,

        /// Output directory for result files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        /// Probability that a row is held out for testing
        #[arg(long, default_value_t = 0.3)]
        test_fraction: f64,

        /// Number of bootstrap replicates (bag and forest only)
        #[arg(long, default_value_t = 50)]
        n_trees: usize,

        /// Features drawn per branch (forest only; defaults to max(2, ceil(sqrt(p))))
        #[arg(long)]
        m_features: Option<usize>,

        #[command(flatten)]
        tree: TreeArgs,
    },

    /// Score new rows with a saved model
    Predict {
        /// Path to the saved model binary
        #[arg(long)]
        model: PathBuf,

        /// Path to the input CSV file
        #[arg(long)]
        data: PathBuf,

        /// Name of the 0/1 label column
        #[arg(long)]
        label: String,

        /// Experiment name for output files
        #[arg(long)]
        experiment: String,

        /// Output directory for result files
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,
    },

    /// Write a synthetic labelled dataset to CSV
    Simulate {
        /// Pattern: "checkerboard", "angled", or "noisy"
        #[arg(long)]
        pattern: String,

        /// Number of rows
        #[arg(long, default_value_t = 1000)]
        n: usize,

        /// Output CSV path
        #[arg(long)]
        output: PathBuf,

        /// Number of feature columns (noisy only)
        #[arg(long, default_value_t = 5)]
        n_features: usize,

        /// Target share of positive labels before noise (noisy only)
        #[arg(long, default_value_t = 0.2)]
        positive_rate: f64,

        /// Probability of flipping each label (noisy only)
        #[arg(long, default_value_t = 0.1)]
        flip_rate: f64,
    },
}

#[derive(Debug, Clone, Copy)]
enum Method {
    Tree,
    Bag,
    Forest,
}

impl Method {
    fn as_str(self) -> &'static str {
        match self {
            Method::Tree => "tree",
            Method::Bag => "bag",
            Method::Forest => "forest",
        }
    }
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct FitOutput {
    experiment: String,
    method: &'static str,
    n_train: usize,
    n_test: usize,
    n_features: usize,
    n_trees: usize,
    n_failed_replicates: usize,
    test_accuracy: f64,
    n_undefined: usize,
    model_path: PathBuf,
}

#[derive(Serialize)]
struct PredictOutput {
    experiment: String,
    model_kind: &'static str,
    n_rows: usize,
    n_undefined: usize,
    accuracy: f64,
}

#[derive(Serialize)]
struct SimulateOutput {
    pattern: String,
    n_rows: usize,
    n_features: usize,
    n_positive: usize,
    output: PathBuf,
}

fn parse_method(s: &str) -> Result<Method> {
    match s {
        "tree" => Ok(Method::Tree),
        "bag" => Ok(Method::Bag),
        "forest" => Ok(Method::Forest),
        other => anyhow::bail!("unknown method: {other} (expected tree, bag, or forest)"),
    }
}

fn read_dataset(path: &Path, label: &str) -> Result<(LabelledTable, Dataset)> {
    let table = LabelledCsvReader::new(path, label)
        .read()
        .context("failed to read input CSV")?;
    let dataset = Dataset::from_rows(table.feature_names().to_vec(), table.rows(), table.labels())
        .context("input CSV does not form a valid dataset")?;
    Ok((table, dataset))
}

fn ensemble_config(
    method: Method,
    n_trees: usize,
    m_features: Option<usize>,
    tree: &TreeArgs,
    seed: u64,
) -> Result<EnsembleConfig> {
    let config = match (method, m_features) {
        (Method::Forest, Some(m)) => {
            EnsembleConfig::random_forest(n_trees)?.with_max_features(MaxFeatures::Fixed(m))
        }
        (Method::Forest, None) => EnsembleConfig::random_forest(n_trees)?,
        (_, m) => {
            if m.is_some() {
                warn!("--m-features only applies to forest; ignored");
            }
            EnsembleConfig::bagging(n_trees)?
        }
    };
    Ok(config
        .with_max_depth(tree.max_depth)
        .with_gini_threshold(tree.gini_threshold)
        .with_min_observations(tree.min_observations)
        .with_n_candidates(tree.n_candidates)
        .with_seed(seed))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Configure Rayon thread pool
    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Fit {
            data,
            label,
            method,
            experiment,
            output_dir,
            test_fraction,
            n_trees,
            m_features,
            tree,
        } => {
            let method = parse_method(&method)?;
            let experiment_name = ExperimentName::new(experiment.clone())?;

            // 1. Read and split
            let (_, dataset) = read_dataset(&data, &label)?;
            let mut rng = ChaCha8Rng::seed_from_u64(cli.seed);
            let (train, test) = dataset
                .train_test_split(test_fraction, &mut rng)
                .context("invalid train/test split")?;
            info!(
                n_train = train.n_observations(),
                n_test = test.n_observations(),
                "dataset split"
            );

            // 2. Fit, score the test rows, and save
            let writer = ResultWriter::new(&output_dir, experiment_name)?;
            let model_path = writer.model_path();
            let (scores, n_trees, n_failed) = match method {
                Method::Tree => {
                    let table = TreeConfig::new()
                        .with_max_depth(tree.max_depth)
                        .with_gini_threshold(tree.gini_threshold)
                        .with_min_observations(tree.min_observations)
                        .with_n_candidates(tree.n_candidates)
                        .with_seed(cli.seed)
                        .fit(&train)
                        .context("tree fitting failed")?;
                    info!(n_branches = table.len(), depth = table.depth(), "tree fitted");
                    table.save(&model_path).context("failed to save model")?;
                    let scores = table
                        .predict_dataset(&test)
                        .context("prediction failed")?
                        .into_iter()
                        .map(Some)
                        .collect::<Vec<_>>();
                    (scores, 1, 0)
                }
                Method::Bag | Method::Forest => {
                    let ensemble = ensemble_config(method, n_trees, m_features, &tree, cli.seed)?
                        .fit(&train)
                        .context("ensemble fitting failed")?;
                    ensemble.save(&model_path).context("failed to save model")?;
                    let prediction = ensemble
                        .predict_dataset(&test)
                        .context("prediction failed")?;
                    (
                        prediction.scores().to_vec(),
                        ensemble.n_trees(),
                        ensemble.n_failed(),
                    )
                }
            };
            info!(path = %model_path.display(), "model saved");

            // 3. Evaluate
            let confusion = ConfusionMatrix::from_scores(test.labels(), &scores, DEFAULT_CUTOFF)?;
            info!("test-set confusion matrix\n{confusion}");
            let report = EvaluationReport {
                method: method.as_str().to_string(),
                n_train: train.n_observations(),
                n_test: test.n_observations(),
                n_trees,
                n_failed_replicates: n_failed,
                n_undefined: confusion.n_skipped(),
                cutoff: DEFAULT_CUTOFF,
                test_accuracy: confusion.accuracy(),
                confusion_matrix: confusion.as_rows(),
                class_metrics: confusion
                    .class_metrics()
                    .iter()
                    .map(|m| (m.precision, m.recall, m.f1, m.support))
                    .collect(),
            };
            writer.write_evaluation(&report)?;
            writer.write_predictions(&scores, test.labels(), DEFAULT_CUTOFF)?;

            // 4. Print summary
            let output = FitOutput {
                experiment,
                method: method.as_str(),
                n_train: report.n_train,
                n_test: report.n_test,
                n_features: dataset.n_features(),
                n_trees,
                n_failed_replicates: n_failed,
                test_accuracy: report.test_accuracy,
                n_undefined: report.n_undefined,
                model_path,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Predict {
            model,
            data,
            label,
            experiment,
            output_dir,
        } => {
            let experiment_name = ExperimentName::new(experiment.clone())?;

            // 1. Load model and data
            let saved = SavedModel::load(&model).context("failed to load model")?;
            let (table, dataset) = read_dataset(&data, &label)?;
            if saved.feature_names() != table.feature_names() {
                anyhow::bail!(
                    "feature columns {:?} do not match the model's {:?}",
                    table.feature_names(),
                    saved.feature_names()
                );
            }

            // 2. Predict
            let scores: Vec<Option<f64>> = match &saved {
                SavedModel::Tree(tree) => tree
                    .predict_dataset(&dataset)
                    .context("prediction failed")?
                    .into_iter()
                    .map(Some)
                    .collect(),
                SavedModel::Ensemble(ensemble) => ensemble
                    .predict_dataset(&dataset)
                    .context("prediction failed")?
                    .scores()
                    .to_vec(),
            };
            let confusion =
                ConfusionMatrix::from_scores(dataset.labels(), &scores, DEFAULT_CUTOFF)?;

            // 3. Write predictions JSON
            let writer = ResultWriter::new(&output_dir, experiment_name)?;
            writer.write_predictions(&scores, dataset.labels(), DEFAULT_CUTOFF)?;

            // 4. Print summary
            let output = PredictOutput {
                experiment,
                model_kind: saved.kind(),
                n_rows: table.n_rows(),
                n_undefined: confusion.n_skipped(),
                accuracy: confusion.accuracy(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Simulate {
            pattern,
            n,
            output,
            n_features,
            positive_rate,
            flip_rate,
        } => {
            if n == 0 {
                anyhow::bail!("--n must be at least 1");
            }
            let dataset = match pattern.as_str() {
                "checkerboard" => synthetic::checkerboard(n, cli.seed),
                "angled" => synthetic::angled(n, cli.seed),
                "noisy" => {
                    synthetic::noisy_imbalanced(n, n_features, positive_rate, flip_rate, cli.seed)
                }
                other => anyhow::bail!(
                    "unknown pattern: {other} (expected checkerboard, angled, or noisy)"
                ),
            };
            let table = LabelledTable::new(
                "y".to_string(),
                dataset.feature_names().to_vec(),
                dataset.rows(),
                dataset.labels().to_vec(),
            );
            write_table(&output, &table).context("failed to write simulated CSV")?;

            let output = SimulateOutput {
                pattern,
                n_rows: table.n_rows(),
                n_features: table.n_features(),
                n_positive: table.labels().iter().filter(|&&l| l == 1.0).count(),
                output,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
