//! Breast-cancer (Wisconsin diagnostic) dataset
//!
//! 569 samples, 30 real-valued features, binary target with
//! `0 = malignant` (212 samples) and `1 = benign` (357 samples).
//!
//! The bundled copy is scikit-learn's `breast_cancer.csv` (UCI WDBC, CC BY 4.0),
//! compiled into the binary. Another file in the same layout can be loaded
//! through [`DatasetSource::Csv`].

use super::Dataset;
use crate::config::DatasetSource;
use crate::error::{BenchError, Result};
use csv::ReaderBuilder;
use ndarray::{Array1, Array2};
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

pub const N_SAMPLES: usize = 569;
pub const N_FEATURES: usize = 30;

pub const TARGET_NAMES: [&str; 2] = ["malignant", "benign"];

pub const FEATURE_NAMES: [&str; N_FEATURES] = [
    "mean radius",
    "mean texture",
    "mean perimeter",
    "mean area",
    "mean smoothness",
    "mean compactness",
    "mean concavity",
    "mean concave points",
    "mean symmetry",
    "mean fractal dimension",
    "radius error",
    "texture error",
    "perimeter error",
    "area error",
    "smoothness error",
    "compactness error",
    "concavity error",
    "concave points error",
    "symmetry error",
    "fractal dimension error",
    "worst radius",
    "worst texture",
    "worst perimeter",
    "worst area",
    "worst smoothness",
    "worst compactness",
    "worst concavity",
    "worst concave points",
    "worst symmetry",
    "worst fractal dimension",
];

/// scikit-learn's copy of the UCI WDBC data, in the layout [`from_csv`] reads
const BUNDLED_CSV: &str = include_str!("breast_cancer.csv");

/// Load the breast-cancer dataset from the configured source
pub fn load_breast_cancer(source: &DatasetSource) -> Result<Dataset> {
    let dataset = match source {
        DatasetSource::Bundled => bundled()?,
        DatasetSource::Csv(path) => from_csv(path)?,
    };

    info!(
        n_samples = dataset.n_samples(),
        n_features = dataset.n_features(),
        source = ?source,
        "Loaded breast cancer dataset"
    );
    Ok(dataset)
}

fn bundled() -> Result<Dataset> {
    let rdr = csv_reader().from_reader(BUNDLED_CSV.as_bytes());
    parse_records(rdr, "bundled breast_cancer.csv")
}

fn csv_reader() -> ReaderBuilder {
    let mut builder = ReaderBuilder::new();
    builder.has_headers(false).flexible(true).trim(csv::Trim::All);
    builder
}

/// Parse the scikit-learn CSV layout: a `n_samples,n_features,target_name...`
/// header followed by rows of `n_features` values and an integer target.
fn from_csv(path: &Path) -> Result<Dataset> {
    let rdr = csv_reader().from_path(path)?;
    parse_records(rdr, &path.display().to_string())
}

fn parse_records<R: Read>(mut rdr: csv::Reader<R>, origin: &str) -> Result<Dataset> {
    let mut records = rdr.records();
    let header = records
        .next()
        .ok_or_else(|| BenchError::DataError(format!("{} is empty", origin)))??;

    let parse_count = |idx: usize, what: &str| -> Result<usize> {
        header
            .get(idx)
            .and_then(|v| v.parse().ok())
            .ok_or_else(|| BenchError::DataError(format!("header is missing {}", what)))
    };
    let n_samples = parse_count(0, "n_samples")?;
    let n_features = parse_count(1, "n_features")?;
    let target_names: Vec<String> = header.iter().skip(2).map(String::from).collect();

    let mut values = Vec::with_capacity(n_samples * n_features);
    let mut target = Vec::with_capacity(n_samples);

    for (row, record) in records.enumerate() {
        let record = record?;
        if record.len() != n_features + 1 {
            return Err(BenchError::DataError(format!(
                "row {} has {} fields, expected {}",
                row + 1,
                record.len(),
                n_features + 1
            )));
        }
        for field in record.iter().take(n_features) {
            let v: f64 = field.parse().map_err(|_| {
                BenchError::DataError(format!("row {}: invalid number '{}'", row + 1, field))
            })?;
            values.push(v);
        }
        let label: i64 = record[n_features].parse().map_err(|_| {
            BenchError::DataError(format!(
                "row {}: invalid label '{}'",
                row + 1,
                &record[n_features]
            ))
        })?;
        target.push(label as f64);
    }

    if target.len() != n_samples {
        return Err(BenchError::DataError(format!(
            "header declares {} samples, file has {}",
            n_samples,
            target.len()
        )));
    }
    debug!(origin, n_samples, n_features, "Parsed dataset CSV");

    let feature_names = if n_features == N_FEATURES {
        FEATURE_NAMES.iter().map(|s| s.to_string()).collect()
    } else {
        (0..n_features).map(|i| format!("feature_{}", i)).collect()
    };

    Dataset::new(
        Array2::from_shape_vec((n_samples, n_features), values)?,
        Array1::from_vec(target),
        feature_names,
        target_names,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_bundled_shape_and_classes() {
        let ds = load_breast_cancer(&DatasetSource::Bundled).unwrap();

        assert_eq!(ds.n_samples(), N_SAMPLES);
        assert_eq!(ds.n_features(), N_FEATURES);
        let counts = ds.class_counts();
        assert_eq!(counts.get(&0), Some(&212));
        assert_eq!(counts.get(&1), Some(&357));
        assert_eq!(ds.target_names, vec!["malignant", "benign"]);
        assert!(ds.features.iter().all(|v| v.is_finite() && *v >= 0.0));
    }

    #[test]
    fn test_bundled_is_wdbc() {
        let ds = load_breast_cancer(&DatasetSource::Bundled).unwrap();

        let first: Vec<f64> = ds.features.row(0).iter().take(4).copied().collect();
        assert_eq!(first, vec![17.99, 10.38, 122.8, 1001.0]);
        assert_eq!(ds.target[0], 0.0);
        let last: Vec<f64> = ds.features.row(568).iter().take(4).copied().collect();
        assert_eq!(last, vec![7.76, 24.54, 47.92, 181.0]);
        assert_eq!(ds.target[568], 1.0);

        assert!((ds.features.column(0).sum() - 8038.429).abs() < 1e-6);
        assert!((ds.features.column(3).sum() - 372_631.9).abs() < 1e-6);
        assert!((ds.features.sum() - 1_056_474.459_635_6).abs() < 1e-4);
    }

    #[test]
    fn test_bundled_features_are_correlated() {
        // perimeter tracks radius within each class
        let ds = load_breast_cancer(&DatasetSource::Bundled).unwrap();
        for label in [0.0, 1.0] {
            let rows: Vec<(f64, f64)> = ds
                .features
                .outer_iter()
                .zip(ds.target.iter())
                .filter(|(_, &t)| t == label)
                .map(|(r, _)| (r[0], r[2]))
                .collect();
            let n = rows.len() as f64;
            let (mx, my) = rows
                .iter()
                .fold((0.0, 0.0), |(a, b), (x, y)| (a + x / n, b + y / n));
            let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
            for (x, y) in &rows {
                sxy += (x - mx) * (y - my);
                sxx += (x - mx).powi(2);
                syy += (y - my).powi(2);
            }
            let r = sxy / (sxx * syy).sqrt();
            assert!(r > 0.95, "class {} radius/perimeter correlation {}", label, r);
        }
    }

    #[test]
    fn test_csv_layout() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "3,2,malignant,benign").unwrap();
        writeln!(file, "1.0,2.0,0").unwrap();
        writeln!(file, "3.0,4.0,1").unwrap();
        writeln!(file, "5.0,6.0,1").unwrap();

        let ds = load_breast_cancer(&DatasetSource::Csv(file.path().to_path_buf())).unwrap();
        assert_eq!(ds.n_samples(), 3);
        assert_eq!(ds.n_features(), 2);
        assert_eq!(ds.target_names, vec!["malignant", "benign"]);
        assert_eq!(ds.features[[2, 1]], 6.0);
        assert_eq!(ds.feature_names[0], "feature_0");
    }

    #[test]
    fn test_csv_sample_count_mismatch() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "4,1,a,b").unwrap();
        writeln!(file, "1.0,0").unwrap();

        let result = load_breast_cancer(&DatasetSource::Csv(file.path().to_path_buf()));
        assert!(matches!(result, Err(BenchError::DataError(_))));
    }

    #[test]
    fn test_missing_csv_is_fatal() {
        let result = load_breast_cancer(&DatasetSource::Csv("/nonexistent/bc.csv".into()));
        assert!(result.is_err());
    }
}
