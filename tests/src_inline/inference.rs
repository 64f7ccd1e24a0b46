use super::*;

use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::input::RawData;
use crate::model::priors::ModelKind;
use crate::model::sparse::CsrMatrix;
use crate::model::transform::CountTransform;
use crate::observe::RecordingObserver;
use crate::pipeline::DatasetParams;

fn make_temp_dir() -> PathBuf {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    let id = COUNTER.fetch_add(1, Ordering::SeqCst);
    let dir =
        std::env::temp_dir().join(format!("kira_ambient_inference_{}_{}", std::process::id(), id));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

// Analyzed barcodes [0, 1, 2], genes [0, 1, 2] out of 5 x 4.
fn dataset() -> Dataset {
    let matrix = CsrMatrix::from_rows(
        4,
        vec![
            vec![(0, 600), (1, 400)],
            vec![(0, 500), (2, 400)],
            vec![(1, 50)],
            vec![(2, 40)],
            vec![(0, 5)],
        ],
    );
    let raw = RawData {
        matrix,
        barcodes: (0..5).map(|i| format!("BC{i}-1")).collect(),
        gene_names: (0..4).map(|i| format!("gene{i}")).collect(),
    };
    let mut params = DatasetParams::new(ModelKind::Full);
    params.expected_cell_count = Some(2);
    params.num_transition_barcodes = Some(1);
    Dataset::from_raw(raw, params, CountTransform::default(), &RecordingObserver::new()).unwrap()
}

const DOCUMENT: &str = r#"{
    "z": [[0.1, 0.2], [0.3, 0.4], [0.5, 0.6]],
    "d": [7.0, 6.5, 3.0],
    "p": [0.99, 0.8, 0.1],
    "counts": {"rows": [0, 2], "cols": [1, 0], "values": [3.5, 1.0]},
    "ambient_expression": [0.2, 0.5, 0.3],
    "loss": {"train": {"elbo": [-10.0, -8.0]}, "test": {"epoch": [1], "elbo": [-9.0]}}
}"#;

#[test]
fn test_from_path_reads_plain_and_gzipped_json() {
    let dir = make_temp_dir();
    let plain = dir.join("posterior.json");
    std::fs::write(&plain, DOCUMENT).unwrap();
    let gz = dir.join("posterior.json.gz");
    let mut enc = flate2::write::GzEncoder::new(
        std::fs::File::create(&gz).unwrap(),
        flate2::Compression::default(),
    );
    enc.write_all(DOCUMENT.as_bytes()).unwrap();
    enc.finish().unwrap();

    let a = RecordedInference::from_path(&plain).unwrap();
    let b = RecordedInference::from_path(&gz).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.d, vec![7.0, 6.5, 3.0]);
    assert_eq!(a.contamination_fraction, None);
    assert_eq!(a.loss.as_ref().unwrap().test.epoch, vec![1]);
}

#[test]
fn test_malformed_document_is_an_error() {
    let dir = make_temp_dir();
    let path = dir.join("broken.json");
    std::fs::write(&path, "{\"z\": 3}").unwrap();
    assert!(matches!(
        RecordedInference::from_path(&path),
        Err(InferenceError::Json(_))
    ));
}

#[test]
fn test_encodings_match_analyzed_barcodes() {
    let model: RecordedInference = serde_json::from_str(DOCUMENT).unwrap();
    let enc = model.encodings(&dataset(), true).unwrap();
    assert_eq!(enc.z.n_rows, 3);
    assert_eq!(enc.z.n_cols, 2);
    assert_eq!(enc.z.row(1), &[0.3, 0.4]);
    assert_eq!(enc.p.as_deref(), Some(&[0.99, 0.8, 0.1][..]));
}

#[test]
fn test_encodings_length_mismatch() {
    let mut model: RecordedInference = serde_json::from_str(DOCUMENT).unwrap();
    model.d.pop();
    assert!(matches!(
        model.encodings(&dataset(), true),
        Err(InferenceError::Length {
            what: "latent scale",
            expected: 3,
            got: 2
        })
    ));
}

#[test]
fn test_counts_scattered_to_original_coordinates() {
    let data = dataset();
    let model: RecordedInference = serde_json::from_str(DOCUMENT).unwrap();
    let enc = model.encodings(&data, true).unwrap();
    let counts = model.count_matrix_from_encodings(&enc, &data, true).unwrap();
    assert_eq!(counts.shape(), (5, 4));
    assert_eq!(counts.nnz(), 2);
    assert_eq!(counts.get(0, 1), 3.5);
    assert_eq!(counts.get(2, 0), 1.0);
}

#[test]
fn test_counts_outside_analyzed_block() {
    let data = dataset();
    let mut model: RecordedInference = serde_json::from_str(DOCUMENT).unwrap();
    model.counts = Some(RecordedCounts {
        rows: vec![3],
        cols: vec![0],
        values: vec![1.0],
    });
    let enc = model.encodings(&data, true).unwrap();
    assert!(matches!(
        model.count_matrix_from_encodings(&enc, &data, true),
        Err(InferenceError::CountOutOfRange { row: 3, .. })
    ));

    model.counts = None;
    assert!(matches!(
        model.count_matrix_from_encodings(&enc, &data, true),
        Err(InferenceError::MissingCounts)
    ));
}

#[test]
fn test_latent_matrix_rejects_ragged_rows() {
    let err = LatentMatrix::from_rows(&[vec![1.0, 2.0], vec![3.0]]).unwrap_err();
    assert!(matches!(
        err,
        InferenceError::RaggedLatent {
            row: 1,
            expected: 2,
            got: 1
        }
    ));
}

#[test]
fn test_latent_select_rows() {
    let z = LatentMatrix::from_rows(&[vec![1.0], vec![2.0], vec![3.0]]).unwrap();
    let kept = z.select_rows(&[true, false, true]);
    assert_eq!(kept.n_rows, 2);
    assert_eq!(kept.values, vec![1.0, 3.0]);
}
