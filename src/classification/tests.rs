use super::*;

/// Two clusters over disjoint feature blocks, plus a little shared noise.
fn separable(n_per_class: usize, n_classes: usize) -> (SparseMatrix, Vec<usize>) {
    let block = 4;
    let n_features = block * n_classes + 2;
    let mut rows = Vec::new();
    let mut labels = Vec::new();
    for i in 0..n_per_class {
        for class in 0..n_classes {
            let mut row: Vec<(usize, f32)> = (0..block)
                .filter(|j| (i + j) % 3 != 0)
                .map(|j| (class * block + j, 1.0))
                .collect();
            row.push((block * n_classes + i % 2, 1.0));
            rows.push(row);
            labels.push(class);
        }
    }
    (SparseMatrix::from_rows(n_features, rows).unwrap(), labels)
}

#[test]
fn test_fit_separable_binary() {
    let (x, y) = separable(20, 2);
    let model = SoftmaxRegression::new().fit(&x, &y, 2, 1.0, 300).unwrap();
    assert_eq!(model.score(&x, &y).unwrap(), 1.0);
}

#[test]
fn test_fit_separable_multiclass() {
    let (x, y) = separable(15, 4);
    let (score, model) = SoftmaxRegression::new()
        .train(&x, &y, &x, &y, 1.0, 300)
        .unwrap();
    assert_eq!(score, 1.0);
    assert_eq!(model.n_classes(), 4);
    assert_eq!(model.n_features(), x.n_cols());
}

#[test]
fn test_predict_proba_rows_sum_to_one() {
    let (x, y) = separable(5, 3);
    let model = SoftmaxRegression::new().fit(&x, &y, 3, 1.0, 50).unwrap();
    for probs in model.predict_proba(&x).unwrap() {
        let sum: f64 = probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }
}

#[test]
fn test_zero_iterations_predicts_first_class() {
    let (x, y) = separable(3, 2);
    let model = SoftmaxRegression::new().fit(&x, &y, 2, 1.0, 0).unwrap();
    assert!(model.predict(&x).unwrap().iter().all(|&p| p == 0));
    assert!((model.score(&x, &y).unwrap() - 0.5).abs() < 1e-12);
}

#[test]
fn test_stronger_regularisation_shrinks_weights() {
    let (x, y) = separable(10, 2);
    let loose = SoftmaxRegression::new().fit(&x, &y, 2, 100.0, 200).unwrap();
    let tight = SoftmaxRegression::new().fit(&x, &y, 2, 0.001, 200).unwrap();
    let norm = |m: &SoftmaxModel| m.weights.iter().map(|w| w * w).sum::<f64>();
    assert!(norm(&tight) < norm(&loose));
}

#[test]
fn test_fit_rejects_label_mismatch() {
    let (x, _) = separable(2, 2);
    let err = SoftmaxRegression::new().fit(&x, &[0, 1], 2, 1.0, 10).unwrap_err();
    assert!(matches!(err, FlyError::DimensionMismatch { .. }));
}

#[test]
fn test_fit_rejects_bad_c() {
    let (x, y) = separable(2, 2);
    for c in [0.0, -1.0, f64::NAN] {
        let err = SoftmaxRegression::new().fit(&x, &y, 2, c, 10).unwrap_err();
        assert!(matches!(err, FlyError::InvalidParameter { .. }));
    }
}

#[test]
fn test_fit_rejects_out_of_range_label() {
    let (x, mut y) = separable(2, 2);
    y[0] = 5;
    let err = SoftmaxRegression::new().fit(&x, &y, 2, 1.0, 10).unwrap_err();
    assert!(err.to_string().contains("label"));
}

#[test]
fn test_fit_rejects_empty() {
    let x = SparseMatrix::new(3);
    let err = SoftmaxRegression::new().fit(&x, &[], 1, 1.0, 10).unwrap_err();
    assert!(matches!(err, FlyError::InvalidParameter { .. }));
}

#[test]
fn test_train_rejects_column_mismatch() {
    let (x, y) = separable(2, 2);
    let val = SparseMatrix::new(x.n_cols() + 1);
    let err = SoftmaxRegression::new()
        .train(&x, &y, &val, &[], 1.0, 10)
        .unwrap_err();
    assert!(matches!(err, FlyError::DimensionMismatch { .. }));
}

#[test]
fn test_validation_only_class_counts_towards_outputs() {
    let (x, y) = separable(3, 2);
    let val = SparseMatrix::from_rows(x.n_cols(), vec![vec![(0, 1.0)]]).unwrap();
    let (_, model) = SoftmaxRegression::new()
        .train(&x, &y, &val, &[2], 1.0, 10)
        .unwrap();
    assert_eq!(model.n_classes(), 3);
}

#[test]
fn test_model_serde_roundtrip() {
    let (x, y) = separable(4, 2);
    let model = SoftmaxRegression::new().fit(&x, &y, 2, 1.0, 20).unwrap();
    let bytes = bincode::serialize(&model).unwrap();
    let back: SoftmaxModel = bincode::deserialize(&bytes).unwrap();
    assert_eq!(back, model);
}

#[test]
fn test_score_empty_validation_is_zero() {
    let (x, y) = separable(2, 2);
    let model = SoftmaxRegression::new().fit(&x, &y, 2, 1.0, 5).unwrap();
    let empty = SparseMatrix::new(x.n_cols());
    assert_eq!(model.score(&empty, &[]).unwrap(), 0.0);
}
