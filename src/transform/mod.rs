//! Feature transformation
//!
//! Turns raw train/test record frames into scaled numeric matrices plus
//! encoded label vectors. Identifier columns are dropped, the label column is
//! separated out, and the standardization fit on the training split is applied
//! unchanged to the test split.

mod scaler;

pub use scaler::StandardScaler;

use crate::error::{Result, RiskmlError};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Maps categorical label values to class indices.
///
/// Classes come from the training split only, sorted for a stable encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    /// Fit on the training labels: sorted unique values become classes 0..k.
    pub fn fit(values: &[String]) -> Self {
        let mut classes = values.to_vec();
        classes.sort();
        classes.dedup();
        Self { classes }
    }

    /// Encode one label. Values outside the training class set are an error.
    pub fn encode(&self, value: &str) -> Result<f64> {
        self.classes
            .iter()
            .position(|c| c == value)
            .map(|i| i as f64)
            .ok_or_else(|| {
                RiskmlError::Transformation(format!(
                    "label value '{}' not present in training labels",
                    value
                ))
            })
    }

    /// Class name for an encoded index.
    pub fn decode(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(|s| s.as_str())
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }
}

/// Output of one transformation pass
#[derive(Debug, Clone)]
pub struct TransformOutput {
    pub x_train: Array2<f64>,
    pub x_test: Array2<f64>,
    pub y_train: Array1<f64>,
    pub y_test: Array1<f64>,
    /// Feature column order, fixed by the training split schema
    pub feature_names: Vec<String>,
    /// Label classes in encoding order
    pub encoder: LabelEncoder,
    /// Scaler state fit on the training split only
    pub scaler: StandardScaler,
}

/// Cleans and scales raw tabular records into numeric matrices.
///
/// Stateless across pipeline runs; scaler state is computed per call and
/// returned on the output.
#[derive(Debug, Clone)]
pub struct FeatureTransformer {
    label_column: String,
    id_columns: Vec<String>,
}

impl Default for FeatureTransformer {
    fn default() -> Self {
        Self::new("Risk Classification", &["Customer ID"])
    }
}

impl FeatureTransformer {
    pub fn new(label_column: &str, id_columns: &[&str]) -> Self {
        Self {
            label_column: label_column.to_string(),
            id_columns: id_columns.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Transform both splits into scaled matrices and encoded label vectors.
    ///
    /// The scaler is fit on the cleaned training features only and the same
    /// state is applied to the test features.
    pub fn transform(&self, train: &DataFrame, test: &DataFrame) -> Result<TransformOutput> {
        let train = self.clean(train)?;
        let test = self.clean(test)?;

        if train.height() == 0 {
            return Err(RiskmlError::Transformation(
                "training split has zero rows after cleaning".to_string(),
            ));
        }

        let train_labels = self.label_values(&train)?;
        let test_labels = self.label_values(&test)?;

        let encoder = LabelEncoder::fit(&train_labels);
        let y_train = encode_labels(&encoder, &train_labels)?;
        let y_test = encode_labels(&encoder, &test_labels)?;

        // Feature order is fixed by the training split schema
        let feature_names: Vec<String> = train
            .get_column_names()
            .into_iter()
            .filter(|name| name.as_str() != self.label_column)
            .map(|s| s.to_string())
            .collect();

        let x_train_raw = columns_to_matrix(&train, &feature_names)?;
        let x_test_raw = columns_to_matrix(&test, &feature_names)?;

        let mut scaler = StandardScaler::new();
        let x_train = scaler.fit_transform(&x_train_raw)?;
        let x_test = scaler.transform(&x_test_raw)?;

        Ok(TransformOutput {
            x_train,
            x_test,
            y_train,
            y_test,
            feature_names,
            encoder,
            scaler,
        })
    }

    /// Drop identifier columns (absent ones are ignored) and null-bearing rows.
    fn clean(&self, df: &DataFrame) -> Result<DataFrame> {
        let mut df = df.clone();
        for id_col in &self.id_columns {
            if df.get_column_names().iter().any(|n| n.as_str() == id_col) {
                df = df.drop(id_col)?;
            }
        }
        drop_null_rows(&df)
    }

    fn label_values(&self, df: &DataFrame) -> Result<Vec<String>> {
        let column = df.column(&self.label_column).map_err(|_| {
            RiskmlError::Transformation(format!(
                "label column '{}' missing from split",
                self.label_column
            ))
        })?;

        let as_str = column
            .cast(&DataType::String)
            .map_err(|e| RiskmlError::Transformation(e.to_string()))?;
        let ca = as_str
            .str()
            .map_err(|e| RiskmlError::Transformation(e.to_string()))?;

        ca.into_iter()
            .map(|opt| {
                opt.map(|s| s.to_string()).ok_or_else(|| {
                    RiskmlError::Transformation(format!(
                        "null label value in column '{}'",
                        self.label_column
                    ))
                })
            })
            .collect()
    }
}

fn encode_labels(encoder: &LabelEncoder, values: &[String]) -> Result<Array1<f64>> {
    let encoded: Vec<f64> = values
        .iter()
        .map(|v| encoder.encode(v))
        .collect::<Result<Vec<_>>>()?;
    Ok(Array1::from_vec(encoded))
}

/// Keep only rows where every column is non-null.
fn drop_null_rows(df: &DataFrame) -> Result<DataFrame> {
    if df.height() == 0 {
        return Ok(df.clone());
    }

    let mut mask: Option<BooleanChunked> = None;
    for column in df.get_columns() {
        let col_mask = column.as_materialized_series().is_not_null();
        mask = Some(match mask {
            Some(m) => &m & &col_mask,
            None => col_mask,
        });
    }

    match mask {
        Some(m) => Ok(df.filter(&m)?),
        None => Ok(df.clone()),
    }
}

/// Extract named columns into a row-major matrix, rejecting non-numeric ones.
fn columns_to_matrix(df: &DataFrame, col_names: &[String]) -> Result<Array2<f64>> {
    let n_rows = df.height();
    let n_cols = col_names.len();

    let col_data: Vec<Vec<f64>> = col_names
        .iter()
        .map(|col_name| {
            let column = df.column(col_name).map_err(|_| {
                RiskmlError::Transformation(format!("feature column '{}' missing", col_name))
            })?;

            if !is_numeric_dtype(column.dtype()) {
                return Err(RiskmlError::Transformation(format!(
                    "feature column '{}' is not numeric ({})",
                    col_name,
                    column.dtype()
                )));
            }

            let as_f64 = column
                .cast(&DataType::Float64)
                .map_err(|e| RiskmlError::Data(e.to_string()))?;
            let values: Vec<f64> = as_f64
                .f64()
                .map_err(|e| RiskmlError::Data(e.to_string()))?
                .into_iter()
                .map(|v| v.unwrap_or(0.0))
                .collect();
            Ok(values)
        })
        .collect::<Result<Vec<Vec<f64>>>>()?;

    let col_refs: Vec<&[f64]> = col_data.iter().map(|c| c.as_slice()).collect();
    Ok(Array2::from_shape_fn((n_rows, n_cols), |(r, c)| {
        col_refs[c][r]
    }))
}

fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}
