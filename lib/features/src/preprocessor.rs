//! Record table -> numeric matrix.

use crate::encoder::OneHotEncoder;
use crate::scaler::StandardScaler;
use crate::schema::FeatureSchema;
use ndarray::{concatenate, Array2, Axis};
use schoolrec_core::{missing_columns, Error, Result, SchoolRecord};
use serde::{Deserialize, Serialize};

/// Fitted column transformer: standardized numeric columns followed by
/// one-hot groups, in schema order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Preprocessor {
    schema: FeatureSchema,
    scaler: StandardScaler,
    encoder: OneHotEncoder,
}

impl Preprocessor {
    /// Learn scaling statistics and vocabularies from `records` and return
    /// the transformed matrix alongside the fitted transformer.
    ///
    /// Fails with [`Error::MissingColumns`] before touching any value if a
    /// declared attribute is absent from any record.
    pub fn fit_transform(schema: FeatureSchema, records: &[SchoolRecord]) -> Result<(Self, Array2<f64>)> {
        schema.validate()?;
        ensure_columns(&schema, records)?;
        if records.is_empty() {
            return Err(Error::EmptyTable);
        }

        let numeric = numeric_matrix(records, &schema.numeric)?;
        let (scaler, scaled) = StandardScaler::fit_transform(&numeric)?;
        let encoder = OneHotEncoder::fit(records, &schema.categorical)?;
        let encoded = encoder.transform(records)?;

        let preprocessor = Self {
            schema,
            scaler,
            encoder,
        };
        let matrix = join_columns(scaled, encoded)?;
        Ok((preprocessor, matrix))
    }

    /// Apply the fitted parameters to new records. Nothing is re-learned.
    pub fn transform(&self, records: &[SchoolRecord]) -> Result<Array2<f64>> {
        ensure_columns(&self.schema, records)?;
        let numeric = numeric_matrix(records, &self.schema.numeric)?;
        let scaled = self.scaler.transform(&numeric)?;
        let encoded = self.encoder.transform(records)?;
        join_columns(scaled, encoded)
    }

    /// Output column names, aligned with the transformed matrix.
    pub fn feature_names(&self) -> Vec<String> {
        self.schema
            .numeric
            .iter()
            .cloned()
            .chain(self.encoder.feature_names())
            .collect()
    }

    pub fn n_features(&self) -> usize {
        self.scaler.n_features() + self.encoder.n_features()
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    pub fn encoder(&self) -> &OneHotEncoder {
        &self.encoder
    }
}

fn ensure_columns(schema: &FeatureSchema, records: &[SchoolRecord]) -> Result<()> {
    let missing = missing_columns(records, &schema.required());
    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::MissingColumns(missing))
    }
}

fn numeric_matrix(records: &[SchoolRecord], attributes: &[String]) -> Result<Array2<f64>> {
    let mut out = Array2::zeros((records.len(), attributes.len()));
    for (row, record) in records.iter().enumerate() {
        for (col, attribute) in attributes.iter().enumerate() {
            out[[row, col]] = record.numeric(attribute)?;
        }
    }
    Ok(out)
}

fn join_columns(numeric: Array2<f64>, encoded: Array2<f64>) -> Result<Array2<f64>> {
    let rows = numeric.nrows();
    concatenate(Axis(1), &[numeric.view(), encoded.view()]).map_err(|_| Error::InvalidDimension {
        expected: rows,
        actual: encoded.nrows(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn school(name: &str, rating: f64, tuition: f64, kind: &str, focus: &str) -> SchoolRecord {
        SchoolRecord::new(name)
            .with("rating", rating)
            .with("tuition", tuition)
            .with("student_teacher_ratio", 12)
            .with("test_scores", 75)
            .with("type", kind)
            .with("curriculum", "national")
            .with("focus", focus)
            .with("facilities", "basic")
    }

    fn corpus() -> Vec<SchoolRecord> {
        vec![
            school("A", 4.0, 1000.0, "public", "arts"),
            school("B", 3.0, 5000.0, "private", "stem"),
            school("C", 5.0, 3000.0, "public", "stem"),
        ]
    }

    #[test]
    fn test_column_layout() {
        let (pre, x) = Preprocessor::fit_transform(FeatureSchema::default(), &corpus()).unwrap();
        assert_eq!(
            pre.feature_names(),
            vec![
                "rating",
                "tuition",
                "student_teacher_ratio",
                "test_scores",
                "type_public",
                "type_private",
                "curriculum_national",
                "focus_arts",
                "focus_stem",
                "facilities_basic"
            ]
        );
        assert_eq!(x.dim(), (3, 10));
        assert_eq!(pre.n_features(), 10);
        // constant numeric columns collapse to zero
        assert!(x.column(2).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_missing_columns_abort() {
        let mut records = corpus();
        records[1].fields.remove("tuition");
        records[2].fields.remove("focus");

        let err = Preprocessor::fit_transform(FeatureSchema::default(), &records).unwrap_err();
        match err {
            Error::MissingColumns(cols) => assert_eq!(cols, vec!["tuition", "focus"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_table() {
        assert!(matches!(
            Preprocessor::fit_transform(FeatureSchema::default(), &[]),
            Err(Error::EmptyTable)
        ));
    }

    #[test]
    fn test_transform_matches_fit_output() {
        let records = corpus();
        let (pre, x) = Preprocessor::fit_transform(FeatureSchema::default(), &records).unwrap();
        let again = pre.transform(&records).unwrap();
        assert_eq!(x, again);
    }

    #[test]
    fn test_unseen_category_transforms() {
        let (pre, _) = Preprocessor::fit_transform(FeatureSchema::default(), &corpus()).unwrap();
        let novel = school("Z", 4.0, 2000.0, "charter", "music");
        let x = pre.transform(&[novel]).unwrap();
        assert_eq!(x.dim(), (1, 10));
        assert_eq!(x[[0, 4]], 0.0);
        assert_eq!(x[[0, 5]], 0.0);
        assert_eq!(x[[0, 7]], 0.0);
        assert_eq!(x[[0, 8]], 0.0);
        assert_eq!(x[[0, 6]], 1.0);
    }
}
