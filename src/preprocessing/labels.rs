//! Target column encoding

use super::plan::{LabelPolicy, PreprocessingPlan};
use crate::error::Result;
use polars::prelude::*;

/// Name of the encoded label column
pub const LABEL_COLUMN: &str = "label";

/// Encoded target values plus the row filter derived from them
#[derive(Debug, Clone)]
pub struct LabelEncoding {
    /// Row mask over the input, `true` for rows that are kept
    pub keep: Vec<bool>,
    /// Class ids of kept rows, null where the value is unmapped
    pub labels: Vec<Option<i32>>,
}

impl LabelEncoding {
    pub fn rows_removed(&self) -> usize {
        self.keep.iter().filter(|k| !**k).count()
    }

    pub fn to_column(&self) -> Column {
        Column::new(LABEL_COLUMN.into(), self.labels.clone())
    }
}

fn normalize(value: &str) -> String {
    value.trim().to_uppercase()
}

/// Encode a raw target column according to the plan's label map and policy
pub fn encode_labels(target: &Column, plan: &PreprocessingPlan) -> Result<LabelEncoding> {
    let casted = target.cast(&DataType::String)?;
    let normalized: Vec<Option<String>> = casted
        .str()?
        .into_iter()
        .map(|v| v.map(normalize))
        .collect();

    let mut keep = Vec::with_capacity(normalized.len());
    let mut labels = Vec::with_capacity(normalized.len());

    for value in &normalized {
        let code = value.as_deref().and_then(|v| plan.encode_label(v));
        let kept = match plan.label_policy {
            LabelPolicy::KeepAll => true,
            LabelPolicy::FilterToKnown { reject } => {
                let rejected = value.as_deref().is_some_and(|v| v.contains(reject));
                !rejected && code.is_some()
            }
        };
        keep.push(kept);
        if kept {
            labels.push(code);
        }
    }

    Ok(LabelEncoding { keep, labels })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mission::Mission;
    use crate::preprocessing::plan::plan;

    #[test]
    fn test_kepler_filters_false_positives() {
        let col = Column::new(
            "koi_disposition".into(),
            &[Some(" confirmed "), Some("FALSE POSITIVE"), Some("CANDIDATE"), None, Some("NOT DISPOSITIONED")],
        );
        let enc = encode_labels(&col, plan(Mission::Kepler)).unwrap();
        assert_eq!(enc.keep, vec![true, false, true, false, false]);
        assert_eq!(enc.labels, vec![Some(1), Some(0)]);
        assert_eq!(enc.rows_removed(), 3);
    }

    #[test]
    fn test_tess_keeps_unmapped_rows() {
        let col = Column::new("tfopwg_disp".into(), &["PC", "FP", "KP", "apc"]);
        let enc = encode_labels(&col, plan(Mission::Tess)).unwrap();
        assert_eq!(enc.rows_removed(), 0);
        assert_eq!(enc.labels, vec![Some(0), None, Some(1), Some(0)]);
    }

    #[test]
    fn test_k2_labels() {
        let col = Column::new("disposition".into(), &["CONFIRMED", "FALSE POSITIVE", "CANDIDATE"]);
        let enc = encode_labels(&col, plan(Mission::K2)).unwrap();
        assert_eq!(enc.labels, vec![Some(1), None, Some(0)]);
        assert_eq!(enc.to_column().null_count(), 1);
    }
}
