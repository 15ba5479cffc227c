//! Inferring which column holds the classification codes.

use polars::prelude::DataFrame;

use hbs_metadata::Defaults;
use hbs_model::ClassificationType;

use crate::error::{DecodeError, Result};

/// A column chosen for decoding and the classification kind it matched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub column: String,
    pub kind: ClassificationType,
}

/// Picks the only column whose name contains a classification keyword.
///
/// Keywords match case-insensitively as substrings. With `kind` given only
/// that kind's keywords are tried. No candidate, or more than one, is an
/// error.
pub fn infer_target(
    table: &DataFrame,
    defaults: &Defaults,
    kind: Option<ClassificationType>,
) -> Result<Target> {
    let kinds: Vec<ClassificationType> = match kind {
        Some(kind) => vec![kind],
        None => ClassificationType::ALL.to_vec(),
    };
    let keywords: Vec<(ClassificationType, String)> = kinds
        .into_iter()
        .flat_map(|kind| {
            defaults
                .keywords_for(kind)
                .into_iter()
                .map(move |keyword| (kind, keyword.to_lowercase()))
        })
        .collect();

    let mut candidates: Vec<Target> = Vec::new();
    for column in table.get_column_names() {
        let lowered = column.as_str().to_lowercase();
        if let Some((kind, _)) = keywords
            .iter()
            .find(|(_, keyword)| lowered.contains(keyword.as_str()))
        {
            candidates.push(Target {
                column: column.to_string(),
                kind: *kind,
            });
        }
    }

    if candidates.len() == 1 {
        let target = candidates.remove(0);
        tracing::debug!(column = %target.column, kind = %target.kind, "inferred target column");
        return Ok(target);
    }
    Err(DecodeError::TargetDisambiguation {
        candidates: candidates.into_iter().map(|target| target.column).collect(),
    })
}

#[cfg(test)]
mod tests {
    use polars::prelude::*;

    use super::*;

    fn defaults() -> Defaults {
        Defaults::builtin().unwrap()
    }

    #[test]
    fn single_candidate_is_chosen() {
        let df = df! {
            "Year" => [1390i64],
            "Commodity_Code" => [11111i64],
            "Expenditure" => [10i64],
        }
        .unwrap();
        let target = infer_target(&df, &defaults(), None).unwrap();
        assert_eq!(target.column, "Commodity_Code");
        assert_eq!(target.kind, ClassificationType::Commodity);
    }

    #[test]
    fn kind_restricts_keywords() {
        let df = df! {
            "Commodity_Code" => [11111i64],
            "Job_Occupation" => [2111i64],
        }
        .unwrap();
        let target = infer_target(&df, &defaults(), Some(ClassificationType::Occupation)).unwrap();
        assert_eq!(target.column, "Job_Occupation");
    }

    #[test]
    fn ambiguous_columns_are_rejected() {
        let df = df! {
            "Commodity_Code" => [11111i64],
            "Industry_Code" => [1i64],
        }
        .unwrap();
        let err = infer_target(&df, &defaults(), None).unwrap_err();
        insta::assert_snapshot!(
            err.to_string(),
            @"target column not specified; candidates: [Commodity_Code, Industry_Code]"
        );
    }

    #[test]
    fn no_candidate_is_rejected() {
        let df = df! { "Year" => [1390i64] }.unwrap();
        assert!(matches!(
            infer_target(&df, &defaults(), None),
            Err(DecodeError::TargetDisambiguation { candidates }) if candidates.is_empty()
        ));
    }
}
