//! Library defaults read from layered `settings.yaml` files.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};
use serde_yaml::Value;

use hbs_model::{ClassificationType, Year};

use crate::error::{MetadataError, Result};

/// File name of the settings document in every metadata layer.
pub const SETTINGS_FILE: &str = "settings.yaml";

const BUILTIN_SETTINGS: &str = include_str!("../config/settings.yaml");

/// Default column names used when a decoder is not told otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DefaultColumns {
    pub year: String,
    pub id: String,
    pub weight: String,
    #[serde(default)]
    pub commodity_code: Option<String>,
    #[serde(default)]
    pub industry_code: Option<String>,
    #[serde(default)]
    pub occupation_code: Option<String>,
}

/// Dataset-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Defaults {
    /// Survey years available in the dataset, ascending.
    #[serde(deserialize_with = "deserialize_years")]
    pub years: Vec<Year>,
    pub columns: DefaultColumns,
    /// Column-name keywords used to infer the code column of each kind.
    #[serde(default)]
    pub classification_keywords: BTreeMap<ClassificationType, Vec<String>>,
    /// Metadata documents loaded by a [`crate::MetadataContext`].
    #[serde(default)]
    pub metadata_documents: Vec<String>,
}

impl Defaults {
    /// The settings shipped with the library.
    pub fn builtin() -> Result<Self> {
        Ok(serde_yaml::from_str(BUILTIN_SETTINGS)?)
    }

    pub(crate) fn builtin_value() -> Result<Value> {
        Ok(serde_yaml::from_str(BUILTIN_SETTINGS)?)
    }

    /// Builds defaults from an already merged settings value.
    pub fn from_value(value: Value) -> Result<Self> {
        let defaults: Self = serde_yaml::from_value(value)?;
        if defaults.years.is_empty() {
            return Err(MetadataError::InvalidYears {
                spec: String::new(),
                message: "settings declare no available years".to_string(),
            });
        }
        Ok(defaults)
    }

    /// Default code column for a classification kind.
    pub fn code_column(&self, kind: ClassificationType) -> Option<&str> {
        match kind {
            ClassificationType::Commodity => self.columns.commodity_code.as_deref(),
            ClassificationType::Industry => self.columns.industry_code.as_deref(),
            ClassificationType::Occupation => self.columns.occupation_code.as_deref(),
        }
    }

    /// First available year and one past the last, used as open-ended
    /// bounds for year ranges.
    pub fn year_bounds(&self) -> (Year, Year) {
        let first = self.years.iter().copied().min().unwrap_or_default();
        let last = self.years.iter().copied().max().unwrap_or_default();
        (first, last + 1)
    }

    /// Keywords identifying the code column of `kind`.
    ///
    /// Falls back to the kind's name plus its default code column.
    pub fn keywords_for(&self, kind: ClassificationType) -> Vec<String> {
        if let Some(keywords) = self.classification_keywords.get(&kind)
            && !keywords.is_empty()
        {
            return keywords.clone();
        }
        let mut keywords = vec![kind.as_str().to_string()];
        keywords.extend(self.code_column(kind).map(str::to_string));
        keywords
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum YearsSpec {
    List(Vec<Year>),
    Range(String),
}

fn deserialize_years<'de, D>(deserializer: D) -> std::result::Result<Vec<Year>, D::Error>
where
    D: Deserializer<'de>,
{
    let mut years = match YearsSpec::deserialize(deserializer)? {
        YearsSpec::List(years) => years,
        YearsSpec::Range(text) => parse_year_range(&text).map_err(serde::de::Error::custom)?,
    };
    years.sort_unstable();
    years.dedup();
    Ok(years)
}

/// Parses an inclusive `"first-last"` year range.
pub(crate) fn parse_year_range(text: &str) -> std::result::Result<Vec<Year>, String> {
    let (first, last) = text
        .split_once('-')
        .ok_or_else(|| format!("'{text}' is not a year range"))?;
    let parse = |part: &str| {
        part.trim()
            .parse::<Year>()
            .map_err(|_| format!("'{}' is not a year", part.trim()))
    };
    let (first, last) = (parse(first)?, parse(last)?);
    if first > last {
        return Err(format!("range '{text}' ends before it starts"));
    }
    Ok((first..=last).collect())
}
