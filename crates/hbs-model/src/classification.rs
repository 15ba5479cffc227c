//! Classification kinds.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// A hierarchical taxonomy that maps numeric codes to labelled categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationType {
    /// Goods and services consumed by households.
    Commodity,
    /// Economic activity of the workplace.
    Industry,
    /// Job performed by the respondent.
    Occupation,
}

impl ClassificationType {
    pub const ALL: [Self; 3] = [Self::Commodity, Self::Industry, Self::Occupation];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Commodity => "commodity",
            Self::Industry => "industry",
            Self::Occupation => "occupation",
        }
    }

    /// Name of the metadata document that holds classifications of this kind.
    pub fn metadata_document(self) -> &'static str {
        match self {
            Self::Commodity => "commodities",
            Self::Industry => "industries",
            Self::Occupation => "occupations",
        }
    }
}

impl fmt::Display for ClassificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClassificationType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "commodity" | "commodities" => Ok(Self::Commodity),
            "industry" | "industries" => Ok(Self::Industry),
            "occupation" | "occupations" => Ok(Self::Occupation),
            _ => Err(ModelError::UnknownClassificationType(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_singular_and_plural_names() {
        assert_eq!(
            "Commodity".parse::<ClassificationType>().unwrap(),
            ClassificationType::Commodity
        );
        assert_eq!(
            "industries".parse::<ClassificationType>().unwrap(),
            ClassificationType::Industry
        );
        assert!("region".parse::<ClassificationType>().is_err());
    }

    #[test]
    fn document_names_are_plural() {
        assert_eq!(ClassificationType::Occupation.metadata_document(), "occupations");
    }
}
