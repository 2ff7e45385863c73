//! Record identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TypesError;

/// Engine-assigned sequential identifier of a land asset record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AssetId(pub u64);

/// Sequential identifier of a transfer case.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CaseId(pub u64);

impl AssetId {
    pub fn to_be_bytes(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }
}

impl CaseId {
    pub fn to_be_bytes(self) -> [u8; 8] {
        self.0.to_be_bytes()
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "asset-{}", self.0)
    }
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "case-{}", self.0)
    }
}

impl FromStr for AssetId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim_start_matches("asset-").parse().map(AssetId)
    }
}

impl FromStr for CaseId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim_start_matches("case-").parse().map(CaseId)
    }
}

/// The external survey identifier of a parcel. Immutable once a record is created.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SurveyId(String);

impl SurveyId {
    pub const MAX_LEN: usize = 128;

    pub fn parse(raw: &str) -> Result<Self, TypesError> {
        let s = raw.trim();
        if s.is_empty() || s.len() > Self::MAX_LEN || s.chars().any(|c| c.is_control()) {
            return Err(TypesError::InvalidSurveyId(raw.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SurveyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for SurveyId {
    type Error = TypesError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<SurveyId> for String {
    fn from(id: SurveyId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_parse_with_or_without_prefix() {
        assert_eq!("asset-7".parse::<AssetId>().unwrap(), AssetId(7));
        assert_eq!("7".parse::<AssetId>().unwrap(), AssetId(7));
        assert_eq!("case-12".parse::<CaseId>().unwrap(), CaseId(12));
        assert!("case-x".parse::<CaseId>().is_err());
    }

    #[test]
    fn survey_id_is_trimmed_and_bounded() {
        assert_eq!(SurveyId::parse("  SRV-001 ").unwrap().as_str(), "SRV-001");
        assert!(SurveyId::parse("").is_err());
        assert!(SurveyId::parse(&"x".repeat(200)).is_err());
        assert!(SurveyId::parse("a\nb").is_err());
    }
}
