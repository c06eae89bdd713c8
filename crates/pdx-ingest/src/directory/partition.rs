//! Partition schemes
//!
//! The directory caps how deep a single query can page, so a full harvest
//! splits the search space into partitions and walks each one separately.
//! Each partition contributes its own query facets and the label recorded
//! in a partner's `locations`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{IngestError, Result};

/// Countries walked by the [`PartitionScheme::Countries`] scheme, as
/// `(display name, ISO 3166-1 alpha-2 code)`.
pub const COUNTRIES: &[(&str, &str)] = &[
    ("Algeria", "DZ"),
    ("Argentina", "AR"),
    ("Australia", "AU"),
    ("Austria", "AT"),
    ("Bangladesh", "BD"),
    ("Belgium", "BE"),
    ("Brazil", "BR"),
    ("Bulgaria", "BG"),
    ("Canada", "CA"),
    ("Chile", "CL"),
    ("China", "CN"),
    ("Colombia", "CO"),
    ("Croatia", "HR"),
    ("Czech Republic", "CZ"),
    ("Denmark", "DK"),
    ("Egypt", "EG"),
    ("Finland", "FI"),
    ("France", "FR"),
    ("Germany", "DE"),
    ("Greece", "GR"),
    ("Hong Kong", "HK"),
    ("Hungary", "HU"),
    ("India", "IN"),
    ("Indonesia", "ID"),
    ("Ireland", "IE"),
    ("Israel", "IL"),
    ("Italy", "IT"),
    ("Japan", "JP"),
    ("Kazakhstan", "KZ"),
    ("Kenya", "KE"),
    ("Malaysia", "MY"),
    ("Mexico", "MX"),
    ("Morocco", "MA"),
    ("Netherlands", "NL"),
    ("New Zealand", "NZ"),
    ("Nigeria", "NG"),
    ("Norway", "NO"),
    ("Pakistan", "PK"),
    ("Peru", "PE"),
    ("Philippines", "PH"),
    ("Poland", "PL"),
    ("Portugal", "PT"),
    ("Qatar", "QA"),
    ("Romania", "RO"),
    ("Saudi Arabia", "SA"),
    ("Serbia", "RS"),
    ("Singapore", "SG"),
    ("Slovakia", "SK"),
    ("South Africa", "ZA"),
    ("South Korea", "KR"),
    ("Spain", "ES"),
    ("Sweden", "SE"),
    ("Switzerland", "CH"),
    ("Thailand", "TH"),
    ("Tunisia", "TN"),
    ("Turkey", "TR"),
    ("Ukraine", "UA"),
    ("United Arab Emirates", "AE"),
    ("United Kingdom", "GB"),
    ("United States", "US"),
    ("Vietnam", "VN"),
];

/// What a partition filters on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PartitionKind {
    /// Free-text search on a single letter
    Letter { letter: char },
    /// Partners located in one country
    Country { code: String, name: String },
}

/// One independently walked slice of the directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    /// Stable selector used on the command line
    pub key: String,
    /// Value merged into a partner's `locations`
    pub label: String,
    pub kind: PartitionKind,
}

impl Partition {
    pub fn letter(letter: char) -> Self {
        let letter = letter.to_ascii_lowercase();
        Self {
            key: letter.to_string(),
            label: letter.to_string(),
            kind: PartitionKind::Letter { letter },
        }
    }

    pub fn country(name: &str, code: &str) -> Self {
        let code = code.to_ascii_uppercase();
        Self {
            key: code.clone(),
            label: code.clone(),
            kind: PartitionKind::Country {
                code,
                name: name.to_string(),
            },
        }
    }

    /// Scheme-specific `key=value` facets for the search filter
    pub fn facets(&self) -> Vec<(&'static str, String)> {
        match &self.kind {
            PartitionKind::Letter { letter } => vec![
                ("freetext", letter.to_string()),
                ("suggestion", "true".to_string()),
            ],
            PartitionKind::Country { code, name } => vec![
                ("onlyThisCountry", "true".to_string()),
                ("country", code.clone()),
                ("locname", name.clone()),
            ],
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            PartitionKind::Letter { letter } => write!(f, "letter '{letter}'"),
            PartitionKind::Country { code, name } => write!(f, "{name} ({code})"),
        }
    }
}

/// Strategy for splitting the directory into partitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionScheme {
    /// `a` through `z` as free-text queries
    #[default]
    Letters,
    /// One query per entry in [`COUNTRIES`]
    Countries,
}

impl PartitionScheme {
    /// Every partition of the scheme, in walk order
    pub fn enumerate(self) -> Vec<Partition> {
        match self {
            PartitionScheme::Letters => ('a'..='z').map(Partition::letter).collect(),
            PartitionScheme::Countries => COUNTRIES
                .iter()
                .map(|(name, code)| Partition::country(name, code))
                .collect(),
        }
    }

    /// The partitions named by `keys`, kept in walk order.
    ///
    /// Keys match case-insensitively. An unknown key is a configuration
    /// error rather than being silently ignored.
    pub fn select<S: AsRef<str>>(self, keys: &[S]) -> Result<Vec<Partition>> {
        let all = self.enumerate();
        if keys.is_empty() {
            return Ok(all);
        }

        for key in keys {
            let key = key.as_ref();
            if !all.iter().any(|p| p.key.eq_ignore_ascii_case(key.trim())) {
                return Err(IngestError::Config(format!(
                    "Unknown partition '{key}' for scheme {self}"
                )));
            }
        }

        Ok(all
            .into_iter()
            .filter(|p| keys.iter().any(|k| p.key.eq_ignore_ascii_case(k.as_ref().trim())))
            .collect())
    }
}

impl fmt::Display for PartitionScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartitionScheme::Letters => write!(f, "letters"),
            PartitionScheme::Countries => write!(f, "countries"),
        }
    }
}

impl FromStr for PartitionScheme {
    type Err = IngestError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "letters" | "letter" | "alphabet" => Ok(PartitionScheme::Letters),
            "countries" | "country" => Ok(PartitionScheme::Countries),
            _ => Err(IngestError::Config(format!("Invalid partition scheme: {s}"))),
        }
    }
}
