use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Threat pattern from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Threat {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Category name, e.g. "Injection" or "Protection des données".
    pub category: String,
    /// Qualitative impact (`low|medium|high|very-high|critical`).
    pub impact: String,
    /// Qualitative likelihood, same scale as impact.
    pub likelihood: String,
    /// Nominal risk as documented by the catalog author.
    pub risk: String,
    #[serde(default)]
    pub mitigations: Vec<String>,
    #[serde(default)]
    pub applicable_asset_types: Vec<String>,
}

impl Threat {
    pub fn applies_to(&self, asset_type: &str) -> bool {
        self.applicable_asset_types.iter().any(|t| t == asset_type)
    }
}

/// Risk label produced by scoring.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn rank(&self) -> u8 {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
            Self::Critical => 3,
        }
    }

    pub fn all() -> [RiskLevel; 4] {
        [Self::Critical, Self::High, Self::Medium, Self::Low]
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" | "med" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            other => Err(format!("invalid risk level: {other}")),
        }
    }
}

/// Result of scoring one threat against one asset.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatFinding {
    pub asset_id: String,
    pub threat_id: String,
    pub threat_name: String,
    pub category: String,
    pub score: f64,
    pub level: RiskLevel,
}
