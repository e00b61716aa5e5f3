//! Threagile threat-model types.
//!
//! These are the structures handed to the YAML emitter. Extra attributes are
//! kept in ordered string maps instead of dedicated fields so that
//! annotations added by later pipeline stages serialize deterministically.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Open string property bag.
pub type Properties = BTreeMap<String, String>;

pub const PROP_CONFIDENTIALITY: &str = "confidentiality";
pub const PROP_INTEGRITY: &str = "integrity";
pub const PROP_AVAILABILITY: &str = "availability";
pub const PROP_THREATS: &str = "threats";
pub const PROP_THREAT_DETAILS: &str = "threatDetails";
pub const PROP_HIGHEST_RISK: &str = "highestRisk";

/// Aggregate root of a converted diagram.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThreagileModel {
    pub title: String,
    pub description: String,
    pub version: String,
    pub author: String,
    pub technical_assets: Vec<TechnicalAsset>,
    pub trust_boundaries: Vec<TrustBoundary>,
    pub shared_runtimes: Vec<SharedRuntime>,
    pub data_assets: Vec<DataAsset>,
    pub communication_links: Vec<CommunicationLink>,
    /// Raw style string per element id.
    pub styles: BTreeMap<String, String>,
    pub properties: Properties,
}

impl ThreagileModel {
    pub fn asset(&self, id: &str) -> Option<&TechnicalAsset> {
        self.technical_assets.iter().find(|a| a.id == id)
    }

    pub fn boundary(&self, id: &str) -> Option<&TrustBoundary> {
        self.trust_boundaries.iter().find(|b| b.id == id)
    }

    pub fn data_asset(&self, id: &str) -> Option<&DataAsset> {
        self.data_assets.iter().find(|d| d.id == id)
    }

    /// Number of model elements produced from the diagram.
    pub fn element_count(&self) -> usize {
        self.technical_assets.len()
            + self.trust_boundaries.len()
            + self.shared_runtimes.len()
            + self.data_assets.len()
            + self.communication_links.len()
    }
}

/// A system component in the threat model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TechnicalAsset {
    pub id: String,
    pub name: String,
    pub title: String,
    #[serde(rename = "type")]
    pub asset_type: String,
    pub usage: String,
    pub description: String,
    pub style: String,
    pub used_for_data_protection: bool,
    pub used_for_data_retention: bool,
    pub used_for_data_destruction: bool,
    pub used_for_data_archiving: bool,
    pub properties: Properties,
}

impl TechnicalAsset {
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    pub fn confidentiality(&self) -> &str {
        self.property(PROP_CONFIDENTIALITY).unwrap_or("medium")
    }

    pub fn integrity(&self) -> &str {
        self.property(PROP_INTEGRITY).unwrap_or("medium")
    }

    pub fn availability(&self) -> &str {
        self.property(PROP_AVAILABILITY).unwrap_or("medium")
    }

    /// Display title, falling back to the name and then the id.
    pub fn display_title(&self) -> &str {
        [&self.title, &self.name]
            .into_iter()
            .find(|s| !s.trim().is_empty())
            .map(String::as_str)
            .unwrap_or(&self.id)
    }
}

/// Named grouping of assets sharing a security perimeter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrustBoundary {
    pub id: String,
    pub name: String,
    pub title: String,
    #[serde(rename = "type")]
    pub boundary_type: String,
    pub description: String,
    pub technical_assets_inside: Vec<String>,
}

/// Assets running on the same runtime (host, cluster, container platform).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SharedRuntime {
    pub id: String,
    pub name: String,
    pub technical_assets_running: Vec<String>,
}

/// Data stored or processed by the system.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DataAsset {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub usage: String,
    pub origin: String,
    pub owner: String,
    pub quantity: String,
    pub confidentiality: String,
    pub integrity: String,
    pub availability: String,
}

/// Directed channel between two technical assets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommunicationLink {
    pub id: String,
    pub name: String,
    pub title: String,
    #[serde(rename = "type")]
    pub link_type: String,
    /// Endpoint ids exactly as they appeared in the diagram.
    pub source_id: String,
    pub target_id: String,
    /// Canonical asset ids; empty when the endpoint could not be resolved.
    pub source: String,
    pub target: String,
    pub protocol: String,
    pub authentication: String,
    pub authorization: String,
    pub encryption: String,
    pub properties: Properties,
}
