//! Threat scoring.
//!
//! Each asset is scored against every catalog threat applicable to its type.
//! The score combines the threat's impact and likelihood with the asset's
//! highest CIA requirement and an asset-type multiplier.

use crate::domain::{
    CATEGORY_AUTHENTICATION, CATEGORY_AVAILABILITY, CATEGORY_DATA_PROTECTION,
    CATEGORY_INJECTION, PROP_HIGHEST_RISK, PROP_THREAT_DETAILS, PROP_THREATS, RiskLevel,
    Threat, ThreatCatalog, ThreatFinding, ThreagileModel,
};

pub const PROP_THREAT_ANALYSIS: &str = "threatAnalysis";
pub const PROP_THREAT_COUNT: &str = "threatCount";

/// (asset type, threat category, multiplier). Pairs not listed score 1.0.
const RISK_FACTORS: &[(&str, &str, f64)] = &[
    ("database", CATEGORY_DATA_PROTECTION, 1.5),
    ("gateway", CATEGORY_AVAILABILITY, 1.5),
    ("web-application", CATEGORY_INJECTION, 1.5),
    ("service", CATEGORY_AUTHENTICATION, 1.3),
];

/// Numeric score and its label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskAssessment {
    pub score: f64,
    pub level: RiskLevel,
}

/// Annotated model and the individual findings behind the annotations.
#[derive(Debug, Clone, Default)]
pub struct ThreatAnalysis {
    pub model: ThreagileModel,
    pub findings: Vec<ThreatFinding>,
}

/// Qualitative level to 1..=4. Unknown strings count as medium.
pub fn level_value(level: &str) -> u8 {
    match level.trim().to_lowercase().as_str() {
        "low" => 1,
        "medium" => 2,
        "high" => 3,
        "very-high" | "critical" => 4,
        _ => 2,
    }
}

pub fn risk_factor(asset_type: &str, category: &str) -> f64 {
    RISK_FACTORS
        .iter()
        .find(|(t, c, _)| *t == asset_type && *c == category)
        .map(|(_, _, factor)| *factor)
        .unwrap_or(1.0)
}

pub fn level_for_score(score: f64) -> RiskLevel {
    if score >= 9.0 {
        RiskLevel::Critical
    } else if score >= 6.0 {
        RiskLevel::High
    } else if score >= 3.0 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Score `threat` against an asset with the given CIA levels and type.
pub fn evaluate_risk(
    threat: &Threat,
    confidentiality: &str,
    integrity: &str,
    availability: &str,
    asset_type: &str,
) -> RiskAssessment {
    let requirement = level_value(confidentiality)
        .max(level_value(integrity))
        .max(level_value(availability));
    let score = f64::from(level_value(&threat.impact))
        * f64::from(level_value(&threat.likelihood))
        * f64::from(requirement)
        * risk_factor(asset_type, &threat.category)
        / 4.0;

    RiskAssessment {
        score,
        level: level_for_score(score),
    }
}

/// Score every asset and annotate a copy of the model.
///
/// Assets get `threats`, `threatDetails` (when any threat applies) and
/// `highestRisk`; the model gets `threatAnalysis=completed` and `threatCount`.
pub fn analyze_threats(model: &ThreagileModel, catalog: &ThreatCatalog) -> ThreatAnalysis {
    let mut annotated = model.clone();
    let mut findings = Vec::new();

    for asset in &mut annotated.technical_assets {
        let threats = catalog.threats_for_asset_type(&asset.asset_type);
        let mut highest: Option<RiskLevel> = None;

        for threat in &threats {
            let assessment = evaluate_risk(
                threat,
                asset.confidentiality(),
                asset.integrity(),
                asset.availability(),
                &asset.asset_type,
            );
            highest = highest.max(Some(assessment.level));
            findings.push(ThreatFinding {
                asset_id: asset.id.clone(),
                threat_id: threat.id.clone(),
                threat_name: threat.name.clone(),
                category: threat.category.clone(),
                score: assessment.score,
                level: assessment.level,
            });
        }

        log::debug!("asset {} has {} applicable threats", asset.id, threats.len());
        asset
            .properties
            .insert(PROP_THREATS.into(), threats.len().to_string());
        if let Some(level) = highest {
            asset
                .properties
                .insert(PROP_THREAT_DETAILS.into(), "available".into());
            asset
                .properties
                .insert(PROP_HIGHEST_RISK.into(), level.to_string());
        }
    }

    annotated
        .properties
        .insert(PROP_THREAT_ANALYSIS.into(), "completed".into());
    annotated
        .properties
        .insert(PROP_THREAT_COUNT.into(), findings.len().to_string());

    log::info!("threat analysis produced {} findings", findings.len());
    ThreatAnalysis {
        model: annotated,
        findings,
    }
}
