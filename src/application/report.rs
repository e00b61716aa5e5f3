use crate::domain::{RiskLevel, ThreagileModel, ThreatCatalog, ThreatFinding};

/// Markdown rendering of threat findings.
///
/// The YAML model only carries per-asset counts; the report lists each
/// threat with its score, level and mitigations.
pub struct ThreatReport;

impl ThreatReport {
    pub fn to_markdown(
        model: &ThreagileModel,
        findings: &[ThreatFinding],
        catalog: &ThreatCatalog,
    ) -> String {
        let mut md = String::new();

        // Title
        md.push_str(&format!("# {}\n\n", model.title));
        if !model.description.trim().is_empty() {
            md.push_str(&format!("{}\n\n", model.description.trim()));
        }

        md.push_str("## Summary\n\n");
        md.push_str("| Metric | Value |\n| :--- | :--- |\n");
        md.push_str(&format!(
            "| **Technical Assets** | {} |\n",
            model.technical_assets.len()
        ));
        md.push_str(&format!(
            "| **Trust Boundaries** | {} |\n",
            model.trust_boundaries.len()
        ));
        md.push_str(&format!(
            "| **Communication Links** | {} |\n",
            model.communication_links.len()
        ));
        md.push_str(&format!("| **Threats** | {} |\n", findings.len()));
        for level in RiskLevel::all() {
            let count = findings.iter().filter(|f| f.level == level).count();
            md.push_str(&format!(
                "| **{} Risk** | {} {} |\n",
                capitalize(&level.to_string()),
                level_marker(level),
                count
            ));
        }
        md.push_str("\n---\n\n");

        if findings.is_empty() {
            md.push_str("_No applicable threats were found._\n");
            return md;
        }

        md.push_str("## Threats by Asset\n\n");
        for asset in &model.technical_assets {
            let mut asset_findings: Vec<&ThreatFinding> =
                findings.iter().filter(|f| f.asset_id == asset.id).collect();
            if asset_findings.is_empty() {
                continue;
            }
            // Highest score first; catalog order breaks ties.
            asset_findings.sort_by(|a, b| b.score.total_cmp(&a.score));

            md.push_str(&format!(
                "### {} (`{}`)\n\n",
                asset.display_title(),
                asset.id
            ));
            md.push_str(&format!(
                "- **Type:** {}\n- **CIA:** {} / {} / {}\n\n",
                asset.asset_type,
                asset.confidentiality(),
                asset.integrity(),
                asset.availability()
            ));

            md.push_str("| Threat | Category | Score | Level |\n| :--- | :--- | ---: | :--- |\n");
            for finding in &asset_findings {
                md.push_str(&format!(
                    "| {} | {} | {:.2} | {} {} |\n",
                    finding.threat_name,
                    finding.category,
                    finding.score,
                    level_marker(finding.level),
                    finding.level
                ));
            }
            md.push('\n');

            for finding in &asset_findings {
                let Some(threat) = catalog.get(&finding.threat_id) else {
                    continue;
                };
                if threat.mitigations.is_empty() {
                    continue;
                }
                md.push_str(&format!("**{}** mitigations:\n", threat.name));
                for mitigation in &threat.mitigations {
                    md.push_str(&format!("- {}\n", mitigation));
                }
                md.push('\n');
            }
        }

        md
    }
}

fn level_marker(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::Critical => "🟣",
        RiskLevel::High => "🔴",
        RiskLevel::Medium => "🟡",
        RiskLevel::Low => "🟢",
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::risk::analyze_threats;
    use crate::domain::TechnicalAsset;

    fn model() -> ThreagileModel {
        ThreagileModel {
            title: "Shop".into(),
            technical_assets: vec![
                TechnicalAsset {
                    id: "db".into(),
                    name: "Orders DB".into(),
                    asset_type: "database".into(),
                    ..Default::default()
                },
                TechnicalAsset {
                    id: "x".into(),
                    asset_type: "mainframe".into(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_renders_summary_and_asset_sections() {
        let catalog = ThreatCatalog::builtin();
        let analysis = analyze_threats(&model(), &catalog);
        let md = ThreatReport::to_markdown(&analysis.model, &analysis.findings, &catalog);

        assert!(md.starts_with("# Shop\n\n"));
        assert!(md.contains("| **Threats** | 4 |"));
        assert!(md.contains("| **Critical Risk** | 🟣 0 |"));
        assert!(md.contains("### Orders DB (`db`)"));
        assert!(md.contains("| Fuite de données sensibles | Protection des données | 4.50 | 🟡 medium |"));
        assert!(md.contains("**Injection SQL** mitigations:"));
        assert!(!md.contains("(`x`)"), "assets without threats are skipped");
    }

    #[test]
    fn test_highest_score_is_listed_first() {
        let catalog = ThreatCatalog::builtin();
        let analysis = analyze_threats(&model(), &catalog);
        let md = ThreatReport::to_markdown(&analysis.model, &analysis.findings, &catalog);

        let leak = md.find("| Fuite de données sensibles |").unwrap();
        let sql = md.find("| Injection SQL |").unwrap();
        assert!(leak < sql);
    }

    #[test]
    fn test_empty_findings_render_a_note() {
        let catalog = ThreatCatalog::builtin();
        let md = ThreatReport::to_markdown(&model(), &[], &catalog);
        assert!(md.contains("_No applicable threats were found._"));
        assert!(md.contains("| **Low Risk** | 🟢 0 |"));
    }
}
