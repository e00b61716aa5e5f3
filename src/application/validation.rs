//! Structural checks on the diagram going in and the model coming out.

use crate::application::resolver::PROP_CIRCULAR_REFERENCES;
use crate::domain::{ConversionError, ErrorKind, ThreagileModel};
use crate::infra::diagram::Diagram;
use std::collections::{HashMap, HashSet};

/// Input checks: shapes exist, ids are present and unique, relation
/// endpoints point at known shapes (warnings only).
pub fn validate_diagram(diagram: &Diagram) -> Vec<ConversionError> {
    diagram.validate()
}

/// Output checks on a resolved model.
pub fn validate_model(model: &ThreagileModel) -> Vec<ConversionError> {
    let mut issues = Vec::new();

    let mut asset_ids = HashSet::new();
    for asset in &model.technical_assets {
        if asset.id.trim().is_empty() {
            issues.push(ConversionError::new(
                ErrorKind::MissingRequiredField,
                format!("technical asset '{}' has an empty id", asset.name),
            ));
        } else if !asset_ids.insert(asset.id.as_str()) {
            issues.push(ConversionError::new(
                ErrorKind::DuplicateId,
                format!("duplicate technical asset id: {}", asset.id),
            ));
        }
    }

    let mut boundary_ids = HashSet::new();
    let mut owner: HashMap<&str, &str> = HashMap::new();
    for boundary in &model.trust_boundaries {
        if !boundary_ids.insert(boundary.id.as_str()) {
            issues.push(ConversionError::new(
                ErrorKind::DuplicateId,
                format!("duplicate trust boundary id: {}", boundary.id),
            ));
        }
        for member in &boundary.technical_assets_inside {
            if !asset_ids.contains(member.as_str()) {
                issues.push(ConversionError::new(
                    ErrorKind::InvalidReference,
                    format!(
                        "trust boundary '{}' contains unknown asset '{member}'",
                        boundary.id
                    ),
                ));
            } else if let Some(previous) = owner.insert(member.as_str(), boundary.id.as_str()) {
                issues.push(ConversionError::new(
                    ErrorKind::ConstraintViolation,
                    format!(
                        "asset '{member}' is inside both '{previous}' and '{}'",
                        boundary.id
                    ),
                ));
            }
        }
    }

    for runtime in &model.shared_runtimes {
        for member in &runtime.technical_assets_running {
            if !asset_ids.contains(member.as_str()) {
                issues.push(ConversionError::new(
                    ErrorKind::InvalidReference,
                    format!(
                        "shared runtime '{}' runs unknown asset '{member}'",
                        runtime.id
                    ),
                ));
            }
        }
    }

    for link in &model.communication_links {
        for (end, id, raw) in [
            ("source", &link.source, &link.source_id),
            ("target", &link.target, &link.target_id),
        ] {
            if id.is_empty() {
                issues.push(ConversionError::warning(
                    ErrorKind::MissingSourceField,
                    format!("link '{}' has no resolved {end} (was '{raw}')", link.id),
                ));
            } else if !asset_ids.contains(id.as_str()) {
                issues.push(ConversionError::new(
                    ErrorKind::InvalidReference,
                    format!("link '{}' {end} '{id}' is not a technical asset", link.id),
                ));
            }
        }
    }

    for asset in &model.technical_assets {
        let data_id = format!("data-{}", asset.id);
        if asset.asset_type == "database" && model.data_asset(&data_id).is_none() {
            issues.push(ConversionError::new(
                ErrorKind::ConstraintViolation,
                format!("database '{}' has no data asset", asset.id),
            ));
        }
    }

    if model
        .properties
        .get(PROP_CIRCULAR_REFERENCES)
        .is_some_and(|v| v == "true")
    {
        issues.push(ConversionError::warning(
            ErrorKind::CircularReferences,
            "model contains circular references",
        ));
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        CommunicationLink, DataAsset, Severity, SharedRuntime, TechnicalAsset, TrustBoundary,
    };

    fn asset(id: &str, asset_type: &str) -> TechnicalAsset {
        TechnicalAsset {
            id: id.into(),
            name: id.into(),
            asset_type: asset_type.into(),
            ..Default::default()
        }
    }

    fn kinds(issues: &[ConversionError]) -> Vec<ErrorKind> {
        issues.iter().map(|i| i.kind).collect()
    }

    #[test]
    fn test_clean_model_has_no_issues() {
        let model = ThreagileModel {
            technical_assets: vec![asset("db", "database"), asset("web", "web-application")],
            data_assets: vec![DataAsset {
                id: "data-db".into(),
                ..Default::default()
            }],
            trust_boundaries: vec![TrustBoundary {
                id: "default-boundary".into(),
                technical_assets_inside: vec!["db".into(), "web".into()],
                ..Default::default()
            }],
            communication_links: vec![CommunicationLink {
                id: "e".into(),
                source: "web".into(),
                target: "db".into(),
                ..Default::default()
            }],
            ..Default::default()
        };
        assert!(validate_model(&model).is_empty());
    }

    #[test]
    fn test_duplicate_and_empty_asset_ids() {
        let model = ThreagileModel {
            technical_assets: vec![asset("a", "client"), asset("a", "client"), asset("", "client")],
            ..Default::default()
        };
        assert_eq!(
            kinds(&validate_model(&model)),
            vec![ErrorKind::DuplicateId, ErrorKind::MissingRequiredField]
        );
    }

    #[test]
    fn test_dangling_members_are_errors() {
        let model = ThreagileModel {
            technical_assets: vec![asset("a", "client")],
            trust_boundaries: vec![TrustBoundary {
                id: "b".into(),
                technical_assets_inside: vec!["ghost".into()],
                ..Default::default()
            }],
            shared_runtimes: vec![SharedRuntime {
                id: "r".into(),
                technical_assets_running: vec!["ghost".into()],
                ..Default::default()
            }],
            ..Default::default()
        };
        let issues = validate_model(&model);
        assert_eq!(
            kinds(&issues),
            vec![ErrorKind::InvalidReference, ErrorKind::InvalidReference]
        );
        assert!(issues.iter().all(ConversionError::is_blocking));
    }

    #[test]
    fn test_asset_in_two_boundaries_violates_constraint() {
        let boundary = |id: &str| TrustBoundary {
            id: id.into(),
            technical_assets_inside: vec!["a".into()],
            ..Default::default()
        };
        let model = ThreagileModel {
            technical_assets: vec![asset("a", "client")],
            trust_boundaries: vec![boundary("b1"), boundary("b2")],
            ..Default::default()
        };
        assert_eq!(
            kinds(&validate_model(&model)),
            vec![ErrorKind::ConstraintViolation]
        );
    }

    #[test]
    fn test_empty_link_endpoints_only_warn() {
        let model = ThreagileModel {
            technical_assets: vec![asset("a", "client")],
            communication_links: vec![CommunicationLink {
                id: "e".into(),
                source: "a".into(),
                target: String::new(),
                target_id: "outside".into(),
                ..Default::default()
            }],
            ..Default::default()
        };
        let issues = validate_model(&model);
        assert_eq!(kinds(&issues), vec![ErrorKind::MissingSourceField]);
        assert_eq!(issues[0].severity, Severity::Warning);
    }

    #[test]
    fn test_unknown_link_endpoint_is_an_error() {
        let model = ThreagileModel {
            technical_assets: vec![asset("a", "client")],
            communication_links: vec![CommunicationLink {
                id: "e".into(),
                source: "a".into(),
                target: "zzz".into(),
                ..Default::default()
            }],
            ..Default::default()
        };
        let issues = validate_model(&model);
        assert_eq!(kinds(&issues), vec![ErrorKind::InvalidReference]);
        assert!(issues[0].is_blocking());
    }

    #[test]
    fn test_database_without_data_asset_is_flagged() {
        let model = ThreagileModel {
            technical_assets: vec![asset("db", "database")],
            ..Default::default()
        };
        assert_eq!(
            kinds(&validate_model(&model)),
            vec![ErrorKind::ConstraintViolation]
        );
    }

    #[test]
    fn test_circular_models_carry_a_generation_warning() {
        let mut model = ThreagileModel::default();
        model
            .properties
            .insert(PROP_CIRCULAR_REFERENCES.into(), "true".into());
        let issues = validate_model(&model);
        assert_eq!(kinds(&issues), vec![ErrorKind::CircularReferences]);
        assert!(!issues[0].is_blocking());
    }
}
