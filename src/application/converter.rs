//! End-to-end conversion: diagram in, annotated threat model out.

use crate::application::mapper::{MapperOptions, map_diagram};
use crate::application::resolver::resolve_references;
use crate::application::risk::analyze_threats;
use crate::application::validation::{validate_diagram, validate_model};
use crate::domain::{ConversionError, ThreagileModel, ThreatCatalog, ThreatFinding};
use crate::infra::diagram::{Diagram, read_diagram_file};
use chrono::Utc;
use std::path::Path;
use std::time::{Duration, Instant};

pub const PROP_CONVERTED_AT: &str = "convertedAt";
pub const PROP_GENERATOR: &str = "generator";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionOptions {
    pub validate_input: bool,
    pub validate_output: bool,
    pub mapper: MapperOptions,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            validate_input: true,
            validate_output: true,
            mapper: MapperOptions::default(),
        }
    }
}

/// Outcome of one conversion. Failures land in `errors` with
/// `success == false`; `convert` never panics on bad input.
#[derive(Debug, Clone, Default)]
pub struct ConversionResult {
    pub success: bool,
    pub elapsed: Duration,
    pub warnings: Vec<ConversionError>,
    pub errors: Vec<ConversionError>,
    pub converted_elements: usize,
    /// Last model produced, present once mapping has run.
    pub model: Option<ThreagileModel>,
    pub findings: Vec<ThreatFinding>,
}

impl ConversionResult {
    fn record(&mut self, issues: Vec<ConversionError>) {
        for issue in issues {
            if issue.is_blocking() {
                self.errors.push(issue);
            } else {
                self.warnings.push(issue);
            }
        }
    }

    fn fail(mut self, error: ConversionError, started: Instant) -> Self {
        self.errors.push(error);
        self.finish(started)
    }

    fn finish(mut self, started: Instant) -> Self {
        self.success = self.errors.is_empty();
        self.elapsed = started.elapsed();
        self.converted_elements = self
            .model
            .as_ref()
            .map(ThreagileModel::element_count)
            .unwrap_or(0);
        log::info!(
            "conversion {} in {:?}: {} elements, {} warnings, {} errors",
            if self.success { "succeeded" } else { "failed" },
            self.elapsed,
            self.converted_elements,
            self.warnings.len(),
            self.errors.len()
        );
        self
    }
}

/// Runs parse → map → resolve → score → validate.
pub struct Converter<'a> {
    catalog: &'a ThreatCatalog,
    options: ConversionOptions,
}

impl<'a> Converter<'a> {
    pub fn new(catalog: &'a ThreatCatalog, options: ConversionOptions) -> Self {
        Self { catalog, options }
    }

    pub fn options(&self) -> &ConversionOptions {
        &self.options
    }

    /// Read a draw.io file and convert it.
    pub fn convert_file(&self, path: &Path) -> ConversionResult {
        let started = Instant::now();
        match read_diagram_file(path) {
            Ok(diagram) => {
                let mut result = self.convert(&diagram);
                result.elapsed = started.elapsed();
                result
            }
            Err(err) => ConversionResult::default().fail(err, started),
        }
    }

    pub fn convert(&self, diagram: &Diagram) -> ConversionResult {
        let started = Instant::now();
        let mut result = ConversionResult::default();

        if self.options.validate_input {
            result.record(validate_diagram(diagram));
            if !result.errors.is_empty() {
                return result.finish(started);
            }
        }

        let mapping = map_diagram(diagram, &self.options.mapper);
        result.record(mapping.warnings);
        result.model = Some(mapping.model.clone());

        let resolution = match resolve_references(&mapping.model) {
            Ok(resolution) => resolution,
            Err(err) => return result.fail(err, started),
        };
        result.record(resolution.warnings);

        let analysis = analyze_threats(&resolution.model, self.catalog);
        let mut model = analysis.model;
        model
            .properties
            .insert(PROP_CONVERTED_AT.into(), Utc::now().to_rfc3339());
        model.properties.insert(
            PROP_GENERATOR.into(),
            format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        );

        if self.options.validate_output {
            result.record(validate_model(&model));
        }

        result.findings = analysis.findings;
        result.model = Some(model);
        result.finish(started)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::mapper::DEFAULT_BOUNDARY_ID;
    use crate::domain::{ErrorKind, PROP_THREATS};

    fn shop() -> Diagram {
        Diagram::builder()
            .title("Shop")
            .shape("db", "Customer Database", "shape=cylinder3")
            .shape("web", "Web App", "")
            .relation("e1", "web", "db", "")
            .build()
            .unwrap()
    }

    #[test]
    fn test_converts_the_reference_scenario() {
        let catalog = ThreatCatalog::builtin();
        let converter = Converter::new(&catalog, ConversionOptions::default());
        let result = converter.convert(&shop());

        assert!(result.success, "{:?}", result.errors);
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);
        let model = result.model.as_ref().unwrap();

        assert_eq!(model.technical_assets.len(), 2);
        assert_eq!(model.asset("db").unwrap().asset_type, "database");
        assert_eq!(model.asset("web").unwrap().asset_type, "web-application");
        assert_eq!(model.data_assets.len(), 1);
        assert_eq!(model.data_assets[0].id, "data-db");

        assert_eq!(model.trust_boundaries.len(), 1);
        let boundary = &model.trust_boundaries[0];
        assert_eq!(boundary.id, DEFAULT_BOUNDARY_ID);
        assert_eq!(boundary.technical_assets_inside, vec!["db", "web"]);

        let link = &model.communication_links[0];
        assert_eq!(link.protocol, "https");
        assert_eq!(link.authentication, "none");
        assert_eq!(link.encryption, "none");
        assert_eq!((link.source.as_str(), link.target.as_str()), ("web", "db"));

        let db_threats: Vec<_> = result
            .findings
            .iter()
            .filter(|f| f.asset_id == "db")
            .map(|f| f.threat_name.as_str())
            .collect();
        assert!(db_threats.contains(&"Fuite de données sensibles"));
        assert!(db_threats.contains(&"Injection SQL"));
        let count: usize = model
            .asset("db")
            .unwrap()
            .property(PROP_THREATS)
            .unwrap()
            .parse()
            .unwrap();
        assert!(count > 0);

        assert!(model.properties.contains_key(PROP_CONVERTED_AT));
        assert_eq!(result.converted_elements, model.element_count());
    }

    #[test]
    fn test_input_errors_fail_before_mapping() {
        let diagram = Diagram {
            shapes: vec![
                crate::infra::diagram::DiagramShape::new("a", "A", ""),
                crate::infra::diagram::DiagramShape::new("a", "B", ""),
            ],
            ..Default::default()
        };
        let catalog = ThreatCatalog::builtin();
        let result = Converter::new(&catalog, ConversionOptions::default()).convert(&diagram);

        assert!(!result.success);
        assert!(result.model.is_none());
        assert_eq!(result.errors[0].kind, ErrorKind::DuplicateId);
        assert_eq!(result.converted_elements, 0);
    }

    #[test]
    fn test_disabling_input_validation_lets_the_pipeline_run() {
        let diagram = Diagram::default();
        let catalog = ThreatCatalog::builtin();
        let options = ConversionOptions {
            validate_input: false,
            ..Default::default()
        };
        let result = Converter::new(&catalog, options).convert(&diagram);
        assert!(result.success);
        // Only the default boundary.
        assert_eq!(result.converted_elements, 1);
    }

    #[test]
    fn test_malformed_reference_fails_the_run() {
        let diagram = Diagram::builder()
            .shape("a", "A", "dependsOn=ref:")
            .build()
            .unwrap();
        let catalog = ThreatCatalog::builtin();
        let result = Converter::new(&catalog, ConversionOptions::default()).convert(&diagram);

        assert!(!result.success);
        assert_eq!(result.errors[0].kind, ErrorKind::InvalidSourceValue);
        assert!(result.model.is_some(), "mapped model is kept for diagnostics");
    }

    #[test]
    fn test_references_to_punctuated_names_convert() {
        let diagram = Diagram::builder()
            .shape("orders", "Orders (EU)", "")
            .shape("web", "Web App", "store=ref:Orders (EU)")
            .build()
            .unwrap();
        let catalog = ThreatCatalog::builtin();
        let result = Converter::new(&catalog, ConversionOptions::default()).convert(&diagram);

        assert!(result.success, "{:?}", result.errors);
        let model = result.model.unwrap();
        assert_eq!(model.asset("web").unwrap().property("store"), Some("Orders (EU)"));
    }

    #[test]
    fn test_dangling_edges_are_warnings() {
        let diagram = Diagram::builder()
            .shape("a", "A", "")
            .relation("e", "a", "elsewhere", "")
            .build()
            .unwrap();
        let catalog = ThreatCatalog::builtin();
        let result = Converter::new(&catalog, ConversionOptions::default()).convert(&diagram);

        assert!(result.success);
        assert!(
            result
                .warnings
                .iter()
                .any(|w| w.kind == ErrorKind::InvalidReference)
        );
        let model = result.model.unwrap();
        let link = &model.communication_links[0];
        assert_eq!(link.target, "");
        assert_eq!(link.target_id, "elsewhere");
    }

    #[test]
    fn test_missing_file_is_a_failed_result() {
        let catalog = ThreatCatalog::builtin();
        let result = Converter::new(&catalog, ConversionOptions::default())
            .convert_file(Path::new("/definitely/not/here.drawio"));
        assert!(!result.success);
        assert_eq!(result.errors[0].kind, ErrorKind::FileNotFound);
    }
}
