//! Diagram → threat model mapping.
//!
//! Shapes become technical assets (or trust boundaries when they contain
//! other shapes), relations become communication links. Everything the
//! diagram leaves implicit is decided by the rule tables in [`rules`].

pub mod rules;

pub use rules::{
    RelationClassification, ShapeClassification, classify_relation, classify_shape,
};

use crate::domain::{
    CommunicationLink, ConversionError, DataAsset, ErrorKind, PROP_AVAILABILITY,
    PROP_CONFIDENTIALITY, PROP_INTEGRITY, Properties, SharedRuntime, TechnicalAsset,
    ThreagileModel, TrustBoundary,
};
use crate::infra::diagram::{Diagram, DiagramRelation, DiagramShape, DiagramStyle};
use rules::{KNOWN_ASSET_TYPES, KNOWN_LEVELS, TYPE_DATABASE};

pub const DEFAULT_BOUNDARY_ID: &str = "default-boundary";
pub const DEFAULT_BOUNDARY_TYPE: &str = "network-on-prem";
pub const REF_PREFIX: &str = "ref:";

/// Style keys copied verbatim into asset and link properties.
const SEMANTIC_KEYS: &[&str] = &[
    "owner",
    "technology",
    "internet",
    "machine",
    "encryption",
    "tags",
];

/// Mapping knobs coming from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapperOptions {
    /// Type of the default boundary and of containers without `boundaryType`.
    pub default_boundary_type: String,
}

impl Default for MapperOptions {
    fn default() -> Self {
        Self {
            default_boundary_type: DEFAULT_BOUNDARY_TYPE.to_string(),
        }
    }
}

/// Unenriched model plus the soft problems found while building it.
#[derive(Debug, Clone, Default)]
pub struct Mapping {
    pub model: ThreagileModel,
    pub warnings: Vec<ConversionError>,
}

/// Build a threat model from a diagram.
pub fn map_diagram(diagram: &Diagram, options: &MapperOptions) -> Mapping {
    let mut mapper = Mapper::new(options);
    mapper.start(diagram);
    for shape in &diagram.shapes {
        mapper.visit(shape, None);
    }
    for relation in &diagram.relations {
        mapper.link(relation);
    }
    mapper.finish()
}

struct Mapper<'a> {
    options: &'a MapperOptions,
    model: ThreagileModel,
    warnings: Vec<ConversionError>,
    default_members: Vec<String>,
}

impl<'a> Mapper<'a> {
    fn new(options: &'a MapperOptions) -> Self {
        Self {
            options,
            model: ThreagileModel::default(),
            warnings: Vec::new(),
            default_members: Vec::new(),
        }
    }

    fn start(&mut self, diagram: &Diagram) {
        let meta = &diagram.metadata;
        self.model.title = non_empty(&meta.title).unwrap_or("Threat Model").to_string();
        self.model.description = meta.description.clone();
        self.model.version = non_empty(&meta.version).unwrap_or("1.0").to_string();
        self.model.author = meta.author.clone();
        if let Some(created) = &meta.created {
            self.model
                .properties
                .insert("sourceCreated".into(), created.clone());
        }
        if let Some(modified) = &meta.modified {
            self.model
                .properties
                .insert("sourceModified".into(), modified.clone());
        }
    }

    /// Walk a shape; `boundary` is the index of the innermost enclosing boundary.
    fn visit(&mut self, shape: &DiagramShape, boundary: Option<usize>) {
        self.model
            .styles
            .insert(shape.id.clone(), shape.raw_style.clone());

        if shape.is_container() {
            let index = self.model.trust_boundaries.len();
            let boundary = self.boundary(shape);
            self.model.trust_boundaries.push(boundary);
            log::debug!("shape {} mapped to trust boundary", shape.id);
            for child in &shape.children {
                self.visit(child, Some(index));
            }
            return;
        }

        let asset = self.asset(shape);
        match boundary {
            Some(index) => self.model.trust_boundaries[index]
                .technical_assets_inside
                .push(asset.id.clone()),
            None => self.default_members.push(asset.id.clone()),
        }
        if let Some(runtime) = shape.style.value("sharedRuntime") {
            self.join_runtime(runtime, &asset.id);
        }
        if asset.asset_type == TYPE_DATABASE {
            self.model.data_assets.push(data_asset_for(&asset, &shape.style));
        }
        self.model.technical_assets.push(asset);
    }

    fn boundary(&self, shape: &DiagramShape) -> TrustBoundary {
        let name = display_name(shape);
        TrustBoundary {
            id: shape.id.clone(),
            title: name.clone(),
            boundary_type: shape
                .style
                .value("boundaryType")
                .unwrap_or(self.options.default_boundary_type.as_str())
                .to_string(),
            description: shape
                .style
                .value("description")
                .map(str::to_string)
                .unwrap_or_else(|| format!("Trust boundary {name}")),
            name,
            technical_assets_inside: Vec::new(),
        }
    }

    fn asset(&mut self, shape: &DiagramShape) -> TechnicalAsset {
        let class = classify_shape(shape);
        let name = display_name(shape);

        if !KNOWN_ASSET_TYPES.contains(&class.asset_type.as_str()) {
            self.warn(
                ErrorKind::UnsupportedMapping,
                format!(
                    "shape '{}' uses unknown asset type '{}'",
                    shape.id, class.asset_type
                ),
            );
        }

        let mut properties = Properties::new();
        for (key, level) in [
            (PROP_CONFIDENTIALITY, &class.confidentiality),
            (PROP_INTEGRITY, &class.integrity),
            (PROP_AVAILABILITY, &class.availability),
        ] {
            if !KNOWN_LEVELS.contains(&level.to_lowercase().as_str()) {
                self.warn(
                    ErrorKind::UnsupportedMapping,
                    format!(
                        "shape '{}' has unknown {key} level '{level}', scored as medium",
                        shape.id
                    ),
                );
            }
            properties.insert(key.to_string(), level.clone());
        }
        copy_annotations(&shape.style, &mut properties);

        let is_database = class.asset_type == TYPE_DATABASE;
        TechnicalAsset {
            id: shape.id.clone(),
            title: name.clone(),
            description: shape
                .style
                .value("description")
                .map(str::to_string)
                .unwrap_or_else(|| format!("{} {}", class.asset_type, name)),
            name,
            asset_type: class.asset_type,
            usage: class.usage,
            style: shape.raw_style.clone(),
            used_for_data_protection: bool_property(
                &shape.style,
                "usedForDataProtection",
                is_database,
            ),
            used_for_data_retention: bool_property(
                &shape.style,
                "usedForDataRetention",
                is_database,
            ),
            used_for_data_destruction: bool_property(
                &shape.style,
                "usedForDataDestruction",
                false,
            ),
            used_for_data_archiving: bool_property(&shape.style, "usedForDataArchiving", false),
            properties,
        }
    }

    fn join_runtime(&mut self, runtime: &str, asset_id: &str) {
        let id = format!("runtime-{}", slug(runtime));
        match self
            .model
            .shared_runtimes
            .iter_mut()
            .find(|r| r.id == id)
        {
            Some(existing) => existing.technical_assets_running.push(asset_id.to_string()),
            None => self.model.shared_runtimes.push(SharedRuntime {
                id,
                name: runtime.to_string(),
                technical_assets_running: vec![asset_id.to_string()],
            }),
        }
    }

    fn link(&mut self, relation: &DiagramRelation) {
        self.model
            .styles
            .insert(relation.id.clone(), relation.raw_style.clone());

        for (end, id) in [("source", &relation.source_id), ("target", &relation.target_id)] {
            if id.trim().is_empty() {
                self.warn(
                    ErrorKind::MissingSourceField,
                    format!("relation '{}' has no {end}", relation.id),
                );
            }
        }

        let class = classify_relation(relation);
        let name = non_empty(&relation.label)
            .map(str::to_string)
            .unwrap_or_else(|| format!("{} to {}", relation.source_id, relation.target_id));
        let mut properties = Properties::new();
        copy_annotations(&relation.style, &mut properties);
        // The link's own encryption field wins over the semantic copy.
        properties.remove("encryption");

        self.model.communication_links.push(CommunicationLink {
            id: relation.id.clone(),
            title: name.clone(),
            name,
            link_type: class.link_type,
            source_id: relation.source_id.clone(),
            target_id: relation.target_id.clone(),
            source: relation.source_id.clone(),
            target: relation.target_id.clone(),
            protocol: class.protocol,
            authentication: class.authentication,
            authorization: class.authorization,
            encryption: class.encryption,
            properties,
        });
    }

    fn finish(mut self) -> Mapping {
        let default_boundary = TrustBoundary {
            id: DEFAULT_BOUNDARY_ID.to_string(),
            name: "Default Trust Boundary".to_string(),
            title: "Default Trust Boundary".to_string(),
            boundary_type: self.options.default_boundary_type.clone(),
            description: "Assets not enclosed by an explicit boundary".to_string(),
            technical_assets_inside: std::mem::take(&mut self.default_members),
        };
        self.model.trust_boundaries.insert(0, default_boundary);

        log::info!(
            "mapped {} assets, {} boundaries, {} links",
            self.model.technical_assets.len(),
            self.model.trust_boundaries.len(),
            self.model.communication_links.len()
        );
        Mapping {
            model: self.model,
            warnings: self.warnings,
        }
    }

    fn warn(&mut self, kind: ErrorKind, message: String) {
        log::warn!("{message}");
        self.warnings.push(ConversionError::warning(kind, message));
    }
}

fn data_asset_for(asset: &TechnicalAsset, style: &DiagramStyle) -> DataAsset {
    DataAsset {
        id: format!("data-{}", asset.id),
        name: format!("{} Data", asset.name),
        data_type: "stored-data".to_string(),
        usage: asset.usage.clone(),
        origin: asset.name.clone(),
        owner: style.value("owner").unwrap_or_default().to_string(),
        quantity: "many".to_string(),
        confidentiality: "medium".to_string(),
        integrity: "medium".to_string(),
        availability: "medium".to_string(),
    }
}

/// Copy `ref:` valued properties and semantic keys.
fn copy_annotations(style: &DiagramStyle, properties: &mut Properties) {
    for (key, value) in &style.properties {
        if value.starts_with(REF_PREFIX) || SEMANTIC_KEYS.contains(&key.as_str()) {
            properties.insert(key.clone(), value.clone());
        }
    }
}

fn bool_property(style: &DiagramStyle, key: &str, default: bool) -> bool {
    match style.value(key) {
        Some(_) => style.flag(key),
        None => default,
    }
}

fn display_name(shape: &DiagramShape) -> String {
    non_empty(&shape.label).unwrap_or(&shape.id).to_string()
}

fn non_empty(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

/// Lowercase, alphanumerics kept, runs of anything else collapsed to `-`.
pub fn slug(value: &str) -> String {
    let mut out = String::new();
    for ch in value.trim().chars() {
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
        } else if !out.ends_with('-') && !out.is_empty() {
            out.push('-');
        }
    }
    out.trim_end_matches('-').to_string()
}
