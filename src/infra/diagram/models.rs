use crate::domain::{ConversionError, ErrorKind, Result};
use crate::infra::diagram::style::parse_style;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

// =========================================================================
// Core Types
// =========================================================================

/// Parsed diagram: metadata, top-level shapes (children nested) and relations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Diagram {
    pub metadata: DiagramMetadata,
    pub shapes: Vec<DiagramShape>,
    pub relations: Vec<DiagramRelation>,
}

/// Document-level information.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagramMetadata {
    pub title: String,
    pub description: String,
    pub version: String,
    pub author: String,
    pub created: Option<String>,
    pub modified: Option<String>,
    pub properties: BTreeMap<String, String>,
}

/// Typed view of a `key=value;...` style string.
///
/// The known fields mirror entries of `properties`, which holds every token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagramStyle {
    pub fill_color: String,
    pub stroke_color: String,
    pub font_color: String,
    pub font_style: String,
    pub font_size: i32,
    pub shape: String,
    pub properties: BTreeMap<String, String>,
}

impl DiagramStyle {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Non-empty value for `key`.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.get(key).map(str::trim).filter(|v| !v.is_empty())
    }

    /// True when `key` is set to `1` or `true`.
    pub fn flag(&self, key: &str) -> bool {
        matches!(
            self.value(key).map(str::to_ascii_lowercase).as_deref(),
            Some("1" | "true")
        )
    }

    /// Render the property map back into `key=value;` form.
    pub fn to_style_string(&self) -> String {
        self.properties
            .iter()
            .map(|(k, v)| format!("{k}={v};"))
            .collect()
    }
}

/// Position and size of a cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Geometry {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// A vertex of the diagram.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagramShape {
    pub id: String,
    pub label: String,
    pub style: DiagramStyle,
    /// Raw style string as found in the source document.
    pub raw_style: String,
    pub geometry: Geometry,
    pub children: Vec<DiagramShape>,
}

impl DiagramShape {
    pub fn new(id: impl Into<String>, label: impl Into<String>, style: &str) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            style: parse_style(style),
            raw_style: style.to_string(),
            geometry: Geometry::default(),
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<DiagramShape>) -> Self {
        self.children = children;
        self
    }

    /// Containers group other shapes instead of standing for an asset.
    pub fn is_container(&self) -> bool {
        !self.children.is_empty()
            || self.style.flag("container")
            || self.style.shape.contains("swimlane")
            || self.raw_style.split(';').next().map(str::trim) == Some("swimlane")
            || self.style.value("boundaryType").is_some()
    }
}

/// An edge between two shapes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagramRelation {
    pub id: String,
    pub label: String,
    pub source_id: String,
    pub target_id: String,
    pub style: DiagramStyle,
    pub raw_style: String,
    pub geometry: Geometry,
}

impl DiagramRelation {
    pub fn new(
        id: impl Into<String>,
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        style: &str,
    ) -> Self {
        Self {
            id: id.into(),
            label: String::new(),
            source_id: source_id.into(),
            target_id: target_id.into(),
            style: parse_style(style),
            raw_style: style.to_string(),
            geometry: Geometry::default(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

impl Diagram {
    /// All shapes, parents before their children.
    pub fn all_shapes(&self) -> Vec<&DiagramShape> {
        fn walk<'a>(shapes: &'a [DiagramShape], out: &mut Vec<&'a DiagramShape>) {
            for shape in shapes {
                out.push(shape);
                walk(&shape.children, out);
            }
        }

        let mut out = Vec::new();
        walk(&self.shapes, &mut out);
        out
    }

    pub fn shape(&self, id: &str) -> Option<&DiagramShape> {
        self.all_shapes().into_iter().find(|s| s.id == id)
    }
}

// =========================================================================
// Builder Pattern
// =========================================================================

/// Builder for diagrams assembled in code.
pub struct DiagramBuilder {
    metadata: DiagramMetadata,
    shapes: Vec<DiagramShape>,
    relations: Vec<DiagramRelation>,
}

impl Diagram {
    pub fn builder() -> DiagramBuilder {
        DiagramBuilder {
            metadata: DiagramMetadata::default(),
            shapes: Vec::new(),
            relations: Vec::new(),
        }
    }
}

impl DiagramBuilder {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.metadata.title = title.into();
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.metadata.author = author.into();
        self
    }

    pub fn shape(mut self, id: impl Into<String>, label: impl Into<String>, style: &str) -> Self {
        self.shapes.push(DiagramShape::new(id, label, style));
        self
    }

    pub fn container(mut self, container: DiagramShape) -> Self {
        self.shapes.push(container);
        self
    }

    pub fn relation(
        mut self,
        id: impl Into<String>,
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        style: &str,
    ) -> Self {
        self.relations
            .push(DiagramRelation::new(id, source_id, target_id, style));
        self
    }

    pub fn build(self) -> Result<Diagram> {
        let diagram = Diagram {
            metadata: self.metadata,
            shapes: self.shapes,
            relations: self.relations,
        };
        if let Some(err) = diagram.validate().into_iter().find(|e| e.is_blocking()) {
            return Err(err);
        }
        Ok(diagram)
    }
}

// =========================================================================
// Validation
// =========================================================================

impl Diagram {
    /// Check shape ids and relation endpoints.
    ///
    /// Missing or duplicate ids are errors; relations pointing at unknown
    /// shapes are warnings since edges may leave the current page.
    pub fn validate(&self) -> Vec<ConversionError> {
        let mut issues = Vec::new();
        let shapes = self.all_shapes();

        if shapes.is_empty() {
            issues.push(ConversionError::new(
                ErrorKind::MissingRequiredField,
                "diagram contains no shapes",
            ));
        }

        let mut seen = HashSet::new();
        for shape in &shapes {
            if shape.id.trim().is_empty() {
                issues.push(ConversionError::new(
                    ErrorKind::MissingRequiredField,
                    format!("shape '{}' has an empty id", shape.label),
                ));
            } else if !seen.insert(shape.id.as_str()) {
                issues.push(ConversionError::new(
                    ErrorKind::DuplicateId,
                    format!("duplicate shape id: {}", shape.id),
                ));
            }
        }

        for relation in &self.relations {
            for (end, id) in [("source", &relation.source_id), ("target", &relation.target_id)] {
                if id.is_empty() {
                    issues.push(ConversionError::warning(
                        ErrorKind::MissingSourceField,
                        format!("relation '{}' has no {end}", relation.id),
                    ));
                } else if !seen.contains(id.as_str()) {
                    issues.push(ConversionError::warning(
                        ErrorKind::InvalidReference,
                        format!(
                            "relation '{}' references unknown {end} shape '{id}'",
                            relation.id
                        ),
                    ));
                }
            }
        }

        issues
    }
}
