//! Classification rule tables.
//!
//! Every attribute the classifier infers is decided by an ordered list of
//! rules; the first rule that matches wins. Explicit style properties come
//! first, then shape keywords, then label substrings, then a fallback.
//! Reordering any table changes classification results.

use crate::infra::diagram::{DiagramRelation, DiagramShape, DiagramStyle};

pub const TYPE_WEB_APPLICATION: &str = "web-application";
pub const TYPE_DATABASE: &str = "database";
pub const TYPE_GATEWAY: &str = "gateway";
pub const TYPE_SERVICE: &str = "service";
pub const TYPE_WEB_SERVICE: &str = "web-service";
pub const TYPE_EXTERNAL_SERVICE: &str = "external-service";
pub const TYPE_CLIENT: &str = "client";

/// Asset types the threat catalog and risk table know about.
pub const KNOWN_ASSET_TYPES: &[&str] = &[
    TYPE_WEB_APPLICATION,
    TYPE_DATABASE,
    TYPE_GATEWAY,
    TYPE_SERVICE,
    TYPE_WEB_SERVICE,
    TYPE_EXTERNAL_SERVICE,
    TYPE_CLIENT,
];

/// Qualitative CIA levels understood by the risk evaluator.
pub const KNOWN_LEVELS: &[&str] = &["low", "medium", "high", "very-high", "critical"];

/// One step of a priority chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Use the value of this style property when it is set and non-empty.
    Explicit(&'static str),
    /// `shape` style value contains the keyword.
    ShapeContains(&'static str, &'static str),
    /// Label contains any of the (lowercase) needles, case-insensitively.
    LabelContains(&'static [&'static str], &'static str),
    /// Always matches.
    Fallback(&'static str),
}

/// What a rule looks at: a lowercased label and the parsed style.
#[derive(Debug, Clone)]
pub struct Subject<'a> {
    label: String,
    style: &'a DiagramStyle,
}

impl<'a> Subject<'a> {
    pub fn new(label: &str, style: &'a DiagramStyle) -> Self {
        Self {
            label: label.to_lowercase(),
            style,
        }
    }

    pub fn of_shape(shape: &'a DiagramShape) -> Self {
        Self::new(&shape.label, &shape.style)
    }

    pub fn of_relation(relation: &'a DiagramRelation) -> Self {
        Self::new(&relation.label, &relation.style)
    }
}

/// Outcome of a rule chain and the rule that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub value: String,
    pub rule: Rule,
}

impl Rule {
    pub fn apply(&self, subject: &Subject<'_>) -> Option<String> {
        match self {
            Rule::Explicit(key) => subject.style.value(key).map(str::to_string),
            Rule::ShapeContains(keyword, value) => subject
                .style
                .shape
                .to_lowercase()
                .contains(keyword)
                .then(|| value.to_string()),
            Rule::LabelContains(needles, value) => needles
                .iter()
                .any(|needle| subject.label.contains(needle))
                .then(|| value.to_string()),
            Rule::Fallback(value) => Some(value.to_string()),
        }
    }
}

/// Run a chain; `None` only when the chain has no fallback and nothing matched.
pub fn evaluate(rules: &[Rule], subject: &Subject<'_>) -> Option<Decision> {
    rules.iter().find_map(|rule| {
        rule.apply(subject).map(|value| Decision { value, rule: *rule })
    })
}

pub const ASSET_TYPE_RULES: &[Rule] = &[
    Rule::Explicit("assetType"),
    Rule::ShapeContains("cylinder", TYPE_DATABASE),
    Rule::ShapeContains("rhombus", TYPE_GATEWAY),
    Rule::LabelContains(&["gateway"], TYPE_GATEWAY),
    Rule::LabelContains(&["database", "db"], TYPE_DATABASE),
    Rule::LabelContains(&["api"], TYPE_WEB_SERVICE),
    Rule::LabelContains(&["web", "application"], TYPE_WEB_APPLICATION),
    Rule::Fallback(TYPE_WEB_APPLICATION),
];

pub const USAGE_RULES: &[Rule] = &[Rule::Explicit("usage"), Rule::Fallback("business")];

const SENSITIVE_IDENTITY: &[&str] = &["auth", "login", "user", "account"];
const SENSITIVE_FINANCE: &[&str] = &["payment", "financial", "billing"];

pub const CONFIDENTIALITY_RULES: &[Rule] = &[
    Rule::Explicit("confidentiality"),
    Rule::LabelContains(SENSITIVE_IDENTITY, "high"),
    Rule::LabelContains(SENSITIVE_FINANCE, "high"),
    Rule::Fallback("medium"),
];

pub const INTEGRITY_RULES: &[Rule] = &[
    Rule::Explicit("integrity"),
    Rule::LabelContains(SENSITIVE_IDENTITY, "high"),
    Rule::LabelContains(SENSITIVE_FINANCE, "high"),
    Rule::Fallback("medium"),
];

pub const AVAILABILITY_RULES: &[Rule] = &[
    Rule::Explicit("availability"),
    Rule::LabelContains(&["gateway"], "high"),
    Rule::ShapeContains("rhombus", "high"),
    Rule::Fallback("medium"),
];

pub const LINK_TYPE_RULES: &[Rule] = &[Rule::Explicit("linkType"), Rule::Fallback("restful-api")];
pub const PROTOCOL_RULES: &[Rule] = &[Rule::Explicit("protocol"), Rule::Fallback("https")];
pub const AUTHENTICATION_RULES: &[Rule] =
    &[Rule::Explicit("authentication"), Rule::Fallback("none")];
pub const AUTHORIZATION_RULES: &[Rule] =
    &[Rule::Explicit("authorization"), Rule::Fallback("none")];
pub const ENCRYPTION_RULES: &[Rule] = &[Rule::Explicit("encryption"), Rule::Fallback("none")];

/// Attributes inferred for a shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeClassification {
    pub asset_type: String,
    pub usage: String,
    pub confidentiality: String,
    pub integrity: String,
    pub availability: String,
}

/// Attributes inferred for a relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationClassification {
    pub link_type: String,
    pub protocol: String,
    pub authentication: String,
    pub authorization: String,
    pub encryption: String,
}

fn decide(rules: &[Rule], subject: &Subject<'_>) -> String {
    evaluate(rules, subject)
        .map(|d| d.value)
        .unwrap_or_default()
}

pub fn classify_shape(shape: &DiagramShape) -> ShapeClassification {
    let subject = Subject::of_shape(shape);
    ShapeClassification {
        asset_type: decide(ASSET_TYPE_RULES, &subject),
        usage: decide(USAGE_RULES, &subject),
        confidentiality: decide(CONFIDENTIALITY_RULES, &subject),
        integrity: decide(INTEGRITY_RULES, &subject),
        availability: decide(AVAILABILITY_RULES, &subject),
    }
}

pub fn classify_relation(relation: &DiagramRelation) -> RelationClassification {
    let subject = Subject::of_relation(relation);
    RelationClassification {
        link_type: decide(LINK_TYPE_RULES, &subject),
        protocol: decide(PROTOCOL_RULES, &subject),
        authentication: decide(AUTHENTICATION_RULES, &subject),
        authorization: decide(AUTHORIZATION_RULES, &subject),
        encryption: decide(ENCRYPTION_RULES, &subject),
    }
}
