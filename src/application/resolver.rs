//! Cross-reference resolution and cycle detection.
//!
//! Assets point at each other through `ref:<id>` property values and
//! boundaries point at their members. Resolution rewrites those forward
//! pointers to canonical values; it never removes assets, boundaries or
//! links.

use crate::application::mapper::REF_PREFIX;
use crate::domain::{
    ConversionError, ErrorKind, Properties, Result, TechnicalAsset, ThreagileModel,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashMap, HashSet};

pub const PROP_CIRCULAR_REFERENCES: &str = "circularReferences";
pub const PROP_CIRCULAR_REFERENCE: &str = "circularReference";

static REFERENCE_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w][\w .:/\-]*$").expect("valid regex"));

/// Resolved model plus the references that could not be resolved.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub model: ThreagileModel,
    pub warnings: Vec<ConversionError>,
}

/// True when the reference graph contains at least one cycle.
pub fn has_circular_references(model: &ThreagileModel) -> bool {
    !find_cycles(model).is_empty()
}

/// Every cycle found by a single depth-first pass, as a node path whose
/// first and last entries are equal.
pub fn find_cycles(model: &ThreagileModel) -> Vec<Vec<String>> {
    ReferenceGraph::build(model).cycles()
}

/// Rewrite references to canonical values.
///
/// - `ref:<id>` property values become the referenced asset's title.
/// - Boundary and shared-runtime members become canonical asset ids;
///   members that do not resolve are dropped.
/// - Link `source`/`target` become canonical asset ids, or empty when the
///   raw `source_id`/`target_id` does not resolve.
///
/// A `ref:` that does not resolve and whose id is empty or malformed is a
/// hard error.
pub fn resolve_references(model: &ThreagileModel) -> Result<Resolution> {
    let index = AssetIndex::new(&model.technical_assets);
    check_reference_syntax(model, &index)?;

    let mut resolved = model.clone();
    let mut warnings = Vec::new();

    for asset in &mut resolved.technical_assets {
        let owner = format!("asset '{}'", asset.id);
        resolve_properties(&index, &owner, &mut asset.properties, &mut warnings);
    }

    for boundary in &mut resolved.trust_boundaries {
        let owner = format!("trust boundary '{}'", boundary.id);
        boundary.technical_assets_inside =
            resolve_members(&index, &owner, &boundary.technical_assets_inside, &mut warnings);
    }

    for runtime in &mut resolved.shared_runtimes {
        let owner = format!("shared runtime '{}'", runtime.id);
        runtime.technical_assets_running =
            resolve_members(&index, &owner, &runtime.technical_assets_running, &mut warnings);
    }

    for link in &mut resolved.communication_links {
        link.source = resolve_endpoint(&index, &link.id, "source", &link.source_id, &mut warnings);
        link.target = resolve_endpoint(&index, &link.id, "target", &link.target_id, &mut warnings);
        let owner = format!("link '{}'", link.id);
        resolve_properties(&index, &owner, &mut link.properties, &mut warnings);
    }

    let cycles = find_cycles(model);
    if !cycles.is_empty() {
        flag_cycles(&mut resolved, &cycles, &mut warnings);
    }

    Ok(Resolution {
        model: resolved,
        warnings,
    })
}

fn check_reference_syntax(model: &ThreagileModel, index: &AssetIndex<'_>) -> Result<()> {
    let asset_props = model
        .technical_assets
        .iter()
        .map(|a| (a.id.as_str(), &a.properties));
    let link_props = model
        .communication_links
        .iter()
        .map(|l| (l.id.as_str(), &l.properties));

    for (owner, properties) in asset_props.chain(link_props) {
        for (key, value) in properties {
            let Some(id) = value.strip_prefix(REF_PREFIX) else {
                continue;
            };
            let id = id.trim();
            if index.lookup(id).is_none() && !REFERENCE_ID.is_match(id) {
                return Err(ConversionError::new(
                    ErrorKind::InvalidSourceValue,
                    format!("'{owner}' property '{key}' has malformed reference '{value}'"),
                ));
            }
        }
    }
    Ok(())
}

fn resolve_properties(
    index: &AssetIndex<'_>,
    owner: &str,
    properties: &mut Properties,
    warnings: &mut Vec<ConversionError>,
) {
    for (key, value) in properties.iter_mut() {
        let Some(reference) = value.strip_prefix(REF_PREFIX) else {
            continue;
        };
        match index.lookup(reference.trim()) {
            Some(target) => *value = target.display_title().to_string(),
            None => warn(
                warnings,
                ErrorKind::InvalidReference,
                format!("{owner} property '{key}' references unknown asset '{reference}'"),
            ),
        }
    }
}

fn resolve_members(
    index: &AssetIndex<'_>,
    owner: &str,
    members: &[String],
    warnings: &mut Vec<ConversionError>,
) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut resolved = Vec::new();
    for member in members {
        match index.lookup(member) {
            Some(asset) => {
                if seen.insert(asset.id.as_str()) {
                    resolved.push(asset.id.clone());
                }
            }
            None => warn(
                warnings,
                ErrorKind::InvalidReference,
                format!("{owner} drops unknown member '{member}'"),
            ),
        }
    }
    resolved
}

fn resolve_endpoint(
    index: &AssetIndex<'_>,
    link_id: &str,
    end: &str,
    raw: &str,
    warnings: &mut Vec<ConversionError>,
) -> String {
    match index.lookup(raw) {
        Some(asset) => asset.id.clone(),
        None => {
            warn(
                warnings,
                ErrorKind::InvalidReference,
                format!("link '{link_id}' {end} '{raw}' does not resolve to an asset"),
            );
            String::new()
        }
    }
}

fn flag_cycles(
    model: &mut ThreagileModel,
    cycles: &[Vec<String>],
    warnings: &mut Vec<ConversionError>,
) {
    model
        .properties
        .insert(PROP_CIRCULAR_REFERENCES.into(), "true".into());

    let involved: HashSet<&str> = cycles.iter().flatten().map(String::as_str).collect();
    for asset in &mut model.technical_assets {
        if involved.contains(asset.id.as_str()) {
            asset
                .properties
                .insert(PROP_CIRCULAR_REFERENCE.into(), "true".into());
        }
    }

    for cycle in cycles {
        warn(
            warnings,
            ErrorKind::CircularMapping,
            format!("circular reference: {}", cycle.join(" -> ")),
        );
    }
}

fn warn(warnings: &mut Vec<ConversionError>, kind: ErrorKind, message: String) {
    log::warn!("{message}");
    warnings.push(ConversionError::warning(kind, message));
}

/// Lookup by exact id, then by case-insensitive name or title.
struct AssetIndex<'a> {
    by_id: HashMap<&'a str, &'a TechnicalAsset>,
    by_name: HashMap<String, &'a TechnicalAsset>,
}

impl<'a> AssetIndex<'a> {
    fn new(assets: &'a [TechnicalAsset]) -> Self {
        let mut by_id = HashMap::new();
        let mut by_name = HashMap::new();
        for asset in assets {
            by_id.entry(asset.id.as_str()).or_insert(asset);
            for name in [&asset.name, &asset.title] {
                if !name.trim().is_empty() {
                    by_name.entry(name.trim().to_lowercase()).or_insert(asset);
                }
            }
        }
        Self { by_id, by_name }
    }

    fn lookup(&self, reference: &str) -> Option<&'a TechnicalAsset> {
        if reference.is_empty() {
            return None;
        }
        self.by_id
            .get(reference)
            .or_else(|| self.by_name.get(&reference.trim().to_lowercase()))
            .copied()
    }
}

/// Directed graph over asset and boundary ids.
struct ReferenceGraph {
    nodes: Vec<String>,
    edges: BTreeMap<String, Vec<String>>,
}

impl ReferenceGraph {
    fn build(model: &ThreagileModel) -> Self {
        let index = AssetIndex::new(&model.technical_assets);
        let boundary_ids: HashSet<&str> =
            model.trust_boundaries.iter().map(|b| b.id.as_str()).collect();

        let mut nodes = Vec::new();
        let mut edges: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for asset in &model.technical_assets {
            nodes.push(asset.id.clone());
            let targets = asset
                .properties
                .values()
                .filter_map(|v| v.strip_prefix(REF_PREFIX))
                .filter_map(|r| index.lookup(r.trim()))
                .map(|t| t.id.clone());
            edges.entry(asset.id.clone()).or_default().extend(targets);
        }

        for boundary in &model.trust_boundaries {
            nodes.push(boundary.id.clone());
            let targets = boundary
                .technical_assets_inside
                .iter()
                .filter_map(|member| {
                    if boundary_ids.contains(member.as_str()) {
                        Some(member.clone())
                    } else {
                        index.lookup(member).map(|a| a.id.clone())
                    }
                });
            edges.entry(boundary.id.clone()).or_default().extend(targets);
        }

        Self { nodes, edges }
    }

    fn cycles(&self) -> Vec<Vec<String>> {
        let mut search = CycleSearch::default();
        for node in &self.nodes {
            if !search.visited.contains(node.as_str()) {
                self.visit(node, &mut search);
            }
        }
        search.cycles
    }

    fn visit<'a>(&'a self, node: &'a str, search: &mut CycleSearch<'a>) {
        search.visited.insert(node);
        search.on_stack.insert(node);
        search.path.push(node);
        if let Some(targets) = self.edges.get(node) {
            for target in targets {
                let target = target.as_str();
                if search.on_stack.contains(target) {
                    search.record_cycle(target);
                } else if !search.visited.contains(target) {
                    self.visit(target, search);
                }
            }
        }
        search.path.pop();
        search.on_stack.remove(node);
    }
}

/// DFS state: `path` mirrors `on_stack` in visiting order.
#[derive(Default)]
struct CycleSearch<'a> {
    visited: HashSet<&'a str>,
    on_stack: HashSet<&'a str>,
    path: Vec<&'a str>,
    cycles: Vec<Vec<String>>,
}

impl CycleSearch<'_> {
    fn record_cycle(&mut self, back_to: &str) {
        let Some(start) = self.path.iter().rposition(|n| *n == back_to) else {
            return;
        };
        let mut cycle: Vec<String> = self.path[start..].iter().map(|n| n.to_string()).collect();
        cycle.push(back_to.to_string());
        self.cycles.push(cycle);
    }
}
