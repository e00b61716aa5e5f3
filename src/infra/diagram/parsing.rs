use crate::domain::{ConversionError, ErrorKind, Result};
use crate::infra::diagram::models::*;
use crate::infra::diagram::style::parse_style;
use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;

static HTML_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<\s*(br|/div|/p|/li)\s*/?\s*>").expect("valid regex"));
static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Attributes of `<object>` wrappers that are not user data.
const RESERVED_OBJECT_ATTRS: &[&str] = &["id", "label", "placeholders", "tooltip", "link"];

/// Read and parse a draw.io file.
pub fn read_diagram_file(path: &Path) -> Result<Diagram> {
    let bytes = std::fs::read(path).map_err(|err| {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::FileNotFound,
            _ => ErrorKind::SchemaViolation,
        };
        ConversionError::new(kind, format!("cannot read {}: {err}", path.display())).with_cause(err)
    })?;
    let text = String::from_utf8(bytes).map_err(|err| {
        ConversionError::new(
            ErrorKind::InvalidEncoding,
            format!("{} is not valid UTF-8", path.display()),
        )
        .with_cause(err)
    })?;
    parse_drawio(&text)
}

/// Parse draw.io XML (`<mxfile>` or a bare `<mxGraphModel>`) into a Diagram.
///
/// Only the first page of a multi-page file is converted.
pub fn parse_drawio(input: &str) -> Result<Diagram> {
    let trimmed = input.trim_start_matches('\u{feff}').trim();
    if trimmed.is_empty() {
        return Err(ConversionError::new(
            ErrorKind::EmptyFile,
            "diagram source is empty",
        ));
    }

    let doc = roxmltree::Document::parse(trimmed).map_err(xml_err)?;
    let root = doc.root_element();

    match root.tag_name().name() {
        "mxGraphModel" => parse_graph_model(root, DiagramMetadata::default()),
        "mxfile" => parse_mxfile(root),
        other => Err(ConversionError::new(
            ErrorKind::SchemaViolation,
            format!("unexpected root element <{other}>, expected <mxfile> or <mxGraphModel>"),
        )),
    }
}

fn parse_mxfile(mxfile: roxmltree::Node<'_, '_>) -> Result<Diagram> {
    let mut metadata = DiagramMetadata {
        modified: mxfile.attribute("modified").map(str::to_string),
        ..Default::default()
    };
    for key in ["host", "agent", "version", "etag", "type"] {
        if let Some(value) = mxfile.attribute(key) {
            metadata
                .properties
                .insert(format!("drawio.{key}"), value.to_string());
        }
    }

    let pages: Vec<_> = mxfile
        .children()
        .filter(|n| n.has_tag_name("diagram"))
        .collect();
    let Some(page) = pages.first() else {
        return Err(ConversionError::new(
            ErrorKind::SchemaViolation,
            "<mxfile> contains no <diagram> page",
        ));
    };
    if pages.len() > 1 {
        log::info!(
            "diagram has {} pages, converting only the first ({})",
            pages.len(),
            page.attribute("name").unwrap_or("unnamed")
        );
    }
    if let Some(name) = page.attribute("name") {
        metadata.title = name.to_string();
    }

    if let Some(model) = page.children().find(|n| n.has_tag_name("mxGraphModel")) {
        return parse_graph_model(model, metadata);
    }

    let payload = page.text().map(str::trim).unwrap_or_default();
    if payload.is_empty() {
        return Err(ConversionError::new(
            ErrorKind::SchemaViolation,
            "<diagram> page has neither an <mxGraphModel> nor a compressed payload",
        ));
    }

    log::debug!("inflating compressed diagram page ({} bytes)", payload.len());
    let xml = inflate_payload(payload)?;
    let doc = roxmltree::Document::parse(&xml).map_err(xml_err)?;
    let model = doc.root_element();
    if !model.has_tag_name("mxGraphModel") {
        return Err(ConversionError::new(
            ErrorKind::SchemaViolation,
            "compressed page does not contain an <mxGraphModel>",
        ));
    }
    parse_graph_model(model, metadata)
}

/// Decode a compressed page: base64, raw deflate, then URI decoding.
fn inflate_payload(payload: &str) -> Result<String> {
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map_err(|err| {
            ConversionError::new(ErrorKind::InvalidEncoding, "compressed page is not base64")
                .with_cause(err)
        })?;

    let mut inflated = String::new();
    flate2::read::DeflateDecoder::new(bytes.as_slice())
        .read_to_string(&mut inflated)
        .map_err(|err| {
            ConversionError::new(ErrorKind::InvalidEncoding, "cannot inflate compressed page")
                .with_cause(err)
        })?;

    percent_decode(&inflated)
}

fn percent_decode(input: &str) -> Result<String> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut idx = 0;

    while idx < bytes.len() {
        if bytes[idx] == b'%' && idx + 2 < bytes.len() {
            let decoded = std::str::from_utf8(&bytes[idx + 1..idx + 3])
                .ok()
                .and_then(|hex| u8::from_str_radix(hex, 16).ok());
            if let Some(byte) = decoded {
                out.push(byte);
                idx += 3;
                continue;
            }
        }
        out.push(bytes[idx]);
        idx += 1;
    }

    String::from_utf8(out).map_err(|err| {
        ConversionError::new(
            ErrorKind::InvalidEncoding,
            "compressed page decodes to invalid UTF-8",
        )
        .with_cause(err)
    })
}

/// A cell as found in the document, before the shape tree is assembled.
#[derive(Debug, Default)]
struct RawCell {
    id: String,
    value: String,
    style: String,
    extra: Vec<(String, String)>,
    vertex: bool,
    edge: bool,
    parent: Option<String>,
    source: String,
    target: String,
    geometry: Geometry,
}

fn parse_graph_model(
    model: roxmltree::Node<'_, '_>,
    mut metadata: DiagramMetadata,
) -> Result<Diagram> {
    let Some(root) = model.children().find(|n| n.has_tag_name("root")) else {
        return Err(ConversionError::new(
            ErrorKind::SchemaViolation,
            "<mxGraphModel> has no <root> element",
        ));
    };

    let mut cells = Vec::new();
    for node in root.children().filter(|n| n.is_element()) {
        match node.tag_name().name() {
            "mxCell" => cells.push(read_cell(node, None)),
            "object" | "UserObject" => {
                let inner = node.children().find(|n| n.has_tag_name("mxCell"));
                // The root cell has no parent and carries document properties.
                if inner.is_none_or(|cell| cell.attribute("parent").is_none()) {
                    read_document_properties(node, &mut metadata);
                }
                if let Some(inner) = inner {
                    cells.push(read_cell(inner, Some(node)));
                }
            }
            other => log::debug!("ignoring <{other}> element in diagram root"),
        }
    }

    Ok(assemble(cells, metadata))
}

fn read_document_properties(node: roxmltree::Node<'_, '_>, metadata: &mut DiagramMetadata) {
    for attr in node.attributes() {
        match attr.name() {
            "title" | "label" if !attr.value().trim().is_empty() => {
                metadata.title = attr.value().to_string()
            }
            "description" => metadata.description = attr.value().to_string(),
            "version" => metadata.version = attr.value().to_string(),
            "author" => metadata.author = attr.value().to_string(),
            "created" => metadata.created = Some(attr.value().to_string()),
            "id" | "label" | "title" => {}
            other => {
                metadata
                    .properties
                    .insert(other.to_string(), attr.value().to_string());
            }
        }
    }
}

fn read_cell(cell: roxmltree::Node<'_, '_>, wrapper: Option<roxmltree::Node<'_, '_>>) -> RawCell {
    let mut raw = RawCell {
        id: cell.attribute("id").unwrap_or_default().to_string(),
        value: cell.attribute("value").unwrap_or_default().to_string(),
        style: cell.attribute("style").unwrap_or_default().to_string(),
        vertex: cell.attribute("vertex") == Some("1"),
        edge: cell.attribute("edge") == Some("1"),
        parent: cell.attribute("parent").map(str::to_string),
        source: cell.attribute("source").unwrap_or_default().to_string(),
        target: cell.attribute("target").unwrap_or_default().to_string(),
        geometry: cell
            .children()
            .find(|n| n.has_tag_name("mxGeometry"))
            .map(read_geometry)
            .unwrap_or_default(),
        ..Default::default()
    };

    if let Some(wrapper) = wrapper {
        if let Some(id) = wrapper.attribute("id") {
            raw.id = id.to_string();
        }
        raw.value = wrapper.attribute("label").unwrap_or_default().to_string();
        raw.extra = wrapper
            .attributes()
            .filter(|a| !RESERVED_OBJECT_ATTRS.contains(&a.name()))
            .map(|a| (a.name().to_string(), a.value().to_string()))
            .collect();
    }

    raw
}

fn read_geometry(node: roxmltree::Node<'_, '_>) -> Geometry {
    let num = |key: &str| {
        node.attribute(key)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .unwrap_or(0.0)
    };
    Geometry {
        x: num("x"),
        y: num("y"),
        width: num("width"),
        height: num("height"),
    }
}

fn assemble(cells: Vec<RawCell>, metadata: DiagramMetadata) -> Diagram {
    let vertex_ids: HashSet<&str> = cells
        .iter()
        .filter(|c| c.vertex)
        .map(|c| c.id.as_str())
        .collect();
    let edge_ids: HashSet<&str> = cells
        .iter()
        .filter(|c| c.edge)
        .map(|c| c.id.as_str())
        .collect();

    let mut edge_labels: HashMap<&str, Vec<String>> = HashMap::new();
    let mut children: HashMap<&str, Vec<usize>> = HashMap::new();
    let mut top_level = Vec::new();
    let mut label_cells = 0;

    for (idx, cell) in cells.iter().enumerate().filter(|(_, c)| c.vertex) {
        match cell.parent.as_deref() {
            Some(parent) if edge_ids.contains(parent) => {
                label_cells += 1;
                let label = clean_label(&cell.value);
                if !label.is_empty() {
                    edge_labels.entry(parent).or_default().push(label);
                }
            }
            Some(parent) if vertex_ids.contains(parent) && parent != cell.id => {
                children.entry(parent).or_default().push(idx);
            }
            _ => top_level.push(idx),
        }
    }

    let mut visited = HashSet::new();
    let shapes: Vec<_> = top_level
        .into_iter()
        .filter_map(|idx| build_shape(idx, &cells, &children, &mut visited))
        .collect();

    let vertex_count = cells.iter().filter(|c| c.vertex).count();
    let skipped = vertex_count.saturating_sub(visited.len() + label_cells);
    if skipped > 0 {
        log::warn!("{skipped} vertices are unreachable from the diagram root and were skipped");
    }

    let relations = cells
        .iter()
        .filter(|c| c.edge)
        .map(|cell| {
            let mut label = clean_label(&cell.value);
            if label.is_empty() {
                if let Some(labels) = edge_labels.get(cell.id.as_str()) {
                    label = labels.join(" ");
                }
            }
            DiagramRelation {
                id: cell.id.clone(),
                label,
                source_id: cell.source.clone(),
                target_id: cell.target.clone(),
                style: cell_style(cell),
                raw_style: cell.style.clone(),
                geometry: cell.geometry,
            }
        })
        .collect();

    Diagram {
        metadata,
        shapes,
        relations,
    }
}

fn build_shape(
    idx: usize,
    cells: &[RawCell],
    children: &HashMap<&str, Vec<usize>>,
    visited: &mut HashSet<usize>,
) -> Option<DiagramShape> {
    if !visited.insert(idx) {
        return None;
    }
    let cell = &cells[idx];

    let nested = children
        .get(cell.id.as_str())
        .map(|kids| {
            kids.iter()
                .filter_map(|&kid| build_shape(kid, cells, children, visited))
                .collect()
        })
        .unwrap_or_default();

    Some(DiagramShape {
        id: cell.id.clone(),
        label: clean_label(&cell.value),
        style: cell_style(cell),
        raw_style: cell.style.clone(),
        geometry: cell.geometry,
        children: nested,
    })
}

/// Style of a cell with `<object>` attributes merged in; style tokens win.
fn cell_style(cell: &RawCell) -> DiagramStyle {
    if cell.extra.is_empty() {
        return parse_style(&cell.style);
    }

    let mut combined = String::new();
    for (key, value) in &cell.extra {
        if value.contains(';') || value.contains('=') {
            log::debug!("cell {}: skipping object attribute {key} with reserved characters", cell.id);
            continue;
        }
        combined.push_str(&format!("{key}={value};"));
    }
    combined.push_str(&cell.style);
    parse_style(&combined)
}

/// Labels may carry HTML markup when the cell style has `html=1`.
fn clean_label(value: &str) -> String {
    if !value.contains('<') && !value.contains('&') {
        return WHITESPACE.replace_all(value.trim(), " ").into_owned();
    }

    let text = HTML_BREAK.replace_all(value, " ");
    let text = HTML_TAG.replace_all(&text, "");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

fn xml_err(err: roxmltree::Error) -> ConversionError {
    ConversionError::new(ErrorKind::MalformedXml, format!("malformed XML: {err}")).with_cause(err)
}
