use crate::infra::diagram::models::DiagramStyle;

/// Parse a draw.io style string (`key=value;key=value;...`).
///
/// Tokens without `=` or with an empty key are skipped. A key given more
/// than once keeps its last value. A `fontSize` that is not an integer
/// sets the typed field to 0; the raw value always lands in the map.
pub fn parse_style(input: &str) -> DiagramStyle {
    let mut style = DiagramStyle::default();

    for token in input.split(';') {
        let Some((key, value)) = token.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        let value = value.trim();

        match key {
            "fillColor" => style.fill_color = value.to_string(),
            "strokeColor" => style.stroke_color = value.to_string(),
            "fontColor" => style.font_color = value.to_string(),
            "fontStyle" => style.font_style = value.to_string(),
            "fontSize" => style.font_size = value.parse().unwrap_or(0),
            "shape" => style.shape = value.to_string(),
            _ => {}
        }
        style.properties.insert(key.to_string(), value.to_string());
    }

    style
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_known_fields_and_keeps_them_in_the_map() {
        let style = parse_style(
            "shape=cylinder3;fillColor=#dae8fc;strokeColor=#6c8ebf;fontColor=#000;fontStyle=1;fontSize=14;whiteSpace=wrap",
        );
        assert_eq!(style.shape, "cylinder3");
        assert_eq!(style.fill_color, "#dae8fc");
        assert_eq!(style.stroke_color, "#6c8ebf");
        assert_eq!(style.font_color, "#000");
        assert_eq!(style.font_style, "1");
        assert_eq!(style.font_size, 14);
        assert_eq!(style.get("shape"), Some("cylinder3"));
        assert_eq!(style.get("fontSize"), Some("14"));
        assert_eq!(style.get("whiteSpace"), Some("wrap"));
        assert_eq!(style.properties.len(), 7);
    }

    #[test]
    fn test_skips_malformed_tokens() {
        let style = parse_style("rounded;=orphan;html=1;;ellipse");
        assert_eq!(style.properties.len(), 1);
        assert_eq!(style.get("html"), Some("1"));
        assert_eq!(style.get("rounded"), None);
    }

    #[test]
    fn test_empty_value_is_kept() {
        let style = parse_style("assetType=;shape=");
        assert_eq!(style.get("assetType"), Some(""));
        assert_eq!(style.value("assetType"), None);
        assert_eq!(style.shape, "");
    }

    #[test]
    fn test_invalid_font_size_leaves_zero() {
        let style = parse_style("fontSize=large");
        assert_eq!(style.font_size, 0);
        assert_eq!(style.get("fontSize"), Some("large"));

        let style = parse_style("fontSize=12.5");
        assert_eq!(style.font_size, 0);
    }

    #[test]
    fn test_last_duplicate_wins_for_fields_and_map() {
        let style = parse_style("shape=rhombus;fillColor=red;shape=cylinder;fillColor=blue");
        assert_eq!(style.shape, "cylinder");
        assert_eq!(style.get("shape"), Some("cylinder"));
        assert_eq!(style.fill_color, "blue");
        assert_eq!(style.get("fillColor"), Some("blue"));
    }

    #[test]
    fn test_invalid_font_size_after_valid_one_resets_to_zero() {
        let style = parse_style("fontSize=12;fontSize=big");
        assert_eq!(style.font_size, 0);
        assert_eq!(style.get("fontSize"), Some("big"));
    }

    #[test]
    fn test_parse_is_deterministic() {
        let input = "shape=cylinder3;a=1;b=2;a=3";
        assert_eq!(parse_style(input), parse_style(input));
        assert_eq!(parse_style(input).to_style_string(), "a=3;b=2;shape=cylinder3;");
    }

    #[test]
    fn test_flags_accept_one_and_true() {
        let style = parse_style("container=1;dashed=TRUE;rounded=0;shadow=yes");
        assert!(style.flag("container"));
        assert!(style.flag("dashed"));
        assert!(!style.flag("rounded"));
        assert!(!style.flag("shadow"));
        assert!(!style.flag("missing"));
    }
}
