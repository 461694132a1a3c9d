//! Mapping tokens to render nodes.

use serde::Serialize;

use ftbar_template::Value;

use crate::icons::IconCatalogView;
use crate::tokens::{split, Token};

/// A renderable unit of item content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RenderNode {
    Text {
        content: String,
    },
    Icon {
        name: String,
        size: Option<String>,
        glyph: String,
    },
}

pub fn render(token: &Token, icons: &IconCatalogView) -> RenderNode {
    match token {
        Token::Text { content } => RenderNode::Text {
            content: content.clone(),
        },
        Token::Icon { name, size } => RenderNode::Icon {
            name: name.clone(),
            size: size.clone(),
            // the splitter only emits registered names
            glyph: icons.glyph(name).unwrap_or(name.as_str()).to_string(),
        },
    }
}

pub fn render_all(tokens: &[Token], icons: &IconCatalogView) -> Vec<RenderNode> {
    tokens.iter().map(|token| render(token, icons)).collect()
}

/// Split and render an evaluated value in one pass.
pub fn render_value(value: &Value, icons: &IconCatalogView) -> Vec<RenderNode> {
    render_all(&split(value, icons), icons)
}

/// Flatten nodes for terminal output. Icons print as their glyph.
pub fn to_plain_text(nodes: &[RenderNode]) -> String {
    nodes
        .iter()
        .map(|node| match node {
            RenderNode::Text { content } => content.as_str(),
            RenderNode::Icon { glyph, .. } => glyph.as_str(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::icons::IconCatalog;

    fn icons() -> IconCatalogView {
        let catalog = IconCatalog::new();
        catalog.register("BiMoon", "M").unwrap();
        catalog.snapshot().unwrap()
    }

    #[test]
    fn test_render_preserves_order_and_sizes() {
        let icons = icons();
        let tokens = vec![
            Token::text("Sleep "),
            Token::icon("BiMoon", Some("12")),
        ];
        assert_eq!(
            render_all(&tokens, &icons),
            vec![
                RenderNode::Text {
                    content: "Sleep ".into()
                },
                RenderNode::Icon {
                    name: "BiMoon".into(),
                    size: Some("12px".into()),
                    glyph: "M".into(),
                },
            ]
        );
    }

    #[test]
    fn test_render_value_and_plain_text() {
        let icons = icons();
        let nodes = render_value(&Value::from("BiMoon night"), &icons);
        assert_eq!(nodes.len(), 2);
        assert_eq!(to_plain_text(&nodes), "M night");
    }

    #[test]
    fn test_empty_string_renders_nothing() {
        assert!(render_value(&Value::from(""), &icons()).is_empty());
    }

    #[test]
    fn test_node_json_shape() {
        let node = RenderNode::Text {
            content: "hi".into(),
        };
        assert_eq!(
            serde_json::to_value(&node).unwrap(),
            serde_json::json!({"type": "text", "content": "hi"})
        );
    }
}
