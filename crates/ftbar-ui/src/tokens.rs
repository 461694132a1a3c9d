//! Splitting evaluated template output into text and icon tokens.

use serde::Serialize;

use ftbar_template::Value;

use crate::icons::IconCatalogView;

/// One piece of evaluated template output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Token {
    Text { content: String },
    Icon { name: String, size: Option<String> },
}

impl Token {
    pub fn text(content: impl Into<String>) -> Self {
        Token::Text {
            content: content.into(),
        }
    }

    pub fn icon(name: impl Into<String>, size: Option<&str>) -> Self {
        Token::Icon {
            name: name.into(),
            size: size.map(|digits| format!("{}px", digits)),
        }
    }

    /// The source text this token was cut from.
    pub fn literal(&self) -> String {
        match self {
            Token::Text { content } => content.clone(),
            Token::Icon { name, size: None } => name.clone(),
            Token::Icon {
                name,
                size: Some(size),
            } => format!("{}:{}", name, size.trim_end_matches("px")),
        }
    }
}

/// Tokenize an evaluated value. Non-strings are split on their JSON form.
pub fn split(value: &Value, icons: &IconCatalogView) -> Vec<Token> {
    split_str(&value.to_canonical_string(), icons)
}

/// Tokenize a string against the registered icon names.
///
/// Concatenating the literals of the result gives back `input`.
pub fn split_str(input: &str, icons: &IconCatalogView) -> Vec<Token> {
    let mut tokens = Vec::new();
    let Some(pattern) = icons.pattern() else {
        push_text(&mut tokens, input);
        return tokens;
    };

    let mut last = 0;
    for caps in pattern.captures_iter(input) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.name("name")) else {
            continue;
        };
        push_text(&mut tokens, &input[last..whole.start()]);
        let size = caps.name("size").map(|m| m.as_str());
        tokens.push(Token::icon(name.as_str(), size));
        last = whole.end();
    }
    push_text(&mut tokens, &input[last..]);
    tokens
}

fn push_text(tokens: &mut Vec<Token>, text: &str) {
    if !text.is_empty() {
        tokens.push(Token::text(text));
    }
}
