//! Chat message model
//!
//! Mirrors the embed layout accepted by Discord-compatible APIs so the REST
//! client can post it as-is.

use serde::{Deserialize, Serialize};

/// Maximum length of an embed field value
pub const FIELD_VALUE_LIMIT: usize = 1024;

/// A message made of embeds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub embeds: Vec<Embed>,
}

impl Message {
    pub fn with_embed(embed: Embed) -> Self {
        Self {
            embeds: vec![embed],
        }
    }
}

/// Rich embed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Embed {
    pub title: String,

    pub description: String,

    /// RGB color as 0xRRGGBB
    pub color: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooter>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedFooter {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
}

impl EmbedField {
    /// Field whose value is a fenced code block, cut to `FIELD_VALUE_LIMIT`
    ///
    /// A truncated block keeps its closing fence.
    pub fn code_block(name: impl Into<String>, language: &str, body: &str) -> Self {
        let value = format!("```{language}\n{body}```");
        let value = if value.chars().count() > FIELD_VALUE_LIMIT {
            let head: String = value.chars().take(FIELD_VALUE_LIMIT - 4).collect();
            format!("{head}…```")
        } else {
            value
        };
        Self {
            name: name.into(),
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_block_short() {
        let field = EmbedField::code_block("Infos", "json", "{}");
        assert_eq!(field.value, "```json\n{}```");
    }

    #[test]
    fn test_code_block_truncated_to_limit() {
        let body = "é".repeat(3000);
        let field = EmbedField::code_block("Infos", "json", &body);
        assert_eq!(field.value.chars().count(), FIELD_VALUE_LIMIT);
        assert!(field.value.ends_with("…```"));
    }

    #[test]
    fn test_message_json_shape() {
        let message = Message::with_embed(Embed {
            title: "t".into(),
            description: "d".into(),
            color: 0x3498db,
            footer: None,
            fields: vec![],
        });
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["embeds"][0]["color"], 0x3498db);
        assert!(json["embeds"][0].get("fields").is_none());
    }
}
