//! Document codecs.
//!
//! Responsibilities:
//! - Define the `DocumentCodec` seam between bytes and `ConfigDocument`.
//! - Provide JSON, TOML and YAML implementations.
//! - Pick a codec from a locator's file extension.
//!
//! Does NOT handle:
//! - Encryption (see `encryption`).
//! - Reading or writing storage (see `storage`).
//!
//! Invariants:
//! - Encoding is deterministic for equal documents.
//! - Both `global` and `environments` sections are optional on decode.

use std::path::Path;

use thiserror::Error;

use crate::document::ConfigDocument;

/// Errors raised while decoding or encoding a document.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("document is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("invalid JSON document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid TOML document: {0}")]
    TomlDecode(#[from] toml::de::Error),

    #[error("cannot encode document as TOML: {0}")]
    TomlEncode(#[from] toml::ser::Error),

    #[error("invalid YAML document: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Converts between persisted bytes and a `ConfigDocument`.
pub trait DocumentCodec: Send + Sync {
    /// Short format name used in logs.
    fn name(&self) -> &'static str;

    /// Parses `bytes` into a document.
    fn decode(&self, bytes: &[u8]) -> Result<ConfigDocument, CodecError>;

    /// Serializes `document` into bytes.
    fn encode(&self, document: &ConfigDocument) -> Result<Vec<u8>, CodecError>;
}

/// Pretty-printed JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl DocumentCodec for JsonCodec {
    fn name(&self) -> &'static str {
        "json"
    }

    fn decode(&self, bytes: &[u8]) -> Result<ConfigDocument, CodecError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    fn encode(&self, document: &ConfigDocument) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec_pretty(document)?)
    }
}

/// TOML. `null` values cannot be represented and fail to encode.
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlCodec;

impl DocumentCodec for TomlCodec {
    fn name(&self) -> &'static str {
        "toml"
    }

    fn decode(&self, bytes: &[u8]) -> Result<ConfigDocument, CodecError> {
        let text = std::str::from_utf8(bytes)?;
        Ok(toml::from_str(text)?)
    }

    fn encode(&self, document: &ConfigDocument) -> Result<Vec<u8>, CodecError> {
        Ok(toml::to_string(document)?.into_bytes())
    }
}

/// YAML.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlCodec;

impl DocumentCodec for YamlCodec {
    fn name(&self) -> &'static str {
        "yaml"
    }

    fn decode(&self, bytes: &[u8]) -> Result<ConfigDocument, CodecError> {
        Ok(serde_yaml::from_slice(bytes)?)
    }

    fn encode(&self, document: &ConfigDocument) -> Result<Vec<u8>, CodecError> {
        Ok(serde_yaml::to_string(document)?.into_bytes())
    }
}

/// Supported document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Format {
    #[default]
    Json,
    Toml,
    Yaml,
}

impl Format {
    /// Guesses the format from a locator's extension, defaulting to JSON.
    pub fn from_locator(locator: &str) -> Self {
        let ext = Path::new(locator)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("toml") => Format::Toml,
            Some("yaml") | Some("yml") => Format::Yaml,
            _ => Format::Json,
        }
    }

    /// Returns a boxed codec for this format.
    pub fn codec(self) -> Box<dyn DocumentCodec> {
        match self {
            Format::Json => Box::new(JsonCodec),
            Format::Toml => Box::new(TomlCodec),
            Format::Yaml => Box::new(YamlCodec),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> ConfigDocument {
        ConfigDocument::new()
            .with_global("theme", json!("light"))
            .with_global("retries", json!(3))
            .with_env_value("PROD", "endpoint", json!("prod.example"))
    }

    #[test]
    fn test_json_decode_accepts_missing_sections() {
        let doc = JsonCodec.decode(br#"{"global": {"a": 1}}"#).unwrap();
        assert_eq!(doc.global["a"], json!(1));
        assert!(doc.environments.is_empty());

        let empty = JsonCodec.decode(b"{}").unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn test_json_decode_rejects_malformed_input() {
        let err = JsonCodec.decode(b"{ not json").unwrap_err();
        assert!(matches!(err, CodecError::Json(_)));
    }

    #[test]
    fn test_json_encoding_is_deterministic() {
        let first = JsonCodec.encode(&sample()).unwrap();
        let second = JsonCodec.encode(&sample()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_toml_reads_partitioned_layout() {
        let text = r#"
[global]
theme = "light"

[environments.PROD]
endpoint = "prod.example"
"#;
        let doc = TomlCodec.decode(text.as_bytes()).unwrap();
        assert_eq!(doc.lookup(Some("PROD"), "endpoint"), Some(&json!("prod.example")));
        assert_eq!(doc.lookup(Some("PROD"), "theme"), Some(&json!("light")));
    }

    #[test]
    fn test_toml_cannot_encode_null() {
        let doc = ConfigDocument::new().with_global("nothing", json!(null));
        assert!(matches!(
            TomlCodec.encode(&doc),
            Err(CodecError::TomlEncode(_))
        ));
    }

    #[test]
    fn test_yaml_preserves_document() {
        let bytes = YamlCodec.encode(&sample()).unwrap();
        assert_eq!(YamlCodec.decode(&bytes).unwrap(), sample());
    }

    #[test]
    fn test_format_from_locator() {
        assert_eq!(Format::from_locator("config.toml"), Format::Toml);
        assert_eq!(Format::from_locator("nested/app.YML"), Format::Yaml);
        assert_eq!(Format::from_locator("app.yaml"), Format::Yaml);
        assert_eq!(Format::from_locator("config.json"), Format::Json);
        assert_eq!(Format::from_locator("config"), Format::Json);
        assert_eq!(Format::from_locator("config.toml").codec().name(), "toml");
    }
}
