use serde::Deserialize;

use crate::error::ConvertError;

/// What the sequence conversion does with a nil source element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NilElementPolicy {
    /// Leave the destination element as freshly allocated (`None` for
    /// pointer elements).
    #[default]
    Skip,
    /// Allocate a default target for pointer destination elements.
    ZeroInitialize,
}

/// Converter toggles, parsed from TOML or set through the builder.
///
/// ```toml
/// source_field_missing_ok = true
/// destination_field_missing_ok = false
/// nil_elements = "zero_initialize"
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConvertOptions {
    /// Destination fields without a source counterpart are left untouched.
    pub source_field_missing_ok: bool,

    /// Source fields without a destination counterpart are dropped.
    pub destination_field_missing_ok: bool,

    pub nil_elements: NilElementPolicy,
}

impl ConvertOptions {
    /// Load options from a TOML file.
    pub fn load(path: &str) -> Result<Self, ConvertError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConvertError::Config(format!("{path}: {e}")))?;
        Self::parse(&content)
    }

    /// Parse options from a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, ConvertError> {
        toml::from_str(toml_str).map_err(|e| ConvertError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn empty_document_uses_defaults() {
        let opts = ConvertOptions::parse("").unwrap();
        assert_eq!(opts, ConvertOptions::default());
        assert_eq!(opts.nil_elements, NilElementPolicy::Skip);
    }

    #[test]
    fn parses_every_key() {
        let opts = ConvertOptions::parse(
            r#"
            source_field_missing_ok = true
            destination_field_missing_ok = true
            nil_elements = "zero_initialize"
            "#,
        )
        .unwrap();
        assert!(opts.source_field_missing_ok);
        assert!(opts.destination_field_missing_ok);
        assert_eq!(opts.nil_elements, NilElementPolicy::ZeroInitialize);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = ConvertOptions::parse("ignore_everything = true").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = ConvertOptions::load("/nonexistent/recast.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/recast.toml"));
    }
}
