//! ENC document handling.

/// Top-level key removed by `--no-environment`.
pub const ENVIRONMENT_KEY: &str = "environment";

/// Remove `key` from the top level of an ENC YAML document.
///
/// Documents without the key are returned unchanged; documents with it are
/// re-serialized.
///
/// # Errors
///
/// Returns an error if the document is not valid YAML.
pub fn strip_top_level_key(document: &str, key: &str) -> Result<String, serde_yaml::Error> {
    let mut parsed: serde_yaml::Value = serde_yaml::from_str(document)?;
    let removed = parsed
        .as_mapping_mut()
        .and_then(|mapping| mapping.remove(key));
    if removed.is_none() {
        return Ok(document.to_string());
    }
    let body = serde_yaml::to_string(&parsed)?;
    Ok(format!("---\n{body}"))
}
