//! Fact documents: parsing, enrichment and sanitizing.
//!
//! Pure functions only. The caller reads the files and hands over text.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use foreman_common::FactUploadBody;
use regex::Regex;
use serde_json::{Map, Value};

use crate::domain::config::FactExtension;

/// Fact carrying the FQDN of the host that uploaded the facts.
pub const MASTER_FQDN_FACT: &str = "puppetmaster_fqdn";

const ENVIRONMENT: &str = "environment";
const AGENT_ENVIRONMENT: &str = "agent_specified_environment";

static RUBY_OBJECT_TAG: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)] // constant pattern
    Regex::new(r"(?m)!ruby/object.*$").expect("valid regex")
});

/// Drop `!ruby/object:...` tags so the YAML can be read as plain data.
#[must_use]
pub fn strip_ruby_tags(text: &str) -> String {
    RUBY_OBJECT_TAG.replace_all(text, "").into_owned()
}

/// Parse a fact or node document.
///
/// # Errors
///
/// Returns the parser's message when the text is not valid for `format`.
pub fn parse_document(text: &str, format: FactExtension) -> Result<Value, String> {
    match format {
        FactExtension::Yaml => {
            serde_yaml::from_str(&strip_ruby_tags(text)).map_err(|e| e.to_string())
        }
        FactExtension::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
    }
}

/// The flat `values` mapping of a fact document; empty when absent.
#[must_use]
pub fn fact_values(document: Value) -> Map<String, Value> {
    match document {
        Value::Object(mut map) => match map.remove("values") {
            Some(Value::Object(values)) => values,
            _ => Map::new(),
        },
        _ => Map::new(),
    }
}

/// Whether the environment has to be backfilled from the node file.
#[must_use]
pub fn needs_environment(values: &Map<String, Value>) -> bool {
    !values.contains_key(ENVIRONMENT) && !values.contains_key(AGENT_ENVIRONMENT)
}

/// Copy the node document's `environment` into `values`, if it has one.
pub fn backfill_environment(values: &mut Map<String, Value>, node: &Value) {
    if let Some(environment) = node.get(ENVIRONMENT) {
        values.insert(ENVIRONMENT.to_string(), environment.clone());
    }
}

/// Node file that accompanies `fact_path`: the first `/facts/` segment
/// replaced by `/node/`.
#[must_use]
pub fn node_path(fact_path: &Path) -> PathBuf {
    let raw = fact_path.to_string_lossy();
    PathBuf::from(raw.replacen("/facts/", "/node/", 1))
}

/// Keep only printable characters in every top-level string value.
pub fn sanitize(values: &mut Map<String, Value>) {
    for value in values.values_mut() {
        if let Value::String(s) = value {
            if s.chars().any(char::is_control) {
                s.retain(|c| !c.is_control());
            }
        }
    }
}

/// Assemble the upload body from parsed values.
///
/// Returns `None` when the fact set is empty.
#[must_use]
pub fn build_upload_body(
    certname: &str,
    mut values: Map<String, Value>,
    master_fqdn: &str,
) -> Option<FactUploadBody> {
    if values.is_empty() {
        return None;
    }
    values.insert(
        MASTER_FQDN_FACT.to_string(),
        Value::String(master_fqdn.to_string()),
    );
    sanitize(&mut values);
    Some(FactUploadBody::new(certname, values))
}

/// Certname encoded in a fact file name: the stem, when the extension matches.
#[must_use]
pub fn certname_from_path(path: &Path, extension: FactExtension) -> Option<String> {
    if path.extension()?.to_str()? != extension.as_str() {
        return None;
    }
    path.file_stem()?.to_str().map(str::to_string)
}
