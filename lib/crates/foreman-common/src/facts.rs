use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of `POST /api/hosts/facts`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FactUploadBody {
    pub facts: Map<String, Value>,
    pub name: String,
    pub certname: String,
}

impl FactUploadBody {
    /// Build an upload body for `certname`.
    ///
    /// The host name reported to Foreman is `networking.fqdn` when the fact
    /// set carries one, otherwise the certname itself.
    #[must_use]
    pub fn new(certname: &str, facts: Map<String, Value>) -> Self {
        let name = facts
            .get("networking")
            .and_then(|networking| networking.get("fqdn"))
            .and_then(Value::as_str)
            .map_or_else(|| certname.to_string(), str::to_string);
        Self {
            facts,
            name,
            certname: certname.to_string(),
        }
    }
}
