//! Local FQDN providers for the `LocalIdentity` port.
//!
//! The name is looked up once and memoized; every fact upload reuses it.

use std::process::{Command, Stdio};
use std::sync::{Arc, OnceLock};

use crate::application::ports::LocalIdentity;

/// FQDN as resolved by the system resolver (`hostname -f`).
#[derive(Debug, Default)]
pub struct ResolvedFqdn {
    name: OnceLock<String>,
}

impl ResolvedFqdn {
    /// `None` when `hostname -f` is unavailable or prints nothing.
    fn lookup() -> Option<String> {
        let output = Command::new("hostname")
            .arg("-f")
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .ok()?;
        if !output.status.success() {
            return None;
        }
        let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
        (!name.is_empty()).then_some(name)
    }
}

impl LocalIdentity for ResolvedFqdn {
    fn fqdn(&self) -> String {
        self.name
            .get_or_init(|| Self::lookup().unwrap_or_else(bare_hostname))
            .clone()
    }
}

/// Kernel host name, without resolver involvement.
#[derive(Debug, Default)]
pub struct BareHostname {
    name: OnceLock<String>,
}

impl LocalIdentity for BareHostname {
    fn fqdn(&self) -> String {
        self.name.get_or_init(bare_hostname).clone()
    }
}

fn bare_hostname() -> String {
    nix::unistd::gethostname()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Picks the richest provider available on first use, so runs that never
/// upload facts never spawn `hostname`.
#[derive(Default)]
pub struct DetectedIdentity {
    provider: OnceLock<Box<dyn LocalIdentity>>,
}

impl LocalIdentity for DetectedIdentity {
    fn fqdn(&self) -> String {
        self.provider.get_or_init(select).fqdn()
    }
}

fn select() -> Box<dyn LocalIdentity> {
    match ResolvedFqdn::lookup() {
        Some(name) => {
            tracing::debug!(fqdn = %name, "using resolver FQDN");
            let resolved = ResolvedFqdn::default();
            let _ = resolved.name.set(name);
            Box::new(resolved)
        }
        None => {
            tracing::debug!("hostname -f unavailable, using bare host name");
            Box::new(BareHostname::default())
        }
    }
}

/// Identity for this host, resolved when first asked for.
#[must_use]
pub fn detect() -> Arc<dyn LocalIdentity> {
    Arc::new(DetectedIdentity::default())
}
