//! Switch to the unprivileged Puppet user before touching any files.

use anyhow::{Context, Result, bail};
use nix::unistd::{Uid, User, setgid, setuid};

/// Become `username` (group first, then user) and move into its home
/// directory. A no-op when already running as that user.
///
/// # Errors
///
/// Returns an error if the user is unknown or the switch is not permitted.
pub fn run_as_user(username: &str) -> Result<()> {
    let Some(user) = User::from_name(username)
        .with_context(|| format!("cannot look up user {username}"))?
    else {
        bail!("no such user: {username}");
    };

    if Uid::current() != user.uid {
        setgid(user.gid).with_context(|| format!("cannot switch to group of {username}"))?;
        setuid(user.uid).with_context(|| format!("cannot switch to user {username}"))?;
    }
    std::env::set_current_dir(&user.dir)
        .with_context(|| format!("cannot change directory to {}", user.dir.display()))?;
    Ok(())
}

/// Name of the user the process currently runs as, for diagnostics.
#[must_use]
pub fn current_user() -> String {
    User::from_uid(Uid::current())
        .ok()
        .flatten()
        .map_or_else(|| Uid::current().to_string(), |user| user.name)
}

/// [`run_as_user`], downgrading failure to a warning.
pub fn drop_privileges(username: &str) {
    if let Err(e) = run_as_user(username) {
        tracing::warn!(
            "cannot switch to user {username}, continuing as '{}': {e:#}",
            current_user()
        );
    }
}
