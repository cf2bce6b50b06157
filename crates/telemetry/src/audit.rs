//! Audit samples of emitted records.

use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Append a serializable record as pretty JSON to the audit file, if one is configured.
///
/// # Arguments
/// * `path` - Path to the audit file, `None` to disable sampling
/// * `payload` - Record to append
pub fn write_audit_sample<P: AsRef<Path>, T: Serialize>(
    path: Option<P>,
    payload: &T,
) -> anyhow::Result<()> {
    let Some(audit_path) = path else {
        return Ok(());
    };

    let json = serde_json::to_string_pretty(payload)?;
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(audit_path.as_ref())?;
    writeln!(file, "{}", json)?;
    debug!("Wrote audit sample to {:?}", audit_path.as_ref());
    Ok(())
}
