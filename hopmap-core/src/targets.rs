use std::fs;
use std::net::Ipv4Addr;
use std::path::Path;

use serde_json::Value;

/// Reads the target list: a JSON array of IPv4 address strings.
///
/// Never fails. A missing or malformed file yields no targets, and entries
/// that are not IPv4 dotted quads are skipped, each with a diagnostic.
pub fn load_targets<P: AsRef<Path>>(path: P) -> Vec<String> {
    let path = path.as_ref();
    let data = match fs::read(path) {
        Ok(data) => data,
        Err(err) => {
            log::error!("failed to read targets {}: {}", path.display(), err);
            return Vec::new();
        }
    };
    let value: Value = match serde_json::from_slice(&data) {
        Ok(value) => value,
        Err(err) => {
            log::error!("invalid JSON in targets {}: {}", path.display(), err);
            return Vec::new();
        }
    };
    let Value::Array(items) = value else {
        log::error!("{} must contain an array of IPv4 addresses", path.display());
        return Vec::new();
    };

    let mut out = Vec::with_capacity(items.len());
    for item in items {
        match item.as_str().map(str::trim) {
            Some(s) if s.parse::<Ipv4Addr>().is_ok() => out.push(s.to_string()),
            _ => log::warn!("skipping target {item}: not an IPv4 address"),
        }
    }
    out
}
