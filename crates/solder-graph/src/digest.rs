//! Semantic digests over canonicalized material.

use serde::Serialize;
use sha2::{Digest, Sha256};

pub fn digest_bytes(bytes: &[u8]) -> String {
    let mut digest = Sha256::new();
    digest.update(bytes);
    let output = digest.finalize();
    let mut rendered = String::with_capacity(output.len() * 2);
    for byte in output {
        rendered.push_str(format!("{byte:02x}").as_str());
    }
    rendered
}

pub fn digest_serializable<T: Serialize>(value: &T) -> String {
    digest_bytes(serde_json::to_vec(value).unwrap_or_default().as_slice())
}

/// Digest a list of material fields joined with NUL separators, with a
/// short scheme prefix.
pub fn digest_material(prefix: &str, material: &[String]) -> String {
    let joined = material.join("\u{0000}");
    format!("{prefix}{}", digest_bytes(joined.as_bytes()))
}
