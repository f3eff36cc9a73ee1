use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Compute SHA-256 of an in-memory byte slice.
pub fn sha256_bytes(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Encode a raw 32-byte hash as a lowercase hex string (64 chars).
pub fn to_hex(hash: &[u8; 32]) -> String {
    hash.iter().map(|b| format!("{b:02x}")).collect()
}

/// Content fingerprint of a statement file.
pub fn fingerprint(data: &[u8]) -> String {
    to_hex(&sha256_bytes(data))
}

/// Sidecar location for a statement: `<edits_dir>/<sanitised name>.edits.json`.
/// Anything outside `[A-Za-z0-9._-]` becomes `_`, so the same file name
/// always maps to the same sidecar.
pub fn sidecar_path(edits_dir: &Path, statement_file_name: &str) -> PathBuf {
    let base = Path::new(statement_file_name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(statement_file_name);
    let safe: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    edits_dir.join(format!("{safe}.edits.json"))
}
