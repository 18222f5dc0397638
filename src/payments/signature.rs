//! PayFast request signing: key-sorted form encoding hashed with MD5.

use md5::{Digest, Md5};

/// Reserved key the shared pass-phrase is inserted under before sorting.
pub const PASS_PHRASE_KEY: &str = "passphrase";

/// Deterministic signature over a flat field set. Entries are sorted by key
/// (byte order), form-encoded (`+` for space, percent-escapes elsewhere,
/// matching PHP `http_build_query`) and digested with MD5, lowercase hex.
/// Insertion order of `fields` never affects the result.
pub fn generate_signature(fields: &[(String, String)], pass_phrase: Option<&str>) -> String {
    let mut entries: Vec<(&str, &str)> = fields
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    if let Some(phrase) = pass_phrase {
        entries.push((PASS_PHRASE_KEY, phrase));
    }
    entries.sort_by(|a, b| a.0.cmp(b.0));

    // Serializing string pairs cannot fail.
    let canonical = serde_urlencoded::to_string(&entries).unwrap_or_default();
    hex::encode(Md5::digest(canonical.as_bytes()))
}
