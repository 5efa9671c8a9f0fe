//! GUID tokens: validation, extraction from opaque text, generation and
//! marker-anchored substitution.

use serde::Serialize;
use std::fmt;

/// Number of characters in a GUID token.
pub const GUID_LENGTH: usize = 32;

/// A 32-character asset identifier.
///
/// Accepts digits and lowercase `a`-`z`, not just hex digits. Tokens written
/// by other tools with letters past `f` are still treated as GUIDs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Guid(String);

impl Guid {
    /// Parse a token, returning `None` unless it is exactly 32 valid characters.
    pub fn parse(text: &str) -> Option<Self> {
        Self::from_bytes(text.as_bytes())
    }

    fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != GUID_LENGTH || !bytes.iter().all(|&b| is_guid_byte(b)) {
            return None;
        }
        // All bytes are ASCII at this point.
        std::str::from_utf8(bytes).ok().map(|s| Guid(s.to_string()))
    }

    /// A fresh random GUID in the same 32-character lowercase form.
    pub fn generate() -> Self {
        Guid(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_guid_byte(b: u8) -> bool {
    b.is_ascii_digit() || b.is_ascii_lowercase()
}

/// Extract every marker-prefixed GUID from `text`, in order of appearance.
///
/// After each marker exactly 32 bytes are consumed whether or not they form a
/// valid token, so characters inside a rejected candidate are never
/// re-examined. Scanning stops when no marker remains or fewer than 32 bytes
/// follow the last one.
pub fn extract_guids(text: &[u8], marker: &[u8]) -> Vec<Guid> {
    let mut guids = Vec::new();
    if marker.is_empty() {
        return guids;
    }

    let mut index = 0;
    while let Some(pos) = find(&text[index..], marker) {
        let start = index + pos + marker.len();
        let end = start + GUID_LENGTH;
        if end > text.len() {
            break;
        }

        if let Some(guid) = Guid::from_bytes(&text[start..end]) {
            guids.push(guid);
        }
        index = end;
    }

    guids
}

/// Replace every `marker + old` with `marker + new`. Returns the new content
/// and the number of substitutions.
pub fn replace_guid(text: &[u8], marker: &[u8], old: &Guid, new: &Guid) -> (Vec<u8>, usize) {
    let needle = [marker, old.as_str().as_bytes()].concat();
    let replacement = [marker, new.as_str().as_bytes()].concat();

    let mut out = Vec::with_capacity(text.len());
    let mut count = 0;
    let mut index = 0;

    while let Some(pos) = find(&text[index..], &needle) {
        out.extend_from_slice(&text[index..index + pos]);
        out.extend_from_slice(&replacement);
        index += pos + needle.len();
        count += 1;
    }
    out.extend_from_slice(&text[index..]);

    (out, count)
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}
