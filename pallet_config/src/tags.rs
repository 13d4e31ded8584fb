//! Known-tag directory loaded from `[[tags]]`.
use std::collections::HashMap;

use pallet_traits::{TagDirectory, normalize_tag_id};
use serde::Deserialize;

/// One `[[tags]]` entry: a tag UID and the vehicle it is mounted on.
#[derive(Debug, Deserialize, Clone)]
pub struct TagEntry {
    pub id: String,
    pub name: String,
}

/// Tag UID (canonical form) → entity name.
#[derive(Debug, Default, Clone)]
pub struct KnownTags {
    by_id: HashMap<String, String>,
}

impl KnownTags {
    pub fn from_entries(entries: &[TagEntry]) -> Self {
        let by_id = entries
            .iter()
            .map(|e| (normalize_tag_id(&e.id), e.name.trim().to_string()))
            .collect();
        Self { by_id }
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl TagDirectory for KnownTags {
    fn lookup(&self, tag_id: &str) -> Option<String> {
        self.by_id.get(&normalize_tag_id(tag_id)).cloned()
    }
}

pub(crate) fn validate_entries(entries: &[TagEntry]) -> eyre::Result<()> {
    let mut seen = HashMap::new();
    for (idx, entry) in entries.iter().enumerate() {
        let id = normalize_tag_id(&entry.id);
        if id.is_empty() {
            eyre::bail!("tags[{idx}].id must not be empty");
        }
        if !id.chars().all(|c| c.is_ascii_hexdigit()) {
            eyre::bail!("tags[{idx}].id must be hexadecimal, got {:?}", entry.id);
        }
        if entry.name.trim().is_empty() {
            eyre::bail!("tags[{idx}].name must not be empty");
        }
        if let Some(prev) = seen.insert(id, idx) {
            eyre::bail!("tags[{idx}].id duplicates tags[{prev}].id");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, name: &str) -> TagEntry {
        TagEntry {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn lookup_ignores_case_and_separators() {
        let tags = KnownTags::from_entries(&[entry("aa:bb:cc", "Lorry 1")]);
        assert_eq!(tags.lookup("AABBCC").as_deref(), Some("Lorry 1"));
        assert_eq!(tags.lookup("aa bb cc").as_deref(), Some("Lorry 1"));
        assert!(tags.lookup("AABBCD").is_none());
    }

    #[test]
    fn duplicate_ids_after_normalisation_are_rejected() {
        let err = validate_entries(&[entry("AABBCC", "a"), entry("aa-bb-cc", "b")])
            .expect_err("duplicate");
        assert!(err.to_string().contains("duplicates"));
    }

    #[test]
    fn non_hex_id_is_rejected() {
        assert!(validate_entries(&[entry("CARD_ID_1", "Lorry")]).is_err());
    }
}
