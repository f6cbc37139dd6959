use sha2::{Digest, Sha256};
use uuid::Uuid;

fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// `"uid_" || sha256(source_system||":"||source_id)[:16]`, stable across
/// revisions of the same logical artifact. Falls back to a random suffix
/// when no source id is supplied.
pub fn artifact_uid(source_system: &str, source_id: Option<&str>) -> String {
    match source_id {
        Some(id) => {
            let digest = sha256_hex(&format!("{source_system}:{id}"));
            format!("uid_{}", &digest[..16])
        }
        None => format!("uid_{}", &Uuid::new_v4().simple().to_string()[..16]),
    }
}

/// `"rev_" || sha256(content)[:16]`, uniquely identifies content.
pub fn revision_id(content: &str) -> String {
    let digest = sha256_hex(content);
    format!("rev_{}", &digest[..16])
}

/// `"art_" || sha256(content)[:12]`, the vector-store cross-reference id.
pub fn artifact_id(content: &str) -> String {
    let digest = sha256_hex(content);
    format!("art_{}", &digest[..12])
}

/// `"{artifact_id}::chunk::{index:03}::{sha256(chunk_content)[:8]}"`.
pub fn chunk_id(artifact_id: &str, index: usize, chunk_content: &str) -> String {
    let digest = sha256_hex(chunk_content);
    format!("{artifact_id}::chunk::{index:03}::{}", &digest[..8])
}

/// A fresh UUID with no prefix, used for `job_id`, `entity_id`, `evidence_id`.
pub fn uuid() -> String {
    Uuid::new_v4().to_string()
}

/// A fresh UUID formatted as `evt_<32 hex>` per the wire identifier grammar.
pub fn event_id() -> String {
    format!("evt_{}", Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revision_id_is_deterministic() {
        assert_eq!(revision_id("hello"), revision_id("hello"));
        assert_ne!(revision_id("hello"), revision_id("world"));
        assert!(revision_id("hello").starts_with("rev_"));
        assert_eq!(revision_id("hello").len(), "rev_".len() + 16);
    }

    #[test]
    fn artifact_uid_is_stable_for_same_source() {
        let a = artifact_uid("email", Some("msg-1"));
        let b = artifact_uid("email", Some("msg-1"));
        assert_eq!(a, b);
        let c = artifact_uid("email", Some("msg-2"));
        assert_ne!(a, c);
    }

    #[test]
    fn artifact_uid_without_source_id_is_random() {
        let a = artifact_uid("chat", None);
        let b = artifact_uid("chat", None);
        assert_ne!(a, b);
    }

    #[test]
    fn event_id_has_prefix_and_length() {
        let id = event_id();
        assert!(id.starts_with("evt_"));
        assert_eq!(id.len(), "evt_".len() + 32);
    }
}
