use std::sync::atomic::{AtomicU64, Ordering};

use sha2::{Digest, Sha256};

use crate::core::time::now_utc;

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Mints an opaque record id such as `rpt_3f9c…`. Ids never encode record content.
pub fn mint_id(prefix: &str) -> String {
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let wall = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let buf = format!(
        "{}|{}|{}|{}|{}",
        prefix,
        wall,
        now_utc().to_rfc3339(),
        std::process::id(),
        seq
    );
    format!("{}_{}", prefix, &sha256_hex(buf.as_bytes())[..20])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minted_ids_are_prefixed_and_unique() {
        let a = mint_id("tip");
        let b = mint_id("tip");
        assert!(a.starts_with("tip_"));
        assert_eq!(a.len(), "tip_".len() + 20);
        assert_ne!(a, b);
    }
}
