use sha2::{Digest, Sha256};

pub type Id = String;

/// Marker substituted for secret values whenever a plan is logged or
/// surfaced through the catalog.
pub const REDACTED: &str = "<redacted>";

/// Derive a stable id from arbitrary input. Repeated catalog builds must
/// produce identical plan/service ids so previously provisioned instances
/// keep resolving, so ids are content hashes rather than random.
pub fn deterministic_id(prefix: &str, input: &str) -> Id {
    let digest = Sha256::digest(input.as_bytes());
    let hex = hex::encode(digest);
    format!("{}-{}", prefix, &hex[..32])
}
