//! # Feature Gates
//!
//! Named boolean toggles consulted before work is scheduled. Gates are read
//! as an immutable [`GateSnapshot`] at the start of each handling unit; the
//! snapshot is cached by [`CachedGates`] and reloaded from its
//! [`FeatureGateSource`] once it is older than the refresh interval or after
//! an explicit invalidation.
//!
//! A gate that a source does not define is closed.

pub mod cache;
pub mod source;

pub use cache::{CachedGates, GateSnapshot};
pub use source::{ConfigGateSource, FeatureGateSource};

/// Global switch for syncing anything to the credentials service
pub const CREDENTIALS_ENABLED: &str = "credentials.enabled";

/// Generate certificates automatically as learners pass
pub const AUTO_CERTIFICATE_GENERATION: &str = "certificates.auto_certificate_generation";

/// Emit `CertAwarded` when a certificate is created or awarded
pub const SEND_CERTIFICATE_CREATED_SIGNAL: &str = "certificates.send_certificate_created_signal";

/// Emit `CertRevoked` when a certificate is revoked
pub const SEND_CERTIFICATE_REVOKED_SIGNAL: &str = "certificates.send_certificate_revoked_signal";

/// Prefix of the per-organization learner records gates
pub const LEARNER_RECORDS_PREFIX: &str = "learner_records";

/// Gate name for the learner records feature of `org`
///
/// Gate names are case-insensitive; they are normalized to lowercase.
pub fn learner_records_gate(org: &str) -> String {
    format!("{LEARNER_RECORDS_PREFIX}.{}", org.to_lowercase())
}
