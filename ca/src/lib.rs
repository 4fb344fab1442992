//! File-backed certificate authority for closed lab networks.
//!
//! One root, one level of leaf certificates. The authority tracks every
//! certificate it has ever signed in a line-oriented index, hands out
//! monotonically increasing serials from persisted counters, and publishes
//! a signed CRL over the revoked set on demand.

pub mod authority;
pub mod config;
pub mod error;
pub mod models;
pub mod san;
pub mod store;

pub use authority::{Authority, CaInfo, InitOutcome, IssueRequest, IssuedCrl};
pub use config::{CaConfig, KeyAlgorithm};
pub use error::CaError;
pub use models::{CertStatus, CertificateRecord, RevocationReason};
pub use san::SanSpec;
