use std::fs;
use std::path::Path;

use chrono::{DateTime, TimeDelta, Utc};
use rcgen::{
    BasicConstraints, Certificate, CertificateParams, CertificateRevocationListParams,
    CertificateSigningRequestParams, DistinguishedName, DnType, IsCa, KeyIdMethod, KeyPair,
    KeyUsagePurpose, RevokedCertParams, SerialNumber,
};
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use x509_parser::prelude::*;

use crate::config::CaConfig;
use crate::error::CaError;
use crate::models::{CertStatus, CertificateRecord, RevocationReason};
use crate::san::{self, SanSpec};
use crate::store::{FileIndex, IndexStore, PersistedCounter, StoreError, write_atomic};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    Created,
    AlreadyInitialized,
}

/// One logical `issue` request.
#[derive(Debug, Clone)]
pub struct IssueRequest {
    pub name: String,
    pub san: SanSpec,
    /// Overrides the configured leaf validity when set.
    pub validity_days: Option<i64>,
    /// Overwrite an existing artifact for the same name.
    pub force: bool,
    /// Reuse the leaf key already on disk instead of generating a fresh one.
    /// Off by default: reuse weakens per-issuance key freshness and has to
    /// be asked for by name.
    pub reuse_key: bool,
}

impl IssueRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            san: SanSpec::default(),
            validity_days: None,
            force: false,
            reuse_key: false,
        }
    }
}

/// A freshly signed CRL plus the metadata the operator cares about.
#[derive(Debug, Clone)]
pub struct IssuedCrl {
    pub pem: String,
    /// The crlNumber embedded in this CRL.
    pub number: u64,
    pub entries: usize,
    pub this_update: DateTime<Utc>,
    pub next_update: DateTime<Utc>,
}

/// Root certificate metadata for the operator `info` view.
#[derive(Debug, Clone)]
pub struct CaInfo {
    pub cert_pem: String,
    /// `sha256:<hex>` over the DER encoding.
    pub fingerprint: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
}

/// The certificate authority: workflows over a root key pair, a certificate
/// index, and two persisted counters. Operations take `&mut self`, so within
/// a process no two of them can interleave on the counters or the index.
pub struct Authority<S = FileIndex> {
    config: CaConfig,
    index: S,
    serials: PersistedCounter,
    crl_numbers: PersistedCounter,
}

impl Authority<FileIndex> {
    /// One-time workspace bootstrap. A no-op when root materials already
    /// exist, so re-running `init` is safe.
    pub fn init(config: &CaConfig) -> Result<InitOutcome, CaError> {
        if config.is_initialized() {
            info!(
                dir = %config.ca_dir.display(),
                "root CA material already present, skipping generation"
            );
            return Ok(InitOutcome::AlreadyInitialized);
        }

        fs::create_dir_all(config.private_dir()).map_err(StoreError::Unavailable)?;
        fs::create_dir_all(config.certs_dir()).map_err(StoreError::Unavailable)?;

        let key_pair = KeyPair::generate_for(config.key_alg.signature_algorithm())
            .map_err(|e| CaError::CryptoProvider(format!("failed to generate root key: {e}")))?;

        let mut params = CertificateParams::default();
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, config.root_subject.clone());
        dn.push(DnType::OrganizationName, config.organization.clone());
        params.distinguished_name = dn;

        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.key_usages = vec![
            KeyUsagePurpose::DigitalSignature,
            KeyUsagePurpose::KeyCertSign,
            KeyUsagePurpose::CrlSign,
        ];

        let now = Utc::now();
        params.not_before = to_offset(now)?;
        params.not_after = to_offset(now + TimeDelta::days(config.root_validity_days))?;

        let cert = params
            .self_signed(&key_pair)
            .map_err(|e| CaError::CryptoProvider(format!("failed to self-sign root: {e}")))?;

        write_key_pem(&config.root_key_path(), &key_pair.serialize_pem())?;
        write_atomic(&config.root_cert_path(), cert.pem().as_bytes())
            .map_err(StoreError::Unavailable)?;

        PersistedCounter::create(config.serial_path(), config.serial_start)?;
        PersistedCounter::create(config.crl_number_path(), config.crl_number_start)?;
        FileIndex::create(config.index_path())?;

        info!(
            dir = %config.ca_dir.display(),
            subject = %config.root_subject,
            "initialized root CA"
        );
        Ok(InitOutcome::Created)
    }

    /// Open an initialized workspace.
    pub fn open(config: CaConfig) -> Result<Self, CaError> {
        if !config.is_initialized() {
            return Err(CaError::NotInitialized);
        }

        let index = FileIndex::open(config.index_path())?;
        let serials = PersistedCounter::open(config.serial_path())?;
        let crl_numbers = PersistedCounter::open(config.crl_number_path())?;

        Ok(Self {
            config,
            index,
            serials,
            crl_numbers,
        })
    }
}

impl<S: IndexStore> Authority<S> {
    pub fn config(&self) -> &CaConfig {
        &self.config
    }

    /// All index records, issuance order.
    pub fn records(&self) -> &[CertificateRecord] {
        self.index.records()
    }

    /// Issue a leaf certificate: fresh (or explicitly reused) key, CSR bound
    /// to the name, SAN/extension stamping, serial allocation, signature by
    /// the root key, artifact write, index record. The record is inserted
    /// only after the artifact exists; on insert failure the artifact is
    /// removed again so neither side is left without the other.
    pub fn issue(&mut self, request: IssueRequest) -> Result<CertificateRecord, CaError> {
        let name = validate_name(&request.name)?;

        let cert_path = self.config.leaf_cert_path(name);
        if cert_path.exists() && !request.force {
            return Err(CaError::DuplicateIssue(name.to_string()));
        }

        let (ca_cert, ca_key) = self.load_root()?;

        let key_path = self.config.leaf_key_path(name);
        let (leaf_key, fresh_key) = if request.reuse_key && key_path.exists() {
            debug!(subject = name, "reusing existing leaf key");
            let pem = fs::read_to_string(&key_path).map_err(StoreError::Unavailable)?;
            let key = KeyPair::from_pem(&pem)
                .map_err(|e| CaError::CryptoProvider(format!("invalid leaf key PEM: {e}")))?;
            (key, false)
        } else {
            let key = KeyPair::generate_for(self.config.key_alg.signature_algorithm())
                .map_err(|e| CaError::CryptoProvider(format!("failed to generate leaf key: {e}")))?;
            (key, true)
        };

        // CSR round-trip so issuance goes through the same signing surface a
        // remote requester would use.
        let mut csr_params = CertificateParams::default();
        csr_params.distinguished_name.push(DnType::CommonName, name);
        let csr_pem = csr_params
            .serialize_request(&leaf_key)
            .map_err(|e| CaError::SigningFailed(format!("failed to build CSR: {e}")))?
            .pem()
            .map_err(|e| CaError::SigningFailed(format!("failed to encode CSR: {e}")))?;

        let mut csr = CertificateSigningRequestParams::from_pem(&csr_pem)
            .map_err(|e| CaError::SigningFailed(format!("failed to parse CSR: {e}")))?;

        san::apply_leaf_extensions(name, &request.san, &mut csr.params)?;

        let serial = self.serials.allocate()?;
        csr.params.serial_number = Some(SerialNumber::from(serial));

        let issued_at = Utc::now();
        let days = request.validity_days.unwrap_or(self.config.leaf_validity_days);
        let expires_at = issued_at + TimeDelta::days(days);
        csr.params.not_before = to_offset(issued_at)?;
        csr.params.not_after = to_offset(expires_at)?;

        let cert = csr
            .signed_by(&ca_cert, &ca_key)
            .map_err(|e| CaError::SigningFailed(format!("failed to sign certificate: {e}")))?;

        if fresh_key {
            write_key_pem(&key_path, &leaf_key.serialize_pem())?;
        }
        write_atomic(&cert_path, cert.pem().as_bytes()).map_err(StoreError::Unavailable)?;

        let record = CertificateRecord {
            serial,
            subject: name.to_string(),
            not_before: issued_at,
            not_after: expires_at,
            status: CertStatus::Valid,
            revoked_at: None,
            revocation_reason: None,
            cert_path: cert_path.clone(),
        };

        if let Err(e) = self.index.insert(record.clone()) {
            let _ = fs::remove_file(&cert_path);
            return Err(e.into());
        }

        info!(serial, subject = name, cert = %cert_path.display(), "issued certificate");
        Ok(record)
    }

    /// Revoke by certificate artifact path, the usual operator entry point.
    pub fn revoke_by_path(
        &mut self,
        cert_file: &Path,
        reason: RevocationReason,
        now: DateTime<Utc>,
    ) -> Result<CertificateRecord, CaError> {
        let serial = self.index.find_by_path(cert_file)?.serial;
        self.revoke_serial(serial, reason, now)
    }

    /// Revoke one serial. The CRL is NOT regenerated here: publication is a
    /// separate step so several revocations can share one sequence bump.
    pub fn revoke_serial(
        &mut self,
        serial: u64,
        reason: RevocationReason,
        now: DateTime<Utc>,
    ) -> Result<CertificateRecord, CaError> {
        let existing = self.index.find(serial)?;
        if now < existing.not_before {
            return Err(CaError::InvalidRequest(format!(
                "revocation time {now} precedes certificate validity start {}",
                existing.not_before
            )));
        }

        let record = self.index.revoke(serial, reason, now)?;
        info!(
            serial,
            subject = %record.subject,
            reason = ?reason,
            "revoked certificate; regenerate the CRL to publish"
        );
        Ok(record)
    }

    /// Sign a CRL over the current revoked set and write it to the
    /// workspace. Each call consumes one CRL sequence number; calling twice
    /// with no new revocations yields CRLs differing only in number and
    /// timestamps.
    ///
    /// `prune_expired` omits revoked certificates whose validity has already
    /// ended. The default operator flow keeps them (the full revoked set is
    /// re-emitted every time).
    pub fn generate_crl(
        &mut self,
        now: DateTime<Utc>,
        prune_expired: bool,
    ) -> Result<IssuedCrl, CaError> {
        let (ca_cert, ca_key) = self.load_root()?;

        let number = self.crl_numbers.allocate()?;
        let next_update = now + TimeDelta::days(self.config.crl_validity_days);

        let mut revoked_certs = Vec::new();
        for record in self.index.revoked() {
            if prune_expired && record.not_after <= now {
                debug!(serial = record.serial, "omitting expired certificate from CRL");
                continue;
            }
            let revoked_at = record.revoked_at.ok_or_else(|| {
                StoreError::Corrupt(format!(
                    "revoked record {} has no revocation time",
                    record.serial
                ))
            })?;
            revoked_certs.push(RevokedCertParams {
                serial_number: SerialNumber::from(record.serial),
                revocation_time: to_offset(revoked_at)?,
                reason_code: Some(
                    record
                        .revocation_reason
                        .unwrap_or(RevocationReason::Unspecified)
                        .into(),
                ),
                invalidity_date: None,
            });
        }
        let entries = revoked_certs.len();

        let params = CertificateRevocationListParams {
            this_update: to_offset(now)?,
            next_update: to_offset(next_update)?,
            crl_number: SerialNumber::from(number),
            issuing_distribution_point: None,
            revoked_certs,
            key_identifier_method: KeyIdMethod::Sha256,
        };

        let crl = params
            .signed_by(&ca_cert, &ca_key)
            .map_err(|e| CaError::SigningFailed(format!("failed to sign CRL: {e}")))?;
        let pem = crl
            .pem()
            .map_err(|e| CaError::SigningFailed(format!("failed to encode CRL: {e}")))?;

        write_atomic(&self.config.crl_path(), pem.as_bytes()).map_err(StoreError::Unavailable)?;

        info!(number, entries, crl = %self.config.crl_path().display(), "generated CRL");
        Ok(IssuedCrl {
            pem,
            number,
            entries,
            this_update: now,
            next_update,
        })
    }

    /// Root certificate PEM, fingerprint, and validity window.
    pub fn info(&self) -> Result<CaInfo, CaError> {
        let cert_pem =
            fs::read_to_string(self.config.root_cert_path()).map_err(StoreError::Unavailable)?;

        let cert_der = pem_rfc7468::decode_vec(cert_pem.as_bytes())
            .map_err(|e| CaError::CryptoProvider(format!("failed to decode CA cert PEM: {e}")))?
            .1;
        let (_, cert) = X509Certificate::from_der(&cert_der)
            .map_err(|e| CaError::CryptoProvider(format!("failed to parse CA cert: {e}")))?;

        let not_before = DateTime::from_timestamp(cert.validity().not_before.timestamp(), 0)
            .ok_or_else(|| CaError::CryptoProvider("invalid notBefore date".into()))?;
        let not_after = DateTime::from_timestamp(cert.validity().not_after.timestamp(), 0)
            .ok_or_else(|| CaError::CryptoProvider("invalid notAfter date".into()))?;

        let mut hasher = Sha256::new();
        hasher.update(&cert_der);
        let fingerprint = format!("sha256:{}", hex::encode(hasher.finalize()));

        Ok(CaInfo {
            cert_pem,
            fingerprint,
            not_before,
            not_after,
        })
    }

    /// Reconstruct the signing root from the workspace PEM files, the same
    /// way the provider round-trips a CA certificate it did not just create.
    fn load_root(&self) -> Result<(Certificate, KeyPair), CaError> {
        let key_pem =
            fs::read_to_string(self.config.root_key_path()).map_err(StoreError::Unavailable)?;
        let key_pair = KeyPair::from_pem(&key_pem)
            .map_err(|e| CaError::CryptoProvider(format!("invalid root key PEM: {e}")))?;

        let cert_pem =
            fs::read_to_string(self.config.root_cert_path()).map_err(StoreError::Unavailable)?;
        let params = CertificateParams::from_ca_cert_pem(&cert_pem)
            .map_err(|e| CaError::CryptoProvider(format!("failed to parse CA cert: {e}")))?;
        let cert = params
            .self_signed(&key_pair)
            .map_err(|e| CaError::CryptoProvider(format!("failed to reconstruct CA cert: {e}")))?;

        Ok((cert, key_pair))
    }
}

/// Leaf names double as file stems under the workspace, so they are kept to
/// a conservative character set.
fn validate_name(name: &str) -> Result<&str, CaError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CaError::InvalidRequest("name must not be empty".into()));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        || name.starts_with('.')
    {
        return Err(CaError::InvalidRequest(format!(
            "name {name:?} may only contain alphanumerics, '.', '-' and '_'"
        )));
    }
    Ok(name)
}

fn to_offset(at: DateTime<Utc>) -> Result<::time::OffsetDateTime, CaError> {
    ::time::OffsetDateTime::from_unix_timestamp(at.timestamp())
        .map_err(|e| CaError::CryptoProvider(format!("invalid timestamp: {e}")))
}

fn write_key_pem(path: &Path, pem: &str) -> Result<(), CaError> {
    write_atomic(path, pem.as_bytes()).map_err(StoreError::Unavailable)?;
    restrict_permissions(path).map_err(StoreError::Unavailable)?;
    Ok(())
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
