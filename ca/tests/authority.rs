use chrono::Utc;
use labca::{
    Authority, CaConfig, CaError, CertStatus, InitOutcome, IssueRequest, RevocationReason, SanSpec,
};
use x509_parser::prelude::*;

fn test_config(dir: &tempfile::TempDir) -> CaConfig {
    let mut config = CaConfig::new(dir.path().join("ca"));
    config.root_subject = "Lab Test CA".to_string();
    config
}

fn decode_pem(pem: &str) -> Vec<u8> {
    pem_rfc7468::decode_vec(pem.as_bytes()).unwrap().1
}

fn request(name: &str, dns: Option<&str>, ip: Option<&str>) -> IssueRequest {
    let mut req = IssueRequest::new(name);
    req.san = SanSpec::from_csv(dns, ip);
    req
}

#[test]
fn init_creates_workspace_and_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);

    assert_eq!(Authority::init(&config).unwrap(), InitOutcome::Created);
    assert!(config.root_key_path().exists());
    assert!(config.root_cert_path().exists());
    assert!(config.index_path().exists());
    assert!(config.serial_path().exists());
    assert!(config.crl_number_path().exists());

    // Re-running init must not replace anything.
    let cert_before = std::fs::read(config.root_cert_path()).unwrap();
    assert_eq!(
        Authority::init(&config).unwrap(),
        InitOutcome::AlreadyInitialized
    );
    assert_eq!(std::fs::read(config.root_cert_path()).unwrap(), cert_before);
}

#[test]
fn root_certificate_is_a_ca() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    Authority::init(&config).unwrap();

    let pem = std::fs::read_to_string(config.root_cert_path()).unwrap();
    let der = decode_pem(&pem);
    let (_, cert) = X509Certificate::from_der(&der).unwrap();

    assert!(cert.is_ca());
    let ku = cert.key_usage().unwrap().unwrap().value;
    assert!(ku.key_cert_sign());
    assert!(ku.crl_sign());
}

#[test]
fn open_before_init_fails() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        Authority::open(test_config(&dir)),
        Err(CaError::NotInitialized)
    ));
}

#[test]
fn issued_certificate_carries_requested_sans_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    Authority::init(&config).unwrap();
    let mut authority = Authority::open(config).unwrap();

    let record = authority
        .issue(request(
            "demo-login.lab",
            Some("demo-login.lab, assets.demo-login.lab"),
            Some("10.0.100.20"),
        ))
        .unwrap();

    assert_eq!(record.status, CertStatus::Valid);
    assert_eq!(record.subject, "demo-login.lab");
    assert!(record.cert_path.exists());

    let pem = std::fs::read_to_string(&record.cert_path).unwrap();
    let der = decode_pem(&pem);
    let (_, cert) = X509Certificate::from_der(&der).unwrap();

    assert_eq!(
        cert.subject().iter_common_name().next().unwrap().as_str().unwrap(),
        "demo-login.lab"
    );
    assert_eq!(cert.tbs_certificate.serial.to_string(), record.serial.to_string());
    assert!(!cert.is_ca());

    let san = cert.subject_alternative_name().unwrap().unwrap().value;
    let names: Vec<String> = san
        .general_names
        .iter()
        .map(|gn| match gn {
            GeneralName::DNSName(name) => format!("dns:{name}"),
            GeneralName::IPAddress(bytes) => format!("ip:{bytes:?}"),
            other => format!("other:{other:?}"),
        })
        .collect();
    assert_eq!(
        names,
        vec![
            "dns:demo-login.lab",
            "dns:assets.demo-login.lab",
            "ip:[10, 0, 100, 20]",
        ]
    );
}

#[test]
fn issuance_without_sans_falls_back_to_subject_dns_entry() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    Authority::init(&config).unwrap();
    let mut authority = Authority::open(config).unwrap();

    let record = authority.issue(request("host.lab", None, None)).unwrap();

    let pem = std::fs::read_to_string(&record.cert_path).unwrap();
    let der = decode_pem(&pem);
    let (_, cert) = X509Certificate::from_der(&der).unwrap();

    let san = cert.subject_alternative_name().unwrap().unwrap().value;
    assert_eq!(san.general_names.len(), 1);
    assert!(matches!(
        san.general_names[0],
        GeneralName::DNSName("host.lab")
    ));
}

#[test]
fn certificate_validity_matches_the_record() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    Authority::init(&config).unwrap();
    let mut authority = Authority::open(config).unwrap();

    let mut req = request("host.lab", None, None);
    req.validity_days = Some(7);
    let record = authority.issue(req).unwrap();

    let pem = std::fs::read_to_string(&record.cert_path).unwrap();
    let der = decode_pem(&pem);
    let (_, cert) = X509Certificate::from_der(&der).unwrap();

    // The index timestamps carry sub-second precision; the signed artifact
    // is truncated to whole seconds.
    assert_eq!(
        cert.validity().not_before.timestamp(),
        record.not_before.timestamp()
    );
    assert_eq!(
        cert.validity().not_after.timestamp(),
        record.not_after.timestamp()
    );
    assert_eq!(
        record.not_after.timestamp() - record.not_before.timestamp(),
        7 * 24 * 60 * 60
    );
}

#[test]
fn serials_increase_and_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    Authority::init(&config).unwrap();

    let mut authority = Authority::open(config.clone()).unwrap();
    let first = authority.issue(request("a.lab", None, None)).unwrap();
    let second = authority.issue(request("b.lab", None, None)).unwrap();
    drop(authority);

    let mut authority = Authority::open(config).unwrap();
    let third = authority.issue(request("c.lab", None, None)).unwrap();

    assert!(first.serial < second.serial);
    assert!(second.serial < third.serial);
    assert_eq!(authority.records().len(), 3);
}

#[test]
fn reissuing_a_name_requires_force() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    Authority::init(&config).unwrap();
    let mut authority = Authority::open(config).unwrap();

    let first = authority.issue(request("host.lab", None, None)).unwrap();

    let err = authority.issue(request("host.lab", None, None)).unwrap_err();
    assert!(matches!(err, CaError::DuplicateIssue(name) if name == "host.lab"));

    let mut forced = request("host.lab", None, None);
    forced.force = true;
    let second = authority.issue(forced).unwrap();
    assert!(second.serial > first.serial);
}

#[test]
fn key_reuse_is_opt_in() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    Authority::init(&config).unwrap();
    let key_path = config.leaf_key_path("host.lab");
    let mut authority = Authority::open(config).unwrap();

    authority.issue(request("host.lab", None, None)).unwrap();
    let original_key = std::fs::read(&key_path).unwrap();

    // Default: a forced reissue replaces the key.
    let mut forced = request("host.lab", None, None);
    forced.force = true;
    authority.issue(forced).unwrap();
    assert_ne!(std::fs::read(&key_path).unwrap(), original_key);

    // Explicit reuse keeps whatever is on disk.
    let reused_key = std::fs::read(&key_path).unwrap();
    let mut reuse = request("host.lab", None, None);
    reuse.force = true;
    reuse.reuse_key = true;
    authority.issue(reuse).unwrap();
    assert_eq!(std::fs::read(&key_path).unwrap(), reused_key);
}

#[test]
fn invalid_names_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    Authority::init(&config).unwrap();
    let mut authority = Authority::open(config).unwrap();

    for bad in ["", "../escape", "a/b.lab"] {
        assert!(matches!(
            authority.issue(request(bad, None, None)),
            Err(CaError::InvalidRequest(_))
        ));
    }
}

#[test]
fn revoke_unknown_and_repeated_revocations_fail() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    Authority::init(&config).unwrap();
    let mut authority = Authority::open(config).unwrap();

    let record = authority.issue(request("host.lab", None, None)).unwrap();

    assert!(matches!(
        authority.revoke_serial(9999, RevocationReason::Unspecified, Utc::now()),
        Err(CaError::Store(labca::store::StoreError::NotFound(_)))
    ));

    authority
        .revoke_serial(record.serial, RevocationReason::Superseded, Utc::now())
        .unwrap();
    assert!(matches!(
        authority.revoke_serial(record.serial, RevocationReason::Superseded, Utc::now()),
        Err(CaError::Store(labca::store::StoreError::AlreadyRevoked(_)))
    ));

    // The record never reverts to Valid.
    let reopened = Authority::open(test_config(&dir)).unwrap();
    assert_eq!(
        reopened.records().iter().find(|r| r.serial == record.serial).unwrap().status,
        CertStatus::Revoked
    );
}

#[test]
fn end_to_end_issue_revoke_crl() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    Authority::init(&config).unwrap();
    let mut authority = Authority::open(config.clone()).unwrap();

    let record = authority
        .issue(request(
            "demo-login.lab",
            Some("demo-login.lab,assets.demo-login.lab"),
            Some("10.0.100.20"),
        ))
        .unwrap();

    let now = Utc::now();
    let revoked = authority
        .revoke_by_path(&record.cert_path, RevocationReason::KeyCompromise, now)
        .unwrap();
    assert_eq!(revoked.status, CertStatus::Revoked);
    assert!(revoked.revoked_at.unwrap() >= revoked.not_before);

    let issued = authority.generate_crl(now, false).unwrap();
    assert_eq!(issued.entries, 1);
    assert!(config.crl_path().exists());

    let der = decode_pem(&issued.pem);
    let (_, crl) = CertificateRevocationList::from_der(&der).unwrap();
    let entries: Vec<_> = crl.iter_revoked_certificates().collect();
    assert_eq!(entries.len(), 1);
    assert_eq!(
        entries[0].user_certificate.to_string(),
        record.serial.to_string()
    );
    let (_, reason) = entries[0].reason_code().unwrap();
    assert_eq!(reason, ReasonCode::KeyCompromise);

    // A second CRL with no new revocations only bumps the sequence number.
    let again = authority.generate_crl(Utc::now(), false).unwrap();
    assert_eq!(again.number, issued.number + 1);
    assert_eq!(again.entries, issued.entries);
}

#[test]
fn crl_covers_every_unexpired_revoked_serial() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    Authority::init(&config).unwrap();
    let mut authority = Authority::open(config).unwrap();

    let s1 = authority.issue(request("one.lab", None, None)).unwrap().serial;
    let s2 = authority.issue(request("two.lab", None, None)).unwrap().serial;
    authority.issue(request("three.lab", None, None)).unwrap();

    let now = Utc::now();
    authority
        .revoke_serial(s1, RevocationReason::KeyCompromise, now)
        .unwrap();
    authority
        .revoke_serial(s2, RevocationReason::CessationOfOperation, now)
        .unwrap();

    let issued = authority.generate_crl(now, false).unwrap();
    let der = decode_pem(&issued.pem);
    let (_, crl) = CertificateRevocationList::from_der(&der).unwrap();

    let mut serials: Vec<String> = crl
        .iter_revoked_certificates()
        .map(|entry| entry.user_certificate.to_string())
        .collect();
    serials.sort();
    let mut expected = vec![s1.to_string(), s2.to_string()];
    expected.sort();
    assert_eq!(serials, expected);
}

#[test]
fn pruning_omits_expired_revoked_certificates() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    Authority::init(&config).unwrap();
    let mut authority = Authority::open(config).unwrap();

    let mut short_lived = request("ephemeral.lab", None, None);
    short_lived.validity_days = Some(0);
    let record = authority.issue(short_lived).unwrap();
    authority
        .revoke_serial(record.serial, RevocationReason::Unspecified, Utc::now())
        .unwrap();

    let now = Utc::now();
    // Default behavior re-emits the full revoked set, expired or not.
    assert_eq!(authority.generate_crl(now, false).unwrap().entries, 1);
    assert_eq!(authority.generate_crl(now, true).unwrap().entries, 0);
}

#[test]
fn info_reports_the_root_fingerprint() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    Authority::init(&config).unwrap();
    let authority = Authority::open(config.clone()).unwrap();

    let info = authority.info().unwrap();
    assert!(info.fingerprint.starts_with("sha256:"));
    assert_eq!(info.fingerprint.len(), "sha256:".len() + 64);
    assert_eq!(
        info.cert_pem,
        std::fs::read_to_string(config.root_cert_path()).unwrap()
    );
    assert!(info.not_before < info.not_after);
}
