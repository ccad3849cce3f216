//! Local certificate authority: one root per configuration directory, reused
//! for every leaf it signs.
//!
//! The CA is created lazily and never rewritten once both of its files exist,
//! so a root the user has trusted keeps validating every later leaf. Leaves
//! are cheap and are overwritten on every request for the same pattern.
//!
//! Concurrent first runs agree on one root without a lock: `ca.key` is
//! published with an exclusive link, the first writer keeps it and everyone
//! else waits briefly for the matching `ca.crt`.

use std::path::PathBuf;
use std::time::Duration as WaitDuration;

use rcgen::{
    BasicConstraints, Certificate, CertificateParams, DistinguishedName, DnType,
    ExtendedKeyUsagePurpose, IsCa, KeyPair, KeyUsagePurpose,
};
use time::{Duration, OffsetDateTime};

use super::store::{self, CA_CERT_FILE, CA_KEY_FILE};
use crate::error::{DipError, DipResult};
use crate::model::validate_domain;

/// Root validity.
pub const CA_VALIDITY_DAYS: i64 = 3650;
/// Leaf validity, kept under the 825-day ceiling browsers accept.
pub const LEAF_VALIDITY_DAYS: i64 = 825;

pub const CA_COMMON_NAME: &str = "dip local development CA";
const ORGANIZATION: &str = "dip";

/// How long to wait for a concurrent invocation to finish writing `ca.crt`.
const PEER_WRITE_GRACE: WaitDuration = WaitDuration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaState {
    Absent,
    Present,
}

/// Result of [`CertificateAuthority::ensure_ca`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaStatus {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
    /// True only on the call that generated the CA.
    pub created: bool,
}

#[derive(Debug, Clone)]
pub struct IssuedCertificate {
    pub domain_pattern: String,
    pub subject_alt_names: Vec<String>,
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
    pub ca: CaStatus,
    pub created_at: OffsetDateTime,
    pub not_after: OffsetDateTime,
}

/// Owns `ca.key`, `ca.crt` and the `<domain>.{key,crt}` pairs in one directory.
#[derive(Debug, Clone)]
pub struct CertificateAuthority {
    dir: PathBuf,
}

impl CertificateAuthority {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn ca_cert_path(&self) -> PathBuf {
        self.dir.join(CA_CERT_FILE)
    }

    pub fn ca_key_path(&self) -> PathBuf {
        self.dir.join(CA_KEY_FILE)
    }

    pub fn state(&self) -> CaState {
        if self.ca_cert_path().is_file() && self.ca_key_path().is_file() {
            CaState::Present
        } else {
            CaState::Absent
        }
    }

    /// Absent → generate and persist; Present → no-op.
    pub fn ensure_ca(&self) -> DipResult<CaStatus> {
        let cert_path = self.ca_cert_path();
        let key_path = self.ca_key_path();
        let existing = |created| CaStatus {
            cert_path: cert_path.clone(),
            key_path: key_path.clone(),
            created,
        };

        if self.state() == CaState::Present {
            return Ok(existing(false));
        }
        // ca.key is always published before ca.crt, so a key alone may be
        // another invocation halfway through, while a cert alone is stale.
        if key_path.is_file() {
            if store::wait_for_file(&cert_path, PEER_WRITE_GRACE) {
                return Ok(existing(false));
            }
            self.warn_incomplete();
            store::remove_stale(&key_path)?;
        } else if cert_path.is_file() {
            if key_path.is_file() {
                return Ok(existing(false));
            }
            self.warn_incomplete();
            store::remove_stale(&cert_path)?;
        }

        store::ensure_dir(&self.dir)?;
        let (cert_pem, key_pem) = generate_ca()?;
        // Whoever publishes ca.key first owns the CA; the cert only follows its own key.
        if !store::publish_new(&key_path, key_pem.as_bytes())? {
            tracing::debug!(dir = %self.dir.display(), "CA created concurrently, reusing it");
            if store::wait_for_file(&cert_path, PEER_WRITE_GRACE) {
                return Ok(existing(false));
            }
            return Err(DipError::storage(
                &cert_path,
                std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "ca.key exists but its certificate never appeared",
                ),
            ));
        }
        store::publish_replace(&cert_path, cert_pem.as_bytes())?;

        tracing::info!(cert = %cert_path.display(), "created local CA");
        Ok(existing(true))
    }

    fn warn_incomplete(&self) {
        tracing::warn!(
            dir = %self.dir.display(),
            "incomplete CA material found, regenerating; the new CA must be trusted again"
        );
    }

    /// Issue (or re-issue) a leaf for `domain_pattern`, signed by the local CA.
    pub fn issue_certificate(&self, domain_pattern: &str) -> DipResult<IssuedCertificate> {
        validate_domain(domain_pattern)?;
        if store::is_reserved_leaf(domain_pattern) {
            return Err(DipError::InvalidDomain(domain_pattern.to_string()));
        }
        let ca = self.ensure_ca()?;

        let ca_key = KeyPair::from_pem(&store::read_pem(&ca.key_path)?)?;
        let ca_params = CertificateParams::from_ca_cert_pem(&store::read_pem(&ca.cert_path)?)?;
        // Same subject and key as the stored root, so leaves chain to it.
        let issuer = ca_params.self_signed(&ca_key)?;

        let subject_alt_names = subject_alt_names(domain_pattern);
        let now = OffsetDateTime::now_utc();
        let not_after = now + Duration::days(LEAF_VALIDITY_DAYS);
        let (cert_pem, key_pem) =
            generate_leaf(domain_pattern, &subject_alt_names, now, not_after, &issuer, &ca_key)?;

        let (cert_path, key_path) = store::leaf_paths(&self.dir, domain_pattern);
        store::write_secret(&key_path, key_pem.as_bytes())?;
        store::write_secret(&cert_path, cert_pem.as_bytes())?;

        tracing::info!(
            domain = domain_pattern,
            cert = %cert_path.display(),
            "issued leaf certificate"
        );

        Ok(IssuedCertificate {
            domain_pattern: domain_pattern.to_string(),
            subject_alt_names,
            cert_path,
            key_path,
            ca,
            created_at: now,
            not_after,
        })
    }
}

/// The pattern itself, plus the apex for a wildcard (`*.a.lan` also covers `a.lan`).
pub fn subject_alt_names(domain_pattern: &str) -> Vec<String> {
    let mut names = vec![domain_pattern.to_string()];
    if let Some(apex) = domain_pattern.strip_prefix("*.") {
        if !apex.is_empty() {
            names.push(apex.to_string());
        }
    }
    names
}

fn distinguished_name(common_name: &str) -> DistinguishedName {
    let mut dn = DistinguishedName::new();
    dn.push(DnType::OrganizationName, ORGANIZATION);
    dn.push(DnType::CommonName, common_name);
    dn
}

fn generate_ca() -> DipResult<(String, String)> {
    let key = KeyPair::generate()?;

    let mut params = CertificateParams::default();
    params.distinguished_name = distinguished_name(CA_COMMON_NAME);
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.key_usages = vec![
        KeyUsagePurpose::KeyCertSign,
        KeyUsagePurpose::CrlSign,
        KeyUsagePurpose::DigitalSignature,
    ];
    let now = OffsetDateTime::now_utc();
    params.not_before = now - Duration::days(1);
    params.not_after = now + Duration::days(CA_VALIDITY_DAYS);

    let cert = params.self_signed(&key)?;
    Ok((cert.pem(), key.serialize_pem()))
}

fn generate_leaf(
    domain_pattern: &str,
    subject_alt_names: &[String],
    not_before: OffsetDateTime,
    not_after: OffsetDateTime,
    issuer: &Certificate,
    issuer_key: &KeyPair,
) -> DipResult<(String, String)> {
    let key = KeyPair::generate()?;

    let mut params = CertificateParams::new(subject_alt_names.to_vec())?;
    params.distinguished_name = distinguished_name(domain_pattern);
    params.is_ca = IsCa::ExplicitNoCa;
    params.key_usages = vec![
        KeyUsagePurpose::DigitalSignature,
        KeyUsagePurpose::KeyEncipherment,
    ];
    params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];
    params.use_authority_key_identifier_extension = true;
    params.not_before = not_before - Duration::minutes(5);
    params.not_after = not_after;

    let cert = params.signed_by(&key, issuer, issuer_key)?;
    Ok((cert.pem(), key.serialize_pem()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use x509_parser::extensions::GeneralName;
    use x509_parser::pem::parse_x509_pem;

    fn read(path: &Path) -> Vec<u8> {
        std::fs::read(path).unwrap()
    }

    #[test]
    fn starts_absent_then_present() {
        let dir = tempfile::tempdir().unwrap();
        let ca = CertificateAuthority::new(dir.path().join("certs"));
        assert_eq!(ca.state(), CaState::Absent);

        let status = ca.ensure_ca().unwrap();
        assert!(status.created);
        assert_eq!(ca.state(), CaState::Present);
    }

    #[test]
    fn ensure_ca_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let ca = CertificateAuthority::new(dir.path());

        ca.ensure_ca().unwrap();
        let first = read(&ca.ca_cert_path());
        let first_key = read(&ca.ca_key_path());

        for _ in 0..3 {
            let status = ca.ensure_ca().unwrap();
            assert!(!status.created);
        }
        assert_eq!(read(&ca.ca_cert_path()), first);
        assert_eq!(read(&ca.ca_key_path()), first_key);
    }

    #[test]
    fn ca_certificate_is_marked_as_ca() {
        let dir = tempfile::tempdir().unwrap();
        let ca = CertificateAuthority::new(dir.path());
        ca.ensure_ca().unwrap();

        let pem_bytes = read(&ca.ca_cert_path());
        let (_, pem) = parse_x509_pem(&pem_bytes).unwrap();
        let cert = pem.parse_x509().unwrap();
        let constraints = cert.basic_constraints().unwrap().unwrap();
        assert!(constraints.value.ca);
        assert!(cert.subject().to_string().contains(CA_COMMON_NAME));
    }

    #[test]
    fn wildcard_leaf_covers_apex_and_verifies() {
        let dir = tempfile::tempdir().unwrap();
        let ca = CertificateAuthority::new(dir.path());

        let issued = ca.issue_certificate("*.example.lan").unwrap();
        assert!(issued.ca.created);
        assert!(issued.cert_path.ends_with("_wildcard.example.lan.crt"));
        assert_eq!(
            issued.subject_alt_names,
            vec!["*.example.lan".to_string(), "example.lan".to_string()]
        );

        let ca_bytes = read(&ca.ca_cert_path());
        let (_, ca_pem) = parse_x509_pem(&ca_bytes).unwrap();
        let ca_cert = ca_pem.parse_x509().unwrap();

        let leaf_bytes = read(&issued.cert_path);
        let (_, leaf_pem) = parse_x509_pem(&leaf_bytes).unwrap();
        let leaf = leaf_pem.parse_x509().unwrap();

        leaf.verify_signature(Some(ca_cert.public_key())).unwrap();
        assert_eq!(leaf.issuer().to_string(), ca_cert.subject().to_string());

        let san = leaf.subject_alternative_name().unwrap().unwrap();
        let dns: Vec<String> = san
            .value
            .general_names
            .iter()
            .filter_map(|n| match n {
                GeneralName::DNSName(d) => Some(d.to_string()),
                _ => None,
            })
            .collect();
        assert_eq!(dns, vec!["*.example.lan", "example.lan"]);

        let lifetime = leaf.validity().not_after.timestamp() - leaf.validity().not_before.timestamp();
        assert!(lifetime <= (LEAF_VALIDITY_DAYS + 1) * 86_400);
    }

    #[test]
    fn reissue_changes_leaf_but_not_ca() {
        let dir = tempfile::tempdir().unwrap();
        let ca = CertificateAuthority::new(dir.path());

        let first = ca.issue_certificate("app.example.lan").unwrap();
        let ca_before = read(&ca.ca_cert_path());
        let leaf_before = read(&first.cert_path);

        let second = ca.issue_certificate("app.example.lan").unwrap();
        assert!(!second.ca.created);
        assert_eq!(second.cert_path, first.cert_path);
        assert_eq!(read(&ca.ca_cert_path()), ca_before);
        assert_ne!(read(&second.cert_path), leaf_before);

        let (_, ca_pem) = parse_x509_pem(&ca_before).unwrap();
        let ca_cert = ca_pem.parse_x509().unwrap();
        let leaf_bytes = read(&second.cert_path);
        let (_, leaf_pem) = parse_x509_pem(&leaf_bytes).unwrap();
        let leaf = leaf_pem.parse_x509().unwrap();
        leaf.verify_signature(Some(ca_cert.public_key())).unwrap();
    }

    #[test]
    fn invalid_domain_is_rejected_before_any_write() {
        let dir = tempfile::tempdir().unwrap();
        let ca = CertificateAuthority::new(dir.path().join("certs"));
        assert!(ca.issue_certificate("bad domain").is_err());
        assert!(ca.issue_certificate("").is_err());
        assert_eq!(ca.state(), CaState::Absent);
        assert!(!dir.path().join("certs").exists());
    }

    #[test]
    fn leaf_cannot_overwrite_the_ca() {
        let dir = tempfile::tempdir().unwrap();
        let ca = CertificateAuthority::new(dir.path());
        ca.ensure_ca().unwrap();
        let cert_before = read(&ca.ca_cert_path());
        let key_before = read(&ca.ca_key_path());

        for pattern in ["ca", "CA"] {
            assert!(matches!(
                ca.issue_certificate(pattern),
                Err(DipError::InvalidDomain(_))
            ));
        }
        assert_eq!(read(&ca.ca_cert_path()), cert_before);
        assert_eq!(read(&ca.ca_key_path()), key_before);
    }

    #[test]
    fn wildcard_file_stem_cannot_be_aliased() {
        let dir = tempfile::tempdir().unwrap();
        let ca = CertificateAuthority::new(dir.path());
        let wildcard = ca.issue_certificate("*.example.lan").unwrap();
        let before = read(&wildcard.cert_path);

        assert!(matches!(
            ca.issue_certificate("_wildcard.example.lan"),
            Err(DipError::InvalidDomain(_))
        ));
        assert_eq!(read(&wildcard.cert_path), before);
    }

    #[test]
    fn dangling_key_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let ca = CertificateAuthority::new(dir.path());
        std::fs::write(ca.ca_key_path(), "stale").unwrap();

        let status = ca.ensure_ca().unwrap();
        assert!(status.created);
        assert_ne!(read(&ca.ca_key_path()), b"stale".to_vec());
        ca.issue_certificate("app.example.lan").unwrap();
    }

    #[test]
    fn half_written_ca_is_regenerated() {
        let dir = tempfile::tempdir().unwrap();
        let ca = CertificateAuthority::new(dir.path());
        std::fs::write(ca.ca_cert_path(), "stale").unwrap();

        let status = ca.ensure_ca().unwrap();
        assert!(status.created);
        assert_ne!(read(&ca.ca_cert_path()), b"stale".to_vec());
    }

    #[test]
    fn apex_only_for_wildcards() {
        assert_eq!(subject_alt_names("api.lan"), vec!["api.lan"]);
        assert_eq!(subject_alt_names("*.lan"), vec!["*.lan", "lan"]);
    }
}
