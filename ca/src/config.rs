use std::path::PathBuf;

use clap::ValueEnum;

/// Root/leaf key algorithm. The provider generates ECDSA P-256 and Ed25519
/// key pairs; RSA generation is not offered by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KeyAlgorithm {
    EcdsaP256,
    Ed25519,
}

impl KeyAlgorithm {
    pub(crate) fn signature_algorithm(self) -> &'static rcgen::SignatureAlgorithm {
        match self {
            KeyAlgorithm::EcdsaP256 => &rcgen::PKCS_ECDSA_P256_SHA256,
            KeyAlgorithm::Ed25519 => &rcgen::PKCS_ED25519,
        }
    }
}

/// Authority settings plus the layout of the on-disk workspace. All paths
/// are derived from `ca_dir`; nothing outside that directory is touched.
#[derive(Debug, Clone)]
pub struct CaConfig {
    pub ca_dir: PathBuf,

    pub root_subject: String,
    pub organization: String,

    pub root_validity_days: i64,
    pub leaf_validity_days: i64,
    pub crl_validity_days: i64,

    pub key_alg: KeyAlgorithm,

    /// First serial handed out by a fresh workspace.
    pub serial_start: u64,
    /// First crlNumber embedded by a fresh workspace.
    pub crl_number_start: u64,
}

impl CaConfig {
    pub fn new(ca_dir: impl Into<PathBuf>) -> Self {
        Self {
            ca_dir: ca_dir.into(),
            root_subject: "Lab CA".to_string(),
            organization: "Lab".to_string(),
            root_validity_days: 3650,
            leaf_validity_days: 825,
            crl_validity_days: 30,
            key_alg: KeyAlgorithm::EcdsaP256,
            serial_start: 1000,
            crl_number_start: 1,
        }
    }

    pub fn private_dir(&self) -> PathBuf {
        self.ca_dir.join("private")
    }

    pub fn certs_dir(&self) -> PathBuf {
        self.ca_dir.join("certs")
    }

    pub fn root_key_path(&self) -> PathBuf {
        self.private_dir().join("ca.key.pem")
    }

    pub fn root_cert_path(&self) -> PathBuf {
        self.ca_dir.join("ca.cert.pem")
    }

    pub fn index_path(&self) -> PathBuf {
        self.ca_dir.join("index.jsonl")
    }

    pub fn serial_path(&self) -> PathBuf {
        self.ca_dir.join("serial")
    }

    pub fn crl_number_path(&self) -> PathBuf {
        self.ca_dir.join("crlnumber")
    }

    pub fn crl_path(&self) -> PathBuf {
        self.ca_dir.join("crl.pem")
    }

    pub fn leaf_key_path(&self, name: &str) -> PathBuf {
        self.private_dir().join(format!("{name}.key.pem"))
    }

    pub fn leaf_cert_path(&self, name: &str) -> PathBuf {
        self.certs_dir().join(format!("{name}.cert.pem"))
    }

    pub fn is_initialized(&self) -> bool {
        self.root_key_path().exists() && self.root_cert_path().exists()
    }
}
