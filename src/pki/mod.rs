pub mod authority;
pub mod store;

pub use authority::{CaState, CaStatus, CertificateAuthority, IssuedCertificate};
