use crate::cli::MkcertArgs;
use crate::context::Session;
use crate::error::DipResult;
use crate::pki::CertificateAuthority;

use super::Outcome;

pub fn mkcert(session: &Session<'_>, args: &MkcertArgs) -> DipResult<Outcome> {
    let authority = CertificateAuthority::new(session.ctx.certs_dir());
    let issued = authority.issue_certificate(&args.domain)?;

    let output = &session.output;
    if issued.ca.created {
        output.success("Created local certificate authority");
        output.info(&format!(
            "Trust this CA once to accept every dip certificate: {}",
            issued.ca.cert_path.display()
        ));
    }

    output.success(&format!(
        "Certificate for {} ({})",
        issued.domain_pattern,
        issued.subject_alt_names.join(", ")
    ));
    output.data(&format!("  cert: {}", issued.cert_path.display()));
    output.data(&format!("  key:  {}", issued.key_path.display()));
    output.detail(&format!("Valid until {}", issued.not_after.date()));
    Ok(Outcome::done())
}
