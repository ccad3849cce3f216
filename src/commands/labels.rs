use crate::cli::LabelArgs;
use crate::context::Session;
use crate::error::DipResult;
use crate::traefik::render_labels;

use super::Outcome;

/// Prints the label block only, so the output can be piped or pasted.
pub fn traefik_label(session: &Session<'_>, args: &LabelArgs) -> DipResult<Outcome> {
    let labels = render_labels(&args.app_name, &args.domain, args.port)?;
    session.output.data(&labels.render(args.format));
    Ok(Outcome::done())
}
