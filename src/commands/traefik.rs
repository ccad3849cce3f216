use crate::cli::TraefikAction;
use crate::context::Session;
use crate::error::DipResult;
use crate::traefik::proxy;

use super::Outcome;

pub async fn traefik(session: &Session<'_>, action: TraefikAction) -> DipResult<Outcome> {
    match action {
        TraefikAction::Start => proxy::start(session).await?,
        TraefikAction::Stop => proxy::stop(session).await?,
        TraefikAction::Restart => proxy::restart(session).await?,
        TraefikAction::Status => proxy::status(session).await?,
        TraefikAction::Reset => proxy::reset(session).await?,
    }
    Ok(Outcome::done())
}
