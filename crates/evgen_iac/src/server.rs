//! Base URL resolution from the spec's `servers` list.

use tracing::debug;

use evgen_spec::{ApiSpecification, Server};

use crate::error::{IacError, IacResult};

/// Select the base URL every destination of a compilation run invokes.
///
/// With an environment, the first server whose description matches it
/// (case-insensitive) is used; otherwise the first server with a URL. An empty
/// environment counts as no environment. One trailing `/` is stripped.
pub fn resolve_base_url(spec: &ApiSpecification, environment: Option<&str>) -> IacResult<String> {
    let url = match environment.filter(|env| !env.is_empty()) {
        Some(env) => find_environment(&spec.servers, env)
            .and_then(Server::usable_url)
            .ok_or_else(|| IacError::EnvironmentNotFound(env.to_string()))?,
        None => spec
            .servers
            .iter()
            .find_map(Server::usable_url)
            .ok_or(IacError::NoServersDefined)?,
    };

    let base_url = url.strip_suffix('/').unwrap_or(url);
    debug!("Resolved base URL {}", base_url);
    Ok(base_url.to_string())
}

fn find_environment<'a>(servers: &'a [Server], environment: &str) -> Option<&'a Server> {
    let wanted = environment.to_lowercase();
    servers.iter().find(|server| {
        server
            .description
            .as_deref()
            .is_some_and(|description| description.to_lowercase() == wanted)
    })
}
