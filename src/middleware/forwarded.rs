//! Base-URL reconstruction for requests arriving through a reverse proxy.

use http::HeaderMap;

use crate::config::ServerConfig;

/// Reconstruct the externally visible base URL of a request.
///
/// `server.public_base_url` wins when configured. Otherwise the URL is
/// rebuilt from `x-{prefix}forwarded-proto` / `-host` / `-port` headers
/// (the prefix comes from `server.forwarded_header_prefix`), falling back
/// to the `Host` header. Standard ports are elided.
pub fn forwarded_base_url(headers: &HeaderMap, config: &ServerConfig) -> String {
    if let Some(base) = &config.public_base_url {
        return base.clone();
    }

    let prefix = &config.forwarded_header_prefix;
    let forwarded = |name: &str| {
        headers
            .get(format!("x-{}{}", prefix, name))
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    let protocol = forwarded("forwarded-proto").unwrap_or_else(|| "http".to_string());

    // Use the default for the protocol, then override with the forwarded
    // port if supplied.
    let default_port = if protocol == "https" { "443" } else { "80" };
    let port = forwarded("forwarded-port").unwrap_or_else(|| default_port.to_string());

    let host = forwarded("forwarded-host")
        .or_else(|| {
            headers
                .get(http::header::HOST)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        })
        .unwrap_or_default();

    let is_standard_port =
        (protocol == "https" && port == "443") || (protocol == "http" && port == "80");

    // Host headers may already carry a port.
    if is_standard_port || host.contains(':') {
        format!("{}://{}", protocol, host)
    } else {
        format!("{}://{}:{}", protocol, host, port)
    }
}
