use std::{sync::OnceLock, time::Duration};

use reqwest::Client;
use tracing::{debug, warn};

/// User agent sent with every outbound request (GitHub rejects requests without one).
pub const USER_AGENT: &str = concat!("release-watch/", env!("CARGO_PKG_VERSION"));

pub fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
            // Another crate may have installed one first.
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

/// Build an HTTP client whose requests time out after `timeout`.
pub fn build_client(timeout: Duration) -> Client {
    install_rustls_provider();
    match Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
    {
        Ok(client) => client,
        Err(error) => {
            warn!(error = %error, "Failed to build HTTP client; falling back to reqwest defaults");
            Client::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_is_idempotent() {
        install_rustls_provider();
        install_rustls_provider();
        let _client = build_client(Duration::from_secs(5));
    }

    #[test]
    fn test_user_agent() {
        assert!(USER_AGENT.starts_with("release-watch/"));
    }
}
