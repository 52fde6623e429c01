use reqwest::{Client, ClientBuilder};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;
use crate::error::DrugPredictError;

/// Hosts every client may reach regardless of configuration.
const DEFAULT_ALLOWED_HOSTS: &[&str] = &[
    "www.ebi.ac.uk", // ChEMBL
    "localhost",
    "127.0.0.1",
];

/// An HTTP client capped to an allowlist of hosts.
///
/// Every outbound request of the pipeline goes through this type, so a
/// misconfigured base URL fails loudly instead of leaking queries.
#[derive(Debug, Clone)]
pub struct SandboxClient {
    client: Client,
    allowlist: HashSet<String>,
}

impl SandboxClient {
    /// Creates a client with the default allowlist and a 30 second timeout.
    pub fn new() -> Result<Self, DrugPredictError> {
        Self::with_timeout(Duration::from_secs(30))
    }

    /// Creates a client with the default allowlist and the given request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, DrugPredictError> {
        let allowlist = DEFAULT_ALLOWED_HOSTS.iter().map(|d| d.to_string()).collect();

        let client = ClientBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("drugpredict/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DrugPredictError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, allowlist })
    }

    /// Appends an exact hostname to the allowlist.
    pub fn allow_domain(&mut self, domain: &str) {
        self.allowlist.insert(domain.to_string());
    }

    /// Allows the host of `base_url`, e.g. a self-hosted ChEMBL mirror.
    pub fn allow_url_host(&mut self, base_url: &str) -> Result<(), DrugPredictError> {
        let parsed = Url::parse(base_url)
            .map_err(|e| DrugPredictError::Config(format!("Invalid URL {}: {}", base_url, e)))?;
        match parsed.host_str() {
            Some(host) => {
                self.allow_domain(host);
                Ok(())
            }
            None => Err(DrugPredictError::Config(format!("URL has no host: {}", base_url))),
        }
    }

    /// Validates if a URL is permitted under the current policy.
    pub fn is_allowed(&self, url: &str) -> bool {
        if let Ok(parsed) = Url::parse(url) {
            if let Some(host) = parsed.host_str() {
                // Exact match or a subdomain of an allowed host
                for allowed in &self.allowlist {
                    if host == allowed || host.ends_with(&format!(".{}", allowed)) {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// GET request builder for an allowed URL.
    pub fn get(&self, url: &str) -> Result<reqwest::RequestBuilder, DrugPredictError> {
        self.check(url)?;
        Ok(self.client.get(url))
    }

    /// POST request builder for an allowed URL.
    pub fn post(&self, url: &str) -> Result<reqwest::RequestBuilder, DrugPredictError> {
        self.check(url)?;
        Ok(self.client.post(url))
    }

    fn check(&self, url: &str) -> Result<(), DrugPredictError> {
        if !self.is_allowed(url) {
            return Err(DrugPredictError::Security(format!(
                "Network capabilities capped: domain not in allowlist for URL {}",
                url
            )));
        }
        Ok(())
    }
}
