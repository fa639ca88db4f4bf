//! HTTPS backend.
//!
//! Sends requests with a blocking `ureq` agent. Failure statuses come back
//! as ordinary responses so the client can read the error body.

use crate::backend::{ApiRequest, ApiResponse, Backend, Method};
use crate::config::ClientConfig;
use crate::error::Result;
use ureq::tls::TlsConfig;
use ureq::{Agent, RequestBuilder};

/// HTTPS backend.
///
/// # Example
///
/// ```no_run
/// use morpheus_api::backend::http::HttpBackend;
/// use morpheus_api::backend::{ApiRequest, Backend, Method};
/// use morpheus_api::ClientConfig;
///
/// let config = ClientConfig::from_env().unwrap();
/// let backend = HttpBackend::new(&config);
/// let response = backend.send(&ApiRequest::new(Method::Get, "/api/whoami")).unwrap();
/// println!("{}", response.body);
/// ```
pub struct HttpBackend {
    agent: Agent,
    base_url: String,
    authorization: String,
}

impl HttpBackend {
    #[must_use]
    pub fn new(config: &ClientConfig) -> Self {
        let agent_config = Agent::config_builder()
            .http_status_as_error(false)
            .tls_config(TlsConfig::builder().disable_verification(!config.verify_ssl).build())
            .build();
        Self {
            agent: Agent::new_with_config(agent_config),
            base_url: config.base_url(),
            authorization: format!("Bearer {}", config.token),
        }
    }

    /// Get the base URL requests go to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn prepare<B>(&self, builder: RequestBuilder<B>, request: &ApiRequest) -> RequestBuilder<B> {
        let mut builder = builder.header("Authorization", self.authorization.as_str());
        for (key, value) in &request.query {
            builder = builder.query(key, value);
        }
        builder
    }
}

impl Backend for HttpBackend {
    fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let url = format!("{}{}", self.base_url, request.path);

        let response = match request.method {
            Method::Get => self.prepare(self.agent.get(&url), request).call(),
            Method::Delete => self.prepare(self.agent.delete(&url), request).call(),
            Method::Post | Method::Put => {
                let builder = if request.method == Method::Post {
                    self.agent.post(&url)
                } else {
                    self.agent.put(&url)
                };
                let builder = self.prepare(builder, request);
                match &request.body {
                    Some(body) => {
                        log::trace!("HTTP REQUEST {body}");
                        builder.send_json(body)
                    }
                    None => builder.send_empty(),
                }
            }
        };

        let mut response = response?;
        let status = response.status().as_u16();
        let body = response.body_mut().read_to_string()?;
        log::debug!("HTTP {} {}{} [{status}]", request.method, self.base_url, request.target());
        log::trace!("HTTP RESPONSE {body}");

        Ok(ApiResponse { status, body })
    }
}
