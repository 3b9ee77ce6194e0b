use std::path::{Path, PathBuf};

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{ClientBuilder, Identity};

use crate::auth::token::TokenClaims;
use crate::config::ClientConfig;
use crate::error::D1Error;
use crate::types::Subject;

const PEM_CERTIFICATE: &str = "-----BEGIN CERTIFICATE-----";
const PEM_PRIVATE_KEY: &str = "PRIVATE KEY-----";

/// How requests authenticate against DataONE nodes.
#[derive(Clone, Default)]
pub enum Credentials {
    /// No authentication, only public content is visible.
    #[default]
    Anonymous,
    /// A bearer token issued by the coordinating nodes.
    Token(String),
    /// An X.509 client certificate with its private key, PEM encoded.
    Certificate { pem: Vec<u8>, path: Option<PathBuf> },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Anonymous => write!(f, "Anonymous"),
            Credentials::Token(_) => write!(f, "Token(***)"),
            Credentials::Certificate { path, .. } => {
                f.debug_struct("Certificate").field("path", path).finish()
            }
        }
    }
}

impl Credentials {
    pub fn from_token(token: impl Into<String>) -> Result<Self, D1Error> {
        let token = token.into().trim().to_string();
        if token.is_empty() {
            return Err(D1Error::client_message("Authentication token is empty"));
        }
        Ok(Credentials::Token(token))
    }

    /// Reads a PEM file holding a certificate and its private key, such as
    /// the one downloaded from the CILogon service.
    pub fn from_certificate_file(path: impl AsRef<Path>) -> Result<Self, D1Error> {
        let path = path.as_ref();
        let pem = std::fs::read(path).map_err(|e| {
            D1Error::client_side(format!("Could not read certificate {path:?}"), Some(e))
        })?;

        Self::from_pem(pem, Some(path.to_path_buf()))
    }

    pub fn from_pem(pem: Vec<u8>, path: Option<PathBuf>) -> Result<Self, D1Error> {
        let text = String::from_utf8_lossy(&pem);
        if !text.contains(PEM_CERTIFICATE) || !text.contains(PEM_PRIVATE_KEY) {
            return Err(D1Error::client_message(format!(
                "Certificate {} must contain a certificate and a private key",
                path.as_deref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "<memory>".into())
            )));
        }

        Ok(Credentials::Certificate { pem, path })
    }

    /// Where CILogon style tools place the session certificate,
    /// `/tmp/x509up_u<uid>`.
    #[cfg(unix)]
    pub fn default_certificate_path() -> Option<PathBuf> {
        let uid = nix::unistd::getuid();
        Some(PathBuf::from(format!("/tmp/x509up_u{uid}")))
    }

    #[cfg(not(unix))]
    pub fn default_certificate_path() -> Option<PathBuf> {
        None
    }

    /// Picks credentials from the configuration.
    ///
    /// A token wins over a configured certificate path, which wins over the
    /// default certificate location. Without any of these the client is
    /// anonymous.
    pub fn discover(config: &ClientConfig) -> Result<Self, D1Error> {
        if let Some(token) = config.auth_token.as_deref().filter(|t| !t.trim().is_empty()) {
            tracing::debug!("authenticating with a bearer token");
            return Self::from_token(token);
        }

        if let Some(path) = &config.cert_path {
            tracing::debug!(path = ?path, "authenticating with a client certificate");
            return Self::from_certificate_file(path);
        }

        if let Some(path) = Self::default_certificate_path().filter(|p| p.is_file()) {
            match Self::from_certificate_file(&path) {
                Ok(credentials) => {
                    tracing::debug!(path = ?path, "using the default client certificate");
                    return Ok(credentials);
                }
                Err(e) => tracing::warn!(path = ?path, error = %e, "ignoring default certificate"),
            }
        }

        Ok(Credentials::Anonymous)
    }

    /// Configures a client builder to send these credentials.
    ///
    /// Tokens go into the default headers, certificates become the TLS
    /// identity.
    pub fn apply(
        &self,
        builder: ClientBuilder,
        headers: &mut HeaderMap,
    ) -> Result<ClientBuilder, D1Error> {
        match self {
            Credentials::Anonymous => Ok(builder),
            Credentials::Token(token) => {
                let mut value = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
                    D1Error::client_side("Token contains invalid header characters", Some(e))
                })?;
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
                Ok(builder)
            }
            Credentials::Certificate { pem, .. } => {
                let identity = Identity::from_pem(pem).map_err(|e| {
                    D1Error::client_side("Could not load the client certificate", Some(e))
                })?;
                Ok(builder.use_rustls_tls().identity(identity))
            }
        }
    }

    /// The subject named by a token. Certificates and anonymous access
    /// return `None`; ask a node with `echo_credentials` instead.
    pub fn subject(&self) -> Option<Subject> {
        match self {
            Credentials::Token(token) => TokenClaims::decode(token).ok()?.subject(),
            _ => None,
        }
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Credentials::Anonymous)
    }
}
