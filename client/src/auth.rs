use crate::error::{
    ClientError,
    Result,
};
use chrono::prelude::*;
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fmt,
    time::Duration,
};
use tokio::sync::Mutex;
use url::Url;

/// A time-bounded access token. Replaced wholesale on renewal, never mutated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credential {
    id: String,
    expires_at: DateTime<Utc>,
}

impl Credential {
    pub fn new(id: impl ToString, expires_at: DateTime<Utc>) -> Self {
        Self {
            id: id.to_string(),
            expires_at,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// True once the credential expires within `margin` of `now`.
    pub fn needs_renewal(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        let deadline = chrono::TimeDelta::from_std(margin)
            .ok()
            .and_then(|margin| now.checked_add_signed(margin));
        match deadline {
            Some(deadline) => self.expires_at < deadline,
            None => true,
        }
    }
}

/// Tenant-scoped API user used for the password grant.
#[derive(Clone)]
pub struct PasswordCredentials {
    pub tenant_id: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for PasswordCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordCredentials")
            .field("tenant_id", &self.tenant_id)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

// -=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-
// Identity wire format

#[derive(Serialize)]
struct TokenRequest<'a> {
    auth: TokenRequestAuth<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenRequestAuth<'a> {
    password_credentials: TokenRequestPassword<'a>,
    tenant_id: &'a str,
}

#[derive(Serialize)]
struct TokenRequestPassword<'a> {
    username: &'a str,
    password: &'a str,
}

impl<'a> From<&'a PasswordCredentials> for TokenRequest<'a> {
    fn from(credentials: &'a PasswordCredentials) -> Self {
        Self {
            auth: TokenRequestAuth {
                password_credentials: TokenRequestPassword {
                    username: &credentials.username,
                    password: &credentials.password,
                },
                tenant_id: &credentials.tenant_id,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    access: Access,
}

#[derive(Debug, Deserialize)]
struct Access {
    token: Token,
    #[serde(rename = "serviceCatalog", default)]
    service_catalog: ServiceCatalog,
}

#[derive(Debug, Deserialize)]
struct Token {
    id: String,
    expires: DateTime<Utc>,
}

pub type ServiceCatalog = Vec<CatalogEntry>;

/// One logical service of the identity service catalog.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CatalogEntry {
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub endpoints: Vec<CatalogEndpoint>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CatalogEndpoint {
    pub region: String,
    #[serde(rename = "publicURL")]
    pub public_url: String,
}

// -=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-=-

/// Owns the current [`Credential`] and renews it before it runs out.
///
/// The credential slot is guarded by an async mutex that is held for the whole
/// identity exchange, so concurrent callers never race two renewals and always
/// observe either the old or the new credential.
pub struct TokenManager {
    http: reqwest::Client,
    identity_url: Url,
    credentials: PasswordCredentials,
    renewal_margin: Duration,
    current: Mutex<Option<Credential>>,
}

impl fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenManager")
            .field("identity_url", &self.identity_url.as_str())
            .field("credentials", &self.credentials)
            .field("renewal_margin", &self.renewal_margin)
            .finish_non_exhaustive()
    }
}

impl TokenManager {
    pub fn new(
        http: reqwest::Client,
        identity_url: Url,
        credentials: PasswordCredentials,
        renewal_margin: Duration,
    ) -> Self {
        Self {
            http,
            identity_url,
            credentials,
            renewal_margin,
            current: Mutex::new(None),
        }
    }

    /// `https://identity.<region>.<domain>/v2.0/tokens`
    pub fn identity_url_for(region: &str, provider_domain: &str) -> Result<Url> {
        let raw = format!("https://identity.{region}.{provider_domain}/v2.0/tokens");
        Url::parse(&raw).map_err(|err| ClientError::auth(raw, err))
    }

    pub fn identity_url(&self) -> &Url {
        &self.identity_url
    }

    /// Unconditionally performs an identity exchange, stores the new credential
    /// and hands back the service catalog from the response.
    pub async fn authenticate(&self) -> Result<ServiceCatalog> {
        let mut current = self.current.lock().await;
        let response = self.exchange().await?;
        let credential = Credential::new(response.access.token.id, response.access.token.expires);
        info!(expires_at = %credential.expires_at(), "obtained token");
        *current = Some(credential);
        Ok(response.access.service_catalog)
    }

    /// Returns a credential that stays valid for at least the renewal margin,
    /// renewing it first if necessary.
    ///
    /// A failed renewal leaves the stored credential untouched; the next call
    /// starts over with a fresh exchange.
    pub async fn ensure_valid(&self) -> Result<Credential> {
        let mut current = self.current.lock().await;
        if let Some(credential) = current.as_ref() {
            if !credential.needs_renewal(Utc::now(), self.renewal_margin) {
                return Ok(credential.clone());
            }
            info!(expires_at = %credential.expires_at(), "renewing token");
        } else {
            debug!("no token yet, requesting one");
        }

        let response = self.exchange().await?;
        let credential = Credential::new(response.access.token.id, response.access.token.expires);
        info!(expires_at = %credential.expires_at(), "renewed token");
        *current = Some(credential.clone());
        Ok(credential)
    }

    /// The stored credential, regardless of its remaining lifetime.
    pub async fn current(&self) -> Option<Credential> {
        self.current.lock().await.clone()
    }

    async fn exchange(&self) -> Result<TokenResponse> {
        let url = self.identity_url.as_str();
        trace!(url, username = %self.credentials.username, "POST token");

        let response = self
            .http
            .post(self.identity_url.clone())
            .json(&TokenRequest::from(&self.credentials))
            .send()
            .await
            .map_err(|err| ClientError::auth(url, err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::auth(url, format!("identity endpoint returned {status}")));
        }

        let body = response.bytes().await.map_err(|err| ClientError::auth(url, err))?;
        let token: TokenResponse = serde_json::from_slice(&body)
            .map_err(|err| ClientError::auth(url, format!("malformed token response: {err}")))?;

        if token.access.token.id.is_empty() {
            return Err(ClientError::auth(url, "token response carries an empty token id"));
        }

        Ok(token)
    }
}
