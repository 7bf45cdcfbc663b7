use crate::{
    auth::{
        PasswordCredentials,
        ServiceCatalog,
        TokenManager,
    },
    error::{
        ClientError,
        Result,
    },
};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use std::time::Duration;
use url::Url;

pub const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";

/// Default number of rows counted back from the end of a usage series.
pub const DEFAULT_USAGE_ROW_OFFSET: usize = 3;

/// Default lead time before expiry at which the token is renewed.
pub const DEFAULT_RENEWAL_MARGIN: Duration = Duration::from_secs(60);

/// Upstream services this exporter talks to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Service {
    Account,
    Compute,
    DatabaseHosting,
}

impl Service {
    pub const ALL: [Service; 3] = [Service::Account, Service::Compute, Service::DatabaseHosting];

    /// The `type` the service is registered under in the service catalog.
    pub fn catalog_type(&self) -> &'static str {
        match self {
            Service::Account => "account",
            Service::Compute => "compute",
            Service::DatabaseHosting => "databasehosting",
        }
    }
}

/// Region-specific base URLs resolved once from the service catalog.
#[derive(Clone, Debug, PartialEq)]
pub struct ServiceEndpoints {
    pub account: Url,
    pub compute: Url,
    pub database_hosting: Url,
}

impl ServiceEndpoints {
    pub fn resolve(catalog: &ServiceCatalog, region: &str) -> Result<Self> {
        let find = |service: Service| -> Result<Url> {
            let public_url = catalog
                .iter()
                .filter(|entry| entry.service_type == service.catalog_type())
                .flat_map(|entry| entry.endpoints.iter())
                .find(|endpoint| endpoint.region == region)
                .map(|endpoint| endpoint.public_url.as_str())
                .ok_or_else(|| ClientError::MissingEndpoint {
                    service: service.catalog_type().to_string(),
                    region: region.to_string(),
                })?;
            Url::parse(public_url).map_err(|err| {
                ClientError::auth(public_url, format!("catalog lists an invalid {service:?} URL: {err}"))
            })
        };

        Ok(Self {
            account: find(Service::Account)?,
            compute: find(Service::Compute)?,
            database_hosting: find(Service::DatabaseHosting)?,
        })
    }

    pub fn base(&self, service: Service) -> &Url {
        match service {
            Service::Account => &self.account,
            Service::Compute => &self.compute,
            Service::DatabaseHosting => &self.database_hosting,
        }
    }

    /// Appends `path` to the service base. Public URLs carry the tenant id as
    /// their last segment, so this is plain concatenation rather than
    /// [`Url::join`].
    pub fn url(&self, service: Service, path: &str) -> String {
        let base = self.base(service).as_str().trim_end_matches('/');
        format!("{base}{path}")
    }
}

/// Everything needed to authenticate and reach the resource endpoints.
#[derive(Clone, Debug)]
pub struct ClientOptions {
    pub region: String,
    pub provider_domain: String,
    /// Overrides the identity URL derived from region and provider domain.
    pub identity_url: Option<Url>,
    pub credentials: PasswordCredentials,
    pub renewal_margin: Duration,
    /// `None` keeps the HTTP stack default, which never times out.
    pub request_timeout: Option<Duration>,
    pub usage_row_offset: usize,
}

impl ClientOptions {
    pub fn new(region: impl ToString, credentials: PasswordCredentials) -> Self {
        Self {
            region: region.to_string(),
            provider_domain: "conoha.io".to_string(),
            identity_url: None,
            credentials,
            renewal_margin: DEFAULT_RENEWAL_MARGIN,
            request_timeout: None,
            usage_row_offset: DEFAULT_USAGE_ROW_OFFSET,
        }
    }
}

/// HTTP client that attaches a valid token to every resource request.
#[derive(Debug)]
pub struct ConohaClient {
    http: reqwest::Client,
    tokens: TokenManager,
    endpoints: ServiceEndpoints,
    usage_row_offset: usize,
}

impl ConohaClient {
    /// Authenticates and resolves the service endpoints for the configured region.
    pub async fn connect(options: ClientOptions) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(ClientError::HttpClient)?;

        let identity_url = match options.identity_url {
            Some(url) => url,
            None => TokenManager::identity_url_for(&options.region, &options.provider_domain)?,
        };

        let tokens = TokenManager::new(http.clone(), identity_url, options.credentials, options.renewal_margin);
        let catalog = tokens.authenticate().await?;
        let endpoints = ServiceEndpoints::resolve(&catalog, &options.region)?;

        debug!(
            account = %endpoints.account,
            compute = %endpoints.compute,
            database_hosting = %endpoints.database_hosting,
            "resolved service endpoints"
        );

        Ok(Self::with_parts(http, tokens, endpoints, options.usage_row_offset))
    }

    pub fn with_parts(
        http: reqwest::Client,
        tokens: TokenManager,
        endpoints: ServiceEndpoints,
        usage_row_offset: usize,
    ) -> Self {
        Self {
            http,
            tokens,
            endpoints,
            usage_row_offset,
        }
    }

    pub fn endpoints(&self) -> &ServiceEndpoints {
        &self.endpoints
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    pub fn usage_row_offset(&self) -> usize {
        self.usage_row_offset
    }

    /// GET `path` below the base URL of `service` and return the raw body.
    ///
    /// The token is checked before every request. There is no retry: a
    /// transport failure or a non-success status is returned as is.
    pub async fn get(&self, service: Service, path: &str) -> Result<Bytes> {
        let url = self.endpoints.url(service, path);
        let credential = self.tokens.ensure_valid().await?;

        trace!(%url, "GET");
        let response = self
            .http
            .get(&url)
            .header(AUTH_TOKEN_HEADER, credential.id())
            .send()
            .await
            .map_err(|source| ClientError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status { url, status });
        }

        response
            .bytes()
            .await
            .map_err(|source| ClientError::Transport { url, source })
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, service: Service, path: &str) -> Result<T> {
        let body = self.get(service, path).await?;
        serde_json::from_slice(&body).map_err(|source| ClientError::Decode {
            url: self.endpoints.url(service, path),
            source,
        })
    }
}
