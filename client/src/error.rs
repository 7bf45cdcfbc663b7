use reqwest::StatusCode;

pub type Result<T, E = ClientError> = std::result::Result<T, E>;

#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    /// The password-grant exchange against the identity endpoint failed.
    #[error("authentication against {url} failed: {reason}")]
    Auth { url: String, reason: String },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} returned {status}")]
    Status { url: String, status: StatusCode },

    #[error("response from {url} did not match the expected shape: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to build the HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("service catalog has no {service:?} endpoint for region {region:?}")]
    MissingEndpoint { service: String, region: String },

    #[error("usage series is unusable: {0}")]
    InvalidUsageSeries(String),
}

impl ClientError {
    pub(crate) fn auth(url: impl ToString, reason: impl ToString) -> Self {
        Self::Auth {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }

    /// Network failures and non-success statuses of resource requests.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Status { .. })
    }

    /// The body could not be mapped onto the expected structure.
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. } | Self::InvalidUsageSeries(_))
    }
}
