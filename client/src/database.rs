use crate::{
    client::{
        ConohaClient,
        Service,
    },
    error::Result,
};
use serde::{
    Deserialize,
    Serialize,
};

/// A hosted database. Sizes are reported in GB.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Database {
    pub database_id: String,
    pub db_name: String,
    pub db_size: f64,
    pub service_id: String,
    pub status: String,
    #[serde(default, rename = "type")]
    pub db_type: Option<String>,
    #[serde(default)]
    pub charset: Option<String>,
    #[serde(default)]
    pub memo: Option<String>,
    #[serde(default)]
    pub internal_hostname: Option<String>,
    #[serde(default)]
    pub external_hostname: Option<String>,
}

/// Storage quota of a database service, in GB.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Quota {
    pub total_usage: f64,
    pub quota: f64,
}

#[derive(Deserialize)]
struct DatabaseListResponse {
    databases: Vec<Database>,
}

#[derive(Deserialize)]
struct DatabaseInfoResponse {
    database: Database,
}

#[derive(Deserialize)]
struct DatabaseQuotaResponse {
    quota: Quota,
}

impl ConohaClient {
    pub async fn databases(&self) -> Result<Vec<Database>> {
        let response: DatabaseListResponse = self.get_json(Service::DatabaseHosting, "/databases").await?;
        Ok(response.databases)
    }

    /// Single database record; the list endpoint may lag behind on `db_size`.
    pub async fn database(&self, database_id: &str) -> Result<Database> {
        let response: DatabaseInfoResponse = self
            .get_json(Service::DatabaseHosting, &format!("/databases/{database_id}"))
            .await?;
        Ok(response.database)
    }

    pub async fn database_quota(&self, service_id: &str) -> Result<Quota> {
        let response: DatabaseQuotaResponse = self
            .get_json(Service::DatabaseHosting, &format!("/services/{service_id}/quotas"))
            .await?;
        Ok(response.quota)
    }
}
