use crate::{
    client::{
        ConohaClient,
        Service,
    },
    error::Result,
    usage::{
        UsageSample,
        UsageSeries,
    },
};
use serde::Deserialize;

#[derive(Deserialize)]
struct RequestsResponse {
    request: UsageSeries,
}

#[derive(Deserialize)]
struct SizeResponse {
    size: UsageSeries,
}

impl ConohaClient {
    /// Request counts against the object storage, one field per method.
    pub async fn object_storage_requests(&self) -> Result<UsageSample> {
        let response: RequestsResponse = self.get_json(Service::Account, "/object-storage/rrd/request").await?;
        response.request.sample(self.usage_row_offset())
    }

    /// Bytes stored in the object storage.
    pub async fn object_storage_usage(&self) -> Result<UsageSample> {
        let response: SizeResponse = self.get_json(Service::Account, "/object-storage/rrd/size").await?;
        response.size.sample(self.usage_row_offset())
    }
}
