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
use serde::{
    Deserialize,
    Serialize,
};
use url::form_urlencoded;

/// A compute instance together with its attached network interfaces.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Server {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub interfaces: Vec<Interface>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Interface {
    pub port_id: String,
    pub mac_addr: String,
    #[serde(default)]
    pub net_id: Option<String>,
    #[serde(default)]
    pub port_state: Option<String>,
}

#[derive(Deserialize)]
struct ServersResponse {
    servers: Vec<ServerSummary>,
}

#[derive(Deserialize)]
struct ServerSummary {
    id: String,
    name: String,
}

#[derive(Deserialize)]
struct InterfacesResponse {
    #[serde(rename = "interfaceAttachments")]
    interface_attachments: Vec<Interface>,
}

#[derive(Deserialize)]
struct CpuResponse {
    cpu: UsageSeries,
}

#[derive(Deserialize)]
struct DiskResponse {
    disk: UsageSeries,
}

#[derive(Deserialize)]
struct InterfaceResponse {
    interface: UsageSeries,
}

impl ConohaClient {
    /// Lists every compute instance and fetches the interfaces of each.
    pub async fn servers(&self) -> Result<Vec<Server>> {
        let response: ServersResponse = self.get_json(Service::Compute, "/servers").await?;

        let mut servers = Vec::with_capacity(response.servers.len());
        for summary in response.servers {
            let interfaces = self.server_interfaces(&summary.id).await?;
            servers.push(Server {
                id: summary.id,
                name: summary.name,
                interfaces,
            });
        }
        Ok(servers)
    }

    pub async fn server_interfaces(&self, server_id: &str) -> Result<Vec<Interface>> {
        let response: InterfacesResponse = self
            .get_json(Service::Compute, &format!("/servers/{server_id}/os-interface"))
            .await?;
        Ok(response.interface_attachments)
    }

    /// CPU usage of the instance, field `value`.
    pub async fn cpu_usage(&self, server: &Server) -> Result<UsageSample> {
        let response: CpuResponse = self
            .get_json(Service::Compute, &format!("/servers/{}/rrd/cpu", server.id))
            .await?;
        response.cpu.sample(self.usage_row_offset())
    }

    /// Disk throughput of the instance, fields `read` and `write`.
    pub async fn disk_usage(&self, server: &Server) -> Result<UsageSample> {
        let response: DiskResponse = self
            .get_json(Service::Compute, &format!("/servers/{}/rrd/disk", server.id))
            .await?;
        response.disk.sample(self.usage_row_offset())
    }

    /// Traffic on one interface of the instance, fields `rx` and `tx`.
    pub async fn interface_usage(&self, server: &Server, interface: &Interface) -> Result<UsageSample> {
        let path = interface_usage_path(&server.id, &interface.port_id);
        let response: InterfaceResponse = self.get_json(Service::Compute, &path).await?;
        response.interface.sample(self.usage_row_offset())
    }
}

fn interface_usage_path(server_id: &str, port_id: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("port_id", port_id)
        .finish();
    format!("/servers/{server_id}/rrd/interface?{query}")
}
