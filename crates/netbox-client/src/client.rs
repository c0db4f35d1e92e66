//! NetBox API client
//!
//! Implements the capability traits over the NetBox REST API:
//! /api/virtualization/clusters/, /api/dcim/{devices,sites,interfaces}/,
//! /api/ipam/{ip-addresses,prefixes}/ and /api/extras/tags/.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tracing::debug;

use crate::common::query::query_resources;
use crate::common::HttpClient;
use crate::error::NetBoxError;
use crate::models::*;
use crate::netbox_trait::{Dcim, Extras, Ipam, NetBox, NetBoxConnector, Virtualization};

/// NetBox API client
#[derive(Debug, Clone)]
pub struct NetBoxClient {
    http: HttpClient,
}

impl NetBoxClient {
    /// Create a new NetBox client
    ///
    /// # Arguments
    /// * `base_url` - NetBox base URL (e.g., "https://netbox.example")
    /// * `token` - API token for authentication
    pub fn new(base_url: String, token: String) -> Result<Self, NetBoxError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(Self {
            http: HttpClient::new(client, base_url, token),
        })
    }

    async fn get_site(&self, id: u64) -> Result<Site, NetBoxError> {
        self.http.get(&format!("/api/dcim/sites/{}/", id)).await
    }
}

/// Returns the only element of `items`, or an error naming the query
fn exactly_one<T>(mut items: Vec<T>, kind: &'static str, query: &str) -> Result<T, NetBoxError> {
    match items.len() {
        0 => Err(NetBoxError::NotFound(format!("{} {}", kind, query))),
        1 => Ok(items.remove(0)),
        count => Err(NetBoxError::MultipleResults {
            kind,
            query: query.to_string(),
            count,
        }),
    }
}

#[async_trait::async_trait]
impl Virtualization for NetBoxClient {
    async fn get_clusters_by_name_region_type(
        &self,
        name: &str,
        region: &str,
        cluster_type: &str,
    ) -> Result<Vec<Cluster>, NetBoxError> {
        debug!("Querying clusters name={:?} region={:?} type={:?}", name, region, cluster_type);
        query_resources(
            &self.http,
            "virtualization/clusters",
            &[("name", name), ("region", region), ("type", cluster_type)],
        )
        .await
    }
}

#[async_trait::async_trait]
impl Dcim for NetBoxClient {
    async fn get_devices_by_cluster_id(&self, cluster_id: u64) -> Result<Vec<Device>, NetBoxError> {
        let id = cluster_id.to_string();
        query_resources(&self.http, "dcim/devices", &[("cluster_id", id.as_str())]).await
    }

    async fn get_region_for_device(&self, device: &Device) -> Result<String, NetBoxError> {
        let site = self.get_site(device.site.id).await?;
        site.region.map(|r| r.slug).ok_or_else(|| {
            NetBoxError::NotFound(format!(
                "region for site {} of device {}",
                site.slug,
                device.name()
            ))
        })
    }

    async fn get_device_by_name(&self, name: &str) -> Result<Device, NetBoxError> {
        let devices = query_resources(&self.http, "dcim/devices", &[("name", name)]).await?;
        exactly_one(devices, "devices", name)
    }

    async fn get_interfaces_for_device(&self, device: &Device) -> Result<Vec<Interface>, NetBoxError> {
        let id = device.id.to_string();
        query_resources(&self.http, "dcim/interfaces", &[("device_id", id.as_str())]).await
    }

    async fn update_device(&self, id: u64, request: &UpdateDeviceRequest) -> Result<Device, NetBoxError> {
        self.http
            .patch(&format!("/api/dcim/devices/{}/", id), request)
            .await
    }
}

#[async_trait::async_trait]
impl Ipam for NetBoxClient {
    async fn get_ip_address_by_address(&self, address: &str) -> Result<Option<IPAddress>, NetBoxError> {
        let addresses = query_resources(&self.http, "ipam/ip-addresses", &[("address", address)]).await?;
        match exactly_one(addresses, "ip addresses", address) {
            Ok(ip) => Ok(Some(ip)),
            Err(NetBoxError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create_ip_address(&self, request: &CreateIPAddressRequest) -> Result<IPAddress, NetBoxError> {
        self.http.post("/api/ipam/ip-addresses/", request).await
    }

    async fn get_prefixes_by_prefix(&self, prefix: &str) -> Result<Vec<Prefix>, NetBoxError> {
        query_resources(&self.http, "ipam/prefixes", &[("prefix", prefix)]).await
    }

    async fn get_prefixes_by_region_role(&self, region: &str, role: &str) -> Result<Vec<Prefix>, NetBoxError> {
        query_resources(&self.http, "ipam/prefixes", &[("region", region), ("role", role)]).await
    }
}

#[async_trait::async_trait]
impl Extras for NetBoxClient {
    async fn get_tags(&self) -> Result<Vec<NestedTag>, NetBoxError> {
        query_resources(&self.http, "extras/tags", &[]).await
    }
}

impl NetBox for NetBoxClient {
    fn base_url(&self) -> &str {
        self.http.base_url()
    }
}

/// Connects to NetBox over HTTP
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpConnector;

impl NetBoxConnector for HttpConnector {
    fn connect(&self, url: &str, token: &str) -> Result<Arc<dyn NetBox>, NetBoxError> {
        if url.is_empty() {
            return Err(NetBoxError::InvalidRequest("netbox url is empty".to_string()));
        }
        let client = NetBoxClient::new(url.to_string(), token.to_string())?;
        Ok(Arc::new(client))
    }
}
