//! HTTP implementations of the platform clients, built on `reqwest`.
//!
//! Wire paths follow the platform's v1 REST conventions. Create endpoints
//! return the assigned id as the response body; a 409 maps to
//! [`SdkError::HttpConflict`] and a 404 on a lookup maps to `None`.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;

use edgelink_core::models::{
    Addressable, Device, DeviceProfile, DeviceServiceRecord, Event, Schedule, ScheduleEvent,
};
use edgelink_core::SdkError;

use super::{ConfigRegistry, DataClient, MetadataClient};

fn meta_err(err: impl std::fmt::Display) -> SdkError {
    SdkError::MetadataClientFail(err.to_string())
}

fn data_err(err: impl std::fmt::Display) -> SdkError {
    SdkError::DataClientFail(err.to_string())
}

/// Read a create response: the body is the assigned id.
async fn created_id(
    rsp: Response,
    wrap: fn(String) -> SdkError,
) -> Result<String, SdkError> {
    match rsp.status() {
        StatusCode::CONFLICT => Err(SdkError::HttpConflict(rsp.url().path().to_string())),
        status if status.is_success() => rsp.text().await.map_err(|e| wrap(e.to_string())),
        status => Err(wrap(format!("{}: HTTP {status}", rsp.url().path()))),
    }
}

/// Read a lookup response: 404 is an absent record, not an error.
async fn optional_json<T: DeserializeOwned>(
    rsp: Response,
    wrap: fn(String) -> SdkError,
) -> Result<Option<T>, SdkError> {
    match rsp.status() {
        StatusCode::NOT_FOUND => Ok(None),
        status if status.is_success() => {
            rsp.json().await.map(Some).map_err(|e| wrap(e.to_string()))
        }
        status => Err(wrap(format!("{}: HTTP {status}", rsp.url().path()))),
    }
}

async fn expect_success(rsp: Response, wrap: fn(String) -> SdkError) -> Result<(), SdkError> {
    match rsp.status() {
        StatusCode::CONFLICT => Err(SdkError::HttpConflict(rsp.url().path().to_string())),
        status if status.is_success() => Ok(()),
        status => Err(wrap(format!("{}: HTTP {status}", rsp.url().path()))),
    }
}

/// Data service client.
pub struct HttpDataClient {
    client: Client,
    base: String,
}

impl HttpDataClient {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base: base.into(),
        }
    }
}

#[async_trait]
impl DataClient for HttpDataClient {
    async fn ping(&self) -> Result<(), SdkError> {
        let rsp = self
            .client
            .get(format!("{}/api/v1/ping", self.base))
            .send()
            .await
            .map_err(data_err)?;
        expect_success(rsp, SdkError::DataClientFail).await
    }

    async fn add_event(&self, event: &Event) -> Result<(), SdkError> {
        let rsp = self
            .client
            .post(format!("{}/api/v1/event", self.base))
            .json(event)
            .send()
            .await
            .map_err(data_err)?;
        expect_success(rsp, SdkError::DataClientFail).await
    }
}

/// Metadata service client.
pub struct HttpMetadataClient {
    client: Client,
    base: String,
}

impl HttpMetadataClient {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base: base.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{path}", self.base)
    }
}

#[async_trait]
impl MetadataClient for HttpMetadataClient {
    async fn ping(&self) -> Result<(), SdkError> {
        let rsp = self
            .client
            .get(self.url("/ping"))
            .send()
            .await
            .map_err(meta_err)?;
        expect_success(rsp, SdkError::MetadataClientFail).await
    }

    async fn get_addressable(&self, name: &str) -> Result<Option<Addressable>, SdkError> {
        let rsp = self
            .client
            .get(self.url(&format!("/addressable/name/{name}")))
            .send()
            .await
            .map_err(meta_err)?;
        optional_json(rsp, SdkError::MetadataClientFail).await
    }

    async fn create_addressable(&self, addressable: &Addressable) -> Result<String, SdkError> {
        let rsp = self
            .client
            .post(self.url("/addressable"))
            .json(addressable)
            .send()
            .await
            .map_err(meta_err)?;
        created_id(rsp, SdkError::MetadataClientFail).await
    }

    async fn get_device_service(
        &self,
        name: &str,
    ) -> Result<Option<DeviceServiceRecord>, SdkError> {
        let rsp = self
            .client
            .get(self.url(&format!("/deviceservice/name/{name}")))
            .send()
            .await
            .map_err(meta_err)?;
        optional_json(rsp, SdkError::MetadataClientFail).await
    }

    async fn create_device_service(
        &self,
        record: &DeviceServiceRecord,
    ) -> Result<String, SdkError> {
        let rsp = self
            .client
            .post(self.url("/deviceservice"))
            .json(record)
            .send()
            .await
            .map_err(meta_err)?;
        created_id(rsp, SdkError::MetadataClientFail).await
    }

    async fn upload_profile(&self, profile: &DeviceProfile) -> Result<String, SdkError> {
        let rsp = self
            .client
            .post(self.url("/deviceprofile"))
            .json(profile)
            .send()
            .await
            .map_err(meta_err)?;
        created_id(rsp, SdkError::MetadataClientFail).await
    }

    async fn get_profile(&self, name: &str) -> Result<Option<DeviceProfile>, SdkError> {
        let rsp = self
            .client
            .get(self.url(&format!("/deviceprofile/name/{name}")))
            .send()
            .await
            .map_err(meta_err)?;
        optional_json(rsp, SdkError::MetadataClientFail).await
    }

    async fn get_profile_by_id(&self, id: &str) -> Result<Option<DeviceProfile>, SdkError> {
        let rsp = self
            .client
            .get(self.url(&format!("/deviceprofile/{id}")))
            .send()
            .await
            .map_err(meta_err)?;
        optional_json(rsp, SdkError::MetadataClientFail).await
    }

    async fn get_devices(&self, service: &str) -> Result<Vec<Device>, SdkError> {
        let rsp = self
            .client
            .get(self.url(&format!("/device/servicename/{service}")))
            .send()
            .await
            .map_err(meta_err)?;
        Ok(optional_json(rsp, SdkError::MetadataClientFail)
            .await?
            .unwrap_or_default())
    }

    async fn get_device(&self, id: &str) -> Result<Option<Device>, SdkError> {
        let rsp = self
            .client
            .get(self.url(&format!("/device/{id}")))
            .send()
            .await
            .map_err(meta_err)?;
        optional_json(rsp, SdkError::MetadataClientFail).await
    }

    async fn get_device_by_name(&self, name: &str) -> Result<Option<Device>, SdkError> {
        let rsp = self
            .client
            .get(self.url(&format!("/device/name/{name}")))
            .send()
            .await
            .map_err(meta_err)?;
        optional_json(rsp, SdkError::MetadataClientFail).await
    }

    async fn create_device(&self, device: &Device) -> Result<String, SdkError> {
        let rsp = self
            .client
            .post(self.url("/device"))
            .json(device)
            .send()
            .await
            .map_err(meta_err)?;
        created_id(rsp, SdkError::MetadataClientFail).await
    }

    async fn update_device(&self, device: &Device) -> Result<(), SdkError> {
        let rsp = self
            .client
            .put(self.url("/device"))
            .json(device)
            .send()
            .await
            .map_err(meta_err)?;
        expect_success(rsp, SdkError::MetadataClientFail).await
    }

    async fn delete_device(&self, id: &str) -> Result<(), SdkError> {
        let rsp = self
            .client
            .delete(self.url(&format!("/device/id/{id}")))
            .send()
            .await
            .map_err(meta_err)?;
        expect_success(rsp, SdkError::MetadataClientFail).await
    }

    async fn create_schedule(&self, name: &str, frequency: &str) -> Result<String, SdkError> {
        let schedule = Schedule {
            id: String::new(),
            name: name.to_string(),
            frequency: frequency.to_string(),
        };
        let rsp = self
            .client
            .post(self.url("/schedule"))
            .json(&schedule)
            .send()
            .await
            .map_err(meta_err)?;
        created_id(rsp, SdkError::MetadataClientFail).await
    }

    async fn get_schedule(&self, name: &str) -> Result<Option<Schedule>, SdkError> {
        let rsp = self
            .client
            .get(self.url(&format!("/schedule/name/{name}")))
            .send()
            .await
            .map_err(meta_err)?;
        optional_json(rsp, SdkError::MetadataClientFail).await
    }

    async fn create_schedule_event(&self, event: &ScheduleEvent) -> Result<String, SdkError> {
        let rsp = self
            .client
            .post(self.url("/scheduleevent"))
            .json(event)
            .send()
            .await
            .map_err(meta_err)?;
        created_id(rsp, SdkError::MetadataClientFail).await
    }

    async fn get_schedule_events(&self, service: &str) -> Result<Vec<ScheduleEvent>, SdkError> {
        let rsp = self
            .client
            .get(self.url(&format!("/scheduleevent/servicename/{service}")))
            .send()
            .await
            .map_err(meta_err)?;
        Ok(optional_json(rsp, SdkError::MetadataClientFail)
            .await?
            .unwrap_or_default())
    }
}

/// Configuration registry client speaking a key/value HTTP convention.
pub struct HttpConfigRegistry {
    client: Client,
    base: String,
}

impl HttpConfigRegistry {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base: base.into(),
        }
    }

    fn scope(service: &str, profile: Option<&str>) -> String {
        match profile {
            Some(p) if !p.is_empty() => format!("{service};{p}"),
            _ => service.to_string(),
        }
    }
}

#[async_trait]
impl ConfigRegistry for HttpConfigRegistry {
    async fn ping(&self) -> Result<(), SdkError> {
        let rsp = self
            .client
            .get(format!("{}/v1/status/leader", self.base))
            .send()
            .await
            .map_err(|e| SdkError::RemoteServerDown(e.to_string()))?;
        expect_success(rsp, SdkError::RemoteServerDown).await
    }

    async fn get_config(
        &self,
        service: &str,
        profile: Option<&str>,
    ) -> Result<Option<Vec<(String, String)>>, SdkError> {
        let rsp = self
            .client
            .get(format!(
                "{}/v1/kv/config/{}",
                self.base,
                Self::scope(service, profile)
            ))
            .send()
            .await
            .map_err(|e| SdkError::BadConfig(e.to_string()))?;
        let pairs: Option<std::collections::BTreeMap<String, String>> =
            optional_json(rsp, SdkError::BadConfig).await?;
        Ok(pairs.map(|m| m.into_iter().collect()))
    }

    async fn put_config(
        &self,
        service: &str,
        profile: Option<&str>,
        pairs: &[(String, String)],
    ) -> Result<(), SdkError> {
        let body: std::collections::BTreeMap<&str, &str> = pairs
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let rsp = self
            .client
            .put(format!(
                "{}/v1/kv/config/{}",
                self.base,
                Self::scope(service, profile)
            ))
            .json(&body)
            .send()
            .await
            .map_err(|e| SdkError::BadConfig(e.to_string()))?;
        expect_success(rsp, SdkError::BadConfig).await
    }

    async fn register_service(
        &self,
        name: &str,
        host: &str,
        port: u16,
        check_interval: &str,
    ) -> Result<(), SdkError> {
        let body = serde_json::json!({
            "Name": name,
            "Address": host,
            "Port": port,
            "Check": {
                "HTTP": format!("http://{host}:{port}/api/v1/ping"),
                "Interval": check_interval,
            },
        });
        let rsp = self
            .client
            .put(format!("{}/v1/agent/service/register", self.base))
            .json(&body)
            .send()
            .await
            .map_err(|e| SdkError::RemoteServerDown(e.to_string()))?;
        expect_success(rsp, SdkError::RemoteServerDown).await
    }
}
