//! HTTP client for the authority's node endpoints.

use crate::error::AgentResult;
use licgrid_types::{ApiResponse, MachineInfo};
use serde::Serialize;
use std::time::Duration;

const HTTP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterBody<'a> {
    license_code: &'a str,
    machine_info: &'a MachineInfo,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NodeIdBody<'a> {
    node_id: &'a str,
}

/// Thin wrapper over reqwest with the agent's timeouts baked in.
///
/// Calls return the response envelope whatever the transport status was;
/// the caller interprets `envelope.code`.
pub struct AuthorityClient {
    http: reqwest::Client,
    base_url: String,
}

impl AuthorityClient {
    pub fn new(base_url: &str) -> AgentResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(HTTP_TIMEOUT)
            .timeout(HTTP_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// `POST /api/node/register`.
    pub async fn register(
        &self,
        license_code: &str,
        machine_info: &MachineInfo,
    ) -> Result<ApiResponse<String>, reqwest::Error> {
        self.http
            .post(format!("{}/api/node/register", self.base_url))
            .json(&RegisterBody {
                license_code,
                machine_info,
            })
            .send()
            .await?
            .json()
            .await
    }

    /// `POST /api/node/heartbeat`.
    pub async fn heartbeat(&self, node_id: &str) -> Result<ApiResponse<bool>, reqwest::Error> {
        self.http
            .post(format!("{}/api/node/heartbeat", self.base_url))
            .json(&NodeIdBody { node_id })
            .send()
            .await?
            .json()
            .await
    }

    /// `POST /api/node/unregister`. Best-effort.
    pub async fn unregister(&self, node_id: &str) -> Result<ApiResponse<String>, reqwest::Error> {
        self.http
            .post(format!("{}/api/node/unregister", self.base_url))
            .json(&NodeIdBody { node_id })
            .send()
            .await?
            .json()
            .await
    }
}
