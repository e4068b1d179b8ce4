// src/api.rs
use crate::auth::SessionGate;
use crate::error::{DashboardError, Result};
use crate::models::{
    AddHolding, AlertList, ChartImage, Forecast, NewAlert, Portfolio, RemoveHolding, Suggestions,
};
use log::{debug, error, info};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Typed client for the dashboard backend. Every call except the chart
/// carries the session's bearer token.
pub struct ApiClient {
    client: Client,
    base_url: String,
    gate: Arc<SessionGate>,
}

impl ApiClient {
    pub fn new(base_url: &str, gate: Arc<SessionGate>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(ApiClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            gate,
        })
    }

    pub fn gate(&self) -> &Arc<SessionGate> {
        &self.gate
    }

    pub async fn portfolio(&self) -> Result<Portfolio> {
        let response = self.authorized(Method::GET, "/api/portfolio").await?.send().await;
        read_json(checked(response, "GET /api/portfolio")?).await
    }

    pub async fn add_holding(&self, body: &AddHolding) -> Result<()> {
        self.send_json(Method::POST, "/api/add".to_string(), Some(body)).await
    }

    pub async fn remove_holding(&self, symbol: &str, body: &RemoveHolding) -> Result<()> {
        let path = format!("/api/delete/{}", encode_segment(symbol));
        self.send_json(Method::DELETE, path, Some(body)).await
    }

    pub async fn alerts(&self) -> Result<AlertList> {
        let response = self.authorized(Method::GET, "/api/alerts").await?.send().await;
        read_json(checked(response, "GET /api/alerts")?).await
    }

    pub async fn create_alert(&self, body: &NewAlert) -> Result<()> {
        self.send_json(Method::POST, "/api/alerts".to_string(), Some(body)).await
    }

    pub async fn delete_alert(&self, id: &str) -> Result<()> {
        let path = format!("/api/alerts/{}", encode_segment(id));
        self.send_json::<()>(Method::DELETE, path, None).await
    }

    pub async fn forecast(&self) -> Result<Forecast> {
        let response = self.authorized(Method::GET, "/api/forecast").await?.send().await;
        read_json(checked(response, "GET /api/forecast")?).await
    }

    pub async fn optimize(&self) -> Result<Suggestions> {
        let response = self.authorized(Method::POST, "/api/optimize").await?.send().await;
        read_json(checked(response, "POST /api/optimize")?).await
    }

    pub async fn chart(&self, symbol: &str) -> Result<ChartImage> {
        let url = format!("{}/chart/{}", self.base_url, encode_segment(symbol));
        let response = self.client.get(&url).send().await;
        read_json(checked(response, "GET /chart")?).await
    }

    async fn authorized(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let token = self.gate.credential().await?;
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);
        Ok(self.client.request(method, &url).bearer_auth(token))
    }

    async fn send_json<B: Serialize>(&self, method: Method, path: String, body: Option<&B>) -> Result<()> {
        let label = format!("{} {}", method, path);
        let mut request = self.authorized(method, &path).await?;
        if let Some(body) = body {
            request = request.json(body);
        }
        checked(request.send().await, &label)?;
        info!("{} succeeded", label);
        Ok(())
    }
}

fn checked(response: reqwest::Result<Response>, label: &str) -> Result<Response> {
    match response {
        Ok(response) if response.status().is_success() => Ok(response),
        Ok(response) => {
            error!("{} failed: HTTP {}", label, response.status());
            Err(DashboardError::Status(response.status().as_u16()))
        }
        Err(e) => {
            error!("{} failed: {}", label, e);
            Err(DashboardError::Network(e))
        }
    }
}

// Read as text first so a malformed body is told apart from a broken connection.
async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| {
        error!("Failed to parse response body: {}", e);
        debug!("Response body: {}", text);
        DashboardError::Payload(e.to_string())
    })
}

fn encode_segment(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}
