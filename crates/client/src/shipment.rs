// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed calls against the shipment service.

use serde::{Deserialize, Serialize};

use crate::client::ApiClient;
use crate::credential::TokenResponse;
use crate::error::ClientError;
use crate::http::{ApiRequest, Response};

/// Fields submitted when booking a shipment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewShipment {
    pub product_name: String,
    pub customer_name: String,
    pub email_address: String,
    pub weight: f64,
    pub delivery_from: String,
    pub delivery_to: String,
    pub phone_number: String,
    /// ISO-8601 timestamp.
    pub estimated_delivery_time: String,
}

/// A shipment as returned by the service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Shipment {
    pub tracking_id: String,
    pub product_name: String,
    pub customer_name: String,
    pub email_address: String,
    pub weight: Option<f64>,
    pub delivery_from: String,
    pub delivery_to: String,
    pub phone_number: String,
    pub estimated_delivery_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[derive(Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

impl ApiClient {
    /// Exchange email and password for a session credential.
    ///
    /// Sent unsigned, straight to the backend: a rejected login never
    /// triggers a refresh or touches the current session.
    pub async fn login(&self, email: &str, password: &str) -> Result<(), ClientError> {
        let body = serde_json::to_value(LoginBody { email, password })
            .map_err(|e| ClientError::InvalidRequest(e.to_string()))?;
        let request = ApiRequest::post(self.options().login_path.clone(), body);

        let resp = self.backend().execute(&request).await?;
        if !resp.is_success() {
            return Err(api_error(&resp, "Login failed"));
        }

        let token: TokenResponse = resp.json()?;
        let credential = token.into_credential(None).ok_or_else(|| {
            ClientError::Decode("login response carried no access token".to_owned())
        })?;
        self.sign_in(&credential);
        Ok(())
    }

    /// Book a new shipment.
    pub async fn create_shipment(&self, shipment: &NewShipment) -> Result<Shipment, ClientError> {
        let body =
            serde_json::to_value(shipment).map_err(|e| ClientError::InvalidRequest(e.to_string()))?;
        let path = format!("{}/create-product", self.options().shipments_path);
        let resp = self.send(ApiRequest::post(path, body)).await?;
        if !resp.is_success() {
            return Err(api_error(&resp, "Failed to create shipment"));
        }
        resp.json()
    }

    /// Look up a shipment by tracking id.
    pub async fn track(&self, tracking_id: &str) -> Result<Shipment, ClientError> {
        let tracking_id = tracking_id.trim();
        if tracking_id.is_empty() {
            return Err(ClientError::InvalidRequest("tracking id is empty".to_owned()));
        }
        let path = format!("{}/{}", self.options().shipments_path, encode_segment(tracking_id));
        let resp = self.send(ApiRequest::get(path)).await?;
        if !resp.is_success() {
            return Err(api_error(&resp, "Failed to fetch shipment details"));
        }
        resp.json()
    }
}

/// Map a non-success reply, preferring the server's own `message`.
fn api_error(resp: &Response, fallback: &str) -> ClientError {
    let message = serde_json::from_slice::<serde_json::Value>(&resp.body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_owned))
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| fallback.to_owned());
    ClientError::Api { status: resp.status, message }
}

/// Percent-encode one path segment.
fn encode_segment(s: &str) -> String {
    s.bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                (b as char).to_string()
            }
            _ => format!("%{b:02X}"),
        })
        .collect()
}

#[cfg(test)]
#[path = "shipment_tests.rs"]
mod tests;
