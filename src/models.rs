// src/models.rs
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub crypto_name: String,
    pub amount: f64,
    pub price: f64,
    #[serde(default)]
    pub value: Option<f64>,
}

impl Holding {
    /// Server value when reported, otherwise amount times price.
    pub fn display_value(&self) -> f64 {
        self.value.unwrap_or(self.amount * self.price)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    pub assets: Vec<Holding>,
    pub total_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AlertTimestamp {
    Iso(String),
    Seconds { seconds: i64 },
}

impl AlertTimestamp {
    pub fn to_local(&self) -> Option<DateTime<Local>> {
        match self {
            AlertTimestamp::Iso(text) => match DateTime::parse_from_rfc3339(text) {
                Ok(dt) => Some(dt.with_timezone(&Local)),
                // No offset: Python's isoformat() of a naive datetime, read as local time.
                Err(_) => NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .and_then(|naive| Local.from_local_datetime(&naive).single()),
            },
            AlertTimestamp::Seconds { seconds } if *seconds != 0 => Local
                .timestamp_millis_opt(seconds.saturating_mul(1000))
                .single(),
            AlertTimestamp::Seconds { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub target: Option<f64>,
    #[serde(default)]
    pub sent: bool,
    #[serde(default)]
    pub timestamp: Option<AlertTimestamp>,
}

// Document stores hand out string ids, SQL backends integers.
fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(id) => Ok(id),
        serde_json::Value::Number(id) => Ok(id.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "alert id must be a string or number, got {}",
            other
        ))),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertList {
    pub alerts: Vec<Alert>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub days: u32,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub forecast: Vec<ForecastPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestions {
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartImage {
    #[serde(default)]
    pub image_base64: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AddHolding {
    pub crypto: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RemoveHolding {
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewAlert {
    pub symbol: String,
    pub threshold: f64,
}
