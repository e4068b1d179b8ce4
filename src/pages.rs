// src/pages.rs
use crate::api::ApiClient;
use crate::auth::{require_session, Navigator, Session};
use crate::error::{DashboardError, Result};
use crate::models::{AddHolding, Alert, ForecastPoint, Holding, NewAlert, RemoveHolding};
use crate::validate::{self, FormInput};
use crate::view::{Confirm, ListSource, ListView, Listing, Row};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::{info, warn};
use std::sync::{Arc, Mutex};

pub const NO_SUGGESTIONS: &str = "No optimization suggestions.";
pub const NO_CHART_DATA: &str = "No chart data.";

pub type ForecastView = ListView<ForecastSource>;
pub type OptimizeView = ListView<SuggestionsSource>;

fn usd(value: f64) -> String {
    format!("{:.2} USD", value)
}

pub struct HoldingsSource;

#[async_trait]
impl ListSource for HoldingsSource {
    type Item = Holding;
    type Draft = AddHolding;
    type Removal = RemoveHolding;

    fn name(&self) -> &'static str {
        "holdings"
    }

    fn headers(&self) -> &'static [&'static str] {
        &["Symbol", "Amount", "Price", "Value"]
    }

    async fn fetch(&self, api: &ApiClient) -> Result<Listing<Holding>> {
        let portfolio = api.portfolio().await?;
        Ok(Listing::new(portfolio.assets).with_summary(usd(portfolio.total_value)))
    }

    fn row(&self, holding: &Holding) -> Row {
        Row {
            key: holding.crypto_name.clone(),
            cells: vec![
                holding.crypto_name.clone(),
                holding.amount.to_string(),
                usd(holding.price),
                usd(holding.display_value()),
            ],
        }
    }

    fn validate_create(&self, input: &FormInput) -> Result<AddHolding> {
        Ok(AddHolding {
            crypto: validate::symbol(input, "crypto")?,
            amount: validate::amount(input, "amount")?,
        })
    }

    async fn create(&self, api: &ApiClient, draft: AddHolding) -> Result<()> {
        api.add_holding(&draft).await
    }

    fn created_message(&self) -> Option<&'static str> {
        Some("Holding added.")
    }

    fn validate_delete(&self, holding: &Holding, input: &FormInput) -> Result<RemoveHolding> {
        Ok(RemoveHolding {
            amount: validate::removal_amount(input, "amount", holding.amount)?,
        })
    }

    fn confirm_prompt(&self, holding: &Holding, removal: &RemoveHolding) -> String {
        format!("Remove {} {}?", removal.amount, holding.crypto_name)
    }

    async fn delete(&self, api: &ApiClient, holding: &Holding, removal: RemoveHolding) -> Result<()> {
        api.remove_holding(&holding.crypto_name, &removal).await
    }
}

pub struct AlertsSource;

impl AlertsSource {
    fn created_at(alert: &Alert) -> String {
        alert
            .timestamp
            .as_ref()
            .and_then(|ts| ts.to_local())
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "Unknown".to_string())
    }
}

#[async_trait]
impl ListSource for AlertsSource {
    type Item = Alert;
    type Draft = NewAlert;
    type Removal = ();

    fn name(&self) -> &'static str {
        "alerts"
    }

    fn headers(&self) -> &'static [&'static str] {
        &["Symbol", "Threshold", "Status", "Created"]
    }

    async fn fetch(&self, api: &ApiClient) -> Result<Listing<Alert>> {
        Ok(Listing::new(api.alerts().await?.alerts))
    }

    fn row(&self, alert: &Alert) -> Row {
        Row {
            key: alert.id.clone(),
            cells: vec![
                alert.symbol.clone().unwrap_or_else(|| "?".to_string()),
                alert.target.map(usd).unwrap_or_else(|| "-".to_string()),
                if alert.sent { "Sent" } else { "Pending" }.to_string(),
                AlertsSource::created_at(alert),
            ],
        }
    }

    fn validate_create(&self, input: &FormInput) -> Result<NewAlert> {
        Ok(NewAlert {
            symbol: validate::symbol(input, "crypto")?,
            threshold: validate::threshold(input, "threshold")?,
        })
    }

    async fn create(&self, api: &ApiClient, draft: NewAlert) -> Result<()> {
        api.create_alert(&draft).await
    }

    fn created_message(&self) -> Option<&'static str> {
        Some("Alert added.")
    }

    fn validate_delete(&self, _alert: &Alert, _input: &FormInput) -> Result<()> {
        Ok(())
    }

    fn confirm_prompt(&self, alert: &Alert, _removal: &()) -> String {
        format!(
            "Delete the {} alert?",
            alert.symbol.as_deref().unwrap_or("unnamed")
        )
    }

    async fn delete(&self, api: &ApiClient, alert: &Alert, _removal: ()) -> Result<()> {
        api.delete_alert(&alert.id).await
    }
}

pub struct ForecastSource;

#[async_trait]
impl ListSource for ForecastSource {
    type Item = ForecastPoint;
    type Draft = ();
    type Removal = ();

    fn name(&self) -> &'static str {
        "forecast"
    }

    fn headers(&self) -> &'static [&'static str] {
        &["Days", "Projected value"]
    }

    async fn fetch(&self, api: &ApiClient) -> Result<Listing<ForecastPoint>> {
        Ok(Listing::new(api.forecast().await?.forecast))
    }

    fn row(&self, point: &ForecastPoint) -> Row {
        Row {
            key: point.days.to_string(),
            cells: vec![point.days.to_string(), usd(point.value)],
        }
    }
}

pub struct SuggestionsSource;

#[async_trait]
impl ListSource for SuggestionsSource {
    type Item = String;
    type Draft = ();
    type Removal = ();

    fn name(&self) -> &'static str {
        "optimize"
    }

    fn headers(&self) -> &'static [&'static str] {
        &["Suggestion"]
    }

    async fn fetch(&self, api: &ApiClient) -> Result<Listing<String>> {
        let suggestions = api.optimize().await?.suggestions;
        if suggestions.is_empty() {
            return Ok(Listing::new(suggestions).with_summary(NO_SUGGESTIONS));
        }
        Ok(Listing::new(suggestions))
    }

    fn row(&self, suggestion: &String) -> Row {
        Row {
            key: suggestion.clone(),
            cells: vec![suggestion.clone()],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartState {
    pub symbol: Option<String>,
    pub image: Option<Vec<u8>>,
    pub message: Option<String>,
}

impl ChartState {
    pub fn is_visible(&self) -> bool {
        self.image.is_some()
    }
}

pub struct ChartView {
    api: Arc<ApiClient>,
    state: Mutex<ChartState>,
}

impl ChartView {
    pub fn new(api: Arc<ApiClient>) -> Self {
        ChartView {
            api,
            state: Mutex::new(ChartState::default()),
        }
    }

    pub fn state(&self) -> ChartState {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn set(&self, next: ChartState) {
        *self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = next;
    }

    /// Fetches the PNG chart for the symbol in the form. An empty symbol sends nothing.
    pub async fn submit(&self, input: &FormInput) -> Result<()> {
        let symbol = validate::symbol(input, "symbol")?;
        let fetched = self.api.chart(&symbol).await.and_then(|chart| match chart.image_base64 {
            Some(encoded) => STANDARD
                .decode(encoded.trim())
                .map(Some)
                .map_err(|e| DashboardError::Payload(format!("chart image: {}", e))),
            None => Ok(None),
        });

        match fetched {
            Ok(Some(image)) => {
                info!("Chart for {} loaded ({} bytes)", symbol, image.len());
                self.set(ChartState {
                    symbol: Some(symbol),
                    image: Some(image),
                    message: None,
                });
                Ok(())
            }
            Ok(None) => {
                self.set(ChartState {
                    symbol: Some(symbol),
                    image: None,
                    message: Some(NO_CHART_DATA.to_string()),
                });
                Ok(())
            }
            Err(e) => {
                warn!("Chart for {} failed: {}", symbol, e);
                self.set(ChartState {
                    symbol: Some(symbol),
                    image: None,
                    message: Some(e.user_message()),
                });
                Err(e)
            }
        }
    }
}

/// Forecast, optimization and chart on one screen; each section fails on its own.
pub struct AnalysisPage {
    pub forecast: ForecastView,
    pub optimize: OptimizeView,
    pub chart: ChartView,
}

impl AnalysisPage {
    pub fn new(api: Arc<ApiClient>, confirm: Arc<dyn Confirm>) -> Self {
        AnalysisPage {
            forecast: ListView::new(ForecastSource, api.clone(), confirm.clone()),
            optimize: ListView::new(SuggestionsSource, api.clone(), confirm),
            chart: ChartView::new(api),
        }
    }

    pub async fn on_session_change(
        &self,
        session: Option<&Session>,
        navigator: &dyn Navigator,
    ) -> (Result<()>, Result<()>) {
        let login_route = self.chart.api.gate().login_route().to_string();
        if !require_session(session, &login_route, navigator) {
            self.forecast.reset();
            self.optimize.reset();
            return (Ok(()), Ok(()));
        }
        tokio::join!(self.forecast.reload(), self.optimize.reload())
    }
}
