// src/main.rs
use chrono::Duration as TokenTtl;
use crypto_dashboard::auth::{issue_token, DevTokenSource, NavChrome, StaticToken};
use crypto_dashboard::pages::{AlertsSource, AnalysisPage, ChartView, HoldingsSource, ForecastSource, SuggestionsSource};
use crypto_dashboard::render;
use crypto_dashboard::validate::FormInput;
use crypto_dashboard::view::{Confirm, ListSource, ListView};
use crypto_dashboard::{ApiClient, Config, DashboardError, Navigator, Refresher, Result, Session, SessionGate};
use env_logger::{Builder, Env};
use log::{error, info};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tokio::time::{self, Duration};

const USAGE: &str = "usage: crypto_dashboard <portfolio | alerts | forecast | optimize | analysis | watch |
                         chart SYMBOL | add SYMBOL AMOUNT | remove SYMBOL AMOUNT |
                         alert SYMBOL THRESHOLD | unalert ID>";

struct TerminalNavigator {
    route: String,
}

impl Navigator for TerminalNavigator {
    fn current_route(&self) -> String {
        self.route.clone()
    }

    fn navigate(&self, route: &str) {
        eprintln!(
            "Not signed in ({}). Set DASHBOARD_ID_TOKEN or DASHBOARD_DEV_USER and retry.",
            route
        );
    }
}

struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        print!("{} [y/N] ", prompt);
        if io::stdout().flush().is_err() {
            return false;
        }
        // stdin blocks; keep it off the async workers.
        let mut answer = String::new();
        match tokio::task::block_in_place(|| io::stdin().lock().read_line(&mut answer)) {
            Ok(_) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
            Err(_) => false,
        }
    }
}

#[tokio::main]
async fn main() {
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(e) = run(args).await {
        error!("{}", e);
        eprintln!("{}", e.user_message());
        std::process::exit(1);
    }
}

fn build_gate(config: &Config) -> Result<SessionGate> {
    let gate = SessionGate::new(config.login_route.clone());
    if let Some(token) = &config.id_token {
        let gate = gate.with_token_source(Arc::new(StaticToken(token.clone())));
        gate.sign_in(token)?;
        return Ok(gate);
    }
    if let Some(user) = &config.dev_user {
        let ttl = TokenTtl::hours(1);
        let token = issue_token(user, None, ttl, &config.dev_secret)?;
        let gate = gate.with_token_source(Arc::new(DevTokenSource {
            user_id: user.clone(),
            secret: config.dev_secret.clone(),
            ttl,
        }));
        gate.sign_in(&token)?;
        return Ok(gate);
    }
    Ok(gate)
}

fn arg<'a>(args: &'a [String], index: usize) -> Result<&'a str> {
    args.get(index)
        .map(String::as_str)
        .ok_or_else(|| DashboardError::Validation(USAGE.to_string()))
}

fn show<S: ListSource>(title: &str, view: &ListView<S>) {
    println!("{}", render::page(title, view.source().headers(), &view.snapshot()));
}

async fn run(args: Vec<String>) -> Result<()> {
    let config = Config::from_env()?;
    let gate = Arc::new(build_gate(&config)?);
    let api = Arc::new(ApiClient::new(&config.api_url, gate.clone(), config.request_timeout)?);
    let confirm: Arc<dyn Confirm> = Arc::new(StdinConfirm);

    let command = args.first().map(String::as_str).unwrap_or("portfolio");
    let navigator = TerminalNavigator {
        route: format!("/{}", command),
    };
    let session: Session = match gate.guard(&navigator) {
        Some(session) => session,
        None => return Ok(()),
    };
    println!("{}", NavChrome::for_session(Some(&session)).user_info);

    match command {
        "portfolio" => {
            let view = ListView::new(HoldingsSource, api, confirm);
            let loaded = view.on_session_change(Some(&session), &navigator).await;
            show("Portfolio", &view);
            loaded
        }
        "add" => {
            let view = ListView::new(HoldingsSource, api, confirm);
            view.on_session_change(Some(&session), &navigator).await?;
            let mut form = FormInput::new()
                .with("crypto", arg(&args, 1)?)
                .with("amount", arg(&args, 2)?);
            let submitted = view.submit(&mut form).await;
            show("Portfolio", &view);
            submitted
        }
        "remove" => {
            let view = ListView::new(HoldingsSource, api, confirm);
            view.on_session_change(Some(&session), &navigator).await?;
            let symbol = arg(&args, 1)?.trim().to_uppercase();
            let form = FormInput::new().with("amount", arg(&args, 2)?);
            let handle = view
                .snapshot()
                .handle_for(&symbol)
                .ok_or_else(|| DashboardError::Validation(format!("{} is not in the portfolio.", symbol)))?;
            let outcome = view.delete(&handle, &form).await;
            show("Portfolio", &view);
            outcome.map(|o| info!("Remove {}: {:?}", symbol, o))
        }
        "alerts" => {
            let view = ListView::new(AlertsSource, api, confirm);
            let loaded = view.on_session_change(Some(&session), &navigator).await;
            show("Alerts", &view);
            loaded
        }
        "alert" => {
            let view = ListView::new(AlertsSource, api, confirm);
            view.on_session_change(Some(&session), &navigator).await?;
            let mut form = FormInput::new()
                .with("crypto", arg(&args, 1)?)
                .with("threshold", arg(&args, 2)?);
            let submitted = view.submit(&mut form).await;
            show("Alerts", &view);
            submitted
        }
        "unalert" => {
            let view = ListView::new(AlertsSource, api, confirm);
            view.on_session_change(Some(&session), &navigator).await?;
            let id = arg(&args, 1)?;
            let handle = view
                .snapshot()
                .handle_for(id)
                .ok_or_else(|| DashboardError::Validation(format!("No alert with id {}.", id)))?;
            let outcome = view.delete(&handle, &FormInput::new()).await;
            show("Alerts", &view);
            outcome.map(|o| info!("Delete alert {}: {:?}", id, o))
        }
        "forecast" => {
            let view = ListView::new(ForecastSource, api, confirm);
            let loaded = view.on_session_change(Some(&session), &navigator).await;
            show("Forecast", &view);
            loaded
        }
        "optimize" => {
            let view = ListView::new(SuggestionsSource, api, confirm);
            let loaded = view.on_session_change(Some(&session), &navigator).await;
            show("Optimization", &view);
            loaded
        }
        "analysis" => {
            let page = AnalysisPage::new(api, confirm);
            let (forecast, optimize) = page.on_session_change(Some(&session), &navigator).await;
            show("Forecast", &page.forecast);
            show("Optimization", &page.optimize);
            if let Some(symbol) = args.get(1) {
                chart(&page.chart, symbol).await?;
            }
            forecast.and(optimize)
        }
        "chart" => chart(&ChartView::new(api), arg(&args, 1)?).await,
        "watch" => watch(api, confirm, gate, &session, &navigator, config.refresh_interval).await,
        _ => Err(DashboardError::Validation(USAGE.to_string())),
    }
}

async fn chart(view: &ChartView, symbol: &str) -> Result<()> {
    view.submit(&FormInput::new().with("symbol", symbol)).await?;
    let state = view.state();
    match (&state.symbol, &state.image) {
        (Some(symbol), Some(image)) => {
            let path = format!("{}.png", symbol);
            tokio::fs::write(&path, image)
                .await
                .map_err(|e| DashboardError::Config(format!("cannot write {}: {}", path, e)))?;
            println!("Chart saved to {}", path);
        }
        _ => println!("{}", state.message.unwrap_or_default()),
    }
    Ok(())
}

async fn watch(
    api: Arc<ApiClient>,
    confirm: Arc<dyn Confirm>,
    gate: Arc<SessionGate>,
    session: &Session,
    navigator: &TerminalNavigator,
    period: Duration,
) -> Result<()> {
    let view = Arc::new(ListView::new(HoldingsSource, api, confirm));
    if let Err(e) = view.on_session_change(Some(session), navigator).await {
        error!("Initial portfolio load failed: {}", e);
    }
    show("Portfolio", &view);

    let refresher = Refresher::spawn(view.clone(), gate.on_session_change(), period);
    let mut printed = view.snapshot().generation;
    let mut poll = time::interval(Duration::from_millis(250));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = poll.tick() => {
                let snapshot = view.snapshot();
                if snapshot.generation != printed {
                    printed = snapshot.generation;
                    show("Portfolio", &view);
                }
                if refresher.is_finished() {
                    break;
                }
            }
        }
    }

    refresher.stop().await;
    view.teardown();
    Ok(())
}
