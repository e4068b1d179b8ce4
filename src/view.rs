// src/view.rs
//! One controller shape for every table-backed page.
//!
//! A [`ListView`] owns the rendered rows of a page and walks the
//! `Loading -> Ready | Error` cycle on every load. What is fetched, how an
//! item becomes a row, and which create/delete calls exist is supplied by a
//! [`ListSource`]. Every render replaces the whole table and bumps a
//! generation counter; row actions are bound to `(key, generation)` so a
//! handle taken from an older render can never hit the wrong item.

use crate::api::ApiClient;
use crate::auth::{require_session, Navigator, Session};
use crate::error::{DashboardError, Result};
use crate::validate::FormInput;
use async_trait::async_trait;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

pub struct Listing<T> {
    pub items: Vec<T>,
    pub summary: Option<String>,
}

impl<T> Listing<T> {
    pub fn new(items: Vec<T>) -> Self {
        Listing {
            items,
            summary: None,
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub key: String,
    pub cells: Vec<String>,
}

impl Row {
    pub fn line(&self) -> String {
        self.cells.join(" | ")
    }
}

#[async_trait]
pub trait ListSource: Send + Sync + 'static {
    type Item: Clone + Send + Sync;
    type Draft: Send;
    type Removal: Send;

    fn name(&self) -> &'static str;

    fn headers(&self) -> &'static [&'static str];

    async fn fetch(&self, api: &ApiClient) -> Result<Listing<Self::Item>>;

    fn row(&self, item: &Self::Item) -> Row;

    fn validate_create(&self, _input: &FormInput) -> Result<Self::Draft> {
        Err(DashboardError::Unsupported)
    }

    async fn create(&self, _api: &ApiClient, _draft: Self::Draft) -> Result<()> {
        Err(DashboardError::Unsupported)
    }

    fn created_message(&self) -> Option<&'static str> {
        None
    }

    fn validate_delete(&self, _item: &Self::Item, _input: &FormInput) -> Result<Self::Removal> {
        Err(DashboardError::Unsupported)
    }

    fn confirm_prompt(&self, _item: &Self::Item, _removal: &Self::Removal) -> String {
        "Delete this entry?".to_string()
    }

    async fn delete(&self, _api: &ApiClient, _item: &Self::Item, _removal: Self::Removal) -> Result<()> {
        Err(DashboardError::Unsupported)
    }
}

/// Asks the user before a destructive request goes out.
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

pub struct AlwaysConfirm;

impl Confirm for AlwaysConfirm {
    fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Idle,
    Loading,
    Ready,
    Error(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Info(String),
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowHandle {
    pub key: String,
    pub generation: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewSnapshot {
    pub phase: Phase,
    pub rows: Vec<Row>,
    pub summary: Option<String>,
    pub notice: Option<Notice>,
    pub generation: u64,
}

impl ViewSnapshot {
    pub fn handles(&self) -> Vec<RowHandle> {
        self.rows
            .iter()
            .map(|row| RowHandle {
                key: row.key.clone(),
                generation: self.generation,
            })
            .collect()
    }

    pub fn handle_for(&self, key: &str) -> Option<RowHandle> {
        self.handles().into_iter().find(|h| h.key == key)
    }

    pub fn lines(&self) -> Vec<String> {
        self.rows.iter().map(Row::line).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome {
    Deleted,
    Cancelled,
}

struct ViewState<T> {
    phase: Phase,
    items: Vec<T>,
    rows: Vec<Row>,
    summary: Option<String>,
    notice: Option<Notice>,
    generation: u64,
}

impl<T> ViewState<T> {
    fn clear(&mut self) {
        self.items.clear();
        self.rows.clear();
        self.summary = None;
    }
}

pub struct ListView<S: ListSource> {
    source: S,
    api: Arc<ApiClient>,
    confirm: Arc<dyn Confirm>,
    state: Mutex<ViewState<S::Item>>,
    reloading: tokio::sync::Mutex<()>,
    mutating: tokio::sync::Mutex<()>,
    closed: AtomicBool,
}

impl<S: ListSource> ListView<S> {
    pub fn new(source: S, api: Arc<ApiClient>, confirm: Arc<dyn Confirm>) -> Self {
        ListView {
            source,
            api,
            confirm,
            state: Mutex::new(ViewState {
                phase: Phase::Idle,
                items: Vec::new(),
                rows: Vec::new(),
                summary: None,
                notice: None,
                generation: 0,
            }),
            reloading: tokio::sync::Mutex::new(()),
            mutating: tokio::sync::Mutex::new(()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    fn state(&self) -> MutexGuard<'_, ViewState<S::Item>> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        let state = self.state();
        ViewSnapshot {
            phase: state.phase.clone(),
            rows: state.rows.clone(),
            summary: state.summary.clone(),
            notice: state.notice.clone(),
            generation: state.generation,
        }
    }

    pub fn handles(&self) -> Vec<RowHandle> {
        self.snapshot().handles()
    }

    /// Entry point for every authentication transition. Without a session the
    /// page is sent to login and nothing is requested.
    pub async fn on_session_change(&self, session: Option<&Session>, navigator: &dyn Navigator) -> Result<()> {
        if !require_session(session, self.api.gate().login_route(), navigator) {
            self.reset();
            return Ok(());
        }
        self.reload().await
    }

    pub async fn reload(&self) -> Result<()> {
        let _reloading = self.reloading.lock().await;
        self.load().await
    }

    /// Reloads unless a reload is already running. `None` means skipped.
    pub async fn try_reload(&self) -> Option<Result<()>> {
        let _reloading = self.reloading.try_lock().ok()?;
        Some(self.load().await)
    }

    async fn load(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.state().phase = Phase::Loading;

        let fetched = self.source.fetch(&self.api).await;

        if self.closed.load(Ordering::SeqCst) {
            debug!("{} view closed, dropping response", self.source.name());
            return Ok(());
        }
        let mut state = self.state();
        state.generation += 1;
        state.clear();
        match fetched {
            Ok(listing) => {
                state.rows = listing.items.iter().map(|item| self.source.row(item)).collect();
                state.items = listing.items;
                state.summary = listing.summary;
                state.phase = Phase::Ready;
                state.notice = None;
                debug!("{} view rendered {} rows", self.source.name(), state.rows.len());
                Ok(())
            }
            Err(DashboardError::Unauthenticated) => {
                state.phase = Phase::Idle;
                Err(DashboardError::Unauthenticated)
            }
            Err(e) => {
                warn!("{} view failed to load: {}", self.source.name(), e);
                state.phase = Phase::Error(e.user_message());
                Err(e)
            }
        }
    }

    fn notify_error(&self, err: &DashboardError) {
        if !self.closed.load(Ordering::SeqCst) {
            self.state().notice = Some(Notice::Error(err.user_message()));
        }
    }

    /// Create-form submission. The form is cleared only when the backend accepted it.
    pub async fn submit(&self, form: &mut FormInput) -> Result<()> {
        let draft = self.source.validate_create(form).map_err(|e| {
            self.notify_error(&e);
            e
        })?;
        let _mutating = self.mutating.try_lock().map_err(|_| {
            let e = DashboardError::Busy;
            self.notify_error(&e);
            e
        })?;

        if let Err(e) = self.source.create(&self.api, draft).await {
            self.notify_error(&e);
            return Err(e);
        }
        info!("{} entry created", self.source.name());
        if self.is_closed() {
            debug!("{} view closed, dropping create result", self.source.name());
            return Ok(());
        }
        form.reset();
        self.reload().await?;
        if let Some(message) = self.source.created_message() {
            if !self.is_closed() {
                self.state().notice = Some(Notice::Info(message.to_string()));
            }
        }
        Ok(())
    }

    pub async fn delete(&self, handle: &RowHandle, input: &FormInput) -> Result<DeleteOutcome> {
        let item = {
            let state = self.state();
            if state.generation != handle.generation {
                return Err(DashboardError::StaleRow);
            }
            let index = state
                .rows
                .iter()
                .position(|row| row.key == handle.key)
                .ok_or(DashboardError::StaleRow)?;
            state.items[index].clone()
        };

        let removal = self.source.validate_delete(&item, input).map_err(|e| {
            self.notify_error(&e);
            e
        })?;
        // Held across the prompt so a confirmed delete is never refused as busy.
        let _mutating = self.mutating.try_lock().map_err(|_| {
            let e = DashboardError::Busy;
            self.notify_error(&e);
            e
        })?;
        let prompt = self.source.confirm_prompt(&item, &removal);
        if !self.confirm.confirm(&prompt) {
            debug!("{} delete of {} cancelled", self.source.name(), handle.key);
            return Ok(DeleteOutcome::Cancelled);
        }

        if let Err(e) = self.source.delete(&self.api, &item, removal).await {
            self.notify_error(&e);
            return Err(e);
        }
        info!("{} entry {} deleted", self.source.name(), handle.key);
        self.reload().await?;
        Ok(DeleteOutcome::Deleted)
    }

    /// Back to an empty, idle table.
    pub fn reset(&self) {
        let mut state = self.state();
        state.clear();
        state.phase = Phase::Idle;
        state.notice = None;
    }

    /// Detaches the view; responses still in flight are discarded.
    pub fn teardown(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.reset();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
