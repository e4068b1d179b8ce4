//! Headless client for the crypto portfolio dashboard backend.
//!
//! A [`SessionGate`] holds the signed-in user's ID token, an [`ApiClient`]
//! talks to the backend with it, and each page is a [`ListView`] over one
//! backend listing. The holdings page is kept fresh by a [`Refresher`].

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod pages;
pub mod refresher;
pub mod render;
pub mod validate;
pub mod view;

pub use api::ApiClient;
pub use auth::{Navigator, Session, SessionGate};
pub use config::Config;
pub use error::{DashboardError, Result};
pub use refresher::{Refresher, RefresherHandle};
pub use view::{ListSource, ListView};
