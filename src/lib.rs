//! # commerce-ext
//!
//! Commerce storefront extensions served from one async HTTP/1.1 process:
//! gateway field resolvers with a cache-aside, de-duplicated VAT rate lookup,
//! and serverless-style web actions (webhooks, Admin UI registrations).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use commerce_ext::app::{self, AppState};
//! use commerce_ext::cache::MemoryStore;
//! use commerce_ext::config::Settings;
//! use commerce_ext::server::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::load()?;
//!     let state = AppState::from_settings(&settings, Arc::new(MemoryStore::new()))?;
//!     let router = Arc::new(app::router(Arc::new(state)));
//!
//!     let server = Server::bind(&settings.server.bind).await?;
//!     server
//!         .run(move |req| {
//!             let router = Arc::clone(&router);
//!             async move { router.route(req).await }
//!         })
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod actions;
pub mod app;
pub mod cache;
pub mod config;
pub mod context;
pub mod http;
pub mod logging;
pub mod mesh;
pub mod router;
pub mod server;

pub use http::{Headers, Method, Request, Response, StatusCode};
pub use server::{Server, ServerError};
