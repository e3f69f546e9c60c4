//! HR leave accounting and approval service.
//!
//! The engine in [`leave`] is usable on its own over any [`store::LeaveStore`];
//! [`api`] and [`routes`] expose it over HTTP.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod docs;
pub mod error;
pub mod leave;
pub mod model;
pub mod models;
pub mod notify;
pub mod routes;
pub mod scheduler;
pub mod storage;
pub mod store;
pub mod utils;
