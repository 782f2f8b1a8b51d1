//! `stockflow` binary support: argument parsing and application bootstrap.

pub mod app;
pub mod cli;

pub use app::{App, AppBus, SaleOutcome, bootstrap};
