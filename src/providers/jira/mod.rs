pub mod action_items;
pub mod audits;
pub mod boards;
pub mod burndown;
pub mod client;
pub mod fields;
pub mod issues;
pub mod provider;
pub mod reconcile;
pub mod tables;
pub mod types;
pub mod workdays;

pub use client::JiraClient;
pub use provider::{ReportProvider, SprintSelection};
