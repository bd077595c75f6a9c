pub mod analytics;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod health;
pub mod latency;
pub mod ledger;
pub mod logging;
pub mod logstore;
pub mod monitor;
pub mod normalize;
pub mod proxy;
pub mod ranking;
pub mod risk;
pub mod sandbox;
pub mod tui;
pub mod types;
pub mod upstream;
pub mod web;
