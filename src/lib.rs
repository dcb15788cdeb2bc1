pub mod alpaca;
pub mod backtester;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod market_data;
pub mod models;
pub mod news;
pub mod report;
pub mod retry;
pub mod screener;
pub mod sentiment;
pub mod series;
pub mod simulator;
pub mod universe;
