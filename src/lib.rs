pub mod api;
pub mod chat;
pub mod config;
pub mod dapps;
pub mod eth;
pub mod explorer;
pub mod fallback;
pub mod fetch;
pub mod models;
pub mod poll;
pub mod probe;
pub mod source_stats;
pub mod units;
