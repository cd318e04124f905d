pub mod config;
pub mod fingerprint;
pub mod history;
pub mod models;
pub mod report;
pub mod scrapers;
pub mod sheets;
