pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod flow;
pub mod handlers;
pub mod ledger;
pub mod preferences;
pub mod progress;
pub mod state;
pub mod validation;

#[cfg(test)]
pub mod testing;
