pub mod adapters;
pub mod assistant;
pub mod autoreply;
pub mod config;
pub mod error;
pub mod outreach;
pub mod session;
pub mod web;
