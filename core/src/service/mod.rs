pub mod admin;
pub mod aggregation;
pub mod cache;
pub mod dashboard_service;
pub mod dto;
pub mod metrics;
