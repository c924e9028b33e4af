pub mod audit;
pub mod auth;
pub mod configuration;
pub mod error;
pub mod localization;
pub mod logger;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod response;
pub mod routes;
pub mod seed;
pub mod startup;
pub mod telemetry;
