//! Shopping-cart service: active-cart lookup, per-size priced line items and
//! cart totals over PostgreSQL, served through an axum API.

pub mod audit;
pub mod config;
pub mod db;
pub mod dto;
pub mod entity;
pub mod error;
pub mod models;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
