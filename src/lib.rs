pub mod api;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod notify;
pub mod payments;
pub mod qr;
pub mod repository;
pub mod scheduler;
pub mod service;
