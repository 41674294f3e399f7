pub mod admin;
pub mod attendance;
pub mod auth;
pub mod events;
pub mod members;
pub mod payments;
pub mod reports;
pub mod root;
