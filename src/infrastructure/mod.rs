pub mod auth;
pub mod blob;
pub mod codec;
pub mod database;
pub mod metrics;
pub mod remote;
