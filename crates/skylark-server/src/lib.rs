pub mod app;
pub mod error;
pub mod ratelimit;
pub mod routes;
pub mod state;
