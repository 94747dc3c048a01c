// API routes and handlers

pub mod health;
pub mod routes;
pub mod training_logs;
