pub mod assemble;
pub mod config;
pub mod error;
pub mod report;
pub mod routes;
pub mod upload;
pub mod vision;
