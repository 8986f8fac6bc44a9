pub mod access_log;
pub mod config;
pub mod handlers;
pub mod server;

pub use config::Config;
pub use server::HttpServer;
