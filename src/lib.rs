pub mod batch;
pub mod config;
pub mod dates;
pub mod extract;
pub mod fetch;
pub mod output;
pub mod session;
