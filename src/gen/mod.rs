pub mod client;
pub mod runner;
