pub mod capture;
pub mod config;
pub mod runner;
