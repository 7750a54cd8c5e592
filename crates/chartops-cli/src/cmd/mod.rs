pub mod action;
pub mod app;
pub mod config;
pub mod serve;
