//! Command handlers

pub mod config;
pub mod import;
pub mod post;
pub mod site;
pub mod status;
pub mod subscriber;
