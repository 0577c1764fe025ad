pub mod cache;
pub mod mailer;
pub mod models;
pub mod repositories;
pub mod services;
pub mod settings;
