pub mod cache;
pub mod config;
pub mod db;
pub mod errors;
pub mod examples;
pub mod generator;
pub mod model;
pub mod prompt;
pub mod providers;
pub mod schema;
pub mod validate;
