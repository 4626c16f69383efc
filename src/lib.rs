pub mod config;
pub mod db;
pub mod extract;
pub mod fetch;
pub mod pipeline;
pub mod record;
pub mod web;
