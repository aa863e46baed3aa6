pub mod config;
pub mod db;
pub mod domain;
pub mod middleware;
pub mod services;
pub mod state;
pub mod tasks;
pub mod web;
