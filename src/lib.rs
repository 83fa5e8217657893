// Library exports for Hotell, shared by the binary and the integration tests.

pub mod accounts;
pub mod booking;
pub mod catalog;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod flash;
pub mod forms;
pub mod mail;
pub mod routes;
pub mod state;
pub mod storage;
