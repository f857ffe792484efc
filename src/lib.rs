pub mod admin;
pub mod config;
pub mod db;
pub mod error;
pub mod html;
pub mod i18n;
pub mod render;
pub mod security;
pub mod server;
pub mod shortcode;
