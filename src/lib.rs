pub mod animation;
pub mod app;
pub mod capability;
pub mod config;
pub mod controls;
pub mod mapping;
pub mod prefs;
pub mod render;
pub mod session;
pub mod terminal;
pub mod visual;
