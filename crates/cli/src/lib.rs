pub mod commands;
pub mod modules;
