mod config;
mod console;
