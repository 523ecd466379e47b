mod config;
mod discovery;
mod executor;
mod notification;
mod process_backend;
mod security;
mod state;
mod tokenizer;
mod validator;
