mod commands;
mod discovery;
mod lifecycle;
mod pairing;
