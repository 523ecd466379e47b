mod helpers;
mod ipc;
mod session;
