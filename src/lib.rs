pub mod config;
pub mod constants;
pub mod core_auth;
pub mod core_cli;
pub mod core_ftpcommand;
pub mod core_network;
pub mod core_tftp;
pub mod core_vfs;
pub mod server;
pub mod session;
pub mod users;
