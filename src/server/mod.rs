pub mod orders;
pub mod server;
