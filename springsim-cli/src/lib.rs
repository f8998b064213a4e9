pub mod cli;
pub mod server;
pub mod stream;
pub mod viewer;
