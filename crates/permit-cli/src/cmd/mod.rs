pub mod app;
pub mod events;
pub mod init;
pub mod purge;
pub mod sync;
