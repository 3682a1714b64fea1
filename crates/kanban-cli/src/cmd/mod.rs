pub mod completions;
pub mod config;
pub mod create;
pub mod delete;
pub mod init;
pub mod move_cmd;
pub mod show;
pub mod status;
pub mod sync;
pub mod update;
pub mod watch;
