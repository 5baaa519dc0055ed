pub mod goal;
pub mod project;
pub mod time_log;
pub mod user;
