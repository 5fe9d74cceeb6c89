pub mod file;
pub mod profile;
pub mod timeline_event;
