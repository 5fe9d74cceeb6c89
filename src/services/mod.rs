pub mod audit;
pub mod file_list;
pub mod preview;
pub mod record_store;

#[cfg(test)]
pub mod memory_store;
