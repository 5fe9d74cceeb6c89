pub mod audit;
pub mod file_record;
pub mod upload_policy;
