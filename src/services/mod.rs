pub mod archive;
pub mod delete_service;
pub mod disk_store;
#[cfg(test)]
pub mod memory_store;
pub mod object_store;
pub mod ownership;
pub mod upload_service;
