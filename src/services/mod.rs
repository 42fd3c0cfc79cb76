pub mod image_service;
#[cfg(test)]
pub mod memory_store;
pub mod naming;
pub mod normalizer;
pub mod object_store;
pub mod s3_store;
pub mod session;
