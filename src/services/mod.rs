pub mod media;
pub mod publisher;
pub mod records;
pub mod sniffer;
pub mod staging;
pub mod storage;
pub mod upload_service;
