pub mod error;
pub mod hdfs;
pub mod hive;
pub mod pipeline;
pub mod settings;
pub mod source;
pub mod staging;
pub mod verify;
