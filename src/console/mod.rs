pub mod application;
pub mod device_list;
pub mod types;
