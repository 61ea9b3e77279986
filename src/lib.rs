pub mod device;
pub mod export;
pub mod serial;
pub mod solar;
