pub mod driver;
pub mod models;

pub use driver::QuantumDriver;
pub use models::*;

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("Device not connected")]
    NotConnected,

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Serial communication error: {0}")]
    SerialError(#[from] crate::serial::SerialError),
}

pub type Result<T> = std::result::Result<T, DeviceError>;
