#![allow(dead_code)] // not every test binary uses every helper

use std::collections::VecDeque;
use std::time::Duration;

use apogee_par::device::{AveragingConfig, QuantumDriver};
use apogee_par::serial::{Result, SerialError, Transport};

/// One scripted reply per driver exchange, consumed in order. An exhausted
/// script reads as device silence (empty reply).
pub enum Reply {
    Bytes(Vec<u8>),
    IoFault,
}

#[derive(Default)]
pub struct MockTransport {
    pub written: Vec<Vec<u8>>,
    pub replies: VecDeque<Reply>,
    /// When set, sends fail once this many writes have gone through.
    pub fail_writes_after: Option<usize>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_reply(&mut self, bytes: Vec<u8>) {
        self.replies.push_back(Reply::Bytes(bytes));
    }

    pub fn push_fault(&mut self) {
        self.replies.push_back(Reply::IoFault);
    }

    /// Scripts the connect-time calibration exchange: a 5-byte multiplier
    /// reply followed by the bare 4-byte offset reply.
    pub fn script_calibration(&mut self, multiplier: f32, offset: f32) {
        self.push_reply(f32_reply(multiplier));
        self.push_reply(offset.to_le_bytes().to_vec());
    }
}

impl Transport for MockTransport {
    fn send(&mut self, frame: &[u8]) -> Result<()> {
        if self.fail_writes_after.is_some_and(|n| self.written.len() >= n) {
            return Err(SerialError::IoError(std::io::Error::other(
                "mock write fault",
            )));
        }
        self.written.push(frame.to_vec());
        Ok(())
    }

    fn read_up_to(&mut self, n: usize) -> Result<Vec<u8>> {
        match self.replies.pop_front() {
            Some(Reply::Bytes(mut bytes)) => {
                bytes.truncate(n);
                Ok(bytes)
            }
            Some(Reply::IoFault) => Err(SerialError::IoError(std::io::Error::other(
                "mock read fault",
            ))),
            None => Ok(Vec::new()),
        }
    }
}

/// Standard 5-byte measurement reply: status byte then the value.
pub fn f32_reply(value: f32) -> Vec<u8> {
    let mut reply = vec![0x00];
    reply.extend_from_slice(&value.to_le_bytes());
    reply
}

pub fn u32_reply(value: u32) -> Vec<u8> {
    let mut reply = vec![0x00];
    reply.extend_from_slice(&value.to_le_bytes());
    reply
}

/// Driver with test-friendly averaging: 5 samples, no inter-sample pause.
pub fn test_driver<T: Transport>() -> QuantumDriver<T> {
    QuantumDriver::new(AveragingConfig {
        samples: 5,
        interval: Duration::ZERO,
    })
}
