use std::thread;

use chrono::NaiveDateTime;

use crate::serial::protocol::{self, REPLY_LEN};
use crate::serial::{Command, SerialError, SerialTransport, Transport};

use super::{AveragingConfig, Calibration, ConnectionState, DeviceError, LoggedEntry, Result};

/// Driver for a quantum PAR sensor on a serial link.
///
/// The driver starts out disconnected; `connect` (or `attach` with an
/// already-open transport) runs the connect-and-calibrate sequence and moves
/// it to `Connected`. A failed connect records the error and leaves the
/// driver disconnected; reconnecting is the caller's decision, there is no
/// implicit retry inside the read path. Measurement operations on a
/// disconnected driver fail with `DeviceError::NotConnected`.
pub struct QuantumDriver<T: Transport = SerialTransport> {
    transport: Option<T>,
    calibration: Option<Calibration>,
    state: ConnectionState,
    averaging: AveragingConfig,
}

impl QuantumDriver<SerialTransport> {
    /// Opens the named serial port and runs the connect-and-calibrate
    /// sequence in one step.
    pub fn open(port_name: &str) -> Result<Self> {
        let mut driver = Self::new(AveragingConfig::default());
        driver.connect(port_name)?;
        Ok(driver)
    }

    /// Connects over a fresh serial port. Safe to call again after a failure.
    pub fn connect(&mut self, port_name: &str) -> Result<()> {
        let transport = match SerialTransport::open(port_name) {
            Ok(transport) => transport,
            Err(e) => {
                self.state = ConnectionState::Error(e.to_string());
                return Err(DeviceError::ConnectionFailed(e.to_string()));
            }
        };
        self.attach(transport)
    }
}

impl<T: Transport> QuantumDriver<T> {
    /// Creates a disconnected driver.
    pub fn new(averaging: AveragingConfig) -> Self {
        Self {
            transport: None,
            calibration: None,
            state: ConnectionState::Disconnected,
            averaging,
        }
    }

    /// Runs the connect-and-calibrate sequence over an already-open
    /// transport. On failure the transport is dropped and the driver stays
    /// disconnected with the error recorded.
    pub fn attach(&mut self, mut transport: T) -> Result<()> {
        match read_calibration(&mut transport) {
            Ok(calibration) => {
                log::info!(
                    "Connected; calibration multiplier={} offset={}",
                    calibration.multiplier,
                    calibration.offset
                );
                self.transport = Some(transport);
                self.calibration = Some(calibration);
                self.state = ConnectionState::Connected;
                Ok(())
            }
            Err(e) => {
                log::error!("Calibration read failed: {}", e);
                self.transport = None;
                self.calibration = None;
                self.state = ConnectionState::Error(e.to_string());
                Err(DeviceError::ConnectionFailed(e.to_string()))
            }
        }
    }

    /// Drops the transport and returns to the disconnected state.
    pub fn disconnect(&mut self) {
        if self.transport.take().is_some() {
            log::info!("Disconnected from sensor");
        }
        self.calibration = None;
        self.state = ConnectionState::Disconnected;
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_some()
    }

    pub fn connection_state(&self) -> &ConnectionState {
        &self.state
    }

    /// Calibration constants read at connect time, if connected.
    pub fn calibration(&self) -> Option<Calibration> {
        self.calibration
    }

    fn transport_mut(&mut self) -> Result<&mut T> {
        self.transport.as_mut().ok_or(DeviceError::NotConnected)
    }

    /// One write-then-read exchange for commands with a standard 5-byte reply.
    fn exchange(&mut self, command: Command) -> Result<Vec<u8>> {
        let transport = self.transport_mut()?;
        transport.send(&command.encode())?;
        Ok(transport.read_up_to(REPLY_LEN)?)
    }

    /// Takes a single voltage sample. `None` means the device stayed silent
    /// within the read timeout.
    pub fn read_voltage_once(&mut self) -> Result<Option<f32>> {
        let reply = self.exchange(Command::GetVolt)?;
        Ok(protocol::decode_f32(&reply)?)
    }

    /// Averages several voltage samples, pausing between them per the
    /// averaging config.
    ///
    /// Silent reads are skipped rather than retried; if every sample is
    /// silent the average is 0.0. Any I/O or decode fault abandons the whole
    /// operation and discards partial results.
    pub fn read_voltage(&mut self) -> Result<f32> {
        let AveragingConfig { samples, interval } = self.averaging;
        let mut readings = Vec::with_capacity(samples as usize);

        for _ in 0..samples {
            if let Some(volts) = self.read_voltage_once()? {
                readings.push(volts);
                if !interval.is_zero() {
                    thread::sleep(interval);
                }
            }
        }

        if readings.is_empty() {
            return Ok(0.0);
        }
        Ok(readings.iter().sum::<f32>() / readings.len() as f32)
    }

    /// Averaged voltage converted to micromoles via the session calibration.
    pub fn get_micromoles(&mut self) -> Result<f32> {
        let calibration = self.calibration.ok_or(DeviceError::NotConnected)?;
        let volts = self.read_voltage()?;
        Ok(calibration.micromoles(volts))
    }

    /// Reads the device serial number.
    pub fn get_serial_number(&mut self) -> Result<u32> {
        let reply = self.exchange(Command::ReadSerialNum)?;
        protocol::decode_u32(&reply)?
            .ok_or_else(silent_reply_error)
            .map_err(DeviceError::from)
    }

    /// Number of entries currently held in the on-device log. A silent reply
    /// counts as zero; an I/O fault is an error, distinct from a real zero.
    pub fn get_logging_count(&mut self) -> Result<u32> {
        let reply = self.exchange(Command::GetLoggingCount)?;
        Ok(protocol::decode_u32(&reply)?.unwrap_or(0))
    }

    /// Retrieves the logged value at `index`. `None` means the device stayed
    /// silent for this entry.
    pub fn get_logged_entry(&mut self, index: u32) -> Result<Option<f32>> {
        let reply = self.exchange(Command::GetLoggedEntry { index })?;
        Ok(protocol::decode_f32(&reply)?)
    }

    /// Retrieves every logged entry, one exchange per index, oldest first.
    ///
    /// Entries are logged at one-minute intervals, so entry `i` of `count`
    /// gets the timestamp `(reference − count minutes) + i minutes`.
    /// Per-entry failures are logged and skipped; only a failed count read
    /// aborts the retrieval.
    pub fn get_all_logged_entries(&mut self, reference: NaiveDateTime) -> Result<Vec<LoggedEntry>> {
        let count = self.get_logging_count()?;
        let earliest = reference - chrono::Duration::minutes(i64::from(count));
        let mut entries = Vec::with_capacity(count as usize);

        for index in 0..count {
            match self.get_logged_entry(index) {
                Ok(Some(value)) => {
                    let timestamp = earliest + chrono::Duration::minutes(i64::from(index));
                    entries.push(LoggedEntry {
                        index,
                        timestamp,
                        value,
                    });
                }
                Ok(None) => log::warn!("Logged entry {}: no reply, skipping", index),
                Err(e) => log::warn!("Logged entry {}: {}, skipping", index, e),
            }
            log::debug!("Read {}/{} logged entries", index + 1, count);
        }

        Ok(entries)
    }

    /// Erases the on-device log. Success is the write succeeding; the device
    /// sends no reply worth parsing.
    pub fn erase_logged_data(&mut self) -> Result<()> {
        let transport = self.transport_mut()?;
        transport.send(&Command::EraseLoggedData.encode())?;
        log::info!("Erased logged data");
        Ok(())
    }

    /// Writes new calibration constants to the device and adopts them for
    /// the rest of the session.
    pub fn set_calibration(&mut self, calibration: Calibration) -> Result<()> {
        let transport = self.transport_mut()?;
        transport.send(
            &Command::SetCalibration {
                multiplier: calibration.multiplier,
                offset: calibration.offset,
            }
            .encode(),
        )?;
        self.calibration = Some(calibration);
        log::info!(
            "Calibration set to multiplier={} offset={}",
            calibration.multiplier,
            calibration.offset
        );
        Ok(())
    }
}

/// The connect-time calibration read: a 5-byte multiplier reply followed by
/// a bare 4-byte offset reply. Silence on either fails the connect.
fn read_calibration<T: Transport>(transport: &mut T) -> crate::serial::Result<Calibration> {
    transport.send(&Command::ReadCalibration.encode())?;

    let multiplier_reply = transport.read_up_to(REPLY_LEN)?;
    let multiplier = protocol::decode_f32(&multiplier_reply)?.ok_or_else(silent_reply_error)?;

    let offset_reply = transport.read_up_to(protocol::OFFSET_REPLY_LEN)?;
    let offset = protocol::decode_offset(&offset_reply)?;

    Ok(Calibration { multiplier, offset })
}

fn silent_reply_error() -> SerialError {
    SerialError::UnexpectedReply {
        expected: REPLY_LEN,
        got: 0,
    }
}
