use std::io::{Read, Write};
use std::time::Duration;

use serialport::{SerialPort, SerialPortType};

use super::{Result, SerialError, SerialPortInfo};

// Apogee SQ-series sensors enumerate as an FTDI FT230X USB-serial bridge
pub const APOGEE_VID: u16 = 0x0403;
pub const APOGEE_PID: u16 = 0x6015;
pub const BAUD_RATE: u32 = 115_200;
pub const READ_TIMEOUT: Duration = Duration::from_millis(500);

/// One request/response exchange is a write followed by a blocking read with
/// a fixed timeout. The trait exists so tests can substitute a scripted
/// transport for the real serial link.
pub trait Transport {
    /// Writes a complete command frame to the device.
    fn send(&mut self, frame: &[u8]) -> Result<()>;

    /// Reads up to `n` bytes, truncated to whatever arrived before the
    /// read timeout. An empty buffer means the device stayed silent.
    fn read_up_to(&mut self, n: usize) -> Result<Vec<u8>>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send(&mut self, frame: &[u8]) -> Result<()> {
        (**self).send(frame)
    }

    fn read_up_to(&mut self, n: usize) -> Result<Vec<u8>> {
        (**self).read_up_to(n)
    }
}

pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    /// Opens the named port at the fixed sensor baud rate.
    pub fn open(port_name: &str) -> Result<Self> {
        let port = serialport::new(port_name, BAUD_RATE)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|e| SerialError::ConnectionFailed(format!("{}: {}", port_name, e)))?;

        log::info!("Opened {} at {} baud", port_name, BAUD_RATE);
        Ok(Self { port })
    }

    /// Lists serial ports whose USB identifiers match an Apogee sensor.
    pub fn discover_ports() -> Result<Vec<SerialPortInfo>> {
        let ports = serialport::available_ports()?;
        let mut sensors = Vec::new();

        for port in ports {
            if let SerialPortType::UsbPort(usb_info) = port.port_type {
                if usb_info.vid == APOGEE_VID && usb_info.pid == APOGEE_PID {
                    sensors.push(SerialPortInfo {
                        port_name: port.port_name.clone(),
                        vid: usb_info.vid,
                        pid: usb_info.pid,
                        serial_number: usb_info.serial_number.clone(),
                        manufacturer: usb_info.manufacturer.clone(),
                        product: usb_info.product.clone(),
                    });
                }
            }
        }

        Ok(sensors)
    }
}

impl Transport for SerialTransport {
    fn send(&mut self, frame: &[u8]) -> Result<()> {
        self.port.write_all(frame)?;
        self.port.flush()?;
        Ok(())
    }

    fn read_up_to(&mut self, n: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; n];
        let mut filled = 0;

        while filled < n {
            match self.port.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(read) => filled += read,
                Err(ref e) if e.kind() == std::io::ErrorKind::TimedOut => break,
                Err(e) => return Err(SerialError::IoError(e)),
            }
        }

        buf.truncate(filled);
        Ok(buf)
    }
}
