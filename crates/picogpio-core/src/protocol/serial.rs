//! Serial port handling
//!
//! Provides the real serial backend: opening and configuring ports, the
//! line-oriented [`SerialTransport`], and a diagnostic listing of the ports
//! the operating system knows about.

use serialport::{SerialPort, SerialPortInfo, SerialPortType};
use std::collections::HashMap;
#[cfg(target_os = "linux")]
use std::fs;
use std::io::{Read, Write};
use std::time::{Duration, Instant};

use super::transport::{LineBuffer, PortOpener, Transport};
use super::{ProtocolError, DEFAULT_BAUD_RATE};

/// USB vendor id of Raspberry Pi boards
pub const RASPBERRY_PI_VID: u16 = 0x2E8A;

/// Interval between polls of the input queue while waiting for a line
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Information about an available serial port
#[derive(Debug, Clone)]
pub struct PortInfo {
    /// Port name (e.g., "/dev/ttyACM0" or "COM3")
    pub name: String,

    /// USB vendor ID (if USB device)
    pub vid: Option<u16>,

    /// USB product ID (if USB device)
    pub pid: Option<u16>,

    /// Manufacturer name (if available)
    pub manufacturer: Option<String>,

    /// Product name (if available)
    pub product: Option<String>,

    /// Serial number (if available)
    pub serial_number: Option<String>,
}

impl PortInfo {
    fn bare(name: String) -> Self {
        Self {
            name,
            vid: None,
            pid: None,
            manufacturer: None,
            product: None,
            serial_number: None,
        }
    }

    /// True when the USB vendor id belongs to Raspberry Pi
    pub fn is_pico(&self) -> bool {
        self.vid == Some(RASPBERRY_PI_VID)
    }
}

impl From<SerialPortInfo> for PortInfo {
    fn from(info: SerialPortInfo) -> Self {
        let (vid, pid, manufacturer, product, serial_number) = match info.port_type {
            SerialPortType::UsbPort(usb_info) => (
                Some(usb_info.vid),
                Some(usb_info.pid),
                usb_info.manufacturer,
                usb_info.product,
                usb_info.serial_number,
            ),
            _ => (None, None, None, None, None),
        };

        Self {
            name: info.port_name,
            vid,
            pid,
            manufacturer,
            product,
            serial_number,
        }
    }
}

/// Sort key used so that:
///  - ttyACM* ports come first (sorted numerically by suffix)
///  - then ttyUSB* ports (sorted numerically)
///  - then other ports (by numeric suffix, then name)
pub(crate) fn port_sort_key(name: &str) -> (u8, usize, String) {
    let basename = name.rsplit(['/', '\\']).next().unwrap_or(name);
    if let Some(rest) = basename.strip_prefix("ttyACM") {
        let num = rest.parse::<usize>().unwrap_or(usize::MAX);
        return (0, num, basename.to_string());
    }
    if let Some(rest) = basename.strip_prefix("ttyUSB") {
        let num = rest.parse::<usize>().unwrap_or(usize::MAX);
        return (1, num, basename.to_string());
    }
    (2, numeric_suffix(basename), basename.to_string())
}

/// Trailing decimal number of a port name, `usize::MAX` if there is none
pub(crate) fn numeric_suffix(name: &str) -> usize {
    let digits = name.len() - name.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    name[name.len() - digits..]
        .parse::<usize>()
        .unwrap_or(usize::MAX)
}

/// List all available serial ports, with /dev fallbacks and deterministic ordering
pub fn list_ports() -> Vec<PortInfo> {
    let mut map: HashMap<String, PortInfo> = HashMap::new();
    for info in serialport::available_ports().unwrap_or_default() {
        let p = PortInfo::from(info);
        map.entry(p.name.clone()).or_insert(p);
    }

    // Linux-only: add /dev/ttyACM* and /dev/ttyUSB* entries the API missed
    #[cfg(target_os = "linux")]
    if let Ok(entries) = fs::read_dir("/dev") {
        for entry in entries.flatten() {
            if let Some(fname) = entry.file_name().to_str() {
                if fname.starts_with("ttyACM") || fname.starts_with("ttyUSB") {
                    let full = format!("/dev/{}", fname);
                    map.entry(full.clone())
                        .or_insert_with(|| PortInfo::bare(full));
                }
            }
        }
    }

    let mut v: Vec<PortInfo> = map.into_values().collect();
    v.sort_by_key(|p| port_sort_key(&p.name));
    v
}

/// Open a serial port, defaulting to 115200 baud
pub fn open_port(
    name: &str,
    baud_rate: Option<u32>,
    read_timeout: Duration,
) -> Result<Box<dyn SerialPort>, ProtocolError> {
    let baud = baud_rate.unwrap_or(DEFAULT_BAUD_RATE);
    serialport::new(name, baud)
        .timeout(read_timeout)
        .open()
        .map_err(|e| ProtocolError::from_open_error(name, e))
}

/// Configure a serial port for the GPIO firmware (8N1, no flow control)
pub fn configure_port(port: &mut dyn SerialPort) -> Result<(), ProtocolError> {
    port.set_data_bits(serialport::DataBits::Eight)?;
    port.set_parity(serialport::Parity::None)?;
    port.set_stop_bits(serialport::StopBits::One)?;
    port.set_flow_control(serialport::FlowControl::None)?;

    // USB CDC stdio on the Pico only transmits once the host asserts DTR
    if let Err(e) = port.write_data_terminal_ready(true) {
        tracing::warn!("configure_port: failed to set DTR high: {} (continuing)", e);
    }
    if let Err(e) = port.write_request_to_send(true) {
        tracing::warn!("configure_port: failed to set RTS high: {} (continuing)", e);
    }

    Ok(())
}

/// Clear the serial port input buffer
pub fn clear_buffers(port: &mut dyn SerialPort) -> Result<(), ProtocolError> {
    port.clear(serialport::ClearBuffer::Input)?;
    Ok(())
}

/// Line-oriented transport over an OS serial port
pub struct SerialTransport {
    port: Option<Box<dyn SerialPort>>,
    name: String,
    buffer: LineBuffer,
}

impl SerialTransport {
    /// Open and configure `name`
    pub fn open(name: &str, baud_rate: u32, read_timeout: Duration) -> Result<Self, ProtocolError> {
        let mut port = open_port(name, Some(baud_rate), read_timeout)?;
        configure_port(port.as_mut())?;
        tracing::debug!("opened {} at {} baud", name, baud_rate);
        Ok(Self {
            port: Some(port),
            name: name.to_string(),
            buffer: LineBuffer::new(),
        })
    }

    fn port_mut(&mut self) -> Result<&mut Box<dyn SerialPort>, ProtocolError> {
        self.port.as_mut().ok_or(ProtocolError::NotConnected)
    }
}

impl Transport for SerialTransport {
    fn port_name(&self) -> &str {
        &self.name
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), ProtocolError> {
        let port = self.port_mut()?;
        port.write_all(data)?;
        port.flush()?;
        tracing::debug!("tx {}: {:?}", self.name, String::from_utf8_lossy(data));
        Ok(())
    }

    fn read_line(&mut self, deadline: Instant) -> Result<Option<String>, ProtocolError> {
        loop {
            if let Some(line) = self.buffer.next_line() {
                tracing::debug!("rx {}: {:?}", self.name, line);
                return Ok(Some(line));
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }

            let port = self.port_mut()?;
            let available = port.bytes_to_read()? as usize;
            if available == 0 {
                std::thread::sleep(POLL_INTERVAL.min(deadline - now));
                continue;
            }

            let mut chunk = vec![0u8; available];
            match port.read(&mut chunk) {
                Ok(n) => self.buffer.extend(&chunk[..n]),
                Err(ref e)
                    if e.kind() == std::io::ErrorKind::TimedOut
                        || e.kind() == std::io::ErrorKind::WouldBlock => {}
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn drain(&mut self) -> Result<(), ProtocolError> {
        self.buffer.clear();
        let port = self.port_mut()?;
        clear_buffers(port.as_mut())
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            tracing::debug!("closed {}", self.name);
        }
        self.buffer.clear();
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        self.close();
    }
}

/// [`PortOpener`] backed by the operating system's serial ports
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialOpener;

impl PortOpener for SerialOpener {
    fn open(
        &self,
        port: &str,
        baud_rate: u32,
        read_timeout: Duration,
    ) -> Result<Box<dyn Transport>, ProtocolError> {
        Ok(Box::new(SerialTransport::open(port, baud_rate, read_timeout)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serialport::{ClearBuffer, DataBits, FlowControl, Parity, StopBits};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::thread;

    /// In-memory port; clones share the receive queue
    #[derive(Clone, Default)]
    struct MockPort {
        rx: Arc<Mutex<VecDeque<u8>>>,
    }

    impl MockPort {
        fn feed(&self, data: &[u8]) {
            self.rx.lock().unwrap().extend(data);
        }
    }

    impl Read for MockPort {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let mut rx = self.rx.lock().unwrap();
            if rx.is_empty() {
                return Err(std::io::ErrorKind::TimedOut.into());
            }
            let n = buf.len().min(rx.len());
            for (slot, byte) in buf.iter_mut().zip(rx.drain(..n)) {
                *slot = byte;
            }
            Ok(n)
        }
    }

    impl Write for MockPort {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl SerialPort for MockPort {
        fn name(&self) -> Option<String> {
            Some("mock".into())
        }
        fn baud_rate(&self) -> serialport::Result<u32> {
            Ok(DEFAULT_BAUD_RATE)
        }
        fn data_bits(&self) -> serialport::Result<DataBits> {
            Ok(DataBits::Eight)
        }
        fn flow_control(&self) -> serialport::Result<FlowControl> {
            Ok(FlowControl::None)
        }
        fn parity(&self) -> serialport::Result<Parity> {
            Ok(Parity::None)
        }
        fn stop_bits(&self) -> serialport::Result<StopBits> {
            Ok(StopBits::One)
        }
        fn timeout(&self) -> Duration {
            Duration::from_millis(10)
        }
        fn set_baud_rate(&mut self, _: u32) -> serialport::Result<()> {
            Ok(())
        }
        fn set_data_bits(&mut self, _: DataBits) -> serialport::Result<()> {
            Ok(())
        }
        fn set_flow_control(&mut self, _: FlowControl) -> serialport::Result<()> {
            Ok(())
        }
        fn set_parity(&mut self, _: Parity) -> serialport::Result<()> {
            Ok(())
        }
        fn set_stop_bits(&mut self, _: StopBits) -> serialport::Result<()> {
            Ok(())
        }
        fn set_timeout(&mut self, _: Duration) -> serialport::Result<()> {
            Ok(())
        }
        fn write_request_to_send(&mut self, _: bool) -> serialport::Result<()> {
            Ok(())
        }
        fn write_data_terminal_ready(&mut self, _: bool) -> serialport::Result<()> {
            Ok(())
        }
        fn read_clear_to_send(&mut self) -> serialport::Result<bool> {
            Ok(true)
        }
        fn read_data_set_ready(&mut self) -> serialport::Result<bool> {
            Ok(true)
        }
        fn read_ring_indicator(&mut self) -> serialport::Result<bool> {
            Ok(false)
        }
        fn read_carrier_detect(&mut self) -> serialport::Result<bool> {
            Ok(true)
        }
        fn bytes_to_read(&self) -> serialport::Result<u32> {
            Ok(self.rx.lock().unwrap().len() as u32)
        }
        fn bytes_to_write(&self) -> serialport::Result<u32> {
            Ok(0)
        }
        fn clear(&self, buffer_to_clear: ClearBuffer) -> serialport::Result<()> {
            if matches!(buffer_to_clear, ClearBuffer::Input | ClearBuffer::All) {
                self.rx.lock().unwrap().clear();
            }
            Ok(())
        }
        fn try_clone(&self) -> serialport::Result<Box<dyn SerialPort>> {
            Ok(Box::new(self.clone()))
        }
        fn set_break(&self) -> serialport::Result<()> {
            Ok(())
        }
        fn clear_break(&self) -> serialport::Result<()> {
            Ok(())
        }
    }

    fn transport_over(port: &MockPort) -> SerialTransport {
        SerialTransport {
            port: Some(Box::new(port.clone())),
            name: "mock".into(),
            buffer: LineBuffer::new(),
        }
    }

    #[test]
    fn test_read_line_gives_up_at_deadline() {
        let port = MockPort::default();
        let mut transport = transport_over(&port);

        let start = Instant::now();
        let line = transport
            .read_line(start + Duration::from_millis(60))
            .unwrap();

        let elapsed = start.elapsed();
        assert_eq!(line, None);
        assert!(elapsed >= Duration::from_millis(60), "returned after {elapsed:?}");
        assert!(elapsed < Duration::from_millis(500), "returned after {elapsed:?}");
    }

    #[test]
    fn test_read_line_picks_up_late_input() {
        let port = MockPort::default();
        let mut transport = transport_over(&port);
        let feeder = port.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            feeder.feed(b"debug\r\nAOK\n");
        });

        let start = Instant::now();
        let deadline = start + Duration::from_secs(2);
        assert_eq!(transport.read_line(deadline).unwrap().as_deref(), Some("debug"));
        assert_eq!(transport.read_line(deadline).unwrap().as_deref(), Some("AOK"));
        assert!(start.elapsed() < Duration::from_secs(1));
        handle.join().unwrap();
    }

    #[test]
    fn test_read_line_holds_partial_line() {
        let port = MockPort::default();
        let mut transport = transport_over(&port);

        port.feed(b"AHI");
        let line = transport
            .read_line(Instant::now() + Duration::from_millis(30))
            .unwrap();
        assert_eq!(line, None);

        port.feed(b"GH\n");
        let line = transport
            .read_line(Instant::now() + Duration::from_millis(30))
            .unwrap();
        assert_eq!(line.as_deref(), Some("AHIGH"));
    }

    #[test]
    fn test_drain_discards_buffered_and_pending_input() {
        let port = MockPort::default();
        let mut transport = transport_over(&port);

        port.feed(b"banner\npartial");
        let deadline = Instant::now() + Duration::from_millis(30);
        assert_eq!(transport.read_line(deadline).unwrap().as_deref(), Some("banner"));
        port.feed(b"more\n");

        transport.drain().unwrap();

        let line = transport
            .read_line(Instant::now() + Duration::from_millis(30))
            .unwrap();
        assert_eq!(line, None);
    }

    #[test]
    fn test_closed_transport_is_not_connected() {
        let port = MockPort::default();
        let mut transport = transport_over(&port);
        transport.close();
        transport.close();

        assert!(!transport.is_open());
        assert!(matches!(
            transport.write_all(b"g\n"),
            Err(ProtocolError::NotConnected)
        ));
        assert!(matches!(
            transport.read_line(Instant::now() + Duration::from_millis(30)),
            Err(ProtocolError::NotConnected)
        ));
    }

    #[test]
    fn test_list_ports() {
        // This test just ensures the function doesn't panic
        let ports = list_ports();
        for port in &ports {
            println!("Found port: {} - {:?}", port.name, port.product);
        }
    }

    #[test]
    fn test_port_sorting() {
        let names = vec![
            "/dev/ttyUSB1",
            "/dev/ttyACM1",
            "/dev/ttyUSB0",
            "/dev/ttyACM0",
            "/dev/someport",
            "/dev/ttyACM10",
        ];
        let mut ports: Vec<PortInfo> = names
            .into_iter()
            .map(|n| PortInfo::bare(n.to_string()))
            .collect();

        ports.sort_by_key(|p| port_sort_key(&p.name));
        let ordered: Vec<String> = ports.into_iter().map(|p| p.name).collect();

        assert_eq!(
            ordered,
            vec![
                "/dev/ttyACM0",
                "/dev/ttyACM1",
                "/dev/ttyACM10",
                "/dev/ttyUSB0",
                "/dev/ttyUSB1",
                "/dev/someport",
            ]
        );
    }

    #[test]
    fn test_numeric_suffix() {
        assert_eq!(numeric_suffix("cu.usbmodem14101"), 14101);
        assert_eq!(numeric_suffix("COM3"), 3);
        assert_eq!(numeric_suffix("tty.usbserial-A"), usize::MAX);
    }

    #[test]
    fn test_pico_vendor() {
        let mut info = PortInfo::bare("/dev/ttyACM0".into());
        assert!(!info.is_pico());
        info.vid = Some(RASPBERRY_PI_VID);
        assert!(info.is_pico());
    }

    #[test]
    fn test_open_missing_port_fails() {
        let result = SerialTransport::open(
            "/dev/picogpio-no-such-port",
            DEFAULT_BAUD_RATE,
            Duration::from_millis(50),
        );
        assert!(result.is_err());
    }
}
