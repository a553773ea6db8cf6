use std::cell::Cell;
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;

use easy_i2c::config::MAGIC;
use easy_i2c::{
    Activity, AddressProbe, Bitbang, Bridge, Bus, BusLines, Config, Error, HalBus, InputMode,
    Link, TokenProgress,
};
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use embedded_hal::i2c::{ErrorKind, SevenBitAddress};
use embedded_hal_mock::eh1::delay::NoopDelay;
use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};

/// Host side of the serial link: bytes queued for the adapter, bytes it wrote back.
#[derive(Default)]
struct Host {
    to_adapter: VecDeque<u8>,
    from_adapter: Vec<u8>,
}

impl Host {
    fn take_output(&mut self) -> String {
        String::from_utf8_lossy(&std::mem::take(&mut self.from_adapter)).into_owned()
    }
}

impl Link for Host {
    fn read_byte(&mut self, _timeout_us: u32) -> Option<u8> {
        self.to_adapter.pop_front()
    }

    fn write(&mut self, bytes: &[u8]) {
        self.from_adapter.extend_from_slice(bytes);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Write {
    address: SevenBitAddress,
    bytes: Vec<u8>,
    hold: bool,
}

#[derive(Default)]
struct FakeBus {
    writes: Vec<Write>,
    reads: Vec<(SevenBitAddress, usize)>,
    data: Vec<u8>,
    fail: bool,
    /// When set, transactions insist the lines belong to the peripheral.
    attached: Option<Rc<Cell<bool>>>,
}

impl FakeBus {
    fn check_lines(&self) {
        if let Some(attached) = &self.attached {
            assert!(attached.get(), "bus used while lines are bit-banged");
        }
    }
}

impl Bus for FakeBus {
    type Error = ErrorKind;

    fn write(
        &mut self,
        address: SevenBitAddress,
        bytes: &[u8],
        hold: bool,
    ) -> Result<(), Self::Error> {
        self.check_lines();
        if self.fail {
            return Err(ErrorKind::Other);
        }
        self.writes.push(Write {
            address,
            bytes: bytes.to_vec(),
            hold,
        });
        Ok(())
    }

    fn read(&mut self, address: SevenBitAddress, buf: &mut [u8]) -> Result<(), Self::Error> {
        self.check_lines();
        if self.fail {
            return Err(ErrorKind::Other);
        }
        self.reads.push((address, buf.len()));
        buf.copy_from_slice(&self.data[..buf.len()]);
        Ok(())
    }
}

#[derive(Default)]
struct FakeProbe {
    present: Vec<SevenBitAddress>,
    probed: Vec<SevenBitAddress>,
}

impl AddressProbe for FakeProbe {
    fn probe(&mut self, address: SevenBitAddress) -> Result<bool, Error> {
        self.probed.push(address);
        Ok(self.present.contains(&address))
    }
}

fn config() -> Config {
    Config {
        color: false,
        echo: false,
        ..Config::default()
    }
}

type TestBridge<B = FakeBus, P = FakeProbe> = Bridge<Host, B, P>;

fn bridge_with(config: Config) -> TestBridge {
    Bridge::new(
        Host::default(),
        FakeBus::default(),
        FakeProbe::default(),
        config,
    )
}

fn bridge() -> TestBridge {
    bridge_with(config())
}

/// Queues `input` and polls until the adapter has consumed all of it.
fn type_in<B: Bus, P: AddressProbe>(bridge: &mut TestBridge<B, P>, input: &[u8]) -> Vec<Activity> {
    bridge.link().to_adapter.extend(input);
    let mut activity = Vec::new();
    while !bridge.link().to_adapter.is_empty() {
        activity.push(bridge.poll());
    }
    activity
}

fn output<B: Bus, P: AddressProbe>(bridge: &mut TestBridge<B, P>) -> String {
    bridge.link().take_output()
}

fn block(text: &[u8]) -> Vec<u8> {
    let mut block = text.to_vec();
    block.extend_from_slice(&MAGIC);
    block
}

#[test]
fn declared_bytes_are_written_in_order() {
    let mut bridge = bridge();
    type_in(&mut bridge, b"addr:0x50\rbytes:3\rsend 0a 0B ff\r");

    assert_eq!(
        bridge.bus().writes,
        [Write {
            address: 0x50,
            bytes: vec![0x0A, 0x0B, 0xFF],
            hold: false,
        }]
    );
    let session = bridge.session();
    assert_eq!(session.expected, 0);
    assert_eq!(session.progress, TokenProgress::None);
    assert!(!session.repeated_start);

    let out = output(&mut bridge);
    assert!(out.contains("I2C address set to 0x50\n"));
    assert!(out.contains("Expecting 3 bytes\n"));
    assert!(out.contains("Sending 3 bytes\n000: 0A 0B FF "));
}

#[test]
fn send_hold_requests_repeated_start() {
    let mut bridge = bridge();
    type_in(&mut bridge, b"bytes:1\rsend+hold 11\r");

    assert_eq!(bridge.bus().writes.len(), 1);
    assert!(bridge.bus().writes[0].hold);
    assert!(!bridge.session().repeated_start);
}

#[test]
fn payload_continues_on_the_next_line() {
    let mut bridge = bridge();
    type_in(&mut bridge, b"bytes:4\rsend 01 02\r");

    assert_eq!(bridge.session().progress, TokenProgress::Send);
    assert_eq!(bridge.payload(), [0x01, 0x02]);
    assert!(bridge.bus().writes.is_empty());
    assert!(output(&mut bridge).ends_with("Remaining bytes expected: 2\n"));

    type_in(&mut bridge, b"03\r");
    assert_eq!(bridge.payload(), [0x01, 0x02, 0x03]);
    assert!(output(&mut bridge).ends_with("Remaining bytes expected: 1\n"));

    type_in(&mut bridge, b"04\r");
    assert_eq!(bridge.bus().writes[0].bytes, [0x01, 0x02, 0x03, 0x04]);
    assert_eq!(bridge.session().progress, TokenProgress::None);
}

#[test]
fn m2m_send_reports_continue_per_line() {
    let mut bridge = bridge();
    type_in(&mut bridge, b"m2m_resp:1\rbytes:3\rsend 01\r02\r03\r");

    assert_eq!(output(&mut bridge), "..&&.");
    assert_eq!(bridge.bus().writes[0].bytes, [0x01, 0x02, 0x03]);
}

#[test]
fn extra_tokens_after_a_complete_send_are_ignored() {
    let mut bridge = bridge();
    type_in(&mut bridge, b"m2m_resp:1\rbytes:1\rsend 01 02 03\r");

    assert_eq!(output(&mut bridge), "...");
    assert_eq!(bridge.bus().writes[0].bytes, [0x01]);
}

#[test]
fn send_without_byte_count_is_rejected() {
    let mut bridge = bridge();
    type_in(&mut bridge, b"send 01\r");
    assert_eq!(output(&mut bridge), "No bytes expected\n");
    assert_eq!(bridge.session().progress, TokenProgress::None);

    type_in(&mut bridge, b"m2m_resp:1\rsend+hold\rrecv\r");
    assert_eq!(output(&mut bridge), ".XX");
}

#[test]
fn malformed_byte_aborts_without_rollback() {
    let mut bridge = bridge();
    type_in(&mut bridge, b"bytes:3\rsend 01 zz 02\r");

    assert_eq!(bridge.session().progress, TokenProgress::None);
    assert_eq!(bridge.payload(), [0x01]);
    assert!(bridge.bus().writes.is_empty());
    assert!(output(&mut bridge).ends_with("Invalid byte: zz\n"));

    // without a send in progress the leftover byte tokens are just unknown
    type_in(&mut bridge, b"02 03\r");
    assert_eq!(output(&mut bridge), "Unknown command: 02\n");
}

#[test]
fn hex_and_decimal_addresses_are_equivalent() {
    let mut bridge = bridge();
    type_in(&mut bridge, b"addr:0x32\r");
    let hex = bridge.session().address;
    type_in(&mut bridge, b"addr:0\raddr:50\r");
    assert_eq!(bridge.session().address, hex);
    assert_eq!(hex, 50);
}

#[test]
fn bad_arguments_and_unknown_commands() {
    let mut bridge = bridge();
    type_in(&mut bridge, b"addr:0x80\rfrob\rbytes:300\r");
    assert_eq!(
        output(&mut bridge),
        "Invalid argument: addr:0x80\n\
         Unknown command: frob\n\
         Too many bytes, at most 256 fit in one transfer\n"
    );

    type_in(&mut bridge, b"m2m_resp:1\rfrob\raddr:zz\r");
    assert_eq!(output(&mut bridge), ".XX");
}

#[test]
fn full_payload_over_several_lines() {
    let mut bridge = bridge();
    type_in(&mut bridge, b"m2m_resp:1\raddr:0x21\rbytes:256\r");

    let payload: Vec<u8> = (0..=255).collect();
    for (row, chunk) in payload.chunks(16).enumerate() {
        let mut line = String::from(if row == 0 { "send" } else { "" });
        for b in chunk {
            line.push_str(&format!(" {b:02x}"));
        }
        line.push('\r');
        type_in(&mut bridge, line.trim_start().as_bytes());
    }

    assert_eq!(output(&mut bridge), format!("...{}.", "&".repeat(15)));
    assert_eq!(
        bridge.bus().writes,
        [Write {
            address: 0x21,
            bytes: payload,
            hold: false,
        }]
    );
    let session = bridge.session();
    assert_eq!(session.expected, 0);
    assert_eq!(session.progress, TokenProgress::None);
    assert!(bridge.payload().is_empty());
}

#[test]
fn receive_prints_hex_dump() {
    let mut bridge = bridge();
    bridge.bus().data = (b'a'..=b'z').collect();
    type_in(&mut bridge, b"addr:0x20\rbytes:20\rrecv\r");

    assert_eq!(bridge.bus().reads, [(0x20, 20)]);
    let out = output(&mut bridge);
    let dump: Vec<&str> = out.lines().skip(2).collect();
    assert_eq!(dump.len(), 2);
    assert_eq!(
        dump[0],
        "000: 61 62 63 64 65 66 67 68 69 6A 6B 6C 6D 6E 6F 70 : abcdefghijklmnop"
    );
    assert_eq!(
        dump[1],
        format!("016: 71 72 73 74 {}: qrst{}", " ".repeat(36), " ".repeat(12))
    );
    // a receive keeps the byte count for the next one
    assert_eq!(bridge.session().expected, 20);
}

#[test]
fn m2m_receive_streams_in_acknowledged_chunks() {
    let mut bridge = bridge();
    bridge.bus().data = (0..32).collect();
    type_in(&mut bridge, b"m2m_resp:1\rbytes:32\rrecv\r&&");

    let hex: String = (0..32).map(|b| format!("{b:02X} ")).collect();
    let expected = format!("..{}&{}&.", &hex[..48], &hex[48..]);
    assert_eq!(output(&mut bridge), expected);
}

#[test]
fn m2m_receive_abort_and_timeout() {
    let mut bridge = bridge();
    bridge.bus().data = vec![0x5A; 32];
    type_in(&mut bridge, b"m2m_resp:1\rbytes:32\rrecv\rX");
    assert_eq!(output(&mut bridge), format!("..{}&.", "5A ".repeat(16)));

    // no reply at all
    type_in(&mut bridge, b"recv\r");
    assert_eq!(output(&mut bridge), format!("{}&X", "5A ".repeat(16)));

    // the adapter is back to taking commands
    type_in(&mut bridge, b"addr:9\r");
    assert_eq!(output(&mut bridge), ".");
}

#[test]
fn bus_failures_are_protocol_errors() {
    let mut bridge = bridge();
    bridge.bus().fail = true;
    type_in(&mut bridge, b"bytes:1\rrecv\rsend 01\r");
    let out = output(&mut bridge);
    assert!(out.contains("Protocol error reading bytes! Does the I2C device exist?\n"));
    assert!(out.ends_with("Protocol error sending bytes! Does the I2C device exist?\n"));
    assert_eq!(bridge.session().progress, TokenProgress::None);
    assert_eq!(bridge.session().expected, 0);

    type_in(&mut bridge, b"m2m_resp:1\rbytes:1\rrecv\rsend 01\r");
    assert_eq!(output(&mut bridge), "..~~");
}

#[test]
fn tryaddr_reports_presence() {
    let mut bridge = bridge();
    bridge.probe().present.push(0x3C);
    type_in(&mut bridge, b"tryaddr:0x3C\rtryaddr:61\r");

    assert_eq!(bridge.probe().probed, [0x3C, 61]);
    assert_eq!(
        output(&mut bridge),
        "Device found at address 0x3C\nProtocol error! Does the I2C device exist?\n"
    );

    type_in(&mut bridge, b"m2m_resp:1\rtryaddr:60\rtryaddr:0x3d\r");
    assert_eq!(output(&mut bridge), "..~");
}

#[test]
fn noecho_stops_echo_but_not_commands() {
    let mut bridge = bridge_with(Config {
        echo: true,
        ..config()
    });
    type_in(&mut bridge, b"noecho addr:7\r");
    assert_eq!(
        output(&mut bridge),
        "noecho addr:7\nEcho off\nI2C address set to 0x07\n"
    );

    type_in(&mut bridge, b"addr:5\r");
    assert_eq!(output(&mut bridge), "I2C address set to 0x05\n");
    assert_eq!(bridge.session().address, 5);
    assert!(!bridge.session().echo);
}

#[test]
fn echo_handles_backspace() {
    let mut bridge = bridge_with(Config {
        echo: true,
        ..config()
    });
    type_in(&mut bridge, b"ab\x08\x08\x08bin\r");
    assert_eq!(
        output(&mut bridge),
        "ab\x08 \x08\x08 \x08bin\nSwitching to binary mode\n"
    );
}

#[test]
fn m2m_mode_suppresses_echo() {
    let mut bridge = bridge_with(Config {
        echo: true,
        ..config()
    });
    type_in(&mut bridge, b"m2m_resp:1\r");
    output(&mut bridge);

    type_in(&mut bridge, b"addr:1\rm2m_resp:0\r");
    assert_eq!(output(&mut bridge), ".M2M response off\n");
}

#[test]
fn overlong_line_is_discarded() {
    let mut bridge = bridge();
    let mut input = vec![b'z'; 300];
    input.extend_from_slice(b"addr:3\r");
    type_in(&mut bridge, &input);

    assert_eq!(output(&mut bridge), "I2C address set to 0x03\n");
}

#[test]
fn longest_line_is_accepted() {
    let mut bridge = bridge();
    let mut input = b"addr:3".to_vec();
    input.resize(299, b' ');
    input.push(b'\r');
    type_in(&mut bridge, &input);

    assert_eq!(bridge.session().address, 3);
    assert_eq!(output(&mut bridge), "I2C address set to 0x03\n");
}

#[test]
fn device_query_resets_transfer_state() {
    let mut bridge = bridge();
    type_in(&mut bridge, b"bytes:4\rsend+hold 01\r");
    assert_eq!(bridge.session().progress, TokenProgress::Send);
    output(&mut bridge);

    let activity = type_in(&mut bridge, b"device?\r");
    assert_eq!(activity.last(), Some(&Activity::Identified));
    assert_eq!(output(&mut bridge), "easy_adapter\n\r");

    let session = bridge.session();
    assert_eq!(session.progress, TokenProgress::None);
    assert_eq!(session.expected, 0);
    assert!(!session.repeated_start);
    assert!(bridge.payload().is_empty());
    assert_eq!(bridge.poll(), Activity::Idle);
}

#[test]
fn new_byte_count_drops_a_pending_send() {
    let mut bridge = bridge();
    type_in(&mut bridge, b"bytes:4\rsend 01 02 03\rbytes:2\rsend 0a 0b\r");

    assert_eq!(bridge.bus().writes.len(), 1);
    assert_eq!(bridge.bus().writes[0].bytes, [0x0A, 0x0B]);
}

#[test]
fn binary_blocks_are_dumped_and_decoded() {
    let mut bridge = bridge();
    bridge.bus().data = vec![0xAA, 0x0D];
    type_in(&mut bridge, b"bin\r");
    assert_eq!(bridge.session().input_mode, InputMode::Binary);
    assert_eq!(output(&mut bridge), "Switching to binary mode\n");

    // carriage return is ordinary data now
    type_in(&mut bridge, &block(b"bytes:2\r "));
    let out = output(&mut bridge);
    assert!(out.starts_with("000: 62 79 74 65 73 3A 32 0D 20 "));
    assert!(out.contains(&format!(": bytes:2. {}\n", " ".repeat(7))));
    assert!(out.ends_with("Invalid argument: bytes:2.\n"));

    type_in(&mut bridge, &block(b"bytes:2 "));
    assert_eq!(bridge.session().expected, 2);
    output(&mut bridge);

    type_in(&mut bridge, &block(b"m2m_resp:1 "));
    assert!(output(&mut bridge).ends_with('.'));

    type_in(&mut bridge, &block(b"recv "));
    let out = bridge.link().from_adapter.clone();
    assert!(out.ends_with(&[0xAA, 0x0D, b'.']));
}

#[test]
fn binary_m2m_probe_is_silent() {
    let mut bridge = bridge();
    type_in(&mut bridge, b"m2m_resp:1\rbin\r");
    assert_eq!(output(&mut bridge), "..");

    type_in(&mut bridge, &block(b"tryaddr:0x10 "));
    assert_eq!(bridge.probe().probed, [0x10]);
    let out = output(&mut bridge);
    assert!(out.starts_with("000: "));
    assert!(out.ends_with("\n"));
    assert!(!out.contains('~'));
}

#[test]
fn unterminated_block_text_is_not_a_token() {
    let mut bridge = bridge();
    type_in(&mut bridge, b"bin\r");
    output(&mut bridge);

    type_in(&mut bridge, &block(b"addr:9"));
    assert_eq!(bridge.session().address, 0);
    assert_eq!(output(&mut bridge).lines().count(), 1);
}

// Bit-banged probing against fake lines, sharing the pin-mode flag with the bus.

struct Line {
    attached: Rc<Cell<bool>>,
    ack: bool,
}

impl ErrorType for Line {
    type Error = Infallible;
}

impl OutputPin for Line {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        assert!(!self.attached.get(), "line driven while owned by the peripheral");
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        assert!(!self.attached.get(), "line driven while owned by the peripheral");
        Ok(())
    }
}

impl InputPin for Line {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.ack)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(self.ack)
    }
}

struct Lines {
    attached: Rc<Cell<bool>>,
    sda: Line,
    scl: Line,
}

impl Lines {
    fn new(attached: &Rc<Cell<bool>>, ack: bool) -> Self {
        let line = || Line {
            attached: attached.clone(),
            ack,
        };
        Self {
            attached: attached.clone(),
            sda: line(),
            scl: line(),
        }
    }
}

impl BusLines for Lines {
    type Sda = Line;
    type Scl = Line;

    fn detach(&mut self) {
        self.attached.set(false);
    }

    fn attach(&mut self) {
        self.attached.set(true);
    }

    fn sda(&mut self) -> &mut Line {
        &mut self.sda
    }

    fn scl(&mut self) -> &mut Line {
        &mut self.scl
    }
}

#[test]
fn failed_probe_leaves_bus_usable() {
    let attached = Rc::new(Cell::new(true));
    let bus = FakeBus {
        data: vec![0x42],
        attached: Some(attached.clone()),
        ..FakeBus::default()
    };
    let probe = Bitbang::new(Lines::new(&attached, false), NoopDelay::new(), 5);
    let mut bridge = Bridge::new(Host::default(), bus, probe, config());

    type_in(&mut bridge, b"m2m_resp:1\rtryaddr:0x48\r");
    assert_eq!(output(&mut bridge), ".~");
    assert!(attached.get());

    type_in(&mut bridge, b"addr:0x48\rbytes:1\rrecv\rsend 07\r");
    assert_eq!(output(&mut bridge), "..42 ..");
    assert_eq!(bridge.bus().reads, [(0x48, 1)]);
    assert_eq!(bridge.bus().writes[0].bytes, [0x07]);
}

#[test]
fn acknowledged_probe_over_bitbang() {
    let attached = Rc::new(Cell::new(true));
    let probe = Bitbang::new(Lines::new(&attached, true), NoopDelay::new(), 5);
    let mut bridge = Bridge::new(Host::default(), FakeBus::default(), probe, config());

    type_in(&mut bridge, b"tryaddr:0x48\r");
    assert_eq!(output(&mut bridge), "Device found at address 0x48\n");
    assert!(attached.get());
}

#[test]
fn repeated_start_over_hal_bus() {
    let expectations = [I2cTransaction::write_read(0x68, vec![0x11], vec![0x19, 0x40])];
    let bus = HalBus::new(I2cMock::new(&expectations));
    let mut bridge = Bridge::new(Host::default(), bus, FakeProbe::default(), config());

    type_in(
        &mut bridge,
        b"m2m_resp:1\raddr:0x68\rbytes:1\rsend+hold 11\rbytes:2\rrecv\r",
    );
    assert_eq!(output(&mut bridge), ".....19 40 .");

    let (_, bus, _) = bridge.free();
    bus.free().done();
}

#[test]
fn held_write_to_absent_device_fails_on_receive() {
    let expectations = [I2cTransaction::write_read(0x68, vec![0x11], vec![0x00])
        .with_error(ErrorKind::Other)];
    let bus = HalBus::new(I2cMock::new(&expectations));
    let mut bridge = Bridge::new(Host::default(), bus, FakeProbe::default(), config());

    type_in(
        &mut bridge,
        b"m2m_resp:1\raddr:0x68\rbytes:1\rsend+hold 11\rbytes:1\rrecv\r",
    );
    assert_eq!(output(&mut bridge), ".....~");

    let (_, bus, _) = bridge.free();
    bus.free().done();
}
