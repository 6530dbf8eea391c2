//! A scripted controller and stack sharing one event log.
#![allow(dead_code)]

use comlink::{
    Comlink, DeviceId,
    buffer::PacketBuffer,
    config::Config,
    error::NicError,
    nic::{Interrupts, Nic},
    stack::{LinkResolver, NetStack, PollAction, PollHook},
};
use holonet::l2::ethernet::{EtherType, Frame, HEADER_LEN, MacAddress};
use std::{cell::RefCell, collections::VecDeque, rc::Rc};

pub const IRQ: u8 = 11;
pub const MAC: MacAddress = MacAddress::new([0x52, 0x54, 0x00, 0x12, 0x34, 0x56]);
pub const PEER: MacAddress = MacAddress::new([0x52, 0x54, 0x00, 0xab, 0xcd, 0xef]);
pub const ETH0: DeviceId = DeviceId::new(0);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Reset,
    Transmit(usize),
    Input,
    ArpIpin,
    ArpInput,
    ArpOut,
    Poll,
    TimerPoll(u16),
}

#[derive(Debug, Default)]
pub struct WireState {
    pub events: Vec<Event>,
    /// Every call made to the controller.
    pub nic_calls: usize,

    pub rx: VecDeque<Result<Vec<u8>, NicError>>,
    pub status: Interrupts,
    pub mask: Interrupts,
    pub irq_enabled: bool,
    pub attach_fails: bool,
    pub tx_busy: bool,
    /// The controller is full after each transmit.
    pub tx_single_slot: bool,
    pub tx_fails: bool,
    pub transmitted: Vec<Vec<u8>>,

    /// Length of the reply `input` writes, if any.
    pub ip_reply: Option<usize>,
    /// Length of the reply `arp_input` writes, if any.
    pub arp_reply: Option<usize>,
    /// Lengths of the frames the stack sends when polled.
    pub outbox: VecDeque<usize>,
    /// The stack keeps writing frames after being told to stop.
    pub ignore_stop: bool,
}

impl WireState {
    pub fn count(&self, event: &Event) -> usize {
        self.events.iter().filter(|e| *e == event).count()
    }

    pub fn polls(&self) -> usize {
        self.count(&Event::Poll)
    }

    pub fn timer_polls(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, Event::TimerPoll(_)))
            .count()
    }

    pub fn transmits(&self) -> Vec<usize> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Transmit(len) => Some(*len),
                _ => None,
            })
            .collect()
    }

    /// Queues a received frame and raises the RX interrupt.
    pub fn deliver(&mut self, frame: Vec<u8>) {
        self.rx.push_back(Ok(frame));
        self.status |= Interrupts::RX;
    }

    pub fn complete_transmit(&mut self) {
        self.status |= Interrupts::TX_DONE;
    }
}

pub type Wire = Rc<RefCell<WireState>>;

pub struct MockNic {
    wire: Wire,
}

impl Nic for MockNic {
    fn mac_address(&self) -> MacAddress {
        self.wire.borrow_mut().nic_calls += 1;
        MAC
    }

    fn irq(&self) -> u8 {
        self.wire.borrow_mut().nic_calls += 1;
        IRQ
    }

    fn attach_irq(&mut self) -> Result<(), NicError> {
        let mut wire = self.wire.borrow_mut();
        wire.nic_calls += 1;
        if wire.attach_fails {
            Err(NicError::Hardware)
        } else {
            Ok(())
        }
    }

    fn reset(&mut self) {
        let mut wire = self.wire.borrow_mut();
        wire.nic_calls += 1;
        wire.events.push(Event::Reset);
        wire.mask = Interrupts::empty();
    }

    fn enable_irq(&mut self) {
        let mut wire = self.wire.borrow_mut();
        wire.nic_calls += 1;
        wire.irq_enabled = true;
    }

    fn disable_irq(&mut self) {
        let mut wire = self.wire.borrow_mut();
        wire.nic_calls += 1;
        wire.irq_enabled = false;
    }

    fn interrupt_mask(&self) -> Interrupts {
        let mut wire = self.wire.borrow_mut();
        wire.nic_calls += 1;
        wire.mask
    }

    fn set_interrupt_mask(&mut self, mask: Interrupts) {
        let mut wire = self.wire.borrow_mut();
        wire.nic_calls += 1;
        wire.mask = mask;
    }

    fn take_status(&mut self) -> Interrupts {
        let mut wire = self.wire.borrow_mut();
        wire.nic_calls += 1;
        core::mem::take(&mut wire.status)
    }

    fn rx_pending(&self) -> bool {
        let mut wire = self.wire.borrow_mut();
        wire.nic_calls += 1;
        !wire.rx.is_empty()
    }

    fn receive(&mut self, buffer: &mut [u8]) -> Result<usize, NicError> {
        let mut wire = self.wire.borrow_mut();
        wire.nic_calls += 1;
        let frame = wire.rx.pop_front().ok_or(NicError::Hardware)??;
        if frame.len() > buffer.len() {
            return Err(NicError::Oversized);
        }
        buffer[..frame.len()].copy_from_slice(&frame);
        Ok(frame.len())
    }

    fn tx_ready(&self) -> bool {
        let mut wire = self.wire.borrow_mut();
        wire.nic_calls += 1;
        !wire.tx_busy
    }

    fn transmit(&mut self, frame: &[u8]) -> Result<(), NicError> {
        let mut wire = self.wire.borrow_mut();
        wire.nic_calls += 1;
        if wire.tx_fails {
            return Err(NicError::Hardware);
        }
        wire.events.push(Event::Transmit(frame.len()));
        wire.transmitted.push(frame.to_vec());
        if wire.tx_single_slot {
            wire.tx_busy = true;
        }
        Ok(())
    }
}

pub struct MockStack {
    wire: Wire,
}

impl MockStack {
    fn log(&self, event: Event) {
        self.wire.borrow_mut().events.push(event);
    }

    fn send_outbox(&mut self, buffer: &mut PacketBuffer, hook: PollHook<'_>) {
        loop {
            let Some(len) = self.wire.borrow_mut().outbox.pop_front() else {
                break;
            };
            write_frame(buffer, EtherType::IpV4, len);
            let ignore_stop = self.wire.borrow().ignore_stop;
            if hook(self, buffer) == PollAction::Stop && !ignore_stop {
                break;
            }
        }
    }
}

impl LinkResolver for MockStack {
    fn arp_out(&mut self, buffer: &mut PacketBuffer) {
        self.log(Event::ArpOut);
        let mut frame = Frame::new_unchecked(buffer.frame_mut());
        frame.set_dst_addr(PEER);
    }
}

impl NetStack for MockStack {
    fn input(&mut self, buffer: &mut PacketBuffer) {
        self.log(Event::Input);
        let reply = self.wire.borrow().ip_reply;
        match reply {
            Some(len) => write_frame(buffer, EtherType::IpV4, len),
            None => buffer.clear(),
        }
    }

    fn arp_ipin(&mut self, _buffer: &mut PacketBuffer) {
        self.log(Event::ArpIpin);
    }

    fn arp_input(&mut self, buffer: &mut PacketBuffer) {
        self.log(Event::ArpInput);
        let reply = self.wire.borrow().arp_reply;
        match reply {
            Some(len) => write_frame(buffer, EtherType::Arp, len),
            None => buffer.clear(),
        }
    }

    fn poll(&mut self, buffer: &mut PacketBuffer, hook: PollHook<'_>) {
        self.log(Event::Poll);
        self.send_outbox(buffer, hook);
    }

    fn timer_poll(&mut self, buffer: &mut PacketBuffer, hook: PollHook<'_>, half_secs: u16) {
        self.log(Event::TimerPoll(half_secs));
        self.send_outbox(buffer, hook);
    }
}

/// Writes an outgoing frame of `len` bytes from this host.
fn write_frame(buffer: &mut PacketBuffer, ethertype: EtherType, len: usize) {
    let bytes = buffer.prepare(len).unwrap();
    let mut frame = Frame::new(bytes).unwrap();
    frame.set_src_addr(MAC);
    frame.set_ethertype(ethertype);
}

/// Builds a frame of `len` bytes from the peer, carrying `ethertype`.
pub fn inbound(ethertype: u16, len: usize) -> Vec<u8> {
    assert!(len >= HEADER_LEN);
    let mut bytes = vec![0; len];
    bytes[..6].copy_from_slice(&MAC.octets());
    bytes[6..12].copy_from_slice(&PEER.octets());
    bytes[12..14].copy_from_slice(&ethertype.to_be_bytes());
    bytes
}

pub fn arp_request() -> Vec<u8> {
    inbound(0x0806, 42)
}

pub fn ipv4_packet(len: usize) -> Vec<u8> {
    inbound(0x0800, len)
}

/// A controller and its stack, both attached to `wire`.
pub fn interface(wire: &Wire) -> (MockNic, MockStack) {
    (
        MockNic { wire: wire.clone() },
        MockStack { wire: wire.clone() },
    )
}

pub fn setup_with(config: Config) -> (Comlink<MockNic, MockStack>, Wire) {
    let wire = Wire::default();
    let comlink = Comlink::new(config, [interface(&wire)]).unwrap();
    (comlink, wire)
}

pub fn setup() -> (Comlink<MockNic, MockStack>, Wire) {
    setup_with(Config::default())
}

/// An interface brought up at tick 0, with the log cleared.
pub fn setup_up() -> (Comlink<MockNic, MockStack>, Wire) {
    let (comlink, wire) = setup();
    comlink.ifup(ETH0).unwrap();
    wire.borrow_mut().events.clear();
    (comlink, wire)
}

/// Runs the interrupt handler, as the kernel would on the controller's line.
pub fn interrupt(comlink: &Comlink<MockNic, MockStack>) {
    assert!(comlink.on_interrupt(IRQ));
}
