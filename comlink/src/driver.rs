//! Lifecycle controller and event entry points.
//!
//! Three kinds of events reach an interface:
//!
//! - hardware interrupts, through `Comlink::on_interrupt`,
//! - timer expiries (periodic poll and transmit timeout), through `Comlink::on_tick`,
//! - the stack, through `ifup`, `ifdown` and `tx_available`.
//!
//! Each of them runs to completion with the interface's `IrqLock` held.
//! The watchdog has its own lock, always taken after the device lock and
//! released before any timer callback runs.

use crate::{
    buffer::PacketBuffer,
    config::Config,
    device::{Device, DeviceId},
    error::{ComlinkError, ComlinkResult},
    nic::{Interrupts, Nic},
    stack::{LinkResolver, NetStack, PollAction},
    stats::Statistics,
    watchdog::{self, Callback, Tick, TimerHandle, Watchdog},
};
use alloc::vec::Vec;
use holonet::l2::ethernet::{EtherType, Frame, HEADER_LEN, MacAddress};
use hyperdrive::locks::{InterruptMask, NoMask, irq::IrqLock};
use log::{debug, error, info, warn};

type Timers<C, M> = IrqLock<Watchdog<C, DeviceId>, M>;

struct Interface<N, S, M: InterruptMask> {
    irq: u8,
    mac: MacAddress,
    device: IrqLock<Device<N, S>, M>,
}

/// Driver core for a set of network interfaces.
///
/// `M` masks the CPU's interrupts around every critical section.
pub struct Comlink<N, S, M: InterruptMask = NoMask> {
    config: Config,
    interfaces: Vec<Interface<N, S, M>>,
    timers: Timers<Comlink<N, S, M>, M>,
}

impl<N: Nic, S: NetStack, M: InterruptMask> Comlink<N, S, M> {
    /// Registers one interface per controller, in order.
    ///
    /// Every interface starts down.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `config` does not validate, `NoInterfaces` if no
    /// controller is given, `IrqAttach` if an interrupt line cannot be attached
    /// and `Watchdog` if the timer pool is too small.
    pub fn new<I>(config: Config, interfaces: I) -> ComlinkResult<Self>
    where
        I: IntoIterator<Item = (N, S)>,
    {
        config
            .validate()
            .inspect_err(|_| error!("Invalid network configuration: {config:?}"))?;

        let mut timers = Watchdog::new(config.timer_capacity);
        let mut registered = Vec::new();

        for (index, (mut nic, stack)) in interfaces.into_iter().enumerate() {
            let id = DeviceId::new(index);

            nic.attach_irq().map_err(|err| {
                error!("Cannot attach IRQ {} for {id}: {err}", nic.irq());
                ComlinkError::IrqAttach(err)
            })?;

            let (poll_timer, tx_timeout_timer) = timers
                .create()
                .and_then(|poll| Ok((poll, timers.create()?)))
                .inspect_err(|err| error!("Cannot allocate timers for {id}: {err}"))?;

            registered.push(Interface {
                irq: nic.irq(),
                mac: nic.mac_address(),
                device: IrqLock::new(Device::new(
                    id,
                    nic,
                    stack,
                    config.frame_capacity(),
                    poll_timer,
                    tx_timeout_timer,
                )),
            });
        }

        if registered.is_empty() {
            error!("No network interface to drive");
            return Err(ComlinkError::NoInterfaces);
        }
        info!("{} network interface(s) registered", registered.len());

        Ok(Self {
            config,
            interfaces: registered,
            timers: IrqLock::new(timers),
        })
    }

    #[must_use]
    #[inline]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Identifiers of every registered interface.
    pub fn devices(&self) -> impl Iterator<Item = DeviceId> {
        (0..self.interfaces.len()).map(DeviceId::new)
    }

    fn interface(&self, id: DeviceId) -> ComlinkResult<&Interface<N, S, M>> {
        self.interfaces
            .get(id.as_usize())
            .ok_or(ComlinkError::UnknownDevice)
    }

    /// # Errors
    ///
    /// Returns `UnknownDevice` if `id` is not registered.
    pub fn mac_address(&self, id: DeviceId) -> ComlinkResult<MacAddress> {
        Ok(self.interface(id)?.mac)
    }

    /// # Errors
    ///
    /// Returns `UnknownDevice` if `id` is not registered.
    pub fn is_up(&self, id: DeviceId) -> ComlinkResult<bool> {
        self.with_device(id, Device::is_up)
    }

    /// # Errors
    ///
    /// Returns `UnknownDevice` if `id` is not registered.
    pub fn statistics(&self, id: DeviceId) -> ComlinkResult<Statistics> {
        self.with_device(id, |device| *device.statistics())
    }

    /// Runs `f` on the state of an interface, with its lock held.
    ///
    /// # Errors
    ///
    /// Returns `UnknownDevice` if `id` is not registered.
    pub fn with_device<R, F>(&self, id: DeviceId, f: F) -> ComlinkResult<R>
    where
        F: FnOnce(&Device<N, S>) -> R,
    {
        Ok(self.interface(id)?.device.with_locked(|device| f(device)))
    }

    /// Deadline of a timer, if it is armed.
    ///
    /// # Errors
    ///
    /// Returns `Watchdog` if `handle` is unknown.
    pub fn timer_deadline(&self, handle: TimerHandle) -> ComlinkResult<Option<Tick>> {
        Ok(self.timers.with_locked(|timers| timers.deadline(handle))?)
    }

    /// Brings an interface up: resets the controller, arms the poll timer and
    /// enables reception.
    ///
    /// # Errors
    ///
    /// Returns `UnknownDevice` if `id` is not registered and `AlreadyUp` if the
    /// interface is up.
    pub fn ifup(&self, id: DeviceId) -> ComlinkResult<()> {
        let interface = self.interface(id)?;

        interface.device.with_locked(|dev| -> ComlinkResult<()> {
            if dev.link_up {
                return Err(ComlinkError::AlreadyUp);
            }
            info!("Bringing up {id}, MAC: {}", interface.mac);

            dev.nic.reset();
            dev.buffer.clear();
            dev.tx_outstanding = false;
            dev.consecutive_timeouts = 0;

            self.timers.with_locked(|timers| {
                timers.start(
                    dev.poll_timer,
                    self.config.poll_interval_ticks,
                    Self::poll_expiry,
                    id,
                )
            })?;
            dev.link_up = true;

            dev.nic.set_interrupt_mask(Interrupts::RX);
            dev.nic.enable_irq();

            Ok(())
        })
    }

    /// Brings an interface down. Pending timers are cancelled and the buffer is discarded.
    ///
    /// Bringing down an interface that is already down is harmless.
    ///
    /// # Errors
    ///
    /// Returns `UnknownDevice` if `id` is not registered.
    pub fn ifdown(&self, id: DeviceId) -> ComlinkResult<()> {
        self.interface(id)?
            .device
            .with_locked(|dev| self.shutdown(dev))
    }

    /// Tells the driver that the stack has data to send.
    ///
    /// The stack is polled at once if the interface is up and the controller has room.
    ///
    /// # Errors
    ///
    /// Returns `UnknownDevice` if `id` is not registered.
    pub fn tx_available(&self, id: DeviceId) -> ComlinkResult<()> {
        self.interface(id)?.device.with_locked(|dev| {
            if dev.link_up && dev.nic.tx_ready() {
                self.poll_stack(dev, None);
            }
        });
        Ok(())
    }

    /// Interrupt handler entry point. Returns whether an interface claimed `irq`.
    ///
    /// When several interfaces share a line, the first one registered handles it.
    pub fn on_interrupt(&self, irq: u8) -> bool {
        let Some(interface) = self.interfaces.iter().find(|interface| interface.irq == irq) else {
            return false;
        };
        interface.device.with_locked(|dev| self.dispatch(dev));
        true
    }

    /// Timer interrupt entry point. Runs every timer due by `now` and returns how many ran.
    pub fn on_tick(&self, now: Tick) -> usize {
        watchdog::expire(&self.timers, now, self)
    }

    /// Recovers from a transmit that never completed: resets the controller and polls the stack.
    ///
    /// Does nothing if the interface is down or if no transmit is outstanding,
    /// so that a timeout racing with a completion is harmless.
    ///
    /// # Errors
    ///
    /// Returns `UnknownDevice` if `id` is not registered.
    pub fn tx_timeout(&self, id: DeviceId) -> ComlinkResult<()> {
        self.interface(id)?.device.with_locked(|dev| -> ComlinkResult<()> {
            if !dev.link_up || !dev.tx_outstanding {
                debug!("{id}: stale transmit timeout");
                return Ok(());
            }

            dev.stats.tx_timeouts += 1;
            dev.tx_outstanding = false;
            dev.consecutive_timeouts = dev.consecutive_timeouts.saturating_add(1);
            self.timers
                .with_locked(|timers| timers.cancel(dev.tx_timeout_timer))?;

            if let Some(max) = self.config.max_consecutive_timeouts
                && dev.consecutive_timeouts >= max.get()
            {
                error!(
                    "{id}: {} consecutive transmit timeouts, bringing the interface down",
                    dev.consecutive_timeouts
                );
                return self.shutdown(dev);
            }

            warn!("{id}: transmit timed out, resetting the controller");
            dev.nic.reset();
            dev.nic.set_interrupt_mask(Interrupts::RX);
            dev.buffer.clear();

            if dev.nic.tx_ready() {
                self.poll_stack(dev, None);
            }
            Ok(())
        })
    }

    fn poll_expiry(this: &Self, id: DeviceId) {
        if let Err(err) = this.on_poll_timer(id) {
            error!("{id}: poll timer failed: {err}");
        }
    }

    fn tx_timeout_expiry(this: &Self, id: DeviceId) {
        if let Err(err) = this.tx_timeout(id) {
            error!("{id}: transmit timeout recovery failed: {err}");
        }
    }

    fn on_poll_timer(&self, id: DeviceId) -> ComlinkResult<()> {
        self.interface(id)?.device.with_locked(|dev| -> ComlinkResult<()> {
            if !dev.link_up {
                debug!("{id}: poll timer fired while down");
                return Ok(());
            }

            if dev.nic.tx_ready() {
                self.poll_stack(dev, Some(self.config.poll_half_secs));
            }

            self.timers.with_locked(|timers| {
                timers.start(
                    dev.poll_timer,
                    self.config.poll_interval_ticks,
                    Self::poll_expiry,
                    id,
                )
            })?;
            Ok(())
        })
    }

    fn shutdown(&self, dev: &mut Device<N, S>) -> ComlinkResult<()> {
        dev.nic.disable_irq();
        dev.nic.set_interrupt_mask(Interrupts::empty());

        self.timers.with_locked(|timers| {
            timers.cancel(dev.poll_timer)?;
            timers.cancel(dev.tx_timeout_timer)
        })?;

        let was_up = core::mem::replace(&mut dev.link_up, false);
        dev.tx_outstanding = false;
        dev.consecutive_timeouts = 0;

        dev.nic.reset();
        dev.buffer.clear();

        if was_up {
            info!("{} is down", dev.id);
        }
        Ok(())
    }

    fn dispatch(&self, dev: &mut Device<N, S>) {
        dev.nic.set_interrupt_mask(Interrupts::empty());
        let status = dev.nic.take_status();

        if !dev.link_up {
            debug!("{}: interrupt while down ({status:?})", dev.id);
            return;
        }

        // Replies to received frames go out before the completion poll.
        if status.contains(Interrupts::RX) {
            self.receive(dev);
        }
        if status.contains(Interrupts::TX_DONE) {
            self.on_tx_complete(dev);
        }

        let mut mask = Interrupts::RX;
        if dev.tx_outstanding {
            mask |= Interrupts::TX_DONE;
        }
        dev.nic.set_interrupt_mask(mask);
    }

    /// Drains every received frame, feeding each one to the stack.
    fn receive(&self, dev: &mut Device<N, S>) {
        let ip = u16::from(self.config.ip_family.ethertype());
        let arp = u16::from(EtherType::Arp);
        let (stack, buffer, mut tx) = self.split(dev);

        while tx.nic.rx_pending() {
            match buffer.receive_with(|storage| tx.nic.receive(storage)) {
                Ok(len) if len >= HEADER_LEN => {}
                Ok(len) => {
                    tx.stats.rx_errors += 1;
                    debug!("{}: dropping runt frame ({len} bytes)", tx.id);
                    buffer.clear();
                    continue;
                }
                Err(err) => {
                    tx.stats.rx_errors += 1;
                    debug!("{}: dropping received frame: {err}", tx.id);
                    continue;
                }
            }
            tx.stats.rx_packets += 1;

            let ethertype = Frame::new_unchecked(buffer.frame()).ethertype_raw();
            if ethertype == ip {
                tx.stats.rx_ip += 1;
                stack.arp_ipin(buffer);
                stack.input(buffer);
                if !buffer.is_empty() {
                    let resolver: &mut dyn LinkResolver = &mut *stack;
                    tx.reply(Some(resolver), buffer);
                }
            } else if ethertype == arp {
                tx.stats.rx_arp += 1;
                stack.arp_input(buffer);
                // ARP replies carry their link-layer header already.
                if !buffer.is_empty() {
                    tx.reply(None, buffer);
                }
            } else {
                tx.stats.rx_dropped += 1;
                debug!("{}: dropping frame with EtherType {ethertype:#06x}", tx.id);
            }

            buffer.clear();
        }
    }

    fn on_tx_complete(&self, dev: &mut Device<N, S>) {
        if let Err(err) = self
            .timers
            .with_locked(|timers| timers.cancel(dev.tx_timeout_timer))
        {
            error!("{}: cannot cancel the transmit timeout: {err}", dev.id);
        }

        if core::mem::replace(&mut dev.tx_outstanding, false) {
            dev.stats.tx_done += 1;
        } else {
            debug!("{}: completion without outstanding transmit", dev.id);
        }
        dev.consecutive_timeouts = 0;

        if dev.nic.tx_ready() {
            self.poll_stack(dev, None);
        }
    }

    /// Lets the stack send whatever it has, or advance its timers when `half_secs` is set.
    fn poll_stack(&self, dev: &mut Device<N, S>, half_secs: Option<u16>) {
        let (stack, buffer, mut tx) = self.split(dev);
        let mut hook = |resolver: &mut dyn LinkResolver, buffer: &mut PacketBuffer| {
            tx.poll_hook(resolver, buffer)
        };

        match half_secs {
            Some(half_secs) => stack.timer_poll(buffer, &mut hook, half_secs),
            None => stack.poll(buffer, &mut hook),
        }

        buffer.clear();
    }

    fn split<'d>(
        &'d self,
        dev: &'d mut Device<N, S>,
    ) -> (&'d mut S, &'d mut PacketBuffer, Transmitter<'d, N, Self, M>) {
        let Device {
            id,
            nic,
            stack,
            buffer,
            stats,
            tx_outstanding,
            tx_timeout_timer,
            ..
        } = dev;

        let tx = Transmitter {
            id: *id,
            nic,
            stats,
            tx_outstanding,
            timer: *tx_timeout_timer,
            timers: &self.timers,
            timeout_ticks: self.config.tx_timeout_ticks,
            on_timeout: Self::tx_timeout_expiry,
        };
        (stack, buffer, tx)
    }
}

/// Transmit side of a device, borrowed apart from its stack and its buffer.
struct Transmitter<'a, N, C, M: InterruptMask> {
    id: DeviceId,
    nic: &'a mut N,
    stats: &'a mut Statistics,
    tx_outstanding: &'a mut bool,
    timer: TimerHandle,
    timers: &'a Timers<C, M>,
    timeout_ticks: Tick,
    on_timeout: Callback<C, DeviceId>,
}

impl<N: Nic, C, M: InterruptMask> Transmitter<'_, N, C, M> {
    /// Hands the frame in `buffer` to the controller and arms the transmit timeout.
    ///
    /// The buffer is empty on return, whether the frame was accepted or not.
    fn transmit(&mut self, buffer: &mut PacketBuffer) -> ComlinkResult<()> {
        self.stats.tx_packets += 1;

        let saved = self.nic.interrupt_mask();
        self.nic.set_interrupt_mask(Interrupts::empty());
        let sent = self.nic.transmit(buffer.frame());
        // Completions are only wanted while interrupts are live.
        let restored = if saved.is_empty() {
            saved
        } else {
            saved | Interrupts::TX_DONE
        };
        self.nic.set_interrupt_mask(restored);
        buffer.clear();

        if let Err(err) = sent {
            self.stats.tx_errors += 1;
            warn!("{}: transmit failed: {err}", self.id);
            return Err(err.into());
        }

        *self.tx_outstanding = true;
        self.timers.with_locked(|timers| {
            timers.start(self.timer, self.timeout_ticks, self.on_timeout, self.id)
        })?;
        Ok(())
    }

    /// Sends the reply left by the stack, if the controller has room for it.
    fn reply(&mut self, resolver: Option<&mut dyn LinkResolver>, buffer: &mut PacketBuffer) {
        if !self.nic.tx_ready() {
            self.stats.tx_dropped += 1;
            warn!("{}: no room to reply, dropping {} bytes", self.id, buffer.len());
            buffer.clear();
            return;
        }

        if let Some(resolver) = resolver {
            resolver.arp_out(buffer);
        }
        // Hardware failures are already counted and logged by `transmit`.
        if let Err(ComlinkError::Watchdog(err)) = self.transmit(buffer) {
            error!("{}: cannot arm the transmit timeout: {err}", self.id);
        }
    }

    fn poll_hook(&mut self, resolver: &mut dyn LinkResolver, buffer: &mut PacketBuffer) -> PollAction {
        if buffer.is_empty() {
            return PollAction::Continue;
        }

        if !self.nic.tx_ready() {
            self.stats.tx_dropped += 1;
            warn!("{}: controller full, dropping {} bytes", self.id, buffer.len());
            buffer.clear();
            return PollAction::Stop;
        }

        resolver.arp_out(buffer);
        match self.transmit(buffer) {
            Ok(()) if self.nic.tx_ready() => PollAction::Continue,
            Ok(()) => PollAction::Stop,
            Err(ComlinkError::Watchdog(err)) => {
                error!("{}: cannot arm the transmit timeout: {err}", self.id);
                PollAction::Stop
            }
            Err(_) => PollAction::Stop,
        }
    }
}
