pub mod datagram;
pub mod stats;

use std::{
    cmp::Ordering as SeqOrdering,
    net::SocketAddr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, OnceLock,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use datagram::{is_receive_timeout, Datagram, UdpDatagram};
use stats::{SocketStats, StatCounters};

use crate::{
    address::Address,
    config::SocketConfig,
    connection::ConnectionTable,
    error::{Result, SocketError},
    packet::{pad, PacketKind, WirePacket},
    queue::{InboundQueue, PackageSink, ReceivedPackage},
    sequence::SequenceNumber,
};

/// Where a socket is in its life. It only ever moves forward
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Lifecycle {
    Empty,
    Active,
    Terminated,
}

impl Lifecycle {
    fn name(&self) -> &'static str {
        match self {
            Lifecycle::Empty => "not started",
            Lifecycle::Active => "active",
            Lifecycle::Terminated => "terminated",
        }
    }
}

/// What happens to an inbound data packet, decided while the connection table is locked
enum Verdict {
    Deliver,
    Duplicate,
    Gap(SequenceNumber),
}

/// A UDP socket that numbers every data packet per peer, resends it until the peer
/// acknowledges it, and only accepts inbound packets in exact sequence order.
///
/// Three loops share one socket: [listen](Self::listen_loop) and [resend](Self::resend_loop),
/// usually started with [spawn_loops](Self::spawn_loops), and the application calling
/// [send](Self::send) and draining the [sink](PackageSink)
pub struct ReliableSocket<K = InboundQueue>
where
    K: PackageSink,
{
    config: SocketConfig,
    lifecycle: Mutex<Lifecycle>,
    terminated: AtomicBool,
    datagram: OnceLock<Box<dyn Datagram>>,
    /// Where the punch-through probe goes, only set for sockets behind a NAT
    rendezvous: OnceLock<Option<SocketAddr>>,
    connections: Mutex<ConnectionTable>,
    sink: K,
    stats: StatCounters,
    dropped_first_data: AtomicBool,
}

impl ReliableSocket<InboundQueue> {
    /// Creates a socket that collects accepted packages in an [inbound queue](InboundQueue)
    pub fn new(config: SocketConfig) -> Self {
        Self::with_sink(config, InboundQueue::new())
    }

    pub fn has_pending(&self) -> bool {
        self.sink.has_pending()
    }

    /// Pops the oldest accepted package
    pub fn dequeue(&self) -> Option<ReceivedPackage> {
        self.sink.dequeue()
    }

    /// Pops the oldest accepted package, waiting up to `timeout` for one
    pub fn dequeue_timeout(&self, timeout: Duration) -> Option<ReceivedPackage> {
        self.sink.dequeue_timeout(timeout)
    }
}

impl<K> ReliableSocket<K>
where
    K: PackageSink,
{
    /// Creates a socket that hands accepted packages to `sink`. Nothing is bound until
    /// [start](Self::start)
    pub fn with_sink(config: SocketConfig, sink: K) -> Self {
        Self {
            config,
            lifecycle: Mutex::new(Lifecycle::Empty),
            terminated: AtomicBool::new(false),
            datagram: OnceLock::new(),
            rendezvous: OnceLock::new(),
            connections: Mutex::new(ConnectionTable::new()),
            sink,
            stats: StatCounters::default(),
            dropped_first_data: AtomicBool::new(false),
        }
    }

    /// Binds the socket. Without a `rendezvous` it binds exactly `local`, like a server would.
    /// With one it binds an ephemeral port on `local`'s host, and the listen loop first sends
    /// a punch-through probe to the rendezvous so a NAT in front of us opens up
    pub fn start(&self, local: &Address, rendezvous: Option<&Address>) -> Result<()> {
        let receive_timeout = self.config.receive_timeout;

        self.activate(rendezvous, |rendezvous| {
            let mut bind_addr = local.resolve()?;
            if rendezvous.is_some() {
                bind_addr.set_port(0);
            }

            let datagram = UdpDatagram::bind(bind_addr, receive_timeout)?;
            Ok(Box::new(datagram) as Box<dyn Datagram>)
        })
    }

    /// Starts on an already opened [datagram](Datagram)
    pub fn start_with<D>(&self, datagram: D, rendezvous: Option<&Address>) -> Result<()>
    where
        D: Datagram + 'static,
    {
        self.activate(rendezvous, move |_| Ok(Box::new(datagram) as Box<dyn Datagram>))
    }

    fn activate<F>(&self, rendezvous: Option<&Address>, open: F) -> Result<()>
    where
        F: FnOnce(Option<SocketAddr>) -> Result<Box<dyn Datagram>>,
    {
        let mut lifecycle = self.lifecycle();
        if *lifecycle != Lifecycle::Empty {
            return Err(SocketError::IllegalState {
                operation: "start",
                state: lifecycle.name(),
            });
        }

        self.config.validate()?;
        let rendezvous = rendezvous.map(Address::resolve).transpose()?;

        let datagram = open(rendezvous)?;
        let local = datagram.local_addr()?;
        if self.datagram.set(datagram).is_err() || self.rendezvous.set(rendezvous).is_err() {
            return Err(SocketError::IllegalState {
                operation: "start",
                state: "already bound",
            });
        }

        *lifecycle = Lifecycle::Active;
        match rendezvous {
            Some(rendezvous) => log::info!("Socket started on {local}, rendezvous {rendezvous}"),
            None => log::info!("Socket started on {local}"),
        }

        Ok(())
    }

    /// Sends `message` to `peer` and keeps resending it until `peer` acknowledges it.
    /// Shorter messages are padded with zeros, longer ones are refused
    pub fn send(&self, peer: &Address, message: &[u8]) -> Result<()> {
        let datagram = self.active("send")?;

        let max = self.config.package_size;
        if message.len() > max {
            return Err(SocketError::PayloadTooLarge {
                size: message.len(),
                max,
            });
        }

        let target = peer.resolve()?;
        let address = Address::from(target);
        let payload = pad(message, max);

        let mut connections = self.connections();
        let connection = connections.get_or_create(&address);

        if let Some(limit) = self.config.max_pending_sends {
            let pending = connection.pending_count();
            if pending >= limit {
                return Err(SocketError::Backpressure { address, pending });
            }
        }

        let number = connection.advance_send_number();
        let packet = WirePacket::new(number, payload);
        let now = Instant::now();
        connection.touch(now);
        connection.pending_sends.insert(&packet, now);

        if self.config.debug.skip_first_transmission && number == SequenceNumber::FIRST {
            log::debug!("Holding back package {number} to {address}, leaving it to the resend loop");
            return Ok(());
        }

        if let Err(e) = self.transmit(datagram, &packet.encode(), target) {
            drop(connections);
            return Err(self.fail(e));
        }

        Ok(())
    }

    /// Receives datagrams until the socket is terminated, acknowledging and delivering data
    /// packets in sequence order. Fails, terminating the socket, if the network does
    pub fn listen_loop(&self) -> Result<()> {
        let datagram = self.active("listen")?;

        if let Some(rendezvous) = self.rendezvous.get().copied().flatten() {
            log::info!("Punching through to {rendezvous}");
            let probe = WirePacket::probe(self.config.package_size);
            if let Err(e) = self.transmit(datagram, &probe.encode(), rendezvous) {
                return Err(self.fail(e));
            }
        }

        let mut buf = vec![0; self.config.datagram_size()];
        while !self.is_terminated() {
            buf.fill(0);

            let (size, source) = match datagram.recv_from(&mut buf) {
                Ok(received) => received,
                Err(e) if is_receive_timeout(&e) => continue,
                Err(e) => {
                    if self.is_terminated() {
                        return Ok(());
                    }

                    return Err(self.fail(e.into()));
                }
            };

            if let Err(e) = self.handle_datagram(datagram, &buf[..size], source) {
                return Err(self.fail(e));
            }
        }

        Ok(())
    }

    /// Resends every packet that has waited [resend timeout](SocketConfig::resend_timeout)
    /// for its acknowledgement, waking every [resend interval](SocketConfig::resend_interval)
    /// until the socket is terminated
    pub fn resend_loop(&self) -> Result<()> {
        let datagram = self.active("resend")?;

        while !self.is_terminated() {
            if let Err(e) = self.resend_expired(datagram) {
                if self.is_terminated() {
                    return Ok(());
                }

                return Err(self.fail(e));
            }

            if let Some(idle) = self.config.idle_peer_timeout {
                self.evict_idle_peers(idle);
            }

            thread::sleep(self.config.resend_interval);
        }

        Ok(())
    }

    /// Runs the [listen](Self::listen_loop) and [resend](Self::resend_loop) loops on their own
    /// threads
    pub fn spawn_loops(self: &Arc<Self>) -> Result<SocketLoops>
    where
        K: 'static,
    {
        self.active("spawn loops")?;

        let listener = Arc::clone(self);
        let listen = thread::Builder::new()
            .name("socket-listen".to_string())
            .spawn(move || listener.listen_loop())?;

        let resender = Arc::clone(self);
        let resend = thread::Builder::new()
            .name("socket-resend".to_string())
            .spawn(move || resender.resend_loop())?;

        Ok(SocketLoops { listen, resend })
    }

    /// Stops both loops and closes the socket. Pending sends are abandoned. Calling it again,
    /// or before [start](Self::start), does nothing
    pub fn terminate(&self) {
        let mut lifecycle = self.lifecycle();
        if *lifecycle != Lifecycle::Active {
            return;
        }

        *lifecycle = Lifecycle::Terminated;
        self.terminated.store(true, Ordering::SeqCst);

        if let Some(datagram) = self.datagram.get() {
            datagram.close();
        }

        log::info!("Socket terminated");
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &SocketConfig {
        &self.config
    }

    /// Where accepted packages go
    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn stats(&self) -> SocketStats {
        self.stats.snapshot()
    }

    /// The address the socket is bound to. Fails once it is terminated and the port released
    pub fn local_addr(&self) -> Result<SocketAddr> {
        let datagram = self.datagram.get().ok_or(SocketError::IllegalState {
            operation: "read the local address",
            state: Lifecycle::Empty.name(),
        })?;

        Ok(datagram.local_addr()?)
    }

    /// Every peer we currently hold a connection for
    pub fn peers(&self) -> Vec<Address> {
        self.connections().addresses()
    }

    /// How many sends to `peer` are still waiting on an acknowledgement
    pub fn pending_sends(&self, peer: &Address) -> usize {
        let Ok(address) = peer.canonical() else {
            return 0;
        };

        self.connections()
            .get(&address)
            .map(|connection| connection.pending_count())
            .unwrap_or(0)
    }

    fn handle_datagram(
        &self,
        datagram: &dyn Datagram,
        bytes: &[u8],
        source: SocketAddr,
    ) -> Result<()> {
        let packet = match WirePacket::decode(bytes) {
            Ok(packet) => packet,
            Err(e) => {
                log::warn!("Dropping datagram from {source}: {e}");
                return Ok(());
            }
        };

        let address = Address::from(source);
        match packet.kind() {
            PacketKind::Probe => {
                StatCounters::bump(&self.stats.probes_received);
                log::debug!("Received punch-through probe from {address}");
                self.connections()
                    .get_or_create(&address)
                    .touch(Instant::now());

                Ok(())
            }
            PacketKind::Ack => {
                self.on_ack(&address, packet.number);
                Ok(())
            }
            PacketKind::Data => self.on_data(datagram, address, source, packet),
        }
    }

    fn on_ack(&self, address: &Address, number: SequenceNumber) {
        let mut connections = self.connections();
        let connection = connections.get_or_create(address);
        connection.touch(Instant::now());

        if connection.pending_sends.acknowledge(number) {
            StatCounters::bump(&self.stats.acks_received);
            return;
        }

        StatCounters::bump(&self.stats.unknown_acks);
        log::debug!(
            "Received ACK package {number} from {address}, but there is no such package to acknowledge"
        );
    }

    fn on_data(
        &self,
        datagram: &dyn Datagram,
        address: Address,
        source: SocketAddr,
        packet: WirePacket,
    ) -> Result<()> {
        if self.config.debug.drop_first_data_package
            && !self.dropped_first_data.swap(true, Ordering::SeqCst)
        {
            log::debug!("Dropping data package {} from {address} on purpose", packet.number);
            return Ok(());
        }

        let verdict = {
            let mut connections = self.connections();
            let connection = connections.get_or_create(&address);
            connection.touch(Instant::now());

            let expected = connection.expected_receive_number;
            match packet.number.cmp(&expected) {
                SeqOrdering::Equal => {
                    connection.expected_receive_number = expected.next();
                    Verdict::Deliver
                }
                SeqOrdering::Less => Verdict::Duplicate,
                SeqOrdering::Greater => Verdict::Gap(expected),
            }
        };

        let number = packet.number;
        match verdict {
            Verdict::Deliver => {
                StatCounters::bump(&self.stats.delivered);
                self.sink.accept(ReceivedPackage {
                    source: address,
                    payload: packet.payload,
                });
            }
            Verdict::Duplicate => {
                StatCounters::bump(&self.stats.duplicates);
                log::debug!("Received package {number} from {address} again, acknowledging it again");
            }
            Verdict::Gap(expected) => {
                StatCounters::bump(&self.stats.gaps);
                log::debug!(
                    "Received package {number} from {address}, but next package number is {expected}, dropping"
                );
                return Ok(());
            }
        }

        let ack = WirePacket::ack(number, self.config.package_size);
        self.transmit(datagram, &ack.encode(), source)?;
        StatCounters::bump(&self.stats.acks_sent);

        Ok(())
    }

    /// One pass over every peer. The table stays locked for the whole pass
    fn resend_expired(&self, datagram: &dyn Datagram) -> Result<()> {
        let now = Instant::now();
        let timeout = self.config.resend_timeout;
        let mut connections = self.connections();

        for connection in connections.iter_mut() {
            let mut expired = connection.pending_sends.expired(now, timeout).peekable();
            if expired.peek().is_none() {
                continue;
            }

            let target = connection.address.resolve()?;
            for (number, pending) in expired {
                log::debug!(
                    "Package {number} to {} was not acknowledged within timeout, resending",
                    connection.address
                );

                self.transmit(datagram, &pending.bytes, target)?;
                pending.last_sent = now;
                StatCounters::bump(&self.stats.retransmissions);
            }
        }

        Ok(())
    }

    fn evict_idle_peers(&self, idle: Duration) {
        let evicted = self.connections().evict_idle(Instant::now(), idle);
        for address in evicted.iter() {
            log::info!("Freed idle peer {address}");
        }

        StatCounters::add(&self.stats.peers_evicted, evicted.len() as u64);
    }

    fn transmit(&self, datagram: &dyn Datagram, bytes: &[u8], target: SocketAddr) -> Result<()> {
        datagram.send_to(bytes, target)?;
        StatCounters::bump(&self.stats.datagrams_sent);

        Ok(())
    }

    /// Terminates the socket after an unrecoverable network failure
    fn fail(&self, error: SocketError) -> SocketError {
        log::error!("Terminating socket: {error}");
        self.terminate();
        error
    }

    /// The bound datagram, as long as the socket is [active](Lifecycle::Active)
    fn active(&self, operation: &'static str) -> Result<&dyn Datagram> {
        let lifecycle = *self.lifecycle();
        if lifecycle != Lifecycle::Active {
            return Err(SocketError::IllegalState {
                operation,
                state: lifecycle.name(),
            });
        }

        self.datagram
            .get()
            .map(|datagram| datagram.as_ref())
            .ok_or(SocketError::IllegalState {
                operation,
                state: Lifecycle::Empty.name(),
            })
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn connections(&self) -> MutexGuard<'_, ConnectionTable> {
        self.connections
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Handles of the threads running a socket's [listen](ReliableSocket::listen_loop) and
/// [resend](ReliableSocket::resend_loop) loops
pub struct SocketLoops {
    listen: JoinHandle<Result<()>>,
    resend: JoinHandle<Result<()>>,
}

impl SocketLoops {
    /// Waits for both loops, which only return once the socket is terminated. Reports the
    /// listen loop's error first
    pub fn join(self) -> Result<()> {
        let listen = self
            .listen
            .join()
            .unwrap_or_else(|panic| std::panic::resume_unwind(panic));
        let resend = self
            .resend
            .join()
            .unwrap_or_else(|panic| std::panic::resume_unwind(panic));

        listen.and(resend)
    }
}
