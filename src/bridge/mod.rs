//! Bridge wiring and event loops
//!
//! Owns both interface handles, the buffer pool, the relay and the
//! reconciler, and runs the two event loops that drive them:
//!
//! ```text
//! Transport Endpoint events        Station Link events
//!   Attached  -> re-wire backend,    Connected    -> log
//!                bring-up reconcile  Disconnected -> log (collaborator
//!   Detached  -> un-wire backend                     owns reconnection)
//!                                    AddressAcquired -> upstream watcher
//! ```
//!
//! Reconciliations run on their own spawned tasks: they sleep for hundreds
//! of milliseconds at a time and must never stall the event loops or the
//! stack's serialized input processing. Nothing cancels them; a bring-up
//! reconcile and a re-addressing reconcile can overlap briefly, in which
//! case the last writer wins on the handle.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::buffer::{BufferPool, FrameBuffer};
use crate::config::BridgeConfig;
use crate::iface::{AddressAssignment, Backend, Interface, InterfaceRole, MacAddr};
use crate::netcfg::{AddressService, NatControl};
use crate::reconcile::AddressReconciler;
use crate::relay::FrameRelay;
use crate::station::StationEvent;
use crate::transport::{TransportEndpoint, TransportEvent};
use crate::upstream::UpstreamWatcher;

/// Consumer side of the exposed interface's serialized input queue
///
/// Whatever stands in for the network stack implements this; frames arrive
/// one at a time from a single task, already serialized. The sink owns each
/// frame it is handed.
pub trait FrameSink: Send + Sync {
    /// Take ownership of one inbound frame
    fn consume(&self, frame: FrameBuffer);
}

/// The assembled bridge
pub struct Bridge {
    pool: Arc<BufferPool>,
    exposed: Arc<Interface>,
    station: Arc<Interface>,
    relay: Arc<FrameRelay>,
    reconciler: Arc<AddressReconciler>,
    watcher: Arc<UpstreamWatcher>,
    base: AddressAssignment,
    input_queue_depth: usize,
    stack_input: Mutex<Option<mpsc::Sender<FrameBuffer>>>,
}

impl Bridge {
    /// Assemble a bridge from configuration and collaborators
    ///
    /// `station_mac` comes from the wireless hardware by way of the Station
    /// Link collaborator.
    #[must_use]
    pub fn new(
        config: &BridgeConfig,
        station_mac: MacAddr,
        transport: Arc<dyn TransportEndpoint>,
        service: Arc<dyn AddressService>,
        nat: Option<Arc<dyn NatControl>>,
    ) -> Arc<Self> {
        let pool = BufferPool::new(config.usb.mtu, config.relay.max_frames_in_flight);
        let exposed = Interface::new(InterfaceRole::Exposed, "usb0", config.usb.mac, config.usb.mtu);
        let station = Interface::new(InterfaceRole::Station, "wlan0", station_mac, config.usb.mtu);
        let relay = FrameRelay::new(Arc::clone(&exposed), Arc::clone(&pool), transport);
        let reconciler = Arc::new(AddressReconciler::new(
            service,
            config.addressing.retry_policy(),
        ));
        let watcher = Arc::new(UpstreamWatcher::new(
            Arc::clone(&station),
            Arc::clone(&reconciler),
            nat,
            config.addressing.host_suffix,
        ));
        watcher.bind_exposed(Arc::clone(&exposed));

        Arc::new(Self {
            pool,
            exposed,
            station,
            relay,
            reconciler,
            watcher,
            base: config.addressing.base_assignment(),
            input_queue_depth: config.relay.input_queue_depth,
            stack_input: Mutex::new(None),
        })
    }

    /// Exposed-side interface handle
    #[must_use]
    pub fn exposed(&self) -> &Arc<Interface> {
        &self.exposed
    }

    /// Station-side interface handle
    #[must_use]
    pub fn station(&self) -> &Arc<Interface> {
        &self.station
    }

    /// The frame relay; the transport collaborator feeds its inbound path
    #[must_use]
    pub fn relay(&self) -> &Arc<FrameRelay> {
        &self.relay
    }

    /// Buffer pool backing the relay
    #[must_use]
    pub fn pool(&self) -> &Arc<BufferPool> {
        &self.pool
    }

    /// Upstream watcher (exposed for direct driving in tests)
    #[must_use]
    pub fn watcher(&self) -> &Arc<UpstreamWatcher> {
        &self.watcher
    }

    /// Bring the exposed interface up
    ///
    /// Spawns the serialized stack task feeding `sink`, wires the backend
    /// hooks, attaches the link record, then applies the local-only base
    /// assignment best-effort (the lease service is left alone until the
    /// transport reports attached). Returns the stack task handle.
    pub async fn start(&self, sink: Arc<dyn FrameSink>) -> JoinHandle<()> {
        let (tx, mut rx) = mpsc::channel::<FrameBuffer>(self.input_queue_depth);

        // The single serialized processor of interface input
        let stack = tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                sink.consume(frame);
            }
            debug!("stack input queue closed");
        });

        *self.stack_input.lock() = Some(tx.clone());
        self.exposed.attach_link();
        self.exposed.wire_input(Backend::new(tx));
        self.exposed.wire_output();

        info!("{}", self.exposed.describe());

        // Default addressing so the host side is usable before the upstream
        // network is; the attach event re-runs this with the lease service
        match self.reconciler.reconcile(&self.exposed, self.base, false).await {
            Ok(outcome) => info!("{}: base addressing: {:?}", self.exposed.name(), outcome),
            Err(e) => warn!("{}: base addressing failed: {}", self.exposed.name(), e),
        }

        stack
    }

    /// Run the transport and station event loops to completion
    ///
    /// Each loop ends when its sender side closes. Returns both task
    /// handles.
    #[must_use]
    pub fn spawn_event_loops(
        self: &Arc<Self>,
        mut transport_rx: mpsc::Receiver<TransportEvent>,
        mut station_rx: mpsc::Receiver<StationEvent>,
    ) -> (JoinHandle<()>, JoinHandle<()>) {
        let bridge = Arc::clone(self);
        let transport_loop = tokio::spawn(async move {
            while let Some(event) = transport_rx.recv().await {
                bridge.on_transport_event(event);
            }
            debug!("transport event channel closed");
        });

        let bridge = Arc::clone(self);
        let station_loop = tokio::spawn(async move {
            while let Some(event) = station_rx.recv().await {
                bridge.on_station_event(event);
            }
            debug!("station event channel closed");
        });

        (transport_loop, station_loop)
    }

    fn on_transport_event(self: &Arc<Self>, event: TransportEvent) {
        match event {
            TransportEvent::Attached => {
                info!("transport attached");
                // Host re-enumeration lands here too: re-wire, then bring up
                if let Some(tx) = self.stack_input.lock().clone() {
                    self.exposed.wire_input(Backend::new(tx));
                    self.exposed.wire_output();
                }
                let bridge = Arc::clone(self);
                tokio::spawn(async move {
                    match bridge
                        .reconciler
                        .reconcile(&bridge.exposed, bridge.base, true)
                        .await
                    {
                        Ok(outcome) => {
                            info!("{}: bring-up addressing: {:?}", bridge.exposed.name(), outcome);
                        }
                        Err(e) => {
                            warn!("{}: bring-up addressing failed: {}", bridge.exposed.name(), e);
                        }
                    }
                });
            }
            TransportEvent::Detached => {
                warn!("transport detached, clearing backend hooks");
                self.exposed.detach_backend();
            }
        }
    }

    fn on_station_event(self: &Arc<Self>, event: StationEvent) {
        match event {
            StationEvent::Connected => info!("station associated"),
            StationEvent::Disconnected { reason } => {
                warn!("station disconnected (reason={reason})");
            }
            StationEvent::AddressAcquired(assignment) => {
                let bridge = Arc::clone(self);
                tokio::spawn(async move {
                    bridge.watcher.on_station_address_acquired(assignment).await;
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::netcfg::LocalAddressService;
    use crate::transport::LoopbackTransport;

    struct CountingSink(AtomicU64);

    impl FrameSink for CountingSink {
        fn consume(&self, frame: FrameBuffer) {
            self.0.fetch_add(frame.len() as u64, Ordering::Relaxed);
        }
    }

    fn test_config() -> BridgeConfig {
        BridgeConfig::default_config()
    }

    fn station_mac() -> MacAddr {
        "02:00:11:22:33:55".parse().expect("mac")
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_wires_backend_and_addresses_base() {
        let transport = LoopbackTransport::new();
        let service = Arc::new(LocalAddressService::default());
        let bridge = Bridge::new(
            &test_config(),
            station_mac(),
            transport as _,
            Arc::clone(&service) as _,
            None,
        );

        let sink = Arc::new(CountingSink(AtomicU64::new(0)));
        let _stack = bridge.start(sink).await;

        assert!(bridge.exposed().backend_ready());
        assert_eq!(
            bridge.exposed().address(),
            Some(test_config().addressing.base_assignment())
        );
        // Lease service untouched during base addressing
        assert!(!service.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_attach_event_starts_lease_service() {
        let transport = LoopbackTransport::new();
        transport.set_ready(true);
        let service = Arc::new(LocalAddressService::default());
        let bridge = Bridge::new(
            &test_config(),
            station_mac(),
            transport as _,
            Arc::clone(&service) as _,
            None,
        );

        let sink = Arc::new(CountingSink(AtomicU64::new(0)));
        let _stack = bridge.start(sink).await;

        let (tx, transport_rx) = mpsc::channel(4);
        let (_station_tx, station_rx) = mpsc::channel(4);
        let _loops = bridge.spawn_event_loops(transport_rx, station_rx);

        tx.send(TransportEvent::Attached).await.expect("send");
        // Let the bring-up reconcile run to completion
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert!(service.is_running());
        assert_eq!(
            service.assignment(),
            Some(test_config().addressing.base_assignment())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_detach_event_rejects_inbound() {
        let transport = LoopbackTransport::new();
        let service = Arc::new(LocalAddressService::default());
        let bridge = Bridge::new(
            &test_config(),
            station_mac(),
            transport as _,
            service as _,
            None,
        );

        let sink = Arc::new(CountingSink(AtomicU64::new(0)));
        let _stack = bridge.start(sink).await;

        let (tx, transport_rx) = mpsc::channel(4);
        let (_station_tx, station_rx) = mpsc::channel(4);
        let _loops = bridge.spawn_event_loops(transport_rx, station_rx);

        tx.send(TransportEvent::Detached).await.expect("send");
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(!bridge.exposed().backend_ready());
        let verdict = bridge.relay().on_transport_frame(&[0u8; 100]);
        assert_eq!(
            verdict,
            crate::relay::InboundVerdict::Rejected(
                crate::relay::RejectReason::BackendNotReady
            )
        );
    }
}
