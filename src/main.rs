//! usb-wifi-bridge: Wi-Fi station to USB Ethernet bridge
//!
//! This binary runs the bridge core as a soak harness against in-memory
//! collaborators: a loopback transport endpoint and an in-process lease
//! service with realistic stop-settle behavior. Synthetic host frames are
//! pushed through the inbound path, echoed by the stack sink back through
//! the outbound path, and drained from the transport, exercising both relay
//! directions plus bring-up and re-addressing end to end.
//!
//! # Usage
//!
//! ```bash
//! # Run with default configuration
//! usb-wifi-bridge -c ./config.json
//!
//! # Generate a default configuration
//! usb-wifi-bridge -g -c ./config.json
//!
//! # Run with environment overrides
//! USB_WIFI_BRIDGE_LOG_LEVEL=debug usb-wifi-bridge -c ./config.json
//! ```

use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use usb_wifi_bridge::bridge::{Bridge, FrameSink};
use usb_wifi_bridge::buffer::FrameBuffer;
use usb_wifi_bridge::config::{create_default_config, load_config_with_env, BridgeConfig};
use usb_wifi_bridge::iface::AddressAssignment;
use usb_wifi_bridge::netcfg::LocalAddressService;
use usb_wifi_bridge::relay::FrameRelay;
use usb_wifi_bridge::station::StationEvent;
use usb_wifi_bridge::transport::{LoopbackTransport, TransportEvent};

/// Command-line arguments
struct Args {
    /// Configuration file path
    config_path: PathBuf,
    /// Generate default configuration
    generate_config: bool,
    /// Check configuration only
    check_config: bool,
}

impl Args {
    fn parse() -> Self {
        let mut args = std::env::args().skip(1);
        let mut config_path = PathBuf::from("/etc/usb-wifi-bridge/config.json");
        let mut generate_config = false;
        let mut check_config = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-c" | "--config" => {
                    if let Some(path) = args.next() {
                        config_path = PathBuf::from(path);
                    }
                }
                "-g" | "--generate-config" => {
                    generate_config = true;
                }
                "--check" => {
                    check_config = true;
                }
                "-h" | "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                "-v" | "--version" => {
                    println!("usb-wifi-bridge v{}", usb_wifi_bridge::VERSION);
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown argument: {arg}");
                    print_help();
                    std::process::exit(1);
                }
            }
        }

        Self {
            config_path,
            generate_config,
            check_config,
        }
    }
}

fn print_help() {
    println!(
        r"usb-wifi-bridge v{}

Wi-Fi station to USB Ethernet bridge core (soak harness).

USAGE:
    usb-wifi-bridge [OPTIONS]

OPTIONS:
    -c, --config <PATH>     Configuration file path [default: /etc/usb-wifi-bridge/config.json]
    -g, --generate-config   Generate default configuration and exit
    --check                 Check configuration and exit
    -h, --help              Print help information
    -v, --version           Print version information

ENVIRONMENT:
    USB_WIFI_BRIDGE_SSID          Override upstream SSID
    USB_WIFI_BRIDGE_PASSPHRASE    Override upstream passphrase
    USB_WIFI_BRIDGE_LOG_LEVEL     Override log level (trace, debug, info, warn, error)
    USB_WIFI_BRIDGE_BASE_ADDRESS  Override the base exposed-side address
",
        usb_wifi_bridge::VERSION
    );
}

/// Initialize logging
fn init_logging(config: &BridgeConfig) {
    let level = match config.log.level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.log.target);

    if config.log.format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Stack sink that reflects every inbound frame back out
struct EchoSink {
    relay: Arc<FrameRelay>,
}

impl FrameSink for EchoSink {
    fn consume(&self, frame: FrameBuffer) {
        self.relay.on_network_frame(frame);
    }
}

/// Main application entry point
#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.generate_config {
        create_default_config(&args.config_path)?;
        println!("Generated default configuration at {:?}", args.config_path);
        return Ok(());
    }

    let config = load_config_with_env(&args.config_path).map_err(|e| {
        anyhow::anyhow!(
            "Failed to load configuration from {:?}: {}",
            args.config_path,
            e
        )
    })?;

    if args.check_config {
        println!("Configuration is valid");
        return Ok(());
    }

    init_logging(&config);

    info!("usb-wifi-bridge v{}", usb_wifi_bridge::VERSION);
    info!("Configuration loaded from {:?}", args.config_path);

    // In-memory collaborators
    let transport = LoopbackTransport::new();
    let service = Arc::new(LocalAddressService::default());

    let bridge = Bridge::new(
        &config,
        "02:00:11:22:33:55".parse()?,
        Arc::clone(&transport) as _,
        service as _,
        None,
    );

    let sink = Arc::new(EchoSink {
        relay: Arc::clone(bridge.relay()),
    });
    let _stack = bridge.start(sink).await;

    let (transport_tx, transport_rx) = mpsc::channel(16);
    let (station_tx, station_rx) = mpsc::channel(16);
    let _loops = bridge.spawn_event_loops(transport_rx, station_rx);

    // Scripted bring-up: transport attaches, then the station associates
    // and learns an upstream address
    transport.set_ready(true);
    transport_tx.send(TransportEvent::Attached).await?;
    station_tx.send(StationEvent::Connected).await?;
    station_tx
        .send(StationEvent::AddressAcquired(
            AddressAssignment::self_gatewayed(
                Ipv4Addr::new(10, 0, 5, 42),
                Ipv4Addr::new(255, 255, 255, 0),
            ),
        ))
        .await?;

    // Synthetic host traffic through the inbound path; the echo sink sends
    // it back out and the drain task empties the transport queue
    let traffic = {
        let relay = Arc::clone(bridge.relay());
        let transport = Arc::clone(&transport);
        tokio::spawn(async move {
            let mut seq = 0u64;
            let mut ticker = tokio::time::interval(Duration::from_millis(10));
            loop {
                ticker.tick().await;
                let len = 64 + (seq as usize * 37) % 1400;
                let frame = vec![(seq % 256) as u8; len];
                let _ = relay.on_transport_frame(&frame);
                while transport.pop_sent().is_some() {}
                seq += 1;
            }
        })
    };

    let stats = {
        let bridge = Arc::clone(&bridge);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(5));
            loop {
                ticker.tick().await;
                let relay = bridge.relay().stats().snapshot();
                let pool = bridge.pool().stats();
                info!(
                    "relay: in={}f/{}B out={}f/{}B dropped={} | pool: in_flight={} alloc={} released={}",
                    relay.inbound_frames,
                    relay.inbound_bytes,
                    relay.outbound_frames,
                    relay.outbound_bytes,
                    relay.total_dropped(),
                    pool.in_flight,
                    pool.allocated,
                    pool.released,
                );
            }
        })
    };

    info!("Bridge running; press ctrl-c to stop");
    signal::ctrl_c().await?;

    traffic.abort();
    stats.abort();

    let relay = bridge.relay().stats().snapshot();
    info!(
        "Final: inbound {} frames / {} bytes, outbound {} frames / {} bytes, {} dropped",
        relay.inbound_frames,
        relay.inbound_bytes,
        relay.outbound_frames,
        relay.outbound_bytes,
        relay.total_dropped(),
    );

    Ok(())
}
