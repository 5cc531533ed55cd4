use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use gdslink_frame::{FprimeFramer, FprimeFramerConfig, DESCRIPTOR_SIZE};
use gdslink_ground::{GroundChannel, TcpGround, TcpGroundConfig};
use gdslink_transport::{Adapter, Endpoint, WireAdapter, WireConfig};
use gdslink_updown::{
    DownlinkConfig, Downlinker, LinkSnapshot, PipelineError, UplinkConfig, Uplinker,
};
use tracing::{info, warn};

use crate::cmd::{parse_duration, AdapterKind, RunArgs};
use crate::exit::{
    ground_error, pipeline_error, transport_error, CliError, CliResult, INTERNAL, SUCCESS,
};
use crate::output::{print_stats, OutputFormat};

const SUPERVISE_INTERVAL: Duration = Duration::from_millis(50);

pub fn run(args: RunArgs, format: OutputFormat) -> CliResult<i32> {
    let endpoint = endpoint(&args)?;
    let wire_config = WireConfig {
        read_timeout: parse_duration(&args.read_timeout)?,
        connect_timeout: parse_duration(&args.connect_timeout)?,
        accept_timeout: args
            .accept_timeout
            .as_deref()
            .map(parse_duration)
            .transpose()?,
        ..WireConfig::default()
    };
    let framer_config = FprimeFramerConfig {
        checksum: args.checksum.into(),
        max_data_size: args.max_frame_size,
    };
    let downlink_config = DownlinkConfig {
        queue_capacity: args.queue_capacity,
        send_wait: parse_duration(&args.send_wait)?,
    };
    let uplink_config = UplinkConfig {
        retry_count: args.retry_count,
        ..UplinkConfig::default()
    };

    // Handshakes wrap a full-size packet in one more descriptor.
    let ground_framer = FprimeFramerConfig {
        max_data_size: framer_config.max_data_size.saturating_add(DESCRIPTOR_SIZE),
        ..framer_config.clone()
    };
    let ground = Arc::new(TcpGround::new(TcpGroundConfig {
        address: args.ground_addr.clone(),
        framer: ground_framer,
        ..TcpGroundConfig::default()
    }));
    let adapter = Arc::new(WireAdapter::with_config(endpoint, wire_config));
    let framer = Arc::new(FprimeFramer::with_config(framer_config));

    ground
        .open()
        .map_err(|err| ground_error("ground open failed", err))?;
    if let Err(err) = adapter.open() {
        close_ground(ground.as_ref());
        return Err(transport_error("wire open failed", err));
    }

    // Installed after open so a signal while waiting for the flight peer
    // still terminates the process.
    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let downlink = Downlinker::new(
        adapter.clone(),
        framer.clone(),
        ground.clone(),
        downlink_config,
    );
    let uplink = Uplinker::new(
        adapter.clone(),
        framer,
        ground.clone(),
        downlink.loopback(),
        uplink_config,
    );

    let started = downlink.start().and_then(|()| uplink.start());
    if let Err(err) = started {
        downlink.stop();
        let _ = downlink.join();
        close_adapter(adapter.as_ref());
        close_ground(ground.as_ref());
        return Err(pipeline_error("pipeline start failed", err));
    }
    info!(wire = %adapter.name(), ground = %args.ground_addr, "link up");

    while running.load(Ordering::SeqCst) && !downlink.is_finished() && !uplink.is_finished() {
        thread::sleep(SUPERVISE_INTERVAL);
    }
    if running.load(Ordering::SeqCst) {
        warn!("pipeline stage exited, shutting down");
    } else {
        info!("shutdown requested");
    }

    downlink.stop();
    uplink.stop();
    let downlink_result = downlink.join();
    let uplink_result = uplink.join();
    close_adapter(adapter.as_ref());
    close_ground(ground.as_ref());

    print_stats(
        &LinkSnapshot {
            downlink: downlink.stats(),
            uplink: uplink.stats(),
        },
        format,
    );

    report(downlink_result, uplink_result)
}

fn endpoint(args: &RunArgs) -> CliResult<Endpoint> {
    match args.adapter {
        AdapterKind::Tcp => Ok(Endpoint::TcpConnect(args.address.clone())),
        AdapterKind::TcpServer => Ok(Endpoint::TcpListen(args.address.clone())),
        #[cfg(unix)]
        AdapterKind::Unix => Ok(Endpoint::UnixConnect(args.address.clone().into())),
        #[cfg(unix)]
        AdapterKind::UnixServer => Ok(Endpoint::UnixListen(args.address.clone().into())),
        #[cfg(not(unix))]
        AdapterKind::Unix | AdapterKind::UnixServer => Err(CliError::new(
            crate::exit::USAGE,
            "unix domain socket adapters are not supported on this platform",
        )),
    }
}

fn report(
    downlink: Result<(), PipelineError>,
    uplink: Result<(), PipelineError>,
) -> CliResult<i32> {
    match (downlink, uplink) {
        (Err(err), _) => Err(pipeline_error("downlink failed", err)),
        (Ok(()), Err(err)) => Err(pipeline_error("uplink failed", err)),
        (Ok(()), Ok(())) => Ok(SUCCESS),
    }
}

fn close_adapter(adapter: &dyn Adapter) {
    if let Err(err) = adapter.close() {
        warn!(error = %err, "wire close failed");
    }
}

fn close_ground(ground: &dyn GroundChannel) {
    if let Err(err) = ground.close() {
        warn!(error = %err, "ground close failed");
    }
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
