use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use gdslink_frame::{Checksum, DEFAULT_MAX_DATA_SIZE};
use gdslink_updown::{DEFAULT_QUEUE_CAPACITY, DEFAULT_RETRY_COUNT};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod run;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Bridge a flight wire link to a ground distribution server.
    Run(RunArgs),
    /// Deframe a recorded wire capture and print its frames.
    Decode(DecodeArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Run(args) => run::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// How the wire to the flight peer is reached.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum AdapterKind {
    /// Connect to a flight peer listening on TCP.
    Tcp,
    /// Listen on TCP for one flight connection.
    TcpServer,
    /// Connect to a Unix domain socket.
    Unix,
    /// Listen on a Unix domain socket for one flight connection.
    UnixServer,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ChecksumArg {
    Crc32,
    Fixed,
}

impl From<ChecksumArg> for Checksum {
    fn from(arg: ChecksumArg) -> Self {
        match arg {
            ChecksumArg::Crc32 => Checksum::Crc32,
            ChecksumArg::Fixed => Checksum::Fixed,
        }
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Wire adapter kind.
    #[arg(long, value_enum, default_value = "tcp", env = "GDSLINK_ADAPTER")]
    pub adapter: AdapterKind,
    /// Wire address: host:port for TCP kinds, socket path for Unix kinds.
    #[arg(long, default_value = "127.0.0.1:50000", env = "GDSLINK_ADDRESS")]
    pub address: String,
    /// Ground distribution server address.
    #[arg(long, default_value = "127.0.0.1:50050", env = "GDSLINK_GROUND_ADDR")]
    pub ground_addr: String,
    /// Frame trailer checksum.
    #[arg(long, value_enum, default_value = "crc32", env = "GDSLINK_CHECKSUM")]
    pub checksum: ChecksumArg,
    /// Largest frame data size accepted when deframing.
    #[arg(long, default_value_t = DEFAULT_MAX_DATA_SIZE, env = "GDSLINK_MAX_FRAME_SIZE")]
    pub max_frame_size: usize,
    /// Frames held between the downlink stages before new ones are dropped.
    #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY, env = "GDSLINK_QUEUE_CAPACITY")]
    pub queue_capacity: usize,
    /// Write attempts per uplink packet.
    #[arg(long, default_value_t = DEFAULT_RETRY_COUNT, env = "GDSLINK_RETRY_COUNT")]
    pub retry_count: u32,
    /// Bound on one wire read (e.g. 100ms).
    #[arg(long, default_value = "100ms", env = "GDSLINK_READ_TIMEOUT")]
    pub read_timeout: String,
    /// Bound on the downlink send stage's wait for frames (e.g. 500ms).
    #[arg(long, default_value = "500ms", env = "GDSLINK_SEND_WAIT")]
    pub send_wait: String,
    /// Timeout for outbound connects (e.g. 5s).
    #[arg(long, default_value = "5s", env = "GDSLINK_CONNECT_TIMEOUT")]
    pub connect_timeout: String,
    /// How long server adapters wait for the flight peer. Waits forever when unset.
    #[arg(long, env = "GDSLINK_ACCEPT_TIMEOUT")]
    pub accept_timeout: Option<String>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Wire capture to decode.
    pub file: PathBuf,
    /// Frame trailer checksum.
    #[arg(long, value_enum, default_value = "crc32")]
    pub checksum: ChecksumArg,
    /// Largest frame data size accepted.
    #[arg(long, default_value_t = DEFAULT_MAX_DATA_SIZE)]
    pub max_frame_size: usize,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `500ms`, `5s` or a bare number of seconds.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .trim()
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
