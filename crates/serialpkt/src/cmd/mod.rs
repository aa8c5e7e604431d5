use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use serialpkt_packet::{FreshnessPolicy, PacketConfig, MAX_PAYLOAD};

use crate::exit::{io_error, CliError, CliResult};
use crate::output::{from_hex, OutputFormat};

pub mod decode;
pub mod encode;
pub mod listen;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build one frame from a payload.
    Encode(EncodeArgs),
    /// Parse frames from a file or stdin and print each packet.
    Decode(DecodeArgs),
    /// Send one frame over a serial device.
    Send(SendArgs),
    /// Read frames from a serial device and print them.
    Listen(ListenArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Policy {
    /// Whole packet must arrive within the timeout.
    MaxMessageTime,
    /// Each byte must arrive within the timeout of the previous one.
    MinInterByteDelta,
}

impl From<Policy> for FreshnessPolicy {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::MaxMessageTime => FreshnessPolicy::MaxMessageTime,
            Policy::MinInterByteDelta => FreshnessPolicy::MinInterByteDelta,
        }
    }
}

/// Engine options shared by every subcommand that frames or parses packets.
#[derive(Args, Debug, Clone)]
pub struct EngineArgs {
    /// Stuff delimiter bytes out of payloads (both ends must agree).
    #[arg(long)]
    pub packed: bool,
    /// Staleness timeout for partial packets (e.g. 50ms, 2s).
    #[arg(long, default_value = "50ms")]
    pub timeout: String,
    /// How staleness is measured.
    #[arg(long, value_enum, default_value_t = Policy::MinInterByteDelta)]
    pub policy: Policy,
}

impl EngineArgs {
    pub fn config(&self) -> CliResult<PacketConfig> {
        Ok(PacketConfig {
            timeout: parse_duration(&self.timeout)?,
            packed: self.packed,
            freshness: self.policy.into(),
        })
    }
}

/// Where a payload comes from.
#[derive(Args, Debug, Clone, Default)]
pub struct PayloadArgs {
    /// Payload as a UTF-8 string.
    #[arg(long, conflicts_with_all = ["hex", "file"])]
    pub data: Option<String>,
    /// Payload as hex digits (e.g. "7e0102").
    #[arg(long, conflicts_with_all = ["data", "file"])]
    pub hex: Option<String>,
    /// Read payload from a file.
    #[arg(long, conflicts_with_all = ["data", "hex"])]
    pub file: Option<PathBuf>,
}

impl PayloadArgs {
    pub fn resolve(&self) -> CliResult<Vec<u8>> {
        let payload = if let Some(data) = &self.data {
            data.as_bytes().to_vec()
        } else if let Some(hex) = &self.hex {
            from_hex(hex).map_err(|err| CliError::usage(format!("--hex: {err}")))?
        } else if let Some(path) = &self.file {
            fs::read(path)
                .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?
        } else {
            return Err(CliError::usage("one of --data, --hex or --file is required"));
        };

        if payload.is_empty() {
            return Err(CliError::usage("payload must not be empty"));
        }
        if payload.len() > MAX_PAYLOAD {
            return Err(CliError::usage(format!(
                "payload is {} bytes, maximum is {MAX_PAYLOAD}",
                payload.len()
            )));
        }
        Ok(payload)
    }
}

/// Packet header fields chosen by the sender.
#[derive(Args, Debug, Clone)]
pub struct HeaderArgs {
    /// Command word (1..=1014).
    #[arg(long, short = 'c', default_value = "1", value_parser = clap::value_parser!(u16).range(1..=MAX_PAYLOAD as i64))]
    pub command: u16,
    /// Packet ID, used to select a callback on the receiver.
    #[arg(long, default_value = "0")]
    pub id: u8,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    #[command(flatten)]
    pub payload: PayloadArgs,
    #[command(flatten)]
    pub header: HeaderArgs,
    #[command(flatten)]
    pub engine: EngineArgs,
    /// Write the raw frame to this file instead of describing it on stdout.
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Input file. Reads stdin when omitted or "-".
    pub input: Option<PathBuf>,
    /// Treat the input as hex text rather than raw bytes.
    #[arg(long = "hex-input")]
    pub hex_input: bool,
    /// Input frames were built with delimiter stuffing.
    #[arg(long)]
    pub packed: bool,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Serial device path.
    pub device: PathBuf,
    /// Line speed.
    #[arg(long, short = 'b', default_value = "115200")]
    pub baud: u32,
    #[command(flatten)]
    pub payload: PayloadArgs,
    #[command(flatten)]
    pub header: HeaderArgs,
    #[command(flatten)]
    pub engine: EngineArgs,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Serial device path.
    pub device: PathBuf,
    /// Line speed.
    #[arg(long, short = 'b', default_value = "115200")]
    pub baud: u32,
    /// Exit after receiving N packets.
    #[arg(long)]
    pub count: Option<usize>,
    /// Only print packets with these IDs (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub ids: Option<Vec<u8>>,
    /// Delay between polls when the line is idle (e.g. 5ms).
    #[arg(long, default_value = "5ms")]
    pub poll_interval: String,
    #[command(flatten)]
    pub engine: EngineArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show build details.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::usage("duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, true)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::usage(format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::usage("duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
