use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use xbee_frame::{ApiMode, FrameConfig};
use xbee_interface::{open_with_config, InterfaceConfig, XBeeInterface};
use xbee_schema::FrameType;
use xbee_transport::{Endpoint, PortConfig};

use crate::exit::{interface_error, transport_error, CliError, CliResult};
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod envinfo;
pub mod listen;
pub mod ports;
pub mod send;
pub mod types;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List frame types, or show one type's layout.
    Types(TypesArgs),
    /// Build a frame and print its wire bytes.
    Encode(EncodeArgs),
    /// Decode a hex wire dump.
    Decode(DecodeArgs),
    /// Send one frame to a radio.
    Send(SendArgs),
    /// Print frames received from a radio.
    Listen(ListenArgs),
    /// List serial devices that may be radios.
    Ports(PortsArgs),
    /// Show version information.
    Version(VersionArgs),
    /// Print build and environment diagnostics.
    Envinfo(EnvinfoArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Types(args) => types::run(args, format),
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Ports(args) => ports::run(args, format),
        Command::Version(args) => version::run(args),
        Command::Envinfo(args) => envinfo::run(args, format),
    }
}

/// API mode 1 (plain) or 2 (escaped).
#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum ApiModeArg {
    #[value(name = "1", alias = "unescaped")]
    Unescaped,
    #[value(name = "2", alias = "escaped")]
    Escaped,
}

impl From<ApiModeArg> for ApiMode {
    fn from(arg: ApiModeArg) -> Self {
        match arg {
            ApiModeArg::Unescaped => ApiMode::Unescaped,
            ApiModeArg::Escaped => ApiMode::Escaped,
        }
    }
}

/// How to reach the radio.
#[derive(Args, Debug)]
pub struct ConnectArgs {
    /// Serial device, tcp:HOST:PORT or unix:PATH.
    #[arg(long, short = 'p', env = "XBEE_PORT")]
    pub port: String,
    /// Serial baud rate.
    #[arg(long, short = 'b', env = "XBEE_BAUD", default_value = "9600")]
    pub baud: u32,
    /// API mode of the radio.
    #[arg(long, env = "XBEE_API_MODE", default_value = "1")]
    pub api_mode: ApiModeArg,
}

impl ConnectArgs {
    /// Open the radio with `request_timeout` for correlated requests.
    pub fn open(&self, request_timeout: Duration) -> CliResult<XBeeInterface> {
        let endpoint: Endpoint = self
            .port
            .parse()
            .map_err(|err| transport_error("bad --port", err))?;
        let config = InterfaceConfig {
            frame: FrameConfig {
                api_mode: self.api_mode.into(),
                ..FrameConfig::default()
            },
            request_timeout,
            ..InterfaceConfig::default()
        };
        open_with_config(&endpoint, &PortConfig::with_baud(self.baud), config)
            .map_err(|err| interface_error(&format!("open {endpoint} failed"), err))
    }
}

/// A frame described on the command line.
#[derive(Args, Debug)]
pub struct FrameArgs {
    /// Frame type name (e.g. TxRequest) or identifier (e.g. 0x10).
    #[arg(long = "type", short = 't', value_name = "TYPE")]
    pub frame_type: String,
    /// Field assignment NAME=VALUE; repeatable. Values are decimal, 0x-hex,
    /// or two characters for at_cmd.
    #[arg(long = "field", short = 'f', value_name = "NAME=VALUE")]
    pub fields: Vec<String>,
    /// Payload as text.
    #[arg(long, conflicts_with = "data_hex")]
    pub data: Option<String>,
    /// Payload as hex.
    #[arg(long, value_name = "HEX", conflicts_with = "data")]
    pub data_hex: Option<String>,
    /// Source route addresses (comma-separated 16-bit values).
    #[arg(long, value_delimiter = ',', value_name = "ADDR")]
    pub route: Vec<String>,
}

#[derive(Args, Debug)]
pub struct TypesArgs {
    /// Show the layout of one type (name or identifier).
    pub frame_type: Option<String>,
    /// Only list host-to-radio or radio-to-host types.
    #[arg(long, value_enum)]
    pub direction: Option<Direction>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Direction {
    Outbound,
    Inbound,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    #[command(flatten)]
    pub frame: FrameArgs,
    /// Escape the output for API mode 2.
    #[arg(long, env = "XBEE_API_MODE", default_value = "1")]
    pub api_mode: ApiModeArg,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Hex wire dump. Read from stdin when omitted.
    pub hex: Option<String>,
    /// Read binary wire bytes from a file instead.
    #[arg(long, conflicts_with = "hex")]
    pub file: Option<PathBuf>,
    /// API mode of the dump.
    #[arg(long, env = "XBEE_API_MODE", default_value = "1")]
    pub api_mode: ApiModeArg,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    #[command(flatten)]
    pub frame: FrameArgs,
    /// Assign a frame id and wait for the correlated response.
    #[arg(long)]
    pub wait: bool,
    /// Maximum time to wait for the response (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
    /// Only print these frame types (comma-separated names or identifiers).
    #[arg(long = "type", value_delimiter = ',', value_name = "TYPE")]
    pub types: Vec<String>,
    /// Exit after printing N frames.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug, Default)]
pub struct PortsArgs {}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

#[derive(Args, Debug, Default)]
pub struct EnvinfoArgs {}

/// Resolve a frame type from its name (any case) or identifier byte.
pub fn parse_frame_type(input: &str) -> CliResult<FrameType> {
    let input = input.trim();
    if let Some(frame_type) = FrameType::ALL
        .iter()
        .copied()
        .find(|t| t.name().eq_ignore_ascii_case(input))
    {
        return Ok(frame_type);
    }

    let id = parse_number(input)
        .ok()
        .and_then(|n| u8::try_from(n).ok())
        .ok_or_else(|| CliError::usage(format!("unknown frame type: {input}")))?;
    FrameType::from_id(id)
        .ok_or_else(|| CliError::usage(format!("unknown frame type 0x{id:02x}")))
}

/// Decimal or `0x`-prefixed hex.
pub fn parse_number(input: &str) -> CliResult<u64> {
    let input = input.trim();
    let parsed = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => input.parse(),
    };
    parsed.map_err(|_| CliError::usage(format!("invalid number: {input}")))
}

/// Hex bytes with optional whitespace, `:` or `,` separators.
pub fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let digits: Vec<u8> = input
        .bytes()
        .filter(|b| !b.is_ascii_whitespace() && *b != b':' && *b != b',')
        .collect();
    if digits.len() % 2 != 0 {
        return Err(CliError::usage("hex input has an odd number of digits"));
    }

    digits
        .chunks(2)
        .map(|pair| {
            std::str::from_utf8(pair)
                .ok()
                .and_then(|s| u8::from_str_radix(s, 16).ok())
                .ok_or_else(|| {
                    CliError::usage(format!(
                        "invalid hex byte: {}",
                        String::from_utf8_lossy(pair)
                    ))
                })
        })
        .collect()
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::usage("duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::usage(format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::usage("duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}
