use std::collections::BTreeMap;

use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use xbee_frame::MAX_BODY_LEN;
use xbee_transport::serial::SUPPORTED_BAUD_RATES;

use crate::cmd::EnvinfoArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::OutputFormat;

#[derive(Serialize)]
struct PlatformInfo {
    os: String,
    arch: String,
}

#[derive(Serialize)]
struct CodecInfo {
    frame_types: usize,
    max_body_len: usize,
    baud_rates: Vec<u32>,
}

#[derive(Serialize)]
struct EnvInfoOutput {
    version: String,
    target: String,
    rust_version: String,
    git_hash: String,
    platform: PlatformInfo,
    codec: CodecInfo,
    features: Vec<String>,
    dependencies: BTreeMap<String, String>,
    environment: BTreeMap<String, Option<String>>,
}

const ENV_VARS: [&str; 4] = ["XBEE_PORT", "XBEE_BAUD", "XBEE_API_MODE", "XBEE_LOG_LEVEL"];

pub fn run(_args: EnvinfoArgs, format: OutputFormat) -> CliResult<i32> {
    let mut deps = BTreeMap::new();
    deps.insert("clap".to_string(), "4.5".to_string());
    deps.insert("tracing".to_string(), "0.1".to_string());
    if cfg!(feature = "async") {
        deps.insert("tokio-util".to_string(), "0.7".to_string());
    }

    let env = ENV_VARS
        .iter()
        .map(|name| (name.to_string(), std::env::var(name).ok()))
        .collect();

    let output = EnvInfoOutput {
        version: env!("CARGO_PKG_VERSION").to_string(),
        target: target_triple(),
        rust_version: option_env!("RUSTC_VERSION")
            .unwrap_or("unknown")
            .to_string(),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
        platform: PlatformInfo {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
        },
        codec: CodecInfo {
            frame_types: xbee_schema::frame_schemas().len(),
            max_body_len: MAX_BODY_LEN,
            baud_rates: SUPPORTED_BAUD_RATES.to_vec(),
        },
        features: active_features(),
        dependencies: deps,
        environment: env,
    };

    print_envinfo(&output, format);
    Ok(SUCCESS)
}

fn target_triple() -> String {
    if let Some(target) = option_env!("XBEE_BUILD_TARGET") {
        return target.to_string();
    }

    match (std::env::consts::ARCH, std::env::consts::OS) {
        ("aarch64", "macos") => "aarch64-apple-darwin".to_string(),
        ("x86_64", "macos") => "x86_64-apple-darwin".to_string(),
        ("aarch64", "linux") => "aarch64-unknown-linux-gnu".to_string(),
        ("x86_64", "linux") => "x86_64-unknown-linux-gnu".to_string(),
        ("arm", "linux") => "arm-unknown-linux-gnueabihf".to_string(),
        (arch, os) => format!("{arch}-unknown-{os}"),
    }
}

fn print_envinfo(output: &EnvInfoOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string(output).unwrap_or_else(|_| "{}".to_string())
        ),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["KEY", "VALUE"]);
            for (key, value) in summary_rows(output) {
                table.add_row(vec![key, value]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for (key, value) in summary_rows(output) {
                println!("{key:<16} {value}");
            }
        }
        OutputFormat::Raw => println!("{}", output.version),
    }
}

/// Flattened key/value view shared by the human-readable formats.
fn summary_rows(output: &EnvInfoOutput) -> Vec<(String, String)> {
    let bauds: Vec<String> = output
        .codec
        .baud_rates
        .iter()
        .map(u32::to_string)
        .collect();
    let mut rows = vec![
        ("version".to_string(), output.version.clone()),
        ("target".to_string(), output.target.clone()),
        ("rust".to_string(), output.rust_version.clone()),
        ("git hash".to_string(), output.git_hash.clone()),
        (
            "platform".to_string(),
            format!("{} ({})", output.platform.os, output.platform.arch),
        ),
        ("features".to_string(), output.features.join(", ")),
        (
            "frame types".to_string(),
            output.codec.frame_types.to_string(),
        ),
        (
            "max body".to_string(),
            format!("{} bytes", output.codec.max_body_len),
        ),
        ("baud rates".to_string(), bauds.join(" ")),
    ];
    rows.extend(
        output
            .dependencies
            .iter()
            .map(|(name, version)| (format!("dep {name}"), version.clone())),
    );
    rows.extend(output.environment.iter().map(|(name, value)| {
        (
            name.clone(),
            value.clone().unwrap_or_else(|| "(not set)".to_string()),
        )
    }));
    rows
}

fn active_features() -> Vec<String> {
    let mut features = Vec::new();
    if cfg!(feature = "async") {
        features.push("async".to_string());
    }
    if cfg!(feature = "cli") {
        features.push("cli".to_string());
    }
    features
}
