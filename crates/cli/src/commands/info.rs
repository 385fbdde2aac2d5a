//! `info` command implementation.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use bridge::{encode_marker_sample, ManualClock, MarkerSample};
use config_loader::ConfigLoader;
use contracts::BridgeConfig;
use packet_codec::{parse_header, PacketHeader};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;
use crate::error::CliError;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    bridge: BridgeInfo,
    transport: TransportInfo,
    markers: Vec<MarkerInfo>,
    outputs: Vec<OutputInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    preflight: Vec<PreflightInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    example_packets: Vec<PacketInfo>,
}

#[derive(Serialize)]
struct BridgeInfo {
    tick_interval_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    packet_sink: Option<String>,
    initial_packet_counter: u16,
}

#[derive(Serialize)]
struct TransportInfo {
    kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    marker_bind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    publish_addr: Option<String>,
}

#[derive(Serialize)]
struct MarkerInfo {
    path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
struct OutputInfo {
    source_id: String,
    path: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    channels: Vec<ChannelInfo>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    patches: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
struct ChannelInfo {
    name: String,
    channel_type: String,
    nominal_srate: f64,
}

#[derive(Serialize)]
struct PreflightInfo {
    command: String,
    expect: String,
}

#[derive(Serialize)]
struct PacketInfo {
    text: String,
    header: PacketHeader,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let config = ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    let info = build_config_info(&config, args);

    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info, args);
    }

    Ok(())
}

fn build_config_info(config: &BridgeConfig, args: &InfoArgs) -> ConfigInfo {
    let markers = config
        .markers
        .iter()
        .map(|entry| {
            let path = entry.path.display().to_string();
            match ConfigLoader::load_marker_input(&entry.path) {
                Ok(spec) => MarkerInfo {
                    path,
                    stream: Some(spec.name),
                    source_id: spec.source_id,
                    error: None,
                },
                Err(e) => MarkerInfo {
                    path,
                    stream: None,
                    source_id: None,
                    error: Some(e.to_string()),
                },
            }
        })
        .collect();

    let outputs = config
        .outputs
        .iter()
        .map(|entry| {
            let mut info = OutputInfo {
                source_id: entry.source_id.clone(),
                path: entry.path.display().to_string(),
                channels: Vec::new(),
                patches: BTreeMap::new(),
                error: None,
            };
            match ConfigLoader::load_patchboard(&entry.path) {
                Ok(schema) if args.channels => {
                    info.channels = schema
                        .channels
                        .into_iter()
                        .map(|c| ChannelInfo {
                            name: c.name,
                            channel_type: c.channel_type,
                            nominal_srate: c.nominal_srate,
                        })
                        .collect();
                    info.patches = schema.patches;
                }
                Ok(_) => {}
                Err(e) => info.error = Some(e.to_string()),
            }
            info
        })
        .collect();

    ConfigInfo {
        version: format!("{:?}", config.version),
        bridge: BridgeInfo {
            tick_interval_ms: config.bridge.tick_interval_ms,
            packet_sink: config.bridge.packet_sink.clone(),
            initial_packet_counter: config.bridge.initial_packet_counter,
        },
        transport: TransportInfo {
            kind: format!("{:?}", config.transport.kind),
            marker_bind: config.transport.marker_bind.clone(),
            publish_addr: config.transport.publish_addr.clone(),
        },
        markers,
        outputs,
        preflight: config
            .preflight
            .iter()
            .map(|p| PreflightInfo {
                command: p.command.clone(),
                expect: p.expect.clone(),
            })
            .collect(),
        example_packets: if args.packets {
            example_packets(config.bridge.initial_packet_counter)
        } else {
            Vec::new()
        },
    }
}

/// Packets the bridge would emit for one marker, on a fixed clock
fn example_packets(first_packet: u16) -> Vec<PacketInfo> {
    let clock = ManualClock::new(12.5, 0.0005).with_wall_clock("2024-01-01_12-00-00-000000");
    let sample = MarkerSample::new(1021.75, -1009.25, vec!["trial_start".to_string()]);
    let mut counter = first_packet;

    encode_marker_sample(&sample, &clock, &mut counter)
        .into_iter()
        .filter_map(|packet| {
            let header = parse_header(packet.as_str()).ok()?;
            Some(PacketInfo {
                text: packet.to_string(),
                header,
            })
        })
        .collect()
}

fn print_config_info(info: &ConfigInfo, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               EmotiBit Bridge Configuration                  ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("Bridge");
    println!("   ├─ Version: {}", info.version);
    println!("   ├─ Tick interval: {} ms", info.bridge.tick_interval_ms);
    println!("   ├─ First packet number: {}", info.bridge.initial_packet_counter);
    match &info.bridge.packet_sink {
        Some(sink) => println!("   └─ Packet sink: {}", sink),
        None => println!("   └─ Packet sink: (log only)"),
    }

    println!("\nTransport");
    println!("   ├─ Kind: {}", info.transport.kind);
    println!(
        "   ├─ Marker bind: {}",
        info.transport.marker_bind.as_deref().unwrap_or("-")
    );
    println!(
        "   └─ Publish to: {}",
        info.transport.publish_addr.as_deref().unwrap_or("-")
    );

    println!("\nMarker inputs ({})", info.markers.len());
    for (i, marker) in info.markers.iter().enumerate() {
        let prefix = tree_prefix(i, info.markers.len());
        match (&marker.stream, &marker.error) {
            (Some(stream), _) => println!(
                "   {} {} (source: {}) <- {}",
                prefix,
                stream,
                marker.source_id.as_deref().unwrap_or("any"),
                marker.path
            ),
            (None, Some(error)) => println!("   {} {} ✗ {}", prefix, marker.path, error),
            (None, None) => println!("   {} {}", prefix, marker.path),
        }
    }

    println!("\nOutputs ({})", info.outputs.len());
    for (i, output) in info.outputs.iter().enumerate() {
        let is_last = i + 1 == info.outputs.len();
        let child_prefix = if is_last { "   " } else { "│  " };
        println!(
            "   {} {} <- {}",
            tree_prefix(i, info.outputs.len()),
            output.source_id,
            output.path
        );
        if let Some(ref error) = output.error {
            println!("   {}  ✗ {}", child_prefix, error);
        }
        if args.channels {
            for (j, channel) in output.channels.iter().enumerate() {
                println!(
                    "   {}  {} {} ({}, {} Hz)",
                    child_prefix,
                    tree_prefix(j, output.channels.len()),
                    channel.name,
                    channel.channel_type,
                    channel.nominal_srate
                );
            }
            for (tag, channel) in &output.patches {
                println!("   {}     patch {} -> {}", child_prefix, tag, channel);
            }
        }
    }

    if !info.preflight.is_empty() {
        println!("\nPreflight ({})", info.preflight.len());
        for (i, cmd) in info.preflight.iter().enumerate() {
            println!(
                "   {} `{}` expecting '{}'",
                tree_prefix(i, info.preflight.len()),
                cmd.command,
                cmd.expect
            );
        }
    }

    if !info.example_packets.is_empty() {
        println!("\nExample marker packets");
        for packet in &info.example_packets {
            println!(
                "   #{:<5} {} {}",
                packet.header.packet_number, packet.header.type_tag, packet.text
            );
        }
    }

    println!();
}

fn tree_prefix(index: usize, len: usize) -> &'static str {
    if index + 1 == len {
        "└─"
    } else {
        "├─"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_packets_follow_counter() {
        let packets = example_packets(65535);
        let tags: Vec<_> = packets.iter().map(|p| p.header.type_tag.as_str()).collect();
        assert_eq!(tags, ["LM", "TX", "TX"]);
        let numbers: Vec<_> = packets.iter().map(|p| p.header.packet_number).collect();
        assert_eq!(numbers, [65535, 0, 1]);
        assert!(packets[0].text.contains(",LD,trial_start"));
    }
}
