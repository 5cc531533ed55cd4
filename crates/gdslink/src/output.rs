use std::fmt::Write as _;
use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use gdslink_frame::{descriptor_name, peek_descriptor};
use gdslink_updown::LinkSnapshot;
use serde::Serialize;

const PREVIEW_BYTES: usize = 16;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// One frame pulled out of a wire capture.
#[derive(Debug, Serialize)]
pub struct DecodedFrame {
    pub index: usize,
    pub descriptor: Option<u32>,
    pub descriptor_name: &'static str,
    pub size: usize,
    pub payload: String,
}

impl DecodedFrame {
    pub fn new(index: usize, data: &[u8]) -> Self {
        let descriptor = peek_descriptor(data);
        Self {
            index,
            descriptor,
            descriptor_name: descriptor.map_or("NONE", descriptor_name),
            size: data.len(),
            payload: hex_preview(data),
        }
    }
}

pub fn print_frame(frame: &DecodedFrame, data: &[u8], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(frame),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["#", "DESCRIPTOR", "SIZE", "PAYLOAD"])
                .add_row(vec![
                    frame.index.to_string(),
                    frame.descriptor_name.to_string(),
                    frame.size.to_string(),
                    frame.payload.clone(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "frame={} descriptor={} size={} payload={}",
                frame.index, frame.descriptor_name, frame.size, frame.payload
            );
        }
        OutputFormat::Raw => print_raw(data),
    }
}

pub fn print_stats(stats: &LinkSnapshot, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(stats),
        OutputFormat::Table => {
            let down = &stats.downlink;
            let up = &stats.uplink;
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["DIRECTION", "COUNTER", "VALUE"]);
            for (name, value) in [
                ("bytes_read", down.bytes_read),
                ("frames_deframed", down.frames_deframed),
                ("frames_dropped", down.frames_dropped),
                ("loopback_frames", down.loopback_frames),
                ("frames_sent", down.frames_sent),
                ("send_batches", down.send_batches),
                ("send_errors", down.send_errors),
            ] {
                table.add_row(vec!["downlink".to_string(), name.to_string(), value.to_string()]);
            }
            for (name, value) in [
                ("packets_received", up.packets_received),
                ("packets_written", up.packets_written),
                ("write_attempts", up.write_attempts),
                ("write_failures", up.write_failures),
                ("handshakes", up.handshakes),
                ("framing_errors", up.framing_errors),
            ] {
                table.add_row(vec!["uplink".to_string(), name.to_string(), value.to_string()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            let down = &stats.downlink;
            let up = &stats.uplink;
            println!(
                "downlink: bytes={} deframed={} dropped={} loopback={} sent={} batches={} errors={}",
                down.bytes_read,
                down.frames_deframed,
                down.frames_dropped,
                down.loopback_frames,
                down.frames_sent,
                down.send_batches,
                down.send_errors
            );
            println!(
                "uplink: received={} written={} attempts={} failures={} handshakes={} framing_errors={}",
                up.packets_received,
                up.packets_written,
                up.write_attempts,
                up.write_failures,
                up.handshakes,
                up.framing_errors
            );
        }
    }
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

/// Hex of the first bytes of `data`, marking truncation.
pub fn hex_preview(data: &[u8]) -> String {
    let mut out = String::with_capacity(PREVIEW_BYTES * 3);
    for (i, byte) in data.iter().take(PREVIEW_BYTES).enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{byte:02x}");
    }
    if data.len() > PREVIEW_BYTES {
        out.push_str(" ...");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_preview_truncates() {
        assert_eq!(hex_preview(&[0xde, 0xad]), "de ad");
        assert_eq!(hex_preview(&[]), "");
        assert!(hex_preview(&[0u8; 40]).ends_with(" ..."));
    }

    #[test]
    fn decoded_frame_names_descriptor() {
        let frame = DecodedFrame::new(3, &[0, 0, 0, 0xFE, b'x']);
        assert_eq!(frame.descriptor, Some(0xFE));
        assert_eq!(frame.descriptor_name, "HAND");
        assert_eq!(frame.size, 5);

        let short = DecodedFrame::new(0, &[1]);
        assert_eq!(short.descriptor, None);
        assert_eq!(short.descriptor_name, "NONE");
    }
}
