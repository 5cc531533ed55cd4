use bytes::BytesMut;
use gdslink_frame::{FprimeFramer, FprimeFramerConfig, FramerDeframer};
use tracing::{info, warn};

use crate::cmd::DecodeArgs;
use crate::exit::{io_error, CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_frame, DecodedFrame, OutputFormat};

/// Deframe a capture file. Exits non-zero when it holds no frame at all.
pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let capture = std::fs::read(&args.file)
        .map_err(|err| io_error(&format!("cannot read {}", args.file.display()), err))?;

    let framer = FprimeFramer::with_config(FprimeFramerConfig {
        checksum: args.checksum.into(),
        max_data_size: args.max_frame_size,
    });
    let mut pool = BytesMut::from(capture.as_slice());
    let frames = framer.deframe_all(&mut pool);

    for (index, data) in frames.iter().enumerate() {
        print_frame(&DecodedFrame::new(index, data), data, format);
    }

    if !pool.is_empty() {
        warn!(bytes = pool.len(), "capture ends with an incomplete frame");
    }
    info!(frames = frames.len(), bytes = capture.len(), "capture decoded");

    if frames.is_empty() && !capture.is_empty() {
        return Ok(DATA_INVALID);
    }
    Ok(SUCCESS)
}
