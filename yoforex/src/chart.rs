//! Cheap screening of uploads before they are sent for analysis.
//!
//! Trading chart screenshots are dominated by long straight strokes: grid
//! lines, axes, candle wicks. An image counts as a chart when edge
//! detection followed by a Hough transform finds more than
//! [`MIN_LINES`] lines in it.

use image::GrayImage;
use imageproc::edges::canny;
use imageproc::hough::{LineDetectionOptions, detect_lines};

const CANNY_LOW: f32 = 50.0;
const CANNY_HIGH: f32 = 150.0;
const VOTE_THRESHOLD: u32 = 100;
const SUPPRESSION_RADIUS: u32 = 8;
pub const MIN_LINES: usize = 20;

const DEFAULT_MIME: &str = "image/png";

pub fn count_lines(image: &GrayImage) -> usize {
    let edges = canny(image, CANNY_LOW, CANNY_HIGH);
    let options = LineDetectionOptions {
        vote_threshold: VOTE_THRESHOLD,
        suppression_radius: SUPPRESSION_RADIUS,
    };
    detect_lines(&edges, options).len()
}

/// Undecodable data is never a chart.
pub fn is_trading_chart(bytes: &[u8]) -> bool {
    let image = match image::load_from_memory(bytes) {
        Ok(image) => image.to_luma8(),
        Err(e) => {
            tracing::debug!(error = %e, "Upload is not a decodable image");
            return false;
        }
    };

    let lines = count_lines(&image);
    tracing::debug!(
        lines,
        width = image.width(),
        height = image.height(),
        "Chart line detection"
    );
    lines > MIN_LINES
}

/// MIME type sniffed from the image header, PNG when unknown.
pub fn mime_type(bytes: &[u8]) -> &'static str {
    image::guess_format(bytes)
        .map(|format| format.to_mime_type())
        .unwrap_or(DEFAULT_MIME)
}
