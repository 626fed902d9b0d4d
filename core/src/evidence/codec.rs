use crate::prelude::{MonitorError, MonitorResult};
use crate::sensor::detection::BoundingBox;
use crate::sensor::sample::{AudioBlock, VideoFrame};
use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;
use std::io::Cursor;

pub const ALERT_COLOR: [u8; 3] = [255, 0, 0];

pub fn encode_jpeg(frame: &VideoFrame, quality: u8) -> MonitorResult<Vec<u8>> {
    frame
        .validate()
        .map_err(|err| MonitorError::Encoding(err.to_string()))?;
    let color = match frame.channels {
        1 => ExtendedColorType::L8,
        _ => ExtendedColorType::Rgb8,
    };
    let mut buffer = Vec::new();
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
        encoder
            .encode(&frame.pixels, frame.width, frame.height, color)
            .map_err(|err| MonitorError::Encoding(format!("jpeg: {}", err)))?;
    }
    Ok(buffer)
}

pub fn encode_wav(block: &AudioBlock) -> MonitorResult<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: block.channels.max(1),
        sample_rate: block.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|err| MonitorError::Encoding(format!("wav: {}", err)))?;
        for &sample in &block.samples {
            writer
                .write_sample(sample)
                .map_err(|err| MonitorError::Encoding(format!("wav: {}", err)))?;
        }
        writer
            .finalize()
            .map_err(|err| MonitorError::Encoding(format!("wav: {}", err)))?;
    }
    Ok(cursor.into_inner())
}

/// Draws a rectangle outline, clipped to the frame.
pub fn annotate(frame: &mut VideoFrame, bbox: &BoundingBox, color: [u8; 3], thickness: u32) {
    if frame.validate().is_err() || thickness == 0 {
        return;
    }
    let max_x = frame.width as i64 - 1;
    let max_y = frame.height as i64 - 1;
    let x1 = (bbox.x1 as i64).clamp(0, max_x);
    let x2 = (bbox.x2 as i64).clamp(0, max_x);
    let y1 = (bbox.y1 as i64).clamp(0, max_y);
    let y2 = (bbox.y2 as i64).clamp(0, max_y);
    let t = thickness as i64 - 1;

    for y in y1..=y2 {
        for x in x1..=x2 {
            let on_edge = x <= x1 + t || x >= x2 - t || y <= y1 + t || y >= y2 - t;
            if on_edge {
                paint(frame, x as usize, y as usize, color);
            }
        }
    }
}

fn paint(frame: &mut VideoFrame, x: usize, y: usize, color: [u8; 3]) {
    let channels = frame.channels as usize;
    let offset = (y * frame.width as usize + x) * channels;
    if channels == 1 {
        frame.pixels[offset] = color[0];
    } else {
        frame.pixels[offset..offset + 3].copy_from_slice(&color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;

    fn blank_frame(width: u32, height: u32) -> VideoFrame {
        VideoFrame::new(width, height, 3, vec![0; (width * height * 3) as usize], Local::now())
    }

    #[test]
    fn jpeg_output_has_soi_marker() {
        let bytes = encode_jpeg(&blank_frame(16, 8), 90).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn jpeg_rejects_inconsistent_frame() {
        let mut frame = blank_frame(4, 4);
        frame.pixels.truncate(10);
        assert!(matches!(encode_jpeg(&frame, 90), Err(MonitorError::Encoding(_))));
    }

    #[test]
    fn wav_keeps_samples_and_format() {
        let block = AudioBlock::new(vec![0, 1000, -1000, 32767], 1, 44_100, Local::now());
        let bytes = encode_wav(&block).unwrap();
        assert_eq!(&bytes[..4], b"RIFF");

        let mut reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.spec().sample_rate, 44_100);
        assert_eq!(reader.spec().channels, 1);
        let samples: Vec<i16> = reader.samples::<i16>().map(Result::unwrap).collect();
        assert_eq!(samples, block.samples);
    }

    #[test]
    fn annotate_draws_outline_only() {
        let mut frame = blank_frame(10, 10);
        annotate(&mut frame, &BoundingBox::new(2, 2, 7, 7), ALERT_COLOR, 1);
        let pixel = |x: usize, y: usize| {
            let offset = (y * 10 + x) * 3;
            [frame.pixels[offset], frame.pixels[offset + 1], frame.pixels[offset + 2]]
        };
        assert_eq!(pixel(2, 2), ALERT_COLOR);
        assert_eq!(pixel(7, 5), ALERT_COLOR);
        assert_eq!(pixel(4, 4), [0, 0, 0]);
        assert_eq!(pixel(0, 0), [0, 0, 0]);
    }

    #[test]
    fn annotate_clips_to_frame() {
        let mut frame = blank_frame(4, 4);
        annotate(&mut frame, &BoundingBox::new(-5, -5, 50, 50), ALERT_COLOR, 2);
        assert_eq!(&frame.pixels[..3], &ALERT_COLOR);
    }
}
