//! Audio/video metadata description.
//!
//! Media files are not transcribed. Container headers are parsed directly
//! (MP4 box walk, MP3 frame header, WAV/FLAC chunks) and turned into a
//! deterministic natural-language description, so downstream consumers have
//! something textual to reason about without a speech-to-text dependency.

use async_trait::async_trait;

use sift_core::error::{SiftError, SiftResult};
use sift_core::types::{
    AudioMetadata, ExtractionMetadata, ExtractionMethod, ExtractionOptions, ExtractionResult,
    VideoMetadata,
};
use sift_core::Processor;

/// MPEG-1 Layer III bitrates (kbps) by header index.
const MP3_BITRATES_V1_L3: [u32; 16] = [
    0, 32, 40, 48, 56, 64, 80, 96, 112, 128, 160, 192, 224, 256, 320, 0,
];
/// MPEG-2/2.5 Layer III bitrates (kbps) by header index.
const MP3_BITRATES_V2_L3: [u32; 16] =
    [0, 8, 16, 24, 32, 40, 48, 56, 64, 80, 96, 112, 128, 144, 160, 0];
/// Sample rates (Hz) by MPEG version, then header index.
const MP3_SAMPLE_RATES: [[u32; 4]; 3] = [
    [44_100, 48_000, 32_000, 0], // MPEG-1
    [22_050, 24_000, 16_000, 0], // MPEG-2
    [11_025, 12_000, 8_000, 0],  // MPEG-2.5
];

#[derive(Debug, Clone, PartialEq)]
enum MediaKind {
    Audio(AudioMetadata),
    Video(VideoMetadata),
}

/// Processor describing audio/video containers from their headers.
///
/// Header parsing is reliable, but the output is descriptive rather than
/// content-transcribing, hence the fixed 0.9 confidence.
#[derive(Debug, Clone, Default)]
pub struct MediaProcessor;

impl MediaProcessor {
    pub fn new() -> Self {
        Self
    }

    fn parse(content: &[u8]) -> Result<(MediaKind, &'static str), SiftError> {
        if content.len() >= 12 && &content[4..8] == b"ftyp" {
            let brand = String::from_utf8_lossy(&content[8..12]).trim().to_string();
            let duration = Self::mp4_duration(content);
            if brand.starts_with("M4A") || brand.starts_with("m4a") {
                return Ok((
                    MediaKind::Audio(AudioMetadata {
                        duration_secs: duration,
                        codec: Some("aac".to_string()),
                        ..Default::default()
                    }),
                    "audio/mp4",
                ));
            }
            return Ok((
                MediaKind::Video(VideoMetadata {
                    duration_secs: duration,
                    codec: Some(brand),
                    ..Default::default()
                }),
                "video/mp4",
            ));
        }

        if content.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]) {
            return Ok((
                MediaKind::Video(VideoMetadata {
                    codec: Some("matroska".to_string()),
                    ..Default::default()
                }),
                "video/webm",
            ));
        }

        if content.starts_with(b"RIFF") && content.len() > 12 {
            match &content[8..12] {
                b"AVI " => {
                    return Ok((
                        MediaKind::Video(VideoMetadata {
                            codec: Some("avi".to_string()),
                            ..Default::default()
                        }),
                        "video/x-msvideo",
                    ))
                }
                b"WAVE" => return Ok((MediaKind::Audio(Self::wav_metadata(content)), "audio/wav")),
                _ => {}
            }
        }

        if content.starts_with(b"fLaC") {
            return Ok((MediaKind::Audio(Self::flac_metadata(content)), "audio/flac"));
        }

        if content.starts_with(b"OggS") {
            return Ok((
                MediaKind::Audio(AudioMetadata {
                    codec: Some("ogg".to_string()),
                    ..Default::default()
                }),
                "audio/ogg",
            ));
        }

        if content.starts_with(b"ID3") || Self::is_mp3_sync(content) {
            return Ok((MediaKind::Audio(Self::mp3_metadata(content)), "audio/mpeg"));
        }

        Err(SiftError::Parse(
            "unrecognized media container".to_string(),
        ))
    }

    /// Walk top-level MP4 boxes into `moov` for the `mvhd` timescale and
    /// duration.
    fn mp4_duration(content: &[u8]) -> Option<f64> {
        let moov = Self::find_box(content, b"moov")?;
        let mvhd = Self::find_box(moov, b"mvhd")?;
        if mvhd.len() < 24 {
            return None;
        }
        let version = mvhd[0];
        let (timescale, duration) = if version == 1 {
            if mvhd.len() < 32 {
                return None;
            }
            let timescale = u32::from_be_bytes(mvhd[20..24].try_into().ok()?);
            let duration = u64::from_be_bytes(mvhd[24..32].try_into().ok()?);
            (timescale, duration)
        } else {
            let timescale = u32::from_be_bytes(mvhd[12..16].try_into().ok()?);
            let duration = u32::from_be_bytes(mvhd[16..20].try_into().ok()?) as u64;
            (timescale, duration)
        };
        if timescale == 0 {
            return None;
        }
        Some(duration as f64 / timescale as f64)
    }

    /// Body of the first box with the given fourcc at this nesting level.
    fn find_box<'a>(data: &'a [u8], fourcc: &[u8; 4]) -> Option<&'a [u8]> {
        let mut offset = 0usize;
        while offset + 8 <= data.len() {
            let size = u32::from_be_bytes(data[offset..offset + 4].try_into().ok()?) as usize;
            if size < 8 {
                return None;
            }
            let end = offset.checked_add(size)?.min(data.len());
            if &data[offset + 4..offset + 8] == fourcc {
                return Some(&data[offset + 8..end]);
            }
            offset = offset.checked_add(size)?;
        }
        None
    }

    fn is_mp3_sync(content: &[u8]) -> bool {
        content.len() >= 2 && content[0] == 0xFF && (content[1] & 0xE0) == 0xE0
    }

    /// Decode the first MP3 frame header for bitrate, sample rate, and
    /// channel mode. Duration is estimated from the file size at that
    /// bitrate.
    fn mp3_metadata(content: &[u8]) -> AudioMetadata {
        let mut offset = 0usize;

        // Skip an ID3v2 tag (syncsafe 28-bit size at bytes 6..10).
        if content.starts_with(b"ID3") && content.len() > 10 {
            let size = ((content[6] as usize & 0x7F) << 21)
                | ((content[7] as usize & 0x7F) << 14)
                | ((content[8] as usize & 0x7F) << 7)
                | (content[9] as usize & 0x7F);
            offset = 10 + size;
        }

        // Find the first frame sync.
        while offset + 4 <= content.len() {
            if content[offset] == 0xFF && (content[offset + 1] & 0xE0) == 0xE0 {
                break;
            }
            offset += 1;
        }
        if offset + 4 > content.len() {
            return AudioMetadata {
                codec: Some("mp3".to_string()),
                ..Default::default()
            };
        }

        let header = &content[offset..offset + 4];
        let version_bits = (header[1] >> 3) & 0x03;
        let bitrate_index = (header[2] >> 4) as usize;
        let sample_rate_index = ((header[2] >> 2) & 0x03) as usize;
        let channel_mode = (header[3] >> 6) & 0x03;

        // version bits: 00 = MPEG-2.5, 10 = MPEG-2, 11 = MPEG-1
        let (bitrate, rate_row) = match version_bits {
            0b11 => (MP3_BITRATES_V1_L3[bitrate_index], 0),
            0b10 => (MP3_BITRATES_V2_L3[bitrate_index], 1),
            _ => (MP3_BITRATES_V2_L3[bitrate_index], 2),
        };
        let sample_rate = MP3_SAMPLE_RATES[rate_row][sample_rate_index];
        let channels = if channel_mode == 0b11 { 1 } else { 2 };

        let duration_secs = if bitrate > 0 {
            Some((content.len() as f64 * 8.0) / (bitrate as f64 * 1000.0))
        } else {
            None
        };

        AudioMetadata {
            duration_secs,
            bitrate: (bitrate > 0).then_some(bitrate),
            sample_rate: (sample_rate > 0).then_some(sample_rate),
            channels: Some(channels),
            codec: Some("mp3".to_string()),
        }
    }

    /// Pull channels, sample rate, and byte rate from the WAV fmt chunk.
    fn wav_metadata(content: &[u8]) -> AudioMetadata {
        let mut metadata = AudioMetadata {
            codec: Some("pcm".to_string()),
            ..Default::default()
        };
        if content.len() < 36 || &content[12..16] != b"fmt " {
            return metadata;
        }
        metadata.channels = Some(u16::from_le_bytes([content[22], content[23]]) as u8);
        metadata.sample_rate = Some(u32::from_le_bytes([
            content[24], content[25], content[26], content[27],
        ]));
        let byte_rate = u32::from_le_bytes([content[28], content[29], content[30], content[31]]);
        if byte_rate > 0 {
            metadata.bitrate = Some(byte_rate * 8 / 1000);
            // Approximate: data dominates the container.
            metadata.duration_secs = Some(content.len() as f64 / byte_rate as f64);
        }
        metadata
    }

    /// Decode the FLAC STREAMINFO block for sample rate, channels, and
    /// total samples.
    fn flac_metadata(content: &[u8]) -> AudioMetadata {
        let mut metadata = AudioMetadata {
            codec: Some("flac".to_string()),
            ..Default::default()
        };
        // fLaC (4) + block header (4) + STREAMINFO needs 18 bytes read here.
        if content.len() < 8 + 22 {
            return metadata;
        }
        let info = &content[8..];
        let sample_rate = ((info[10] as u32) << 12)
            | ((info[11] as u32) << 4)
            | ((info[12] as u32) >> 4);
        let channels = ((info[12] >> 1) & 0x07) + 1;
        let total_samples = (((info[13] & 0x0F) as u64) << 32)
            | ((info[14] as u64) << 24)
            | ((info[15] as u64) << 16)
            | ((info[16] as u64) << 8)
            | (info[17] as u64);

        metadata.sample_rate = (sample_rate > 0).then_some(sample_rate);
        metadata.channels = Some(channels);
        if sample_rate > 0 && total_samples > 0 {
            metadata.duration_secs = Some(total_samples as f64 / sample_rate as f64);
        }
        metadata
    }

    fn format_duration(secs: f64) -> String {
        let total = secs.round() as u64;
        let minutes = total / 60;
        let seconds = total % 60;
        if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }

    fn describe(kind: &MediaKind, mime_type: &str) -> String {
        match kind {
            MediaKind::Audio(audio) => {
                let mut parts: Vec<String> = Vec::new();
                if let Some(duration) = audio.duration_secs {
                    parts.push(format!("duration {}", Self::format_duration(duration)));
                }
                if let Some(bitrate) = audio.bitrate {
                    parts.push(format!("bitrate {} kbps", bitrate));
                }
                if let Some(rate) = audio.sample_rate {
                    parts.push(format!("sample rate {} Hz", rate));
                }
                if let Some(channels) = audio.channels {
                    parts.push(match channels {
                        1 => "mono".to_string(),
                        2 => "stereo".to_string(),
                        n => format!("{} channels", n),
                    });
                }
                if let Some(codec) = &audio.codec {
                    parts.push(format!("codec {}", codec));
                }
                if parts.is_empty() {
                    format!("Audio file ({})", mime_type)
                } else {
                    format!("Audio file ({}): {}.", mime_type, parts.join(", "))
                }
            }
            MediaKind::Video(video) => {
                let mut parts: Vec<String> = Vec::new();
                if let Some(duration) = video.duration_secs {
                    parts.push(format!("duration {}", Self::format_duration(duration)));
                }
                if let (Some(width), Some(height)) = (video.width, video.height) {
                    parts.push(format!("resolution {}x{}", width, height));
                }
                if let Some(codec) = &video.codec {
                    parts.push(format!("codec {}", codec));
                }
                if parts.is_empty() {
                    format!("Video file ({})", mime_type)
                } else {
                    format!("Video file ({}): {}.", mime_type, parts.join(", "))
                }
            }
        }
    }
}

#[async_trait]
impl Processor for MediaProcessor {
    async fn extract(
        &self,
        content: &[u8],
        options: &ExtractionOptions,
    ) -> SiftResult<ExtractionResult> {
        let (kind, detected_mime) = Self::parse(content)?;
        let description = Self::describe(&kind, detected_mime);

        let mut metadata = ExtractionMetadata {
            size: content.len(),
            ..Default::default()
        };
        if options.extract_metadata {
            match kind {
                MediaKind::Audio(audio) => metadata.audio = Some(audio),
                MediaKind::Video(video) => metadata.video = Some(video),
            }
        }

        Ok(ExtractionResult::ok(
            description,
            metadata,
            ExtractionMethod::MetadataOnly,
            0.9,
        ))
    }

    fn supported_types(&self) -> &[&str] {
        &[
            "audio/mpeg",
            "audio/mp3",
            "audio/wav",
            "audio/x-wav",
            "audio/mp4",
            "audio/ogg",
            "audio/flac",
            "video/mp4",
            "video/webm",
            "video/quicktime",
            "video/x-msvideo",
        ]
    }

    fn name(&self) -> &str {
        "media"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mp3_frame() -> Vec<u8> {
        // MPEG-1 Layer III, 192 kbps (index 11), 44100 Hz (index 0), stereo.
        let mut buf = vec![0xFF, 0xFB, 0xB0, 0x00];
        buf.extend_from_slice(&[0u8; 417]);
        buf
    }

    #[tokio::test]
    async fn test_mp3_description() {
        let processor = MediaProcessor::new();
        let result = processor
            .extract(&mp3_frame(), &ExtractionOptions::default())
            .await
            .unwrap();

        assert!(result.success);
        assert!(result.text.starts_with("Audio file (audio/mpeg)"));
        assert!(result.text.contains("192 kbps"));
        assert!(result.text.contains("44100 Hz"));
        assert!(result.text.contains("stereo"));
        assert_eq!(result.processing.method, ExtractionMethod::MetadataOnly);
        assert!((result.processing.confidence - 0.9).abs() < f32::EPSILON);

        let audio = result.metadata.audio.unwrap();
        assert_eq!(audio.bitrate, Some(192));
        assert_eq!(audio.sample_rate, Some(44_100));
        assert_eq!(audio.channels, Some(2));
    }

    #[tokio::test]
    async fn test_mp3_with_id3_tag() {
        // ID3v2 header declaring a 10-byte tag body, then a frame.
        let mut buf = vec![b'I', b'D', b'3', 3, 0, 0, 0, 0, 0, 10];
        buf.extend_from_slice(&[0u8; 10]);
        buf.extend_from_slice(&mp3_frame());

        let processor = MediaProcessor::new();
        let result = processor
            .extract(&buf, &ExtractionOptions::default())
            .await
            .unwrap();
        assert_eq!(result.metadata.audio.unwrap().bitrate, Some(192));
    }

    #[tokio::test]
    async fn test_wav_metadata() {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&36u32.to_le_bytes());
        buf.extend_from_slice(b"WAVE");
        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes()); // chunk size
        buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
        buf.extend_from_slice(&2u16.to_le_bytes()); // channels
        buf.extend_from_slice(&48_000u32.to_le_bytes()); // sample rate
        buf.extend_from_slice(&192_000u32.to_le_bytes()); // byte rate
        buf.extend_from_slice(&4u16.to_le_bytes()); // block align
        buf.extend_from_slice(&16u16.to_le_bytes()); // bits per sample

        let processor = MediaProcessor::new();
        let result = processor
            .extract(&buf, &ExtractionOptions::default())
            .await
            .unwrap();

        let audio = result.metadata.audio.unwrap();
        assert_eq!(audio.sample_rate, Some(48_000));
        assert_eq!(audio.channels, Some(2));
        assert_eq!(audio.bitrate, Some(1536));
    }

    #[tokio::test]
    async fn test_mp4_video() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&20u32.to_be_bytes());
        buf.extend_from_slice(b"ftypisom");
        buf.extend_from_slice(&[0u8; 8]);
        // moov box containing an mvhd v0 with timescale 1000, duration 90000.
        let mut mvhd = Vec::new();
        mvhd.extend_from_slice(&108u32.to_be_bytes());
        mvhd.extend_from_slice(b"mvhd");
        mvhd.push(0); // version
        mvhd.extend_from_slice(&[0, 0, 0]); // flags
        mvhd.extend_from_slice(&0u32.to_be_bytes()); // ctime
        mvhd.extend_from_slice(&0u32.to_be_bytes()); // mtime
        mvhd.extend_from_slice(&1000u32.to_be_bytes()); // timescale
        mvhd.extend_from_slice(&90_000u32.to_be_bytes()); // duration
        mvhd.extend_from_slice(&vec![0u8; 108 - mvhd.len()]);
        let mut moov = Vec::new();
        moov.extend_from_slice(&((mvhd.len() + 8) as u32).to_be_bytes());
        moov.extend_from_slice(b"moov");
        moov.extend_from_slice(&mvhd);
        buf.extend_from_slice(&moov);

        let processor = MediaProcessor::new();
        let result = processor
            .extract(&buf, &ExtractionOptions::default())
            .await
            .unwrap();

        assert!(result.text.starts_with("Video file (video/mp4)"));
        assert!(result.text.contains("1m 30s"));
        let video = result.metadata.video.unwrap();
        assert_eq!(video.duration_secs, Some(90.0));
    }

    #[tokio::test]
    async fn test_flac_metadata() {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"fLaC");
        buf.extend_from_slice(&[0x00, 0x00, 0x00, 0x22]); // STREAMINFO header
        let mut info = vec![0u8; 34];
        // 44100 Hz: 20 bits 0x0AC44 -> bytes 10..12 + high nibble of 12.
        info[10] = 0x0A;
        info[11] = 0xC4;
        info[12] = 0x42; // low nibble: channels (2-1)=1 <<1, bits-per-sample high bit
        // total samples: 441000 (10 seconds)
        info[14] = 0x00;
        info[15] = 0x06;
        info[16] = 0xBA;
        info[17] = 0xA8;
        buf.extend_from_slice(&info);

        let processor = MediaProcessor::new();
        let result = processor
            .extract(&buf, &ExtractionOptions::default())
            .await
            .unwrap();

        let audio = result.metadata.audio.unwrap();
        assert_eq!(audio.sample_rate, Some(44_100));
        assert_eq!(audio.channels, Some(2));
        assert_eq!(audio.duration_secs, Some(10.0));
    }

    #[tokio::test]
    async fn test_unknown_container_fails() {
        let processor = MediaProcessor::new();
        let err = processor
            .extract(b"definitely not media", &ExtractionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SiftError::Parse(_)));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(MediaProcessor::format_duration(201.4), "3m 21s");
        assert_eq!(MediaProcessor::format_duration(42.0), "42s");
    }

    #[test]
    fn test_supported_types() {
        let processor = MediaProcessor::new();
        assert!(processor.can_process("audio/mpeg"));
        assert!(processor.can_process("video/mp4"));
        assert!(!processor.can_process("image/png"));
        assert_eq!(processor.name(), "media");
    }
}
