//! Whole-file decoding with symphonia

use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::{DeviceError, DeviceResult};

/// Interleaved f32 PCM for a whole track
#[derive(Debug, Clone, Default)]
pub struct DecodedAudio {
    pub pcm: Vec<f32>,
    pub sample_rate: u32,
    pub channels: usize,
}

impl DecodedAudio {
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.pcm.len() / self.channels
        }
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / f64::from(self.sample_rate)
    }
}

/// Turn a track URL into a local path (`file://` prefix optional)
pub fn local_path(source_url: &str) -> &Path {
    Path::new(source_url.strip_prefix("file://").unwrap_or(source_url))
}

fn decode_error(source_url: &str, reason: impl ToString) -> DeviceError {
    DeviceError::Decode {
        source_url: source_url.to_string(),
        reason: reason.to_string(),
    }
}

/// Decode the default track of `path` to interleaved f32.
///
/// Corrupt packets are skipped; the file only fails if it cannot be opened
/// or probed, or has no decodable track.
pub fn decode_file(path: &Path) -> DeviceResult<DecodedAudio> {
    let source_url = path.to_string_lossy();
    let file = std::fs::File::open(path).map_err(|e| decode_error(&source_url, e))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension() {
        hint.with_extension(&ext.to_string_lossy());
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| decode_error(&source_url, e))?;
    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| decode_error(&source_url, "no default track"))?;
    let track_id = track.id;
    let params = track.codec_params.clone();

    let mut decoder = symphonia::default::get_codecs()
        .make(&params, &DecoderOptions::default())
        .map_err(|e| decode_error(&source_url, e))?;

    let mut sample_rate = params.sample_rate.unwrap_or(44100);
    let mut channels = params.channels.map(|c| c.count()).unwrap_or(2);
    let mut pcm = Vec::new();
    let mut skipped = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => {
                log::warn!("decode_file: stopping at packet error in {}: {}", source_url, e);
                break;
            }
        };
        if packet.track_id() != track_id {
            continue;
        }
        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate = spec.rate;
                channels = spec.channels.count();
                let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buffer.copy_interleaved_ref(decoded);
                pcm.extend_from_slice(buffer.samples());
            }
            Err(SymphoniaError::DecodeError(_)) => skipped += 1,
            Err(e) => return Err(decode_error(&source_url, e)),
        }
    }

    if skipped > 0 {
        log::warn!("decode_file: skipped {} corrupt packets in {}", skipped, source_url);
    }
    if channels == 0 {
        return Err(decode_error(&source_url, "no audio channels"));
    }

    log::info!(
        "decode_file: {} ({} Hz, {} ch, {:.1}s)",
        source_url,
        sample_rate,
        channels,
        pcm.len() as f64 / channels as f64 / f64::from(sample_rate.max(1))
    );

    Ok(DecodedAudio {
        pcm,
        sample_rate,
        channels,
    })
}
