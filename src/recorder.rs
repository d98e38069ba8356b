//! Output recorder — captures the post-limiter stereo signal in chunks and
//! renders it to WAV on demand.

use std::io::Cursor;

use log::info;

use crate::error::{DecodeError, EngineError};

/// A fully assembled stereo capture.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedBuffer {
    pub left: Vec<f32>,
    pub right: Vec<f32>,
    pub sample_rate: u32,
}

impl RecordedBuffer {
    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    pub fn duration_seconds(&self) -> f64 {
        self.left.len() as f64 / self.sample_rate as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecorderState {
    Idle,
    Recording,
}

/// Two-state capture of the engine output. Audio arrives in whatever block
/// sizes the caller renders; each block is kept as its own chunk and only
/// stitched together when the recording is read out.
#[derive(Debug)]
pub struct Recorder {
    state: RecorderState,
    chunks_l: Vec<Vec<f32>>,
    chunks_r: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl Recorder {
    pub fn new(sample_rate: u32) -> Self {
        Recorder {
            state: RecorderState::Idle,
            chunks_l: Vec::new(),
            chunks_r: Vec::new(),
            sample_rate,
        }
    }

    /// Begin a new capture, discarding any previous one. No-op while
    /// already recording.
    pub fn start(&mut self) {
        if self.state == RecorderState::Recording {
            return;
        }
        self.chunks_l.clear();
        self.chunks_r.clear();
        self.state = RecorderState::Recording;
        info!("recording started");
    }

    /// Stop the capture, keeping the chunks for readout. No-op while idle.
    pub fn stop(&mut self) {
        if self.state == RecorderState::Idle {
            return;
        }
        self.state = RecorderState::Idle;
        let samples: usize = self.chunks_l.iter().map(Vec::len).sum();
        info!(
            "recording stopped: {:.2}s captured",
            samples as f64 / self.sample_rate as f64
        );
    }

    pub fn is_recording(&self) -> bool {
        self.state == RecorderState::Recording
    }

    /// Capture one block. Blocks arriving while idle are dropped.
    pub fn push_block(&mut self, left: &[f32], right: &[f32]) {
        if self.state != RecorderState::Recording {
            return;
        }
        self.chunks_l.push(left.to_vec());
        self.chunks_r.push(right.to_vec());
    }

    /// Assemble the capture into one contiguous buffer. `None` when nothing
    /// was recorded.
    pub fn recorded_buffer(&self) -> Option<RecordedBuffer> {
        if self.chunks_l.iter().all(Vec::is_empty) {
            return None;
        }
        Some(RecordedBuffer {
            left: self.chunks_l.concat(),
            right: self.chunks_r.concat(),
            sample_rate: self.sample_rate,
        })
    }

    /// Render the capture as a 16-bit stereo WAV file. `None` when nothing
    /// was recorded.
    pub fn recorded_wav(&self) -> Option<Vec<u8>> {
        let buffer = self.recorded_buffer()?;
        Some(encode_wav(&buffer))
    }
}

/// Encode a stereo buffer as 16-bit PCM WAV.
pub fn encode_wav(buffer: &RecordedBuffer) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: buffer.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        // Writing to an in-memory cursor cannot fail.
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .expect("WAV header write to memory");
        for i in 0..buffer.left.len() {
            let l = (buffer.left[i].clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            let r = (buffer.right[i].clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer.write_sample(l).expect("WAV sample write to memory");
            writer.write_sample(r).expect("WAV sample write to memory");
        }
        writer.finalize().expect("WAV finalize to memory");
    }
    cursor.into_inner()
}

/// Decode a WAV file into a stereo buffer. Mono input is duplicated to both
/// channels; more than two channels is rejected.
pub fn decode_wav(bytes: &[u8]) -> Result<RecordedBuffer, EngineError> {
    let mut reader = hound::WavReader::new(Cursor::new(bytes)).map_err(DecodeError::Wav)?;
    let spec = reader.spec();

    if spec.channels == 0 || spec.channels > 2 {
        return Err(DecodeError::BadFormat {
            detail: format!("unsupported channel count {}", spec.channels),
        }
        .into());
    }

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(DecodeError::Wav)?,
        hound::SampleFormat::Int => {
            let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max))
                .collect::<Result<_, _>>()
                .map_err(DecodeError::Wav)?
        }
    };

    let (left, right) = if spec.channels == 1 {
        (samples.clone(), samples)
    } else {
        let mut left = Vec::with_capacity(samples.len() / 2);
        let mut right = Vec::with_capacity(samples.len() / 2);
        for pair in samples.chunks_exact(2) {
            left.push(pair[0]);
            right.push(pair[1]);
        }
        (left, right)
    };

    Ok(RecordedBuffer {
        left,
        right,
        sample_rate: spec.sample_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_recording_yields_none() {
        let mut rec = Recorder::new(44100);
        rec.start();
        rec.stop();
        assert!(rec.recorded_buffer().is_none());
        assert!(rec.recorded_wav().is_none());
    }

    #[test]
    fn blocks_while_idle_are_dropped() {
        let mut rec = Recorder::new(44100);
        rec.push_block(&[0.5; 64], &[0.5; 64]);
        assert!(rec.recorded_buffer().is_none());
    }

    #[test]
    fn chunks_concatenate_in_order() {
        let mut rec = Recorder::new(44100);
        rec.start();
        rec.push_block(&[0.1; 4], &[0.1; 4]);
        rec.push_block(&[0.2; 4], &[0.2; 4]);
        rec.stop();

        let buffer = rec.recorded_buffer().unwrap();
        assert_eq!(buffer.len(), 8);
        assert_eq!(buffer.left[0], 0.1);
        assert_eq!(buffer.left[7], 0.2);
    }

    #[test]
    fn restart_discards_the_previous_take() {
        let mut rec = Recorder::new(44100);
        rec.start();
        rec.push_block(&[0.9; 16], &[0.9; 16]);
        rec.stop();
        rec.start();
        rec.push_block(&[0.1; 8], &[0.1; 8]);
        rec.stop();

        let buffer = rec.recorded_buffer().unwrap();
        assert_eq!(buffer.len(), 8);
        assert_eq!(buffer.left[0], 0.1);
    }

    #[test]
    fn start_while_recording_keeps_the_take() {
        let mut rec = Recorder::new(44100);
        rec.start();
        rec.push_block(&[0.3; 8], &[0.3; 8]);
        rec.start();
        rec.push_block(&[0.4; 8], &[0.4; 8]);
        rec.stop();
        assert_eq!(rec.recorded_buffer().unwrap().len(), 16);
    }

    #[test]
    fn wav_round_trip_preserves_shape_and_level() {
        let mut rec = Recorder::new(22050);
        rec.start();
        let left: Vec<f32> = (0..1000).map(|i| ((i as f32) * 0.01).sin() * 0.8).collect();
        let right: Vec<f32> = left.iter().map(|s| -s).collect();
        rec.push_block(&left, &right);
        rec.stop();

        let wav = rec.recorded_wav().unwrap();
        let decoded = decode_wav(&wav).unwrap();
        assert_eq!(decoded.sample_rate, 22050);
        assert_eq!(decoded.len(), 1000);
        for i in 0..1000 {
            assert!((decoded.left[i] - left[i]).abs() < 0.001, "sample {i} drifted");
            assert!((decoded.right[i] - right[i]).abs() < 0.001);
        }
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(decode_wav(&[0u8; 16]).is_err());
    }

    #[test]
    fn decode_duplicates_mono_to_stereo() {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for i in 0..100i16 {
                writer.write_sample(i * 100).unwrap();
            }
            writer.finalize().unwrap();
        }
        let decoded = decode_wav(&cursor.into_inner()).unwrap();
        assert_eq!(decoded.left, decoded.right);
        assert_eq!(decoded.len(), 100);
    }
}
