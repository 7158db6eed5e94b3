//! Audio sink
//!
//! Collects the interleaved stereo PCM the core pushes during a step. Samples
//! only leave the sink when the host drains it.

/// Audio sample format
pub type Sample = i16;

/// Interleaved channels per frame
pub const CHANNELS: usize = 2;

/// Append-only interleaved stereo buffer
#[derive(Debug, Default)]
pub struct AudioSink {
    buffer: Vec<Sample>,
}

impl AudioSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one stereo frame
    pub fn push_frame(&mut self, left: Sample, right: Sample) {
        self.buffer.push(left);
        self.buffer.push(right);
    }

    /// Append interleaved frames; returns the number of whole frames taken
    pub fn push_batch(&mut self, samples: &[Sample]) -> usize {
        let frames = samples.len() / CHANNELS;
        self.buffer.extend_from_slice(&samples[..frames * CHANNELS]);
        tracing::trace!("Audio batch: {} frames", frames);
        frames
    }

    /// Take everything accumulated so far
    pub fn drain(&mut self) -> Vec<Sample> {
        std::mem::take(&mut self.buffer)
    }

    /// Buffered samples (not frames)
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_creation() {
        let sink = AudioSink::new();
        assert!(sink.is_empty());
    }

    #[test]
    fn test_push_batch_and_drain() {
        let mut sink = AudioSink::new();
        assert_eq!(sink.push_batch(&[1, -1, 2, -2]), 2);
        assert_eq!(sink.push_batch(&[3, -3]), 1);

        assert_eq!(sink.drain(), vec![1, -1, 2, -2, 3, -3]);
        assert!(sink.drain().is_empty());
    }

    #[test]
    fn test_push_frame_interleaves() {
        let mut sink = AudioSink::new();
        sink.push_frame(100, -100);
        sink.push_frame(200, -200);
        assert_eq!(sink.len(), 4);
        assert_eq!(sink.drain(), vec![100, -100, 200, -200]);
    }

    #[test]
    fn test_push_batch_drops_partial_frame() {
        let mut sink = AudioSink::new();
        assert_eq!(sink.push_batch(&[5, 6, 7]), 1);
        assert_eq!(sink.drain(), vec![5, 6]);
    }
}
