use anyhow::{Result, bail};

/// Planar multi-channel sample buffer.
///
/// Storage is allocated once for `capacity` frames per channel. The active
/// length can shrink and grow again within that capacity without reallocating,
/// so a renderer can reuse one buffer for a short final block.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    channels: Vec<Vec<f32>>,
    len: usize,
}

impl AudioBuffer {
    pub fn new(num_channels: usize, len: usize) -> Self {
        Self {
            channels: vec![vec![0.0; len]; num_channels],
            len,
        }
    }

    pub fn from_channels(channels: Vec<Vec<f32>>) -> Result<Self> {
        let len = channels.first().map_or(0, Vec::len);
        if channels.iter().any(|c| c.len() != len) {
            bail!("all channels must have the same length");
        }
        Ok(Self { channels, len })
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// Change the active length, capped at capacity.
    pub fn set_len(&mut self, len: usize) {
        self.len = len.min(self.capacity());
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(|c| &c[..self.len])
    }

    pub fn channel_mut(&mut self, index: usize) -> Option<&mut [f32]> {
        let len = self.len;
        self.channels.get_mut(index).map(|c| &mut c[..len])
    }

    pub fn channels_mut(&mut self) -> impl Iterator<Item = &mut [f32]> {
        let len = self.len;
        self.channels.iter_mut().map(move |c| &mut c[..len])
    }

    pub fn fill(&mut self, value: f32) {
        for channel in self.channels_mut() {
            channel.fill(value);
        }
    }

    /// Deinterleave `frames` into the buffer and set the length to the number of
    /// whole frames read (capped at capacity). Returns that count.
    pub fn read_interleaved(&mut self, samples: &[f32]) -> usize {
        let num_channels = self.num_channels();
        if num_channels == 0 {
            self.len = 0;
            return 0;
        }

        let frames = (samples.len() / num_channels).min(self.capacity());
        for (i, frame) in samples.chunks_exact(num_channels).take(frames).enumerate() {
            for (channel, &sample) in self.channels.iter_mut().zip(frame) {
                channel[i] = sample;
            }
        }
        self.len = frames;
        frames
    }

    /// Append the active frames to `out` in interleaved order.
    pub fn write_interleaved(&self, out: &mut Vec<f32>) {
        out.reserve(self.len * self.num_channels());
        for i in 0..self.len {
            for channel in &self.channels {
                out.push(channel[i]);
            }
        }
    }
}
