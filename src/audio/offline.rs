use crate::audio::buffer::AudioBuffer;
use crate::audio::engine::Engine;

/// Run interleaved `input` through `engine` in blocks of `block_size` frames
/// and return the interleaved result. The engine must already be prepared for
/// `channels` channels.
pub fn render(engine: &mut Engine, input: &[f32], channels: usize, block_size: usize) -> Vec<f32> {
    let channels = channels.max(1);
    let block_size = block_size.max(1);
    let mut buffer = AudioBuffer::new(channels, block_size);
    let mut output = Vec::with_capacity(input.len());

    for chunk in input.chunks(block_size * channels) {
        buffer.read_interleaved(chunk);
        engine.process(&mut buffer);
        buffer.write_interleaved(&mut output);
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::engine::EngineConfig;
    use crate::fx::stages::ProcessSpec;
    use crate::params::ParameterSet;
    use std::sync::Arc;

    #[test]
    fn partial_last_block_keeps_length() {
        let (mut engine, _handle) = Engine::new(Arc::new(ParameterSet::new()), EngineConfig::default());
        engine.prepare(ProcessSpec::new(48_000.0, 64, 2));

        let input = vec![0.1f32; 2 * 150];
        let output = render(&mut engine, &input, 2, 64);

        assert_eq!(output.len(), input.len());
        assert!(output.iter().all(|s| s.is_finite()));
    }
}
