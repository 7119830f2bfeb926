use crate::audio::block::AudioBlock;

/// Mono mixdown and mid/side decomposition of one frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ReducedFrame {
    pub mono: f64,
    pub mid: f64,
    pub side: f64,
}

/// Reduces a single frame of channel samples.
///
/// A one-channel frame is treated as two identical channels, so it lands
/// entirely in `mid`. Beyond two channels, mid/side use the first pair.
pub fn reduce_frame(samples: &[f32]) -> ReducedFrame {
    let mono = samples.iter().map(|&s| s as f64).sum::<f64>() / samples.len().max(1) as f64;

    let (left, right) = match samples {
        [] => (0.0, 0.0),
        [only] => (*only as f64, *only as f64),
        [l, r, ..] => (*l as f64, *r as f64),
    };

    ReducedFrame {
        mono,
        mid: (left + right) / 2.0,
        side: (left - right) / 2.0,
    }
}

/// Lazily reduces every frame of `block`, in order.
pub fn reduce_frames(block: &AudioBlock) -> impl Iterator<Item = ReducedFrame> + '_ {
    block.iter_frames().map(reduce_frame)
}
