use playback_bridge::hal::channel_mapper::{needs_shim, DEFAULT_SCRATCH_FRAMES};
use playback_bridge::hal::*;

#[test]
fn test_shim_expands_i16_stereo_into_quad() {
    let frames = 64;
    let mut shim = ChannelShim::new(HardwareFormat::S16, 256).unwrap();
    let mut output = vec![-1i16; frames * 4];

    let outcome = shim.render(SampleBufferMut::I16(&mut output), frames, |stereo| {
        let samples = match stereo {
            SampleBufferMut::I16(s) => s,
            _ => return false,
        };
        assert_eq!(samples.len(), frames * 2);
        for (i, frame) in samples.chunks_exact_mut(2).enumerate() {
            frame[0] = i as i16;
            frame[1] = -(i as i16);
        }
        true
    });

    assert_eq!(outcome, ShimOutcome::Rendered);
    for (i, frame) in output.chunks_exact(4).enumerate() {
        assert_eq!(frame, [i as i16, -(i as i16), 0, 0]);
    }
}

#[test]
fn test_shim_expands_f32_stereo_into_quad() {
    let frames = 32;
    let mut shim = ChannelShim::new(HardwareFormat::F32, 32).unwrap();
    let mut output = vec![1.0f32; frames * 4];

    let outcome = shim.render(SampleBufferMut::F32(&mut output), frames, |mut stereo| {
        let samples = stereo.as_f32().unwrap();
        for frame in samples.chunks_exact_mut(2) {
            frame[0] = 0.25;
            frame[1] = -0.25;
        }
        true
    });

    assert_eq!(outcome, ShimOutcome::Rendered);
    for frame in output.chunks_exact(4) {
        assert_eq!(frame, [0.25, -0.25, 0.0, 0.0]);
    }
}

#[test]
fn test_shim_leaves_output_untouched_without_data() {
    let mut shim = ChannelShim::new(HardwareFormat::S16, 128).unwrap();
    let mut output = vec![42i16; 128 * 4];

    let outcome = shim.render(SampleBufferMut::I16(&mut output), 128, |mut stereo| {
        // Scribbles on scratch must not leak into the hardware buffer
        stereo.as_i16().unwrap().fill(7);
        false
    });

    assert_eq!(outcome, ShimOutcome::NoData);
    assert!(output.iter().all(|&s| s == 42));
}

#[test]
fn test_shim_only_touches_requested_frames() {
    let mut shim = ChannelShim::new(HardwareFormat::F32, 16).unwrap();
    let mut output = vec![9.0f32; 16 * 4];

    let outcome = shim.render(SampleBufferMut::F32(&mut output), 4, |mut stereo| {
        stereo.as_f32().unwrap().fill(0.5);
        true
    });

    assert_eq!(outcome, ShimOutcome::Rendered);
    assert!(output[..16].chunks_exact(4).all(|f| f == [0.5, 0.5, 0.0, 0.0]));
    assert!(output[16..].iter().all(|&s| s == 9.0));
}

#[test]
fn test_shim_mismatched_buffer_type_is_rejected() {
    let mut shim = ChannelShim::new(HardwareFormat::S16, 16).unwrap();
    let mut output = vec![0.75f32; 16];

    let outcome = shim.render(SampleBufferMut::F32(&mut output), 4, |_| true);

    assert_eq!(outcome, ShimOutcome::UnsupportedFormat(HardwareFormat::Unknown));
    assert!(output.iter().all(|&s| s == 0.75));
}

#[test]
fn test_shim_capacity() {
    let shim = ChannelShim::new(HardwareFormat::F32, DEFAULT_SCRATCH_FRAMES).unwrap();
    assert_eq!(shim.capacity_frames(), DEFAULT_SCRATCH_FRAMES);
    assert!(needs_shim(4));
    assert!(!needs_shim(2));
}
