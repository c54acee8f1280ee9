use playback_bridge::hal::mock::{SimulatedBuffer, SimulatedDriver, SimulatedOutput};
use playback_bridge::hal::HardwareFormat;
use playback_bridge::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn plugin_with(driver: SimulatedDriver, config: OutputConfig) -> OutputPlugin {
    let plugin = OutputPlugin::new(driver).with_config(config);
    plugin.static_init();
    plugin
}

/// Producer that writes `value` into every F32 sample and counts its calls
fn constant_f32(value: f32, calls: Arc<AtomicUsize>) -> impl PlaybackProducer {
    from_fn(move |mut output, format, frames| {
        calls.fetch_add(1, Ordering::SeqCst);
        match output.as_f32() {
            Some(samples) => {
                samples[..frames * format.channels as usize].fill(value);
                true
            }
            None => false,
        }
    })
}

#[test]
fn test_start_stop_restart() {
    let driver = SimulatedDriver::new().with_output(SimulatedOutput::new("Speakers", true));
    let hardware = driver.hardware();
    let plugin = plugin_with(driver, OutputConfig::default());
    let mut session = plugin.create().unwrap();
    assert_eq!(session.state(), SessionState::Created);

    let calls = Arc::new(AtomicUsize::new(0));
    session.start(constant_f32(0.5, calls.clone())).unwrap();
    assert_eq!(session.state(), SessionState::Active);
    assert!(session.is_streaming());

    let buffer = hardware.render(SimulatedBuffer::filled(HardwareFormat::F32, 64, 2, 0)).unwrap();
    assert_eq!(buffer, SimulatedBuffer::F32(vec![0.5; 128]));

    session.stop().unwrap();
    assert_eq!(session.state(), SessionState::Stopped);
    assert!(!session.is_streaming());

    session.start(constant_f32(-0.5, calls.clone())).unwrap();
    assert_eq!(session.state(), SessionState::Active);
    assert_eq!(hardware.open_count(), 2);

    let buffer = hardware.render(SimulatedBuffer::filled(HardwareFormat::F32, 64, 2, 0)).unwrap();
    assert_eq!(buffer, SimulatedBuffer::F32(vec![-0.5; 128]));
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    plugin.destroy(session).unwrap();
}

#[test]
fn test_producer_not_called_after_stop() {
    let driver = SimulatedDriver::new().with_output(SimulatedOutput::new("Speakers", true));
    let hardware = driver.hardware();
    let plugin = plugin_with(driver, OutputConfig::default());
    let mut session = plugin.create().unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    session.start(constant_f32(0.1, calls.clone())).unwrap();
    for _ in 0..3 {
        hardware.render(SimulatedBuffer::filled(HardwareFormat::F32, 16, 2, 0)).unwrap();
    }
    session.stop().unwrap();

    let rendered = hardware.render_count();
    assert!(hardware.render(SimulatedBuffer::filled(HardwareFormat::F32, 16, 2, 0)).is_none());
    assert_eq!(hardware.render_count(), rendered);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_stop_outside_active_is_noop() {
    let driver = SimulatedDriver::new().with_output(SimulatedOutput::new("Speakers", true));
    let plugin = plugin_with(driver, OutputConfig::default());
    let mut session = plugin.create().unwrap();

    session.stop().unwrap();
    assert_eq!(session.state(), SessionState::Created);
}

#[test]
fn test_destroy_without_start() {
    let driver = SimulatedDriver::new().with_output(SimulatedOutput::new("Speakers", true));
    let hardware = driver.hardware();
    let plugin = plugin_with(driver, OutputConfig::default());
    let session = plugin.create().unwrap();

    plugin.destroy(session).unwrap();
    assert_eq!(hardware.open_count(), 0);
}

#[test]
fn test_destroy_while_active_stops_stream() {
    let driver = SimulatedDriver::new().with_output(SimulatedOutput::new("Speakers", true));
    let hardware = driver.hardware();
    let plugin = plugin_with(driver, OutputConfig::default());
    let mut session = plugin.create().unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    session.start(constant_f32(0.2, calls.clone())).unwrap();
    plugin.destroy(session).unwrap();

    assert!(hardware.render(SimulatedBuffer::filled(HardwareFormat::F32, 16, 2, 0)).is_none());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_open_failure_allows_retry() {
    let driver = SimulatedDriver::new().with_output(SimulatedOutput::new("Speakers", true));
    let hardware = driver.hardware();
    let plugin = plugin_with(driver, OutputConfig::default());
    let mut session = plugin.create().unwrap();

    hardware.set_fail_open(true);
    let calls = Arc::new(AtomicUsize::new(0));
    let err = session.start(constant_f32(0.3, calls.clone())).unwrap_err();
    assert!(matches!(err, OutputError::DeviceOpen(_)));
    assert_eq!(session.state(), SessionState::Created);
    assert!(session.negotiated().is_none());

    hardware.set_fail_open(false);
    session.start(constant_f32(0.3, calls.clone())).unwrap();
    assert_eq!(session.state(), SessionState::Active);
}

#[test]
fn test_start_failure_releases_device() {
    let driver = SimulatedDriver::new().with_output(SimulatedOutput::new("Speakers", true));
    let hardware = driver.hardware();
    let plugin = plugin_with(driver, OutputConfig::default());
    let mut session = plugin.create().unwrap();

    hardware.set_fail_start(true);
    let calls = Arc::new(AtomicUsize::new(0));
    let err = session.start(constant_f32(0.3, calls.clone())).unwrap_err();
    assert!(matches!(err, OutputError::DeviceOpen(ref msg) if msg.contains("start failure")));
    assert_eq!(session.state(), SessionState::Created);
    assert!(session.negotiated().is_none());
    assert!(!session.is_streaming());
}

#[test]
fn test_enumeration_failure_fails_create() {
    let driver = SimulatedDriver::new().with_output(SimulatedOutput::new("Speakers", true));
    driver.hardware().set_fail_enumeration(true);
    let plugin = plugin_with(driver, OutputConfig::default());

    let err = plugin.create().unwrap_err();
    assert!(matches!(err, OutputError::Enumeration(_)));
}

#[test]
fn test_start_without_devices() {
    let plugin = plugin_with(SimulatedDriver::new(), OutputConfig::default());
    let mut session = plugin.create().unwrap();
    assert_eq!(plugin.enumerate_targets(&session).count, 0);

    let calls = Arc::new(AtomicUsize::new(0));
    let err = session.start(constant_f32(0.3, calls)).unwrap_err();
    assert!(matches!(err, OutputError::DeviceOpen(_)));
}

#[test]
fn test_adaptive_mode_uses_native_format() {
    let driver = SimulatedDriver::new().with_output(
        SimulatedOutput::new("Interface", true).with_native(HardwareFormat::S32, 6, 96000),
    );
    let hardware = driver.hardware();
    let plugin = plugin_with(driver, OutputConfig::default());
    let mut session = plugin.create().unwrap();

    let seen = Arc::new(parking_lot::Mutex::new(None));
    let seen_in = seen.clone();
    session
        .start(from_fn(move |_output, format, frames| {
            *seen_in.lock() = Some((format, frames));
            false
        }))
        .unwrap();

    let negotiated = session.negotiated().unwrap();
    assert_eq!(negotiated.format, HardwareFormat::S32);
    assert_eq!(negotiated.channels, 6);

    let buffer = hardware.render(SimulatedBuffer::filled(HardwareFormat::S32, 10, 6, 3)).unwrap();
    assert_eq!(buffer, SimulatedBuffer::I32(vec![3; 60]));

    let captured = *seen.lock();
    let (format, frames) = captured.unwrap();
    assert_eq!(format.format, SampleFormat::I32);
    assert_eq!(format.channels, 6);
    assert_eq!(format.sample_rate, 96000);
    assert_eq!(frames, 10);
}

#[test]
fn test_fixed_mode_requests_exact_format() {
    let driver = SimulatedDriver::new().with_output(SimulatedOutput::new("Speakers", true));
    let hardware = driver.hardware();
    let config = OutputConfig::default().with_mode(NegotiationMode::fixed_default());
    let plugin = plugin_with(driver, config);
    let mut session = plugin.create().unwrap();

    session
        .start(from_fn(|mut output, _format, _frames| match output.as_i16() {
            Some(samples) => {
                samples.fill(1000);
                true
            }
            None => false,
        }))
        .unwrap();

    let negotiated = session.negotiated().unwrap();
    assert_eq!(negotiated.format, HardwareFormat::S16);
    assert_eq!(negotiated.channels, 2);
    assert_eq!(negotiated.sample_rate, 48000);

    let buffer = hardware.render(SimulatedBuffer::filled(HardwareFormat::S16, 8, 2, 0)).unwrap();
    assert_eq!(buffer, SimulatedBuffer::I16(vec![1000; 16]));
}

#[test]
fn test_fixed_mode_unsupported_by_device() {
    let driver = SimulatedDriver::new().with_output(SimulatedOutput::new("Speakers", true));
    let config = OutputConfig::default().with_mode(NegotiationMode::Fixed {
        format: SampleFormat::U8,
        channels: 1,
        sample_rate: 8000,
    });
    let plugin = plugin_with(driver, config);
    let mut session = plugin.create().unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let err = session.start(constant_f32(0.1, calls)).unwrap_err();
    assert!(matches!(err, OutputError::DeviceOpen(_)));
    assert_eq!(session.state(), SessionState::Created);
}

#[test]
fn test_fixed_mode_rejects_unknown_format() {
    let driver = SimulatedDriver::new().with_output(SimulatedOutput::new("Speakers", true));
    let config = OutputConfig::default().with_mode(NegotiationMode::Fixed {
        format: SampleFormat::Unknown,
        channels: 2,
        sample_rate: 48000,
    });
    let plugin = plugin_with(driver, config);
    let mut session = plugin.create().unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let err = session.start(constant_f32(0.1, calls)).unwrap_err();
    assert!(matches!(err, OutputError::InvalidConfig(_)));
}

#[test]
fn test_configured_device_overrides_default() {
    let driver = SimulatedDriver::new()
        .with_output(SimulatedOutput::new("Headphones", false).with_native(HardwareFormat::S16, 2, 44100))
        .with_output(SimulatedOutput::new("Speakers", true));
    let plugin = plugin_with(driver, OutputConfig::default().with_device("Headphones"));
    let mut session = plugin.create().unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    session.start(constant_f32(0.1, calls)).unwrap();
    assert_eq!(session.negotiated().unwrap().sample_rate, 44100);
}

#[test]
fn test_missing_configured_device_falls_back_to_default() {
    let driver = SimulatedDriver::new()
        .with_output(SimulatedOutput::new("Headphones", false).with_native(HardwareFormat::S16, 2, 44100))
        .with_output(SimulatedOutput::new("Speakers", true));
    let plugin = plugin_with(driver, OutputConfig::default().with_device("Nowhere"));
    let mut session = plugin.create().unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    session.start(constant_f32(0.1, calls)).unwrap();
    assert_eq!(session.negotiated().unwrap().sample_rate, 48000);
}

#[test]
fn test_no_default_uses_first_device() {
    let driver = SimulatedDriver::new()
        .with_output(SimulatedOutput::new("First", false).with_native(HardwareFormat::S16, 2, 22050))
        .with_output(SimulatedOutput::new("Second", false));
    let plugin = plugin_with(driver, OutputConfig::default());
    let mut session = plugin.create().unwrap();
    assert_eq!(session.targets().default_index, None);

    let calls = Arc::new(AtomicUsize::new(0));
    session.start(constant_f32(0.1, calls)).unwrap();
    assert_eq!(session.negotiated().unwrap().sample_rate, 22050);
}

#[test]
fn test_start_while_active_restarts() {
    let driver = SimulatedDriver::new().with_output(SimulatedOutput::new("Speakers", true));
    let hardware = driver.hardware();
    let plugin = plugin_with(driver, OutputConfig::default());
    let mut session = plugin.create().unwrap();

    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));
    session.start(constant_f32(0.1, first.clone())).unwrap();
    session.start(constant_f32(0.9, second.clone())).unwrap();
    assert_eq!(session.state(), SessionState::Active);

    let buffer = hardware.render(SimulatedBuffer::filled(HardwareFormat::F32, 4, 2, 0)).unwrap();
    assert_eq!(buffer, SimulatedBuffer::F32(vec![0.9; 8]));
    assert_eq!(first.load(Ordering::SeqCst), 0);
    assert_eq!(second.load(Ordering::SeqCst), 1);
}

#[test]
fn test_panicking_producer_leaves_buffer() {
    let driver = SimulatedDriver::new().with_output(SimulatedOutput::new("Speakers", true));
    let hardware = driver.hardware();
    let plugin = plugin_with(driver, OutputConfig::default());
    let mut session = plugin.create().unwrap();

    session
        .start(from_fn(|_output, _format, _frames| panic!("producer bug")))
        .unwrap();

    let buffer = hardware.render(SimulatedBuffer::filled(HardwareFormat::F32, 4, 2, 0)).unwrap();
    assert_eq!(buffer, SimulatedBuffer::F32(vec![0.0; 8]));
    session.stop().unwrap();
}

#[test]
fn test_default_opens_by_id_when_names_collide() {
    let driver = SimulatedDriver::new()
        .with_output(SimulatedOutput::new("USB Audio", false).with_native(HardwareFormat::F32, 2, 44100))
        .with_output(SimulatedOutput::new("USB Audio", true).with_native(HardwareFormat::F32, 2, 96000));
    let plugin = plugin_with(driver, OutputConfig::default());
    let mut session = plugin.create().unwrap();
    assert_eq!(session.targets().default_index, Some(1));

    let calls = Arc::new(AtomicUsize::new(0));
    session.start(constant_f32(0.1, calls)).unwrap();
    assert_eq!(session.negotiated().unwrap().sample_rate, 96000);
}

#[test]
fn test_configured_name_shared_by_default_picks_default() {
    let driver = SimulatedDriver::new()
        .with_output(SimulatedOutput::new("USB Audio", false).with_native(HardwareFormat::F32, 2, 44100))
        .with_output(SimulatedOutput::new("Speakers", false))
        .with_output(SimulatedOutput::new("USB Audio", true).with_native(HardwareFormat::F32, 2, 96000));
    let plugin = plugin_with(driver, OutputConfig::default().with_device("USB Audio"));
    let mut session = plugin.create().unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    session.start(constant_f32(0.1, calls)).unwrap();
    assert_eq!(session.negotiated().unwrap().sample_rate, 96000);
}

#[test]
fn test_stop_waits_for_in_flight_buffer() {
    let driver = SimulatedDriver::new().with_output(SimulatedOutput::new("Speakers", true));
    let hardware = driver.hardware();
    let plugin = plugin_with(driver, OutputConfig::default());
    let mut session = plugin.create().unwrap();

    let entered = Arc::new(AtomicBool::new(false));
    let finished = Arc::new(AtomicBool::new(false));
    let (entered_in, finished_in) = (entered.clone(), finished.clone());
    session
        .start(from_fn(move |mut output, _format, _frames| {
            entered_in.store(true, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(300));
            if let Some(samples) = output.as_f32() {
                samples.fill(0.5);
            }
            finished_in.store(true, Ordering::SeqCst);
            true
        }))
        .unwrap();

    let render_hw = hardware.clone();
    let renderer = std::thread::spawn(move || {
        render_hw.render(SimulatedBuffer::filled(HardwareFormat::F32, 16, 2, 0))
    });

    std::thread::sleep(Duration::from_millis(50));
    assert!(entered.load(Ordering::SeqCst));
    assert!(!finished.load(Ordering::SeqCst));

    session.stop().unwrap();
    assert!(finished.load(Ordering::SeqCst));
    assert_eq!(session.state(), SessionState::Stopped);

    let buffer = renderer.join().unwrap().unwrap();
    assert_eq!(buffer, SimulatedBuffer::F32(vec![0.5; 32]));
}
