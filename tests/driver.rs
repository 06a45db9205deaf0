mod tests {
    use embassy_time::Instant;
    use glimmer_pipeline::{
        DriverError, DriverState, LedDriver, Timings, TransmitStatus, Waveform, WaveformHardware,
    };

    const BUS_CLOCK: u32 = 48_000_000;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Configure(Waveform),
        Load(usize),
        Disarm,
        WaitBoundary,
        Arm,
    }

    #[derive(Default)]
    struct MockHardware {
        calls: Vec<Call>,
    }

    impl WaveformHardware for MockHardware {
        fn configure(&mut self, waveform: &Waveform) {
            self.calls.push(Call::Configure(*waveform));
        }

        fn load(&mut self, buffer: &[u8]) {
            self.calls.push(Call::Load(buffer.len()));
        }

        fn disarm_data_trigger(&mut self) {
            self.calls.push(Call::Disarm);
        }

        fn wait_cycle_boundary(&mut self) {
            self.calls.push(Call::WaitBoundary);
        }

        fn arm(&mut self) {
            self.calls.push(Call::Arm);
        }
    }

    fn us(micros: u64) -> Instant {
        Instant::from_micros(micros)
    }

    #[test]
    fn test_waveform() {
        let waveform = Waveform::new(BUS_CLOCK, &Timings::DEFAULT, 64).unwrap();
        assert_eq!(waveform.period_ticks, 60);
        assert_eq!(waveform.t0h_ticks, 14);
        assert_eq!(waveform.t1h_ticks, 41);
        assert_eq!(waveform.transfer_len, 64 * 24);

        // rounded to nearest
        let waveform = Waveform::new(BUS_CLOCK, &Timings::SK6812_FAST, 1).unwrap();
        assert_eq!(waveform.period_ticks, 53);
    }

    #[test]
    fn test_waveform_rejects_invalid_timings() {
        let stopped = Timings { frequency: 0, ..Timings::DEFAULT };
        assert_eq!(Waveform::new(BUS_CLOCK, &stopped, 64), None);
        let inverted = Timings { t0h: 200, t1h: 100, ..Timings::DEFAULT };
        assert_eq!(Waveform::new(BUS_CLOCK, &inverted, 64), None);
    }

    #[test]
    fn test_init_rejects_without_side_effects() {
        let status = TransmitStatus::new();
        let mut driver = LedDriver::new(MockHardware::default(), &status, BUS_CLOCK);

        assert_eq!(driver.init(0, &Timings::DEFAULT), Err(DriverError::InvalidLength));
        assert_eq!(driver.init(121, &Timings::DEFAULT), Err(DriverError::InvalidLength));
        let bad = Timings { t0h: 200, t1h: 100, ..Timings::DEFAULT };
        assert_eq!(driver.init(64, &bad), Err(DriverError::InvalidTimings));

        assert!(driver.hardware().calls.is_empty());
        assert_eq!(driver.state(), DriverState::Idle);
        assert!(driver.timings().is_none());
        assert!(!driver.ready(us(10_000)));
    }

    #[test]
    fn test_write_before_init() {
        let status = TransmitStatus::new();
        let mut driver = LedDriver::new(MockHardware::default(), &status, BUS_CLOCK);
        assert_eq!(driver.write(&[0; 24]), Err(DriverError::NotConfigured));
        assert!(!status.is_in_progress());
    }

    #[test]
    fn test_write_sequence() {
        let status = TransmitStatus::new();
        let mut driver = LedDriver::new(MockHardware::default(), &status, BUS_CLOCK);
        driver.init(4, &Timings::DEFAULT).unwrap();
        assert_eq!(driver.state(), DriverState::Ready);

        let buffer = [0u8; 200];
        assert_eq!(driver.write(&buffer[..95]), Err(DriverError::BufferTooSmall));
        driver.write(&buffer).unwrap();

        assert_eq!(
            driver.hardware().calls,
            [
                Call::Configure(Waveform::new(BUS_CLOCK, &Timings::DEFAULT, 4).unwrap()),
                Call::Load(96),
                Call::Disarm,
                Call::WaitBoundary,
                Call::Arm,
            ]
        );
        assert_eq!(driver.state(), DriverState::Transmitting);
        assert!(!driver.write_finished());
        assert_eq!(driver.write(&buffer), Err(DriverError::Busy));
    }

    #[test]
    fn test_ready_after_reset_interval() {
        let status = TransmitStatus::new();
        let mut driver = LedDriver::new(MockHardware::default(), &status, BUS_CLOCK);
        driver.init(4, &Timings::DEFAULT).unwrap();
        driver.write(&[0; 96]).unwrap();
        assert!(!driver.ready(us(50_000)));

        // completion interrupt
        status.complete(us(10_000));
        assert!(driver.write_finished());
        assert_eq!(status.finished_at(), us(10_000));
        assert!(!driver.ready(us(10_299)));
        assert!(driver.ready(us(10_300)));
        assert_eq!(driver.state(), DriverState::Ready);
    }

    #[test]
    fn test_wait_ready_polls_clock() {
        let status = TransmitStatus::new();
        let mut driver = LedDriver::new(MockHardware::default(), &status, BUS_CLOCK);
        driver.init(4, &Timings::SK6812).unwrap();
        driver.write(&[0; 96]).unwrap();
        status.complete(us(1_000));

        let mut reads = 0;
        driver.wait_ready(|| {
            reads += 1;
            us(1_000 + reads * 25)
        });
        // 100 us reset interval
        assert_eq!(reads, 4);
    }

    #[test]
    fn test_reinit_reprograms_hardware() {
        let status = TransmitStatus::new();
        let mut driver = LedDriver::new(MockHardware::default(), &status, BUS_CLOCK);
        driver.init(4, &Timings::DEFAULT).unwrap();
        driver.init(120, &Timings::SK6812_EXTREME).unwrap();

        assert_eq!(driver.timings(), Some(&Timings::SK6812_EXTREME));
        assert_eq!(driver.waveform().map(|w| w.transfer_len), Some(120 * 24));
        assert_eq!(driver.waveform().map(|w| w.period_ticks), Some(48));
        assert_eq!(driver.hardware().calls.len(), 2);
    }
}
