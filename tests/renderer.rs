mod tests {
    use embassy_time::Instant;
    use glimmer_pipeline::bitplane::{buffer_size, unpack_pixel};
    use glimmer_pipeline::color::Rgb;
    use glimmer_pipeline::config::NUM_PACKET_BUFFERS;
    use glimmer_pipeline::protocol::{
        ColorFormat, DitherMode, InterpolateMode, packets_per_frame, write_pixel24,
        write_pixel33,
    };
    use glimmer_pipeline::renderer::{COMPILED_RENDERERS, RendererEntry};
    use glimmer_pipeline::{
        ConfigError, Packet, PacketPool, Renderer, RendererHolder, RendererId, RendererOptions,
        RendererSlot,
    };

    const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };
    const RED: Rgb = Rgb { r: 255, g: 0, b: 0 };
    const BLUE: Rgb = Rgb { r: 0, g: 0, b: 255 };

    const RGB24: RendererId =
        RendererId::new(ColorFormat::R8G8B8, DitherMode::None, InterpolateMode::None);
    const RGB24_LINEAR: RendererId =
        RendererId::new(ColorFormat::R8G8B8, DitherMode::None, InterpolateMode::Linear);
    const RGB33: RendererId =
        RendererId::new(ColorFormat::R11G11B11, DitherMode::None, InterpolateMode::None);

    const SMALL: RendererOptions = RendererOptions::new(2, 4, 0);
    const OUT_LEN: usize = buffer_size(4);

    fn frame24<'a>(pool: &'a PacketPool, pixels: &[(usize, Rgb)]) -> Packet<'a> {
        let mut packet = pool.alloc_zeroed();
        for (offset, color) in pixels {
            write_pixel24(packet.bytes_mut(), *offset, color.r, color.g, color.b);
        }
        packet
    }

    fn render(holder: &mut RendererHolder<'_>, now: Instant) -> [u8; OUT_LEN] {
        let mut out = [0u8; OUT_LEN];
        assert!(holder.get_mut().render(&mut out, now));
        out
    }

    #[test]
    fn test_holder_starts_null() {
        let pool = PacketPool::new();
        let mut holder = RendererHolder::new(&pool);
        assert!(holder.get().is_null());
        assert!(holder.get().options().is_none());

        let mut out = [0u8; OUT_LEN];
        assert!(!holder.get_mut().render(&mut out, Instant::from_millis(0)));
        assert!(!holder.get_mut().store_frame_packet(0, pool.alloc(), 64, Instant::from_millis(0)));
        holder.get_mut().advance_frame();
        assert_eq!(pool.available(), NUM_PACKET_BUFFERS);
    }

    #[test]
    fn test_end_to_end_single_red_pixel() {
        let pool = PacketPool::new();
        let mut holder = RendererHolder::new(&pool);
        holder.init(RGB24, SMALL).unwrap();
        assert_eq!(holder.get().frame_buffers(), 2);
        assert_eq!(holder.get().options(), Some(&SMALL));

        let packet = frame24(&pool, &[(0, RED)]);
        assert!(holder.get_mut().store_frame_packet(0, packet, 64, Instant::from_millis(1)));
        holder.get_mut().advance_frame();

        let out = render(&mut holder, Instant::from_millis(2));
        for strip in 0..2 {
            for pixel in 0..4 {
                let expected = if strip == 0 && pixel == 0 { RED } else { BLACK };
                assert_eq!(unpack_pixel(&out, strip, pixel), expected, "strip {strip} pixel {pixel}");
            }
        }
        // strips beyond the configured ones stay low
        assert!(out.iter().all(|byte| byte & 0xfc == 0));
    }

    #[test]
    fn test_pixels_map_strip_major() {
        let pool = PacketPool::new();
        let mut holder = RendererHolder::new(&pool);
        holder.init(RGB24, SMALL).unwrap();

        // frame pixel 5 is strip 1, pixel 1
        let packet = frame24(&pool, &[(5, BLUE)]);
        assert!(holder.get_mut().store_frame_packet(0, packet, 64, Instant::from_millis(1)));
        holder.get_mut().advance_frame();

        let out = render(&mut holder, Instant::from_millis(2));
        assert_eq!(unpack_pixel(&out, 1, 1), BLUE);
        assert_eq!(unpack_pixel(&out, 0, 1), BLACK);
    }

    #[test]
    fn test_dither_collapses_for_plain_24_bit() {
        let dithered =
            RendererId::new(ColorFormat::R8G8B8, DitherMode::Temporal, InterpolateMode::None);
        assert_eq!(dithered.effective_dither_mode(), DitherMode::None);

        let pool = PacketPool::new();
        let mut outputs = Vec::new();
        for id in [RGB24, dithered] {
            let mut holder = RendererHolder::new(&pool);
            holder.init(id, RendererOptions::new(2, 4, 3)).unwrap();
            assert!(matches!(holder.get(), RendererSlot::Rgb24(_)));

            let packet = frame24(&pool, &[(0, Rgb { r: 17, g: 99, b: 200 }), (7, RED)]);
            assert!(holder.get_mut().store_frame_packet(0, packet, 64, Instant::from_millis(1)));
            holder.get_mut().advance_frame();
            for frame in 0..4 {
                outputs.push(render(&mut holder, Instant::from_millis(2 + frame)));
            }
        }
        for frame in 0..4 {
            assert_eq!(outputs[frame], outputs[frame + 4]);
        }
    }

    #[test]
    fn test_wide_format_truncates_to_eight_bits() {
        let pool = PacketPool::new();
        let mut holder = RendererHolder::new(&pool);
        holder.init(RGB33, SMALL).unwrap();
        assert!(matches!(holder.get(), RendererSlot::Rgb33(_)));

        let mut packet = pool.alloc_zeroed();
        write_pixel33(packet.bytes_mut(), 0, 0x7ff, 0x008, 0x3ff);
        assert!(holder.get_mut().store_frame_packet(0, packet, 64, Instant::from_millis(1)));
        holder.get_mut().advance_frame();

        let out = render(&mut holder, Instant::from_millis(2));
        assert_eq!(unpack_pixel(&out, 0, 0), Rgb { r: 0xff, g: 0x01, b: 0x7f });
    }

    #[test]
    fn test_linear_blends_front_and_prior() {
        let pool = PacketPool::new();
        let mut holder = RendererHolder::new(&pool);
        holder.init(RGB24_LINEAR, SMALL).unwrap();
        assert_eq!(holder.get().frame_buffers(), 3);

        assert!(holder.get_mut().store_frame_packet(
            0,
            frame24(&pool, &[(0, RED)]),
            64,
            Instant::from_millis(1)
        ));
        holder.get_mut().advance_frame();
        assert!(holder.get_mut().store_frame_packet(
            0,
            frame24(&pool, &[(0, BLUE)]),
            64,
            Instant::from_millis(2)
        ));
        holder.get_mut().advance_frame();

        // arrival of the front frame: still showing the prior one
        let out = render(&mut holder, Instant::from_millis(2));
        assert_eq!(unpack_pixel(&out, 0, 0), RED);

        // half way
        let out = render(&mut holder, Instant::from_micros(2_500));
        assert_eq!(unpack_pixel(&out, 0, 0), Rgb { r: 127, g: 0, b: 127 });

        // a full frame period later the front frame is shown as is
        let out = render(&mut holder, Instant::from_millis(3));
        assert_eq!(unpack_pixel(&out, 0, 0), BLUE);
        let out = render(&mut holder, Instant::from_millis(60));
        assert_eq!(unpack_pixel(&out, 0, 0), BLUE);
    }

    #[test]
    fn test_reinit_returns_packets() {
        let pool = PacketPool::new();
        let mut holder = RendererHolder::new(&pool);

        holder.init(RGB24, SMALL).unwrap();
        assert_eq!(pool.available(), NUM_PACKET_BUFFERS - 2);

        holder.init(RGB24_LINEAR, SMALL).unwrap();
        assert_eq!(pool.available(), NUM_PACKET_BUFFERS - 3);

        holder.clear();
        assert!(holder.get().is_null());
        assert_eq!(pool.available(), NUM_PACKET_BUFFERS);
    }

    #[test]
    fn test_largest_frames_fit_the_pool() {
        let pool = PacketPool::new();
        let mut holder = RendererHolder::new(&pool);
        for entry in COMPILED_RENDERERS {
            let options = RendererOptions::new(8, 120, 3);
            let buffers = if entry.id.is_triple_buffered() { 3 } else { 2 };
            let packets = buffers * packets_per_frame(8, 120, entry.id.color_format);
            match holder.init(entry.id, options) {
                Ok(()) => assert_eq!(pool.available(), NUM_PACKET_BUFFERS - packets),
                Err(err) => {
                    assert_eq!(err, ConfigError::FrameTooLarge, "{:?}", entry.id);
                    assert_eq!(pool.available(), NUM_PACKET_BUFFERS);
                }
            }
        }
    }

    #[test]
    fn test_invalid_options_fall_back_to_null() {
        let pool = PacketPool::new();
        let mut holder = RendererHolder::new(&pool);
        holder.init(RGB24, SMALL).unwrap();

        for options in [
            RendererOptions::new(0, 4, 0),
            RendererOptions::new(9, 4, 0),
            RendererOptions::new(2, 0, 0),
            RendererOptions::new(2, 121, 0),
            RendererOptions::new(2, 4, 9),
        ] {
            assert_eq!(holder.init(RGB24, options), Err(ConfigError::InvalidOptions));
            assert!(holder.get().is_null());
            assert_eq!(pool.available(), NUM_PACKET_BUFFERS);
        }
    }

    #[test]
    fn test_triple_buffered_too_large() {
        let pool = PacketPool::new();
        let mut holder = RendererHolder::new(&pool);
        let id = RendererId::new(ColorFormat::R11G11B11, DitherMode::Temporal, InterpolateMode::Linear);
        assert_eq!(
            holder.init(id, RendererOptions::new(8, 120, 3)),
            Err(ConfigError::FrameTooLarge)
        );
        assert!(holder.get().is_null());
    }

    #[test]
    fn test_reduced_table() {
        const ONLY_RGB24: &[RendererEntry] = &[COMPILED_RENDERERS[0]];

        let pool = PacketPool::new();
        let mut holder = RendererHolder::with_table(&pool, ONLY_RGB24);
        holder.init(RGB24, SMALL).unwrap();
        assert!(!holder.get().is_null());

        // the dithered 24-bit id resolves to the same entry
        let dithered =
            RendererId::new(ColorFormat::R8G8B8, DitherMode::Temporal, InterpolateMode::None);
        assert_eq!(dithered.effective(), RGB24);
        holder.init(dithered, SMALL).unwrap();
        assert!(matches!(holder.get(), RendererSlot::Rgb24(_)));

        assert_eq!(holder.init(RGB33, SMALL), Err(ConfigError::UnsupportedRenderer));
        assert!(holder.get().is_null());
        assert_eq!(pool.available(), NUM_PACKET_BUFFERS);
    }

    #[test]
    fn test_table_has_no_duplicate_ids() {
        for (i, entry) in COMPILED_RENDERERS.iter().enumerate() {
            assert_eq!(entry.id.effective(), entry.id);
            assert!(COMPILED_RENDERERS[i + 1..].iter().all(|other| other.id != entry.id));
        }
    }

    #[test]
    fn test_every_mode_is_compiled() {
        for format in [ColorFormat::R8G8B8, ColorFormat::R11G11B11] {
            for dither in [DitherMode::None, DitherMode::Temporal] {
                for interpolate in [InterpolateMode::None, InterpolateMode::Linear] {
                    let id = RendererId::new(format, dither, interpolate).effective();
                    assert!(COMPILED_RENDERERS.iter().any(|entry| entry.id == id), "{id:?}");
                }
            }
        }
    }
}
