mod tests {
    use embassy_time::Instant;
    use glimmer_pipeline::PacketPool;
    use glimmer_pipeline::color::Color;
    use glimmer_pipeline::config::NUM_PACKET_BUFFERS;
    use glimmer_pipeline::frame_buffer::{FrameBuffer, Rgb24};
    use glimmer_pipeline::protocol::write_pixel24;

    type Frame<'a> = FrameBuffer<'a, Rgb24, 4>;

    #[test]
    fn test_pool_accounting() {
        let pool = PacketPool::new();
        assert_eq!(pool.capacity(), NUM_PACKET_BUFFERS);
        assert_eq!(pool.available(), NUM_PACKET_BUFFERS);

        let a = pool.alloc();
        let b = pool.alloc_zeroed();
        assert_eq!(pool.available(), NUM_PACKET_BUFFERS - 2);
        assert!(b.bytes().iter().all(|byte| *byte == 0));

        drop(a);
        drop(b);
        assert_eq!(pool.available(), NUM_PACKET_BUFFERS);
    }

    #[test]
    fn test_pool_exhaustion() {
        let pool = PacketPool::new();
        let held: Vec<_> = (0..NUM_PACKET_BUFFERS).map(|_| pool.alloc()).collect();
        assert!(pool.try_alloc().is_none());
        drop(held);
        assert!(pool.try_alloc().is_some());
    }

    #[test]
    #[should_panic(expected = "packet pool exhausted")]
    fn test_pool_exhaustion_is_fatal() {
        let pool = PacketPool::new();
        let _held: Vec<_> = (0..NUM_PACKET_BUFFERS).map(|_| pool.alloc()).collect();
        let _ = pool.alloc();
    }

    #[test]
    fn test_new_frame_takes_packets() {
        let pool = PacketPool::new();
        let frame = Frame::new(&pool, 3);
        assert_eq!(frame.packets_per_frame(), 3);
        assert_eq!(pool.available(), NUM_PACKET_BUFFERS - 3);
        assert_eq!(frame.pixel_at(0), Color::default());

        drop(frame);
        assert_eq!(pool.available(), NUM_PACKET_BUFFERS);
    }

    #[test]
    fn test_out_of_range_packet_is_freed() {
        let pool = PacketPool::new();
        let mut frame = Frame::new(&pool, 3);
        let packet = pool.alloc();

        assert!(!frame.store_frame_packet(3, 3, packet, 64, Instant::from_millis(1)));
        assert_eq!(pool.available(), NUM_PACKET_BUFFERS - 3);
    }

    #[test]
    fn test_store_swaps_and_frees_old_packet() {
        let pool = PacketPool::new();
        let mut frame = Frame::new(&pool, 3);

        let mut packet = pool.alloc_zeroed();
        write_pixel24(packet.bytes_mut(), 1, 10, 20, 30);
        assert_eq!(pool.available(), NUM_PACKET_BUFFERS - 4);

        assert!(!frame.store_frame_packet(3, 0, packet, 64, Instant::from_millis(1)));
        assert_eq!(pool.available(), NUM_PACKET_BUFFERS - 3);
        assert_eq!(frame.pixel(0, 1), Color::new(10, 20, 30));
        assert_eq!(frame.pixel_at(1), Color::new(10, 20, 30));
    }

    #[test]
    fn test_only_last_index_completes_frame() {
        let pool = PacketPool::new();
        let mut frame = Frame::new(&pool, 3);

        // out of order: the last packet completes the frame even if the
        // others never arrive
        assert!(frame.store_frame_packet(3, 2, pool.alloc_zeroed(), 64, Instant::from_millis(7)));
        assert_eq!(frame.time(), Instant::from_millis(7));

        assert!(!frame.store_frame_packet(3, 1, pool.alloc_zeroed(), 64, Instant::from_millis(8)));
        assert_eq!(frame.time(), Instant::from_millis(7));
    }

    fn permutations(items: &[usize]) -> Vec<Vec<usize>> {
        if items.len() <= 1 {
            return vec![items.to_vec()];
        }
        let mut out = Vec::new();
        for (i, first) in items.iter().enumerate() {
            let mut rest = items.to_vec();
            rest.remove(i);
            for mut tail in permutations(&rest) {
                tail.insert(0, *first);
                out.push(tail);
            }
        }
        out
    }

    #[test]
    fn test_any_arrival_order_completes_once() {
        const PACKETS: usize = 4;
        let orders = permutations(&[0, 1, 2, 3]);
        assert_eq!(orders.len(), 24);

        let pool = PacketPool::new();
        for order in orders {
            let mut frame = Frame::new(&pool, PACKETS);
            assert_eq!(pool.available(), NUM_PACKET_BUFFERS - PACKETS);

            // an out-of-range index first, then a repeat of an early packet
            let repeated = *order.iter().find(|index| **index != PACKETS - 1).unwrap();
            let mut arrivals = vec![(PACKETS, 0xee)];
            for (step, index) in order.iter().enumerate() {
                arrivals.push((*index, *index as u8));
                if *index == repeated {
                    arrivals.push((*index, 0x40 + step as u8));
                }
            }

            let mut completions = Vec::new();
            for (step, (index, marker)) in arrivals.iter().enumerate() {
                let mut packet = pool.alloc_zeroed();
                write_pixel24(packet.bytes_mut(), 0, *marker, 0, 0);
                assert_eq!(pool.available(), NUM_PACKET_BUFFERS - PACKETS - 1);

                let now = Instant::from_millis(step as u64);
                if frame.store_frame_packet(PACKETS, *index, packet, 64, now) {
                    completions.push(*index);
                }
                // either the new packet or the one it displaced was freed
                assert_eq!(pool.available(), NUM_PACKET_BUFFERS - PACKETS, "{order:?}");
            }
            assert_eq!(completions, [PACKETS - 1], "{order:?}");

            for index in 0..PACKETS {
                let expected = arrivals
                    .iter()
                    .rev()
                    .find(|(i, _)| *i == index)
                    .map(|(_, marker)| *marker)
                    .unwrap();
                assert_eq!(frame.pixel(index, 0), Color::new(u32::from(expected), 0, 0));
            }

            drop(frame);
            assert_eq!(pool.available(), NUM_PACKET_BUFFERS);
        }
    }

    #[test]
    fn test_short_packet_is_zero_padded() {
        let pool = PacketPool::new();
        let mut frame = Frame::new(&pool, 1);

        let mut packet = pool.alloc();
        packet.bytes_mut().fill(0xff);
        packet.bytes_mut()[0] = 0;
        assert!(frame.store_frame_packet(1, 0, packet, 4, Instant::from_millis(1)));

        assert_eq!(frame.pixel_at(0), Color::new(0xff, 0xff, 0xff));
        assert_eq!(frame.pixel_at(1), Color::default());
        assert_eq!(frame.pixel_at(20), Color::default());
    }

    #[test]
    fn test_missing_packets_keep_stale_data() {
        let pool = PacketPool::new();
        let mut frame = Frame::new(&pool, 2);

        let mut first = pool.alloc_zeroed();
        write_pixel24(first.bytes_mut(), 0, 1, 2, 3);
        assert!(!frame.store_frame_packet(2, 0, first, 64, Instant::from_millis(1)));
        assert!(frame.store_frame_packet(2, 1, pool.alloc_zeroed(), 64, Instant::from_millis(2)));

        // the next frame only sends its last packet
        let mut last = pool.alloc_zeroed();
        last.bytes_mut()[0] = 1;
        assert!(frame.store_frame_packet(2, 1, last, 64, Instant::from_millis(3)));
        assert_eq!(frame.pixel_at(0), Color::new(1, 2, 3));
    }
}
