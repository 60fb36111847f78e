#![forbid(unsafe_code)]

#[cfg(test)]
mod tests {
    use vitrine_core::{
        center_rect, DisplayGeometry, Frame, FrameLayout, Par, PixelFormat, SinkConfig, SinkError,
        VideoFormat,
    };
    use vitrine_sink::{GlesSink, VideoSink};

    // ---- Plane layout contract ----

    /// For every valid even geometry, the upload path consumes exactly
    /// w*h + 2*(w/2)*(h/2) bytes, with the planes at their fixed offsets.
    #[test]
    fn plane_layout_holds_across_the_negotiable_range() {
        for w in (16u32..=4096).step_by(480) {
            for h in (16u32..=4096).step_by(480) {
                let l = FrameLayout::new(w, h);
                assert_eq!(l.luma_len(), (w as usize) * (h as usize));
                assert_eq!(
                    l.chroma_len(),
                    ((w / 2) as usize) * ((h / 2) as usize)
                );
                assert_eq!(l.total_len(), l.luma_len() + 2 * l.chroma_len());
            }
        }
    }

    #[test]
    fn frame_views_slice_the_planes_at_their_offsets() {
        let l = FrameLayout::new(32, 16);
        let mut buf = vec![0u8; l.total_len()];
        buf[..l.luma_len()].fill(1);
        buf[l.u_offset()..l.v_offset()].fill(2);
        buf[l.v_offset()..].fill(3);

        let frame = Frame::new(l, &buf).expect("well-formed buffer");
        assert!(frame.y_plane().iter().all(|&b| b == 1));
        assert!(frame.u_plane().iter().all(|&b| b == 2));
        assert!(frame.v_plane().iter().all(|&b| b == 3));
        assert_eq!(frame.y_plane().len(), 32 * 16);
        assert_eq!(frame.u_plane().len(), 16 * 8);
        assert_eq!(frame.v_plane().len(), 16 * 8);
    }

    // ---- Letterbox contract ----

    #[test]
    fn letterbox_is_idempotent_and_centered() {
        let first = center_rect(720, 576, 1920, 1080);
        for _ in 0..8 {
            assert_eq!(center_rect(720, 576, 1920, 1080), first);
        }

        // Destination wider than source: height binds, width derives.
        assert_eq!(first.height, 1080);
        assert_eq!(first.width, (1080u64 * 720 / 576) as i32);
        assert_eq!(first.x, (1920 - first.width) / 2);
    }

    // ---- Negotiation contract ----

    #[test]
    fn negotiation_accepts_only_planar_i420_with_par() {
        assert!(DisplayGeometry::negotiate(&VideoFormat::i420(720, 576, 1, 1)).is_ok());

        let no_par = VideoFormat {
            format: PixelFormat::I420,
            width: 720,
            height: 576,
            par: None,
        };
        assert!(matches!(
            DisplayGeometry::negotiate(&no_par),
            Err(SinkError::Negotiation(_))
        ));

        for format in [PixelFormat::Nv12, PixelFormat::Rgba] {
            let req = VideoFormat {
                format,
                width: 720,
                height: 576,
                par: Some(Par::SQUARE),
            };
            assert!(DisplayGeometry::negotiate(&req).is_err());
        }
    }

    // ---- End-to-end geometry scenario (GL-free) ----

    /// Negotiate 720×576 @ PAR 1/1, check the byte budget one render call
    /// consumes and the viewport the scale pass would use in a 1024×768
    /// window.
    #[test]
    fn pal_square_pixel_scenario() {
        let geometry =
            DisplayGeometry::negotiate(&VideoFormat::i420(720, 576, 1, 1)).expect("negotiates");
        assert_eq!(
            (geometry.display_width, geometry.display_height),
            (720, 576)
        );

        let layout = geometry.layout();
        assert_eq!(layout.total_len(), 720 * 576 + 2 * (360 * 288));

        let viewport = center_rect(
            geometry.display_width,
            geometry.display_height,
            1024,
            768,
        );
        // 1024/768 is wider than 720/576 == 5:4, so height binds.
        assert_eq!(viewport.height, 768);
        assert_eq!(viewport.width, 960);
        assert_eq!((viewport.x, viewport.y), (32, 0));
    }

    // ---- Adapter contract (headless paths only) ----

    #[test]
    fn adapter_validates_before_touching_any_thread() {
        let mut sink = GlesSink::new(SinkConfig::default());

        // Render before negotiation is an error flow, not a panic.
        assert!(sink.render(&[0u8; 64]).is_err());

        sink.set_format(&VideoFormat::i420(64, 64, 1, 1))
            .expect("negotiates");

        // A mis-sized buffer is rejected against the negotiated layout.
        assert!(matches!(
            sink.render(&[0u8; 64]),
            Err(SinkError::InvalidFrame { .. })
        ));

        // Renegotiation to the same geometry is accepted and idempotent.
        sink.set_format(&VideoFormat::i420(64, 64, 1, 1))
            .expect("renegotiates");
    }

    #[test]
    fn adapter_preserves_the_external_window_gap() {
        let mut sink = GlesSink::new(SinkConfig::default());
        let err = sink.set_window_handle(42).expect_err("documented gap");
        assert!(matches!(err, SinkError::ExternalWindowUnsupported));
    }

    #[test]
    fn drop_first_policy_is_an_adapter_concern() {
        let mut sink = GlesSink::new(SinkConfig::default());
        sink.set_drop_first(3);
        sink.set_format(&VideoFormat::i420(32, 32, 1, 1))
            .expect("negotiates");

        let buf = vec![0u8; 32 * 32 + 2 * (16 * 16)];
        for _ in 0..3 {
            sink.render(&buf).expect("dropped frames still return ok");
        }
        assert_eq!(sink.dropped(), 3);

        // Stopping resets the tally.
        sink.stop();
        assert_eq!(sink.dropped(), 0);
    }
}
