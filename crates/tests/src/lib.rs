//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 内存传输 e2e 测试（无需外部网络端）
//! - UDP 传输 e2e 测试（本地回环）

#[cfg(test)]
mod contract_tests {
    use contracts::{ConfigError, ReturnCode};

    #[test]
    fn test_return_codes_are_stable() {
        assert_eq!(ReturnCode::Success as i8, 0);
        assert_eq!(ReturnCode::TagNotFound as i8, -1);
        assert_eq!(ReturnCode::ValueMismatch as i8, -2);
        assert_eq!(ReturnCode::FormatIncorrect as i8, -3);
        assert_eq!(
            ReturnCode::of::<()>(&Err(ConfigError::tag_not_found("lsl"))),
            ReturnCode::TagNotFound
        );
    }

    #[test]
    fn test_packet_vocabulary() {
        assert_eq!(packet_codec::type_tag::LSL_MARKER, "LM");
        assert_eq!(packet_codec::type_tag::TIMESTAMP_CROSS_TIME, "TX");
        assert_eq!(packet_codec::type_tag::TIMESTAMP_LOCAL, "TL");
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use bridge::{BridgeState, MemoryTransport, UdpTransport};
    use contracts::{ManualClock, MarkerSample, ReturnCode};
    use marker_input::{MarkerDatagram, MockMarkerSource};
    use packet_codec::parse_header;
    use tokio::net::UdpSocket;

    const PSYCHOPY_MARKERS: &str =
        r#"{"lsl": {"marker": {"name": "PsychoPyMarkers", "sourceId": "stim-pc-1"}}}"#;

    const EMOTIBIT_BOARD: &str = r#"{
        "patchboard": {
            "inputType": "EmotiBit",
            "outputType": "LSL",
            "patches": {"EA": "EDA", "PI": "PPG_IR", "T1": "TEMP"},
            "settings": {"output": {"meta-data": {"channels": [
                {"name": "EDA", "type": "EDA", "nominal_srate": 15},
                {"name": "PPG_IR", "type": "PPG", "nominal_srate": 25},
                {"name": "TEMP", "type": "Temperature", "nominal_srate": 7.5}
            ]}}}
        }
    }"#;

    fn memory_bridge() -> (BridgeState, Arc<MemoryTransport>) {
        let transport = Arc::new(MemoryTransport::new());
        let clock = Arc::new(
            ManualClock::new(100.0, 0.001).with_wall_clock("2025-06-01_09-30-00-000001"),
        );
        (BridgeState::new(transport.clone(), clock), transport)
    }

    /// End-to-end: marker outlet -> BridgeState -> EmotiBit packets
    ///
    /// 验证：
    /// 1. 每个 marker 样本产生 LM、TX、TX 三个数据包
    /// 2. 包序号连续递增
    /// 3. LM 包携带校正时间戳与原始时间戳
    #[test]
    fn test_e2e_markers_to_packets() {
        let (mut state, transport) = memory_bridge();
        state.add_marker_input(PSYCHOPY_MARKERS).unwrap();

        let outlet = transport.hub().open_outlet("PsychoPyMarkers", "stim-pc-1");
        outlet.push(MarkerSample::new(50.0, 0.25, vec!["trial_start".into()]));
        outlet.push(MarkerSample::new(51.5, 0.25, vec!["trial_end".into(), "ok".into()]));

        let output = state.tick();
        assert_eq!(output.summary.markers_drained, 2);
        assert_eq!(output.packets.len(), 6);

        let headers: Vec<_> = output
            .packets
            .iter()
            .map(|p| parse_header(p.as_str()).unwrap())
            .collect();
        let tags: Vec<_> = headers.iter().map(|h| h.type_tag.as_str()).collect();
        assert_eq!(tags, ["LM", "TX", "TX", "LM", "TX", "TX"]);
        let numbers: Vec<_> = headers.iter().map(|h| h.packet_number).collect();
        assert_eq!(numbers, [0, 1, 2, 3, 4, 5]);

        let lm = output.packets[0].payload_fields();
        assert_eq!(&lm[..4], ["LR", "50.25", "LM", "50"]);
        assert_eq!(&lm[6..], ["LD", "trial_start"]);

        let tl = output.packets[2].payload_fields();
        assert_eq!(&tl[..2], ["TL", "2025-06-01_09-30-00-000001"]);

        let second = output.packets[3].payload_fields();
        assert_eq!(&second[6..], ["LD", "trial_end", "ok"]);
        assert_eq!(headers[3].data_length, 9);
    }

    /// Patchboard registration -> add_sample -> published sample
    #[test]
    fn test_e2e_device_samples_published() {
        let (mut state, transport) = memory_bridge();
        state
            .add_data_stream_outputs(EMOTIBIT_BOARD, "emotibit-01")
            .unwrap();
        assert_eq!(state.outputs().count_patches("emotibit-01"), 3);
        assert_eq!(transport.publisher().streams().len(), 3);

        assert!(state.add_sample(&[0.31], "EA", "emotibit-01"));
        assert!(state.add_sample(&[1021.0], "PI", "emotibit-01"));
        assert!(!state.add_sample(&[1.0], "AX", "emotibit-01"));
        assert!(!state.add_sample(&[1.0], "EA", "emotibit-02"));

        let samples = transport.publisher().samples();
        let published: Vec<_> = samples
            .iter()
            .map(|s| (s.key.channel_name.as_str(), s.channel_type.as_str(), s.values[0]))
            .collect();
        assert_eq!(published, [("EDA", "EDA", 0.31), ("PPG_IR", "PPG", 1021.0)]);

        state.clear_data_stream_outputs();
        assert!(!state.outputs().is_known_source("emotibit-01"));
        assert!(!state.add_sample(&[0.31], "EA", "emotibit-01"));
    }

    /// Registration errors report codes and leave the state unchanged
    #[test]
    fn test_e2e_rejected_documents() {
        let (mut state, _) = memory_bridge();

        let missing = [
            ("inputType", r#"{"patchboard": {}}"#),
            (
                "settings",
                r#"{"patchboard": {"inputType": "EmotiBit", "outputType": "LSL"}}"#,
            ),
            (
                "meta-data",
                r#"{"patchboard": {"inputType": "EmotiBit", "outputType": "LSL",
                    "settings": {"output": {}}}}"#,
            ),
        ];
        for (tag, doc) in missing {
            let err = state.add_data_stream_outputs(doc, "dev").unwrap_err();
            assert_eq!(err.return_code(), Some(ReturnCode::TagNotFound), "{tag}");
            assert!(err.to_string().contains(tag), "{err}");
        }

        let err = state
            .add_data_stream_outputs(
                r#"{"patchboard": {"inputType": "EmotiBit", "outputType": "LSL",
                    "settings": {"output": {"meta-data": {"channels": {}}}}}}"#,
                "dev",
            )
            .unwrap_err();
        assert_eq!(err.return_code(), Some(ReturnCode::FormatIncorrect));
        assert!(!state.outputs().is_known_source("dev"));
        assert!(state.last_error_message().is_some());

        let err = state
            .add_marker_input(r#"{"lsl": {"marker": {}}}"#)
            .unwrap_err();
        assert_eq!(err.code(), ReturnCode::TagNotFound);
        assert!(state.markers().is_empty());
    }

    /// Mock marker source drives the bridge on a real runtime
    #[tokio::test]
    async fn test_e2e_mock_marker_source() {
        let (mut state, transport) = memory_bridge();
        state
            .add_marker_input(r#"{"lsl": {"marker": {"name": "MockMarkers"}}}"#)
            .unwrap();

        let source = MockMarkerSource::named("MockMarkers", 100.0);
        let handle = source.start(transport.hub());

        let mut packets = Vec::new();
        let result = tokio::time::timeout(Duration::from_secs(5), async {
            while packets.len() < 9 {
                tokio::time::sleep(Duration::from_millis(10)).await;
                packets.extend(state.create_marker_input_packets());
            }
        })
        .await;

        source.stop();
        let sent = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("mock source did not stop")
            .unwrap();

        assert!(result.is_ok(), "markers were not drained in time");
        assert!(sent >= 3);
        assert_eq!(packets.len() % 3, 0);
        assert_eq!(packets[0].type_tag(), "LM");
        assert!(packets[0].as_str().contains(",LD,trial_start,"));
    }

    /// UDP transport: marker datagram in, packets out; sample datagram out
    #[tokio::test]
    async fn test_e2e_udp_transport() {
        let publish_sink = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let transport = Arc::new(
            UdpTransport::bind("127.0.0.1:0", publish_sink.local_addr().unwrap())
                .await
                .unwrap(),
        );
        let marker_addr = transport.marker_addr();
        let clock = Arc::new(ManualClock::new(10.0, 0.001));
        let mut state = BridgeState::new(transport.clone(), clock);

        state.add_marker_input(PSYCHOPY_MARKERS).unwrap();
        state
            .add_data_stream_outputs(EMOTIBIT_BOARD, "emotibit-01")
            .unwrap();

        // Marker publisher side
        let publisher = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let datagram = MarkerDatagram {
            stream: "PsychoPyMarkers".into(),
            source_id: "stim-pc-1".into(),
            sample: MarkerSample::new(3.5, 0.5, vec!["go".into()]),
        };
        publisher
            .send_to(&serde_json::to_vec(&datagram).unwrap(), marker_addr)
            .await
            .unwrap();

        let packets = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let packets = state.create_marker_input_packets();
                if !packets.is_empty() {
                    return packets;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("marker datagram never produced packets");
        assert_eq!(packets.len(), 3);
        assert_eq!(&packets[0].payload_fields()[..4], ["LR", "4", "LM", "3.5"]);

        // Device sample side
        assert!(state.add_sample(&[0.5], "EA", "emotibit-01"));
        let mut buf = vec![0u8; 65536];
        let mut events = Vec::new();
        while !events.iter().any(|e: &serde_json::Value| e["event"] == "sample") {
            let n = tokio::time::timeout(Duration::from_secs(5), publish_sink.recv(&mut buf))
                .await
                .expect("no datagram from publisher")
                .unwrap();
            events.push(serde_json::from_slice(&buf[..n]).unwrap());
        }
        let opens = events.iter().filter(|e| e["event"] == "open").count();
        assert_eq!(opens, 3);
        let sample = events.last().unwrap();
        assert_eq!(sample["name"], "EDA");
        assert_eq!(sample["source_id"], "emotibit-01");

        drop(state);
        match Arc::try_unwrap(transport) {
            Ok(transport) => transport.shutdown().await,
            Err(_) => panic!("transport still shared"),
        }
    }

    /// Preflight-style check through the subprocess runner
    #[cfg(unix)]
    #[tokio::test]
    async fn test_e2e_system_call() {
        let output = system_call::SystemCall::new("echo EmotiBit ready", "ready")
            .spawn()
            .wait()
            .await
            .unwrap();
        assert!(output.matched);
        assert_eq!(output.exit_code, Some(0));
    }
}
