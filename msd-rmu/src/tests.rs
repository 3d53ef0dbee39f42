//! Protocol tests for the RMU codec, parsers and session
//!
//! - Request encoding and decoding for every command and both framings
//! - Table-dump paging
//! - Register batches
//! - Sessions against a simulated switch

#[cfg(test)]
mod codec_tests {
    use crate::frame::{codes, PACKET_PREFIX_SIZE};
    use crate::request::*;
    use crate::tcam::{TcamEntry, TcamOctet, TcamOp};
    use msd_core::{ErrorKind, FramingMode, RegisterCommand};
    use msd_packet::DsaFraming;

    fn framings() -> [DsaFraming; 2] {
        [
            DsaFraming::new(FramingMode::EtherTypeDsa, 0xDADA),
            DsaFraming::new(FramingMode::Dsa, 0),
        ]
    }

    fn all_commands() -> Vec<RmuCommand> {
        let mut entry = TcamEntry::new(12);
        entry.key.spv = 0x00F0;
        entry.key.octets[27] = TcamOctet {
            data: 0xAA,
            mask: 0x0F,
        };
        entry.action.faction = 0x1234;

        vec![
            RmuCommand::GetId,
            RmuCommand::DumpAtu { start: 0 },
            RmuCommand::DumpAtu { start: 0x0130 },
            RmuCommand::DumpEcid { start: 0x0042 },
            RmuCommand::DumpMib2 {
                port: 5,
                clear: false,
            },
            RmuCommand::DumpMib2 {
                port: 10,
                clear: true,
            },
            RmuCommand::RegRw(vec![
                RegisterCommand::read(0x1B, 0x00),
                RegisterCommand::write(0x10, 0x04, 0x007F),
            ]),
            RmuCommand::DumpTcam { start: 3 },
            RmuCommand::TcamRw {
                op: TcamOp::Load,
                pointer: 12,
                entry: Box::new(entry),
            },
            RmuCommand::TcamRw {
                op: TcamOp::FlushAll,
                pointer: 0,
                entry: Box::new(TcamEntry::new(0)),
            },
            RmuCommand::FwVersionGet,
        ]
    }

    #[test]
    fn test_request_round_trip_all_commands() {
        for framing in framings() {
            for (i, command) in all_commands().into_iter().enumerate() {
                let request = RmuRequest::new(command, i as u8 * 17, framing, 0x1E);
                let frame = encode_request(&request).unwrap();
                let decoded = decode_request(&frame, &framing).unwrap();
                assert_eq!(decoded, request, "{} / {}", framing.mode(), request.command);
            }
        }
    }

    #[test]
    fn test_sequence_offset_per_framing() {
        let [edsa, dsa] = framings();
        let frame = RmuRequest::new(RmuCommand::GetId, 0xA5, edsa, 2).encode().unwrap();
        assert_eq!(frame[19], 0xA5);
        assert_eq!(frame[16], 0x42);
        assert_eq!(&frame[22..24], &[0x00, 0x00]);

        let frame = RmuRequest::new(RmuCommand::GetId, 0xA5, dsa, 2).encode().unwrap();
        assert_eq!(frame[15], 0xA5);
        assert_eq!(frame[12], 0x42);
        assert_eq!(frame[13], 0x00);
    }

    #[test]
    fn test_request_bodies() {
        let framing = DsaFraming::default();
        let frame = RmuRequest::new(RmuCommand::DumpEcid { start: 4 }, 0, framing, 0)
            .encode()
            .unwrap();
        assert_eq!(&frame[26..30], &[0x10, 0x00, 0x20, 0x04]);

        let frame = RmuRequest::new(
            RmuCommand::DumpMib2 {
                port: 3,
                clear: true,
            },
            0,
            framing,
            0,
        )
        .encode()
        .unwrap();
        assert_eq!(&frame[22..30], &[0x00, 0x01, 0x00, 0x00, 0x10, 0x21, 0x00, 0x03]);

        let frame = RmuRequest::new(RmuCommand::FwVersionGet, 0, framing, 0)
            .encode()
            .unwrap();
        assert_eq!(frame.len(), 60);
        assert_eq!(&frame[26..28], &[0x40, 0x00]);
    }

    #[test]
    fn test_tcam_rw_is_44_words() {
        let framing = DsaFraming::default();
        let command = RmuCommand::TcamRw {
            op: TcamOp::Read,
            pointer: 1,
            entry: Box::new(TcamEntry::new(1)),
        };
        assert_eq!(command.request_code(), codes::TCAM_RW);
        let frame = RmuRequest::new(command, 0, framing, 0).encode().unwrap();
        assert_eq!(frame.len(), PACKET_PREFIX_SIZE + 44 * 2);
    }

    #[test]
    fn test_encode_bad_params() {
        let framing = DsaFraming::default();
        let bad = [
            RmuCommand::DumpAtu { start: 0x2001 },
            RmuCommand::DumpEcid { start: 0x2000 },
            RmuCommand::DumpMib2 {
                port: 32,
                clear: false,
            },
            RmuCommand::RegRw(Vec::new()),
            RmuCommand::TcamRw {
                op: TcamOp::Read,
                pointer: 0xFF,
                entry: Box::new(TcamEntry::new(0xFF)),
            },
        ];
        for command in bad {
            let err = RmuRequest::new(command, 0, framing, 0).encode().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::BadParam);
        }

        let err = RmuRequest::new(RmuCommand::GetId, 0, framing, 0x20)
            .encode()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadParam);
    }

    #[test]
    fn test_decode_unknown_code() {
        let framing = DsaFraming::default();
        let mut frame = RmuRequest::new(RmuCommand::GetId, 0, framing, 0)
            .encode()
            .unwrap();
        frame[26] = 0x7F;
        assert_eq!(decode_request(&frame, &framing).unwrap_err().kind(), ErrorKind::Fail);
    }
}

#[cfg(test)]
mod dump_tests {
    use crate::atu::*;
    use crate::dump::{encode_page, DumpRecord, TableDumpCursor};
    use crate::frame::PACKET_PREFIX_SIZE;
    use msd_core::MacAddr;

    fn entry(i: usize) -> AtuEntry {
        AtuEntry::new(MacAddr([0x00, 0x50, 0x43, 0x00, 0x00, i as u8]), 1 << (i % 11), 1)
    }

    fn frame(body: &[u8], delta: usize) -> Vec<u8> {
        let mut frame = vec![0u8; PACKET_PREFIX_SIZE - delta];
        frame.extend_from_slice(body);
        frame
    }

    #[test]
    fn test_full_atu_page_with_continuation() {
        let entries: Vec<_> = (0..MAX_ATUS).map(entry).collect();
        let body = encode_page(&entries, Some(TableDumpCursor(0x0BAD)), &[]).unwrap();

        for delta in [0, 4] {
            let page = parse_atu(&frame(&body, delta), delta).unwrap();
            assert_eq!(page.entries.len(), MAX_ATUS);
            assert_eq!(page.entries, entries);
            assert_eq!(page.continuation, Some(TableDumpCursor(0x0BAD)));
        }
    }

    #[test]
    fn test_early_terminator_after_k_entries() {
        for k in [0usize, 1, 7, MAX_ATUS - 1] {
            let mut body = Vec::new();
            for i in 0..k {
                body.extend_from_slice(&entry(i).encode().unwrap());
            }
            body.extend_from_slice(&[0u8; ATU_ENTRY_SIZE]);
            // valid-looking data after the terminator must be ignored
            body.extend_from_slice(&entry(99).encode().unwrap());

            let page = parse_atu(&frame(&body, 0), 0).unwrap();
            assert_eq!(page.entries.len(), k);
            assert_eq!(page.continuation, None);
        }
    }

    #[test]
    fn test_entry_count_never_exceeds_maximum() {
        let entries: Vec<_> = (0..MAX_ATUS).map(entry).collect();
        let mut body = encode_page(&entries, Some(TableDumpCursor(1)), &[]).unwrap();
        body.extend_from_slice(&entry(0).encode().unwrap());

        let page = parse_atu(&frame(&body, 0), 0).unwrap();
        assert_eq!(page.entries.len(), MAX_ATUS);
        assert_eq!(AtuEntry::MAX_PER_PACKET, 48);
    }
}

#[cfg(test)]
mod session_tests {
    use crate::atu::{AtuEntry, MAX_ATUS};
    use crate::batch;
    use crate::dump::{encode_page, TableDumpCursor};
    use crate::ecid::{EcidEntry, MAX_ECIDS};
    use crate::frame::codes;
    use crate::mib::{StatCounter, StatsCounterSet};
    use crate::request::{decode_request, RmuCommand, RmuRequest};
    use crate::response::{encode_response, FirmwareVersion};
    use crate::session::{RmuConfig, RmuSession};
    use crate::tcam::{end_marker, TcamEntry, TcamOp};
    use msd_capture::FrameTransport;
    use msd_core::{Error, ErrorKind, FramingMode, MacAddr, RegisterCommand, Result};
    use msd_packet::DsaFraming;
    use std::collections::VecDeque;

    const HOST_MAC: MacAddr = MacAddr([0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);

    type Responder = Box<dyn FnMut(&RmuRequest) -> Vec<Vec<u8>> + Send>;

    /// Simulated switch answering each request through a closure
    struct MockSwitch {
        framing: DsaFraming,
        sent: Vec<Vec<u8>>,
        requests: Vec<RmuRequest>,
        pending: VecDeque<Vec<u8>>,
        responder: Responder,
    }

    impl MockSwitch {
        fn new(
            framing: DsaFraming,
            responder: impl FnMut(&RmuRequest) -> Vec<Vec<u8>> + Send + 'static,
        ) -> Self {
            Self {
                framing,
                sent: Vec::new(),
                requests: Vec::new(),
                pending: VecDeque::new(),
                responder: Box::new(responder),
            }
        }
    }

    impl FrameTransport for MockSwitch {
        fn send(&mut self, frame: &[u8]) -> Result<()> {
            self.sent.push(frame.to_vec());
            let request = decode_request(frame, &self.framing)?;
            let replies = (self.responder)(&request);
            self.pending.extend(replies);
            self.requests.push(request);
            Ok(())
        }

        fn recv(&mut self) -> Result<Option<Vec<u8>>> {
            Ok(self.pending.pop_front())
        }

        fn local_mac(&self) -> MacAddr {
            HOST_MAC
        }
    }

    fn reply(request: &RmuRequest, body: &[u8]) -> Vec<u8> {
        encode_response(
            &request.framing,
            request.target_device,
            request.sequence,
            0x3521,
            request.command.request_code(),
            body,
        )
        .unwrap()
    }

    fn atu_entry(i: usize) -> AtuEntry {
        AtuEntry::new(MacAddr([0x00, 0x11, 0x22, 0x00, (i >> 8) as u8, i as u8]), 0x001, 1)
    }

    fn session(
        config: RmuConfig,
        responder: impl FnMut(&RmuRequest) -> Vec<Vec<u8>> + Send + 'static,
    ) -> RmuSession<MockSwitch> {
        let transport = MockSwitch::new(config.dsa_framing(), responder);
        RmuSession::with_sequence(transport, config, 0x10).unwrap()
    }

    #[test]
    fn test_dump_atu_two_entries_single_call() {
        let mut session = session(RmuConfig::default(), |request| {
            assert_eq!(request.command, RmuCommand::DumpAtu { start: 0 });
            let body = encode_page(&[atu_entry(1), atu_entry(2)], None, &[0u8; 10]).unwrap();
            vec![reply(request, &body)]
        });

        let entries = session.dump_atu_all().unwrap();
        assert_eq!(entries, vec![atu_entry(1), atu_entry(2)]);
        assert_eq!(session.transport().sent.len(), 1);
        assert_eq!(session.stats().frames_dropped, 0);
    }

    #[test]
    fn test_flipped_sequence_exhausts_drop_budget() {
        let config = RmuConfig::default().with_max_drops(5);
        let mut session = session(config, |request| {
            let mut frame = reply(request, &[]);
            frame[19] ^= 0xFF;
            vec![frame; 8]
        });

        let err = session.get_id().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Fail);
        assert!(matches!(
            err,
            Error::SequenceMismatch {
                expected: 0x10,
                actual: 0xEF
            }
        ));
        let stats = session.stats();
        assert_eq!(stats.frames_received, 5);
        assert_eq!(stats.frames_dropped, 5);
        // three unread frames are still queued
        assert_eq!(session.transport().pending.len(), 3);
    }

    #[test]
    fn test_stale_frames_dropped_before_match() {
        let config = RmuConfig::default().with_target_device(4);
        let mut session = session(config, |request| {
            let mut stale = reply(request, &[]);
            stale[19] = request.sequence.wrapping_sub(1);
            let mut other_device = reply(request, &[]);
            other_device[16] = 0x05;
            let echo = request.encode().unwrap();
            vec![
                vec![0u8; 60],
                stale,
                other_device,
                echo,
                reply(request, &[]),
            ]
        });

        let id = session.get_id().unwrap();
        assert_eq!(id.product_num, 0x352);
        assert_eq!(id.revision, 1);
        assert_eq!(session.stats().frames_dropped, 3 + 1);
    }

    #[test]
    fn test_no_response_times_out() {
        let mut session = session(RmuConfig::default().with_max_drops(3), |_| Vec::new());
        let err = session.firmware_version().unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
        assert_eq!(err.kind(), ErrorKind::Fail);
        assert_eq!(session.stats().timeouts, 3);
    }

    #[test]
    fn test_response_code_mismatch() {
        let mut session = session(RmuConfig::default(), |request| {
            vec![encode_response(
                &request.framing,
                request.target_device,
                request.sequence,
                0,
                codes::DUMP_TCAM,
                &[],
            )
            .unwrap()]
        });
        assert_eq!(session.get_id().unwrap_err().kind(), ErrorKind::Fail);
    }

    #[test]
    fn test_source_mac_and_sequence_wrap() {
        let config = RmuConfig::default();
        let transport = MockSwitch::new(config.dsa_framing(), |request| vec![reply(request, &[0, 1, 0, 2])]);
        let mut session = RmuSession::with_sequence(transport, config, 0xFF).unwrap();

        session.firmware_version().unwrap();
        let version = session.firmware_version().unwrap();
        assert_eq!(
            version,
            FirmwareVersion {
                major: 0,
                minor: 1,
                build: 2
            }
        );

        let sent = &session.transport().sent;
        assert_eq!(&sent[0][6..12], HOST_MAC.as_bytes());
        assert_eq!(sent[0][19], 0xFF);
        assert_eq!(sent[1][19], 0x00);
    }

    #[test]
    fn test_paged_atu_dump_follows_continuation() {
        let mut session = session(RmuConfig::default(), |request| {
            let body = match request.command {
                RmuCommand::DumpAtu { start: 0 } => {
                    let entries: Vec<_> = (0..MAX_ATUS).map(atu_entry).collect();
                    encode_page(&entries, Some(TableDumpCursor(0x30)), &[]).unwrap()
                }
                RmuCommand::DumpAtu { start: 0x30 } => {
                    let entries: Vec<_> = (MAX_ATUS..MAX_ATUS + 3).map(atu_entry).collect();
                    encode_page(&entries, None, &[0u8; 10]).unwrap()
                }
                ref other => panic!("unexpected {}", other),
            };
            vec![reply(request, &body)]
        });

        let entries = session.dump_atu_all().unwrap();
        assert_eq!(entries.len(), MAX_ATUS + 3);
        assert_eq!(entries[MAX_ATUS + 2], atu_entry(MAX_ATUS + 2));
        assert_eq!(session.transport().requests.len(), 2);
    }

    #[test]
    fn test_non_advancing_continuation_fails() {
        let mut session = session(RmuConfig::default(), |request| {
            let entries: Vec<_> = (0..MAX_ATUS).map(atu_entry).collect();
            let body = encode_page(&entries, Some(TableDumpCursor(0)), &[]).unwrap();
            vec![reply(request, &body)]
        });
        assert_eq!(session.dump_atu_all().unwrap_err().kind(), ErrorKind::Fail);
        assert_eq!(session.transport().requests.len(), 1);
    }

    #[test]
    fn test_atu_dump_stops_at_ecid_space() {
        let mut session = session(RmuConfig::default(), |request| {
            assert_eq!(request.command, RmuCommand::DumpAtu { start: 0 });
            let entries: Vec<_> = (0..MAX_ATUS).map(atu_entry).collect();
            let body = encode_page(&entries, Some(TableDumpCursor(0x2000)), &[]).unwrap();
            vec![reply(request, &body)]
        });
        assert_eq!(session.dump_atu_all().unwrap().len(), MAX_ATUS);
        assert_eq!(session.transport().requests.len(), 1);
    }

    #[test]
    fn test_paged_ecid_dump_follows_continuation() {
        let ecid = |i: usize| EcidEntry {
            entry_state: 1,
            port_vec: 0x001,
            ecid_base: i as u16,
            ..Default::default()
        };
        let mut session = session(RmuConfig::default(), move |request| {
            let body = match request.command {
                RmuCommand::DumpEcid { start: 0 } => {
                    let entries: Vec<_> = (0..MAX_ECIDS).map(ecid).collect();
                    encode_page(&entries, Some(TableDumpCursor(0x2030)), &[]).unwrap()
                }
                RmuCommand::DumpEcid { start: 0x30 } => {
                    let entries: Vec<_> = (MAX_ECIDS..MAX_ECIDS + 2).map(ecid).collect();
                    encode_page(&entries, None, &[0u8; 10]).unwrap()
                }
                ref other => panic!("unexpected {}", other),
            };
            vec![reply(request, &body)]
        });

        let entries = session.dump_ecid_all().unwrap();
        assert_eq!(entries.len(), MAX_ECIDS + 2);
        assert_eq!(entries[MAX_ECIDS + 1], ecid(MAX_ECIDS + 1));
        let sent = &session.transport().sent;
        assert_eq!(sent.len(), 2);
        assert_eq!(&sent[1][28..30], &[0x20, 0x30]);
    }

    #[test]
    fn test_ecid_dump_sets_mode_bit() {
        let mut session = session(RmuConfig::default(), |request| {
            assert_eq!(request.command, RmuCommand::DumpEcid { start: 0 });
            vec![reply(request, &[0u8; 10])]
        });
        assert!(session.dump_ecid_all().unwrap().is_empty());
        assert_eq!(&session.transport().sent[0][28..30], &[0x20, 0x00]);
    }

    #[test]
    fn test_reg_rw_over_dsa() {
        let config = RmuConfig::default().with_framing(FramingMode::Dsa).with_target_device(2);
        let mut session = session(config, |request| {
            let RmuCommand::RegRw(commands) = &request.command else {
                panic!("expected RegRW");
            };
            let data: Vec<u16> = commands
                .iter()
                .map(|c| c.entry_id * 2 + c.dev_address as u16)
                .collect();
            vec![reply(request, &batch::encode_response(commands, &data).unwrap())]
        });

        let values = session.read_registers(&[(0x10, 1), (0x1B, 4)]).unwrap();
        assert_eq!(values, vec![0x12, 0x23]);
        session.write_registers(&[(0x11, 2, 0xFFFF)]).unwrap();

        let requests = &session.transport().requests;
        assert_eq!(
            requests[1].command,
            RmuCommand::RegRw(vec![RegisterCommand::write(0x11, 2, 0xFFFF)])
        );
    }

    #[test]
    fn test_reg_rw_bad_param_never_sent() {
        let mut session = session(RmuConfig::default(), |_| Vec::new());
        let too_many = vec![RegisterCommand::read(0, 0); 122];
        assert_eq!(session.reg_rw(&too_many).unwrap_err().kind(), ErrorKind::BadParam);
        assert!(session.transport().sent.is_empty());
    }

    #[test]
    fn test_reg_rw_missing_sentinel() {
        let mut session = session(RmuConfig::default(), |request| {
            // pairs only, then a body long enough to avoid padding
            let mut body = Vec::new();
            for _ in 0..20 {
                body.extend_from_slice(&[0x08, 0x00, 0x00, 0x01]);
            }
            vec![reply(request, &body)]
        });
        let err = session.read_registers(&[(0, 0)]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Fail);
    }

    #[test]
    fn test_dump_mib() {
        let mut expected = StatsCounterSet {
            port: 3,
            timestamp: 1000,
            ..Default::default()
        };
        expected.set(StatCounter::InUnicasts, 42);
        expected.set(StatCounter::OutDiscards, 7);
        let body = expected.to_body();

        let mut session = session(RmuConfig::default().with_framing(FramingMode::Dsa), move |request| {
            vec![reply(request, &body)]
        });
        let set = session.dump_mib(3, true).unwrap();
        assert_eq!(set, expected);
        assert_eq!(
            session.transport().requests[0].command,
            RmuCommand::DumpMib2 {
                port: 3,
                clear: true
            }
        );
    }

    #[test]
    fn test_dump_mib_short_response() {
        let mut session = session(RmuConfig::default(), |request| vec![reply(request, &[0u8; 100])]);
        assert_eq!(session.dump_mib(0, false).unwrap_err().kind(), ErrorKind::Fail);
    }

    #[test]
    fn test_tcam_operations() {
        let mut stored = TcamEntry::new(5);
        stored.key.pvid = 10;
        stored.action.faction = 0x0001;

        let mut session = session(RmuConfig::default(), move |request| {
            let RmuCommand::TcamRw { op, pointer, .. } = &request.command else {
                let body: Vec<u8> = [stored.encode_bytes(), end_marker()].concat();
                return vec![reply(request, &body)];
            };
            let body = match (op, pointer) {
                (TcamOp::Read, 5) | (TcamOp::GetNext, 4) => stored.encode_bytes(),
                (TcamOp::GetNext, _) => end_marker(),
                _ => Vec::new(),
            };
            vec![reply(request, &body)]
        });

        assert_eq!(session.tcam_read(5).unwrap(), stored);
        assert_eq!(session.tcam_get_next(4).unwrap(), Some(stored));
        assert_eq!(session.tcam_get_next(5).unwrap(), None);
        session.tcam_load(&stored).unwrap();
        session.tcam_flush_entry(5).unwrap();
        session.tcam_flush_all().unwrap();
        assert_eq!(session.dump_tcam_all().unwrap(), vec![stored]);

        let ops: Vec<_> = session
            .transport()
            .requests
            .iter()
            .filter_map(|r| match &r.command {
                RmuCommand::TcamRw { op, .. } => Some(*op),
                _ => None,
            })
            .collect();
        assert_eq!(
            ops,
            vec![
                TcamOp::Read,
                TcamOp::GetNext,
                TcamOp::GetNext,
                TcamOp::Load,
                TcamOp::FlushOne,
                TcamOp::FlushAll
            ]
        );
        assert_eq!(session.tcam_load(&TcamEntry::new(0xFF)).unwrap_err().kind(), ErrorKind::BadParam);
    }

    trait EncodeBytes {
        fn encode_bytes(&self) -> Vec<u8>;
    }

    impl EncodeBytes for TcamEntry {
        fn encode_bytes(&self) -> Vec<u8> {
            self.to_words().unwrap().to_bytes()
        }
    }

    #[test]
    fn test_config_validation() {
        let transport = MockSwitch::new(DsaFraming::default(), |_| Vec::new());
        let config = RmuConfig::default().with_target_device(32);
        assert!(RmuSession::new(transport, config).is_err());

        let transport = MockSwitch::new(DsaFraming::default(), |_| Vec::new());
        assert!(RmuSession::new(transport, RmuConfig::default().with_max_drops(0)).is_err());
    }
}
