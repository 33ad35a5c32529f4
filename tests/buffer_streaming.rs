//! Integration tests for the arena-backed byte buffer.

use std::io::{self, Read, Write};

use monoarena::arena::MonotonicArena;
use monoarena::buffer::Buffer;

#[test]
fn request_scoped_buffer_lifecycle() {
    let mut arena = MonotonicArena::with_min_buffer_size(1024);

    for round in 0..3 {
        {
            let mut buf = Buffer::new(Some(&arena));
            buf.write_str("hello world");

            let mut head = [0u8; 5];
            assert_eq!(buf.read(&mut head), 5);
            assert_eq!(&head, b"hello");
            assert_eq!(buf.len(), 6);
            assert_eq!(buf.read_byte(), Some(b' '));
            assert_eq!(buf.to_string(), "world");
        }
        arena.reset();
        assert_eq!(arena.len(), 0, "round {round}");
    }
}

#[test]
fn roundtrip_arbitrary_bytes() {
    let arena = MonotonicArena::with_min_buffer_size(8 * 1024);
    let mut buf = Buffer::new(Some(&arena));

    let payload: Vec<u8> = (0..4096u32).map(|i| (i * 31 % 251) as u8).collect();
    buf.write(&payload);

    let mut out = vec![0u8; payload.len()];
    assert_eq!(buf.read(&mut out), payload.len());
    assert_eq!(out, payload);
    assert!(buf.is_empty());
}

#[test]
fn truncate_bounds() {
    let mut buf = Buffer::new(None);
    buf.write_str("0123456789");

    buf.truncate(5);
    assert_eq!(Buffer::bytes(&buf), b"01234");

    let result = std::panic::catch_unwind(move || {
        let mut buf = Buffer::new(None);
        buf.write_str("abc");
        buf.truncate(4);
    });
    assert!(result.is_err(), "out-of-range truncate must abort");
}

#[test]
fn write_to_reports_writer_failures() {
    struct RefusingWriter;

    impl Write for RefusingWriter {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::WouldBlock, "full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    let mut buf = Buffer::new(None);
    buf.write_str("stuck");

    let err = buf.write_to(&mut RefusingWriter).unwrap_err();
    assert_eq!(err.completed, 0);
    assert_eq!(err.source.kind(), io::ErrorKind::WouldBlock);
    // Nothing was accepted, so nothing was consumed.
    assert_eq!(Buffer::bytes(&buf), b"stuck");
}

#[test]
fn read_from_then_write_to_pipes_data() {
    let arena = MonotonicArena::with_min_buffer_size(64 * 1024);
    let mut buf = Buffer::new(Some(&arena));

    let payload = vec![0xC3u8; 20_000];
    let ingested = buf.read_from(&mut payload.as_slice()).unwrap();
    assert_eq!(ingested, 20_000);

    let mut sink = Vec::new();
    let drained = buf.write_to(&mut sink).unwrap();
    assert_eq!(drained, 20_000);
    assert_eq!(sink, payload);
    assert!(buf.is_empty());
}

#[test]
fn interrupted_reads_are_retried() {
    struct FlakyReader {
        interruptions: usize,
        payload: &'static [u8],
    }

    impl Read for FlakyReader {
        fn read(&mut self, p: &mut [u8]) -> io::Result<usize> {
            if self.interruptions > 0 {
                self.interruptions -= 1;
                return Err(io::Error::new(io::ErrorKind::Interrupted, "signal"));
            }
            let n = self.payload.len().min(p.len());
            p[..n].copy_from_slice(&self.payload[..n]);
            self.payload = &self.payload[n..];
            Ok(n)
        }
    }

    let mut buf = Buffer::new(None);
    let mut reader = FlakyReader {
        interruptions: 3,
        payload: b"persistent",
    };
    assert_eq!(buf.read_from(&mut reader).unwrap(), 10);
    assert_eq!(Buffer::bytes(&buf), b"persistent");
}

#[test]
fn io_copy_interoperates() {
    let arena = MonotonicArena::with_min_buffer_size(4096);
    let mut buf = Buffer::new(Some(&arena));
    buf.write(&[9u8; 1000]);

    let mut sink = Vec::new();
    let copied = io::copy(&mut buf, &mut sink).unwrap();
    assert_eq!(copied, 1000);
    assert_eq!(sink.len(), 1000);
}
