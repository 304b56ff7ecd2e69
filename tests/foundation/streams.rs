//! Stream framing behavior the snapshot protocol relies on.

use strata_foundation::{ErrorKind, MemoryStream, Stream};

#[test]
fn backpatched_size_prefix_frames_a_block() {
    let mut stream = MemoryStream::new();

    stream.write_u8(1).unwrap();
    let patch_at = stream.position();
    stream.write_u32(0).unwrap();
    let payload_start = stream.position();
    stream.write(b"some payload").unwrap();
    let end = stream.position();

    stream.set_position(patch_at).unwrap();
    stream.write_u32((end - payload_start) as u32).unwrap();
    stream.set_position(end).unwrap();

    stream.rewind();
    assert_eq!(stream.read_u8().unwrap(), 1);
    let size = stream.read_u32().unwrap();
    assert_eq!(size, 12);
    let mut payload = vec![0u8; size as usize];
    stream.read(&mut payload).unwrap();
    assert_eq!(payload, b"some payload");
    assert_eq!(stream.position(), stream.len() as u64);
}

#[test]
fn skip_by_declared_size_lands_on_next_block() {
    let mut stream = MemoryStream::new();
    stream.write_u32(6).unwrap();
    stream.write(b"junk..").unwrap();
    stream.write_u8(0xaa).unwrap();

    stream.rewind();
    let size = stream.read_u32().unwrap();
    stream.skip(u64::from(size)).unwrap();
    assert_eq!(stream.read_u8().unwrap(), 0xaa);
}

#[test]
fn reads_past_the_end_report_exhaustion() {
    let mut stream = MemoryStream::from_bytes(vec![1, 2, 3]);
    stream.skip(2).unwrap();
    let err = stream.read_u32().unwrap_err();
    assert!(matches!(
        err.kind,
        ErrorKind::StreamExhausted {
            requested: 4,
            available: 1
        }
    ));
}

#[test]
fn seeks_outside_the_stream_are_rejected() {
    let mut stream = MemoryStream::from_bytes(vec![0; 4]);
    assert!(stream.set_position(4).is_ok());
    assert!(matches!(
        stream.set_position(5).unwrap_err().kind,
        ErrorKind::SeekOutOfRange {
            position: 5,
            length: 4
        }
    ));
}
