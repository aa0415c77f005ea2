use super::*;
use std::io::Cursor;

#[tokio::test]
async fn round_trips_a_short_payload() {
    let mut buf = Cursor::new(Vec::new());
    write_framed(&mut buf, "hello world").await.expect("write");
    let mut cursor = Cursor::new(buf.into_inner());
    let decoded = read_framed(&mut cursor).await.expect("read");
    assert_eq!(decoded, "hello world");
}

#[tokio::test]
async fn rejects_a_payload_over_the_cap() {
    let mut buf = Cursor::new(Vec::new());
    let oversized = "x".repeat(MAX_FRAME_LEN + 1);
    assert!(write_framed(&mut buf, &oversized).await.is_err());
}

#[tokio::test]
async fn header_is_exactly_the_ascii_decimal_length() {
    let mut buf = Cursor::new(Vec::new());
    write_framed(&mut buf, "abc").await.expect("write");
    assert_eq!(buf.into_inner(), b"3\nabc");
}

#[test]
fn sync_variant_round_trips() {
    let mut buf = Vec::new();
    write_framed_sync(&mut buf, "sync payload").expect("write");
    let mut cursor = Cursor::new(buf);
    let decoded = read_framed_sync(&mut cursor).expect("read");
    assert_eq!(decoded, "sync payload");
}

#[tokio::test]
async fn empty_payload_round_trips() {
    let mut buf = Cursor::new(Vec::new());
    write_framed(&mut buf, "").await.expect("write");
    let mut cursor = Cursor::new(buf.into_inner());
    let decoded = read_framed(&mut cursor).await.expect("read");
    assert_eq!(decoded, "");
}
