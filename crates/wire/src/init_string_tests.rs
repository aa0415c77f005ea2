use super::*;

fn sample() -> InitString {
    InitString {
        conn_fd: 7,
        log_fds: [(10, 11), (12, 13), (14, 15), (16, 17)],
        console_flags: 0b101,
        path_id: 3,
        conn_status: ConnStatus {
            subfields: vec![
                "a".into(),
                "b".into(),
                "c".into(),
                "d".into(),
                "e".into(),
                "core-admin".into(),
            ],
            skip_first_reply: true,
        },
        parent_host: "127.0.0.1".to_string(),
        parent_port: "4441".to_string(),
    }
}

#[test]
fn round_trips_through_encode_decode() {
    let original = sample();
    let encoded = original.encode();
    let decoded = InitString::decode(&encoded).expect("decodes");
    assert_eq!(original, decoded);
}

#[test]
fn server_name_is_read_from_subfield_five() {
    let original = sample();
    assert_eq!(original.conn_status.server_name(), Some("core-admin"));
}

#[test]
fn skip_first_reply_is_the_trailing_flag_character() {
    let encoded = sample().conn_status.serialize();
    assert!(encoded.ends_with('1'));
}

#[test]
fn too_few_fields_is_rejected() {
    let err = InitString::decode("1;_;2;_;3").unwrap_err();
    assert!(matches!(err, TurbulenceError::ConfigInvalid(_)));
}

#[test]
fn bad_flag_character_is_rejected() {
    let err = ConnStatus::parse("a;-;b;-;c;-;d;-;e;-;f2").unwrap_err();
    assert!(matches!(err, TurbulenceError::ConfigInvalid(_)));
}

proptest::proptest! {
    #[test]
    fn arbitrary_fd_and_flag_values_round_trip(
        conn_fd in -1i32..4096,
        console_flags in 0u32..u32::MAX,
        path_id in 1u32..10_000,
        skip in proptest::bool::ANY,
    ) {
        let init = InitString {
            conn_fd,
            log_fds: [(1, 2), (3, 4), (5, 6), (7, 8)],
            console_flags,
            path_id,
            conn_status: ConnStatus {
                subfields: vec!["x".into(); 6],
                skip_first_reply: skip,
            },
            parent_host: "host".into(),
            parent_port: "1234".into(),
        };
        let decoded = InitString::decode(&init.encode()).expect("decodes");
        proptest::prop_assert_eq!(init, decoded);
    }
}
