// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (c) 2026 the turbulence contributors

//! End-to-end scenarios from spec.md §8, driven against `PPathEngine`
//! and `ConfigStore` with a `FakeDriver` standing in for a live BEEP
//! engine binding.

use std::io::Write;
use std::sync::Arc;

use tbc_config::ConfigStore;
use tbc_core::id::ConnId;
use tbc_driver::FakeDriver;
use tbc_ppath::PPathEngine;

fn write_conf(dir: &tempfile::TempDir, xml: &str) -> std::path::PathBuf {
    let path = dir.path().join("turbulence.conf.xml");
    let mut f = std::fs::File::create(&path).expect("create conf");
    f.write_all(xml.as_bytes()).expect("write conf");
    path
}

fn engine_from(xml: &str, driver: Arc<FakeDriver>) -> (tempfile::TempDir, ConfigStore, PPathEngine) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_conf(&dir, xml);
    let store = ConfigStore::load(&path).expect("load conf");
    let snapshot = store.snapshot();
    let engine = PPathEngine::new(snapshot.ppath.clone(), snapshot.attr_alias.clone(), driver);
    (dir, store, engine)
}

/// Scenario 1: default-only path, one allowed profile.
#[test]
fn default_only_path_accepts_the_allowed_profile_and_denies_the_rest() {
    const CONF: &str = r#"<turbulence><profile-path-configuration>
        <path-def path-name="default" src=".*">
            <allow profile="urn:demo:echo" />
        </path-def>
    </profile-path-configuration></turbulence>"#;

    let driver = Arc::new(FakeDriver::new());
    let (_dir, _store, engine) = engine_from(CONF, driver);

    let conn = ConnId::next();
    engine
        .select_connection(conn, "127.0.0.1", "127.0.0.1")
        .expect("a path-def matches any src");

    assert_eq!(engine.mask(conn, 1, "urn:demo:echo", None), tbc_ppath::MaskOutcome::Allow);

    match engine.mask(conn, 2, "urn:demo:other", None) {
        tbc_ppath::MaskOutcome::Deny { error: Some(msg) } => {
            assert!(msg.contains("urn:demo:other"), "message was: {msg}");
            assert!(msg.contains("default"), "message was: {msg}");
        }
        other => panic!("expected a denial with a message, got {other:?}"),
    }
}

/// Scenario 2: sequential gating through a tuning alias (property P5).
#[test]
fn app_profile_is_denied_before_tls_and_allowed_after_tuning_alias_is_set() {
    const CONF: &str = r#"<turbulence>
        <features>
            <attr-alias uri="http://iana.org/beep/TLS" attr="tls-fication:status" />
        </features>
        <profile-path-configuration>
            <path-def path-name="gated" src=".*">
                <if-success profile="http://iana.org/beep/TLS">
                    <allow profile="urn:x:app" />
                </if-success>
                <allow profile="http://iana.org/beep/TLS" />
            </path-def>
        </profile-path-configuration>
    </turbulence>"#;

    let driver = Arc::new(FakeDriver::new());
    let (_dir, _store, engine) = engine_from(CONF, driver.clone());

    let conn = ConnId::next();
    engine.select_connection(conn, "10.0.0.1", "10.0.0.1").unwrap();

    assert!(matches!(
        engine.mask(conn, 1, "urn:x:app", None),
        tbc_ppath::MaskOutcome::Deny { .. }
    ));

    driver.set_attr(conn, "tls-fication:status", "ok");

    assert_eq!(
        engine.mask(conn, 2, "urn:x:app", None),
        tbc_ppath::MaskOutcome::Allow
    );
}

/// Scenario 3: `max_per_conn = 2` caps concurrently open channels
/// (property P4).
#[test]
fn max_per_conn_denies_the_third_channel_of_the_same_profile() {
    const CONF: &str = r#"<turbulence><profile-path-configuration>
        <path-def path-name="capped" src=".*">
            <allow profile="urn:x:limited" max-per-conn="2" />
        </path-def>
    </profile-path-configuration></turbulence>"#;

    let driver = Arc::new(FakeDriver::new());
    let (_dir, _store, engine) = engine_from(CONF, driver.clone());

    let conn = ConnId::next();
    engine.select_connection(conn, "10.0.0.1", "10.0.0.1").unwrap();

    assert_eq!(engine.mask(conn, 1, "urn:x:limited", None), tbc_ppath::MaskOutcome::Allow);
    driver.open_channel(conn, "urn:x:limited");

    assert_eq!(engine.mask(conn, 2, "urn:x:limited", None), tbc_ppath::MaskOutcome::Allow);
    driver.open_channel(conn, "urn:x:limited");

    assert!(matches!(
        engine.mask(conn, 3, "urn:x:limited", None),
        tbc_ppath::MaskOutcome::Deny { .. }
    ));
}

/// Scenario 5: SIGHUP-style reload. A connection selected against the
/// old engine keeps its own `Arc` tree; a fresh engine built from the
/// reloaded snapshot sees the new rule.
#[test]
fn reload_adds_a_new_rule_without_disturbing_connections_on_the_old_engine() {
    const V1: &str = r#"<turbulence><profile-path-configuration>
        <path-def path-name="v1" src=".*"><allow profile="urn:x:old" /></path-def>
    </profile-path-configuration></turbulence>"#;
    const V2: &str = r#"<turbulence><profile-path-configuration>
        <path-def path-name="v1" src=".*">
            <allow profile="urn:x:old" />
            <allow profile="urn:x:new" />
        </path-def>
    </profile-path-configuration></turbulence>"#;

    let driver = Arc::new(FakeDriver::new());
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_conf(&dir, V1);
    let store = ConfigStore::load(&path).expect("load conf");

    let snapshot = store.snapshot();
    let old_engine = PPathEngine::new(snapshot.ppath.clone(), snapshot.attr_alias.clone(), driver.clone());
    let existing_conn = ConnId::next();
    old_engine.select_connection(existing_conn, "10.0.0.1", "10.0.0.1").unwrap();

    std::fs::write(&path, V2).expect("rewrite conf");
    store.reload().expect("reload");

    assert!(matches!(
        old_engine.mask(existing_conn, 1, "urn:x:new", None),
        tbc_ppath::MaskOutcome::Deny { .. }
    ));

    let snapshot = store.snapshot();
    let new_engine = PPathEngine::new(snapshot.ppath.clone(), snapshot.attr_alias.clone(), driver);
    let fresh_conn = ConnId::next();
    new_engine.select_connection(fresh_conn, "10.0.0.1", "10.0.0.1").unwrap();
    assert_eq!(
        new_engine.mask(fresh_conn, 1, "urn:x:new", None),
        tbc_ppath::MaskOutcome::Allow
    );
}
