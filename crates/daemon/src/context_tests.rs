use super::*;
use std::sync::Arc;
use tbc_driver::fake::FakeDriver;

const MINIMAL_CONF: &str = r#"<turbulence>
    <global-settings kill-childs-on-exit="no" />
    <modules />
    <profile-path-configuration>
        <path-def path-name="default"><allow profile="urn:x:echo" /></path-def>
    </profile-path-configuration>
</turbulence>"#;

fn write_conf(dir: &tempfile::TempDir) -> PathBuf {
    let path = dir.path().join("turbulence.conf.xml");
    std::fs::write(&path, MINIMAL_CONF).expect("write conf");
    path
}

fn build_context(dir: &tempfile::TempDir) -> Arc<Context> {
    let conf_path = write_conf(dir);
    let driver: Arc<dyn BeepDriver> = Arc::new(FakeDriver::new());
    Context::new(conf_path, dir.path().join("runtime"), driver).expect("context")
}

#[tokio::test]
async fn new_builds_a_working_context_from_a_minimal_document() {
    let dir = tempfile::tempdir().expect("tempdir");
    let ctx = build_context(&dir);
    assert!(!ctx.is_started());
    ctx.mark_started();
    assert!(ctx.is_started());
    assert_eq!(ctx.engine().def_for(tbc_core::ConnId::next()), None);
}

#[tokio::test]
async fn data_bag_round_trips() {
    let dir = tempfile::tempdir().expect("tempdir");
    let ctx = build_context(&dir);
    assert_eq!(ctx.data_get("k"), None);
    ctx.data_set("k", "v");
    assert_eq!(ctx.data_get("k"), Some("v".to_string()));
}

#[tokio::test]
async fn list_store_is_created_once_and_reused() {
    let dir = tempfile::tempdir().expect("tempdir");
    let ctx = build_context(&dir);
    let list_path = dir.path().join("allow.list");
    ctx.list_store("admin-allow", &list_path).expect("open");
    ctx.with_list_store("admin-allow", |s| s.add("1.2.3.4").expect("add"));
    // Re-opening under the same name must not reset the in-memory cache.
    ctx.list_store("admin-allow", &list_path).expect("reopen");
    let present = ctx
        .with_list_store("admin-allow", |s| s.contains("1.2.3.4").expect("contains"))
        .expect("store present");
    assert!(present);
}

#[tokio::test]
async fn shutdown_closes_every_tracked_connection_and_releases_the_pid_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let conf_path = write_conf(&dir);
    let driver = Arc::new(FakeDriver::new());
    let driver_dyn: Arc<dyn BeepDriver> = driver.clone();
    let ctx = Context::new(conf_path, dir.path().join("runtime"), driver_dyn).expect("context");

    let conn = tbc_core::ConnId::next();
    ctx.conns().register(conn, 0);
    ctx.mark_started();

    ctx.shutdown().await;

    assert!(!ctx.is_started());
    assert!(!ctx.conns().contains(conn));
    assert!(driver.is_shutdown(conn));
}

#[tokio::test]
async fn reload_picks_up_an_edited_document() {
    let dir = tempfile::tempdir().expect("tempdir");
    let ctx = build_context(&dir);
    let conf_path = dir.path().join("turbulence.conf.xml");

    let updated = MINIMAL_CONF.replace("urn:x:echo", "urn:x:updated");
    std::fs::write(&conf_path, updated).expect("rewrite");

    ctx.reload().await.expect("reload");
    assert_eq!(
        ctx.config().snapshot().ppath.defs[0].items[0].profile.original(),
        "urn:x:updated"
    );
}
