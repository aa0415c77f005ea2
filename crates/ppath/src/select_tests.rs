use super::*;
use tbc_core::expr::Expr;
use tbc_core::ppath::PPathDef;

fn def(id: PathId, src: Option<&str>, separate: bool) -> PPathDef {
    PPathDef {
        id,
        name: Some(format!("def-{id}")),
        server_name: None,
        src: src.map(|s| Expr::compile(s).expect("compiles")),
        dst: None,
        items: vec![],
        user_id: None,
        group_id: None,
        separate,
        reuse: false,
        chroot: None,
        work_dir: None,
        child_limit: -1,
        children_running: Default::default(),
    }
}

#[test]
fn no_definitions_means_no_match() {
    let path = PPath::default();
    assert_eq!(select(&path, "10.0.0.1", "10.0.0.2"), None);
}

#[test]
fn first_matching_definition_in_document_order_wins() {
    let path = PPath {
        defs: vec![def(1, Some("127\\.0\\.0\\.1"), false), def(2, None, false)],
    };
    assert_eq!(select(&path, "127.0.0.1", "x"), Some(SelectOutcome::InProcess(1)));
    assert_eq!(select(&path, "10.0.0.9", "x"), Some(SelectOutcome::InProcess(2)));
}

#[test]
fn separate_definitions_select_as_separate() {
    let path = PPath {
        defs: vec![def(1, None, true)],
    };
    assert_eq!(select(&path, "any", "any"), Some(SelectOutcome::Separate(1)));
}

#[test]
fn selection_is_a_pure_function_of_src_and_dst() {
    let path = PPath {
        defs: vec![def(1, Some("10\\..*"), false), def(2, None, false)],
    };
    let a = select(&path, "10.1.2.3", "x");
    let b = select(&path, "10.1.2.3", "x");
    assert_eq!(a, b);
}
