// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (c) 2026 the turbulence contributors

//! XML parsing (spec.md §4.2, §6.1) via `roxmltree`.
//!
//! Structural validation mirrors the DTD the original ships: a single
//! `<turbulence>` root with `<global-settings>`, `<modules>`, an
//! optional `<features>`, and `<profile-path-configuration>` holding a
//! sequence of `<path-def>` elements (spec.md §6.1).

use std::path::PathBuf;
use std::sync::Arc;

use roxmltree::{Document, Node};
use tbc_core::error::TurbulenceError;
use tbc_core::expr::Expr;
use tbc_core::ppath::{AttrAlias, PPath, PPathDef, PPathItem, PPathItemKind};

use crate::doc::{ConfigDoc, GlobalSettings, ModuleConfig};

/// Parse a full `<turbulence>` document from `xml`.
pub fn parse_document(xml: &str) -> Result<ConfigDoc, TurbulenceError> {
    let doc = Document::parse(xml).map_err(|e| TurbulenceError::ConfigInvalid(e.to_string()))?;
    let root = doc.root_element();
    if root.tag_name().name() != "turbulence" {
        return Err(TurbulenceError::ConfigInvalid(format!(
            "root element must be <turbulence>, found <{}>",
            root.tag_name().name()
        )));
    }

    let global = parse_global_settings(&root)?;
    let modules = parse_modules(&root)?;
    let (ppath, attr_alias) = parse_profile_path(&root)?;

    let config = ConfigDoc {
        global,
        modules,
        ppath: Arc::new(ppath),
        attr_alias: Arc::new(attr_alias),
    };
    validate(&config)?;
    Ok(config)
}

fn child<'a, 'input>(node: &'a Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.is_element() && n.tag_name().name() == name)
}

fn children<'a, 'input>(node: &'a Node<'a, 'input>, name: &str) -> Vec<Node<'a, 'input>> {
    node.children()
        .filter(|n| n.is_element() && n.tag_name().name() == name)
        .collect()
}

/// `true` for `yes|true|1|enabled`, case-insensitively (spec.md §4.2's
/// "is attribute positive" helper).
pub fn is_positive(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "yes" | "true" | "1" | "enabled"
    )
}

fn attr_positive(node: &Node, name: &str) -> bool {
    node.attribute(name).map(is_positive).unwrap_or(false)
}

fn attr_int(node: &Node, name: &str) -> Result<Option<i64>, TurbulenceError> {
    match node.attribute(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| TurbulenceError::ConfigInvalid(format!("attribute {name}='{raw}' is not an integer"))),
    }
}

fn parse_global_settings(root: &Node) -> Result<GlobalSettings, TurbulenceError> {
    let Some(node) = child(root, "global-settings") else {
        return Ok(GlobalSettings::default());
    };

    Ok(GlobalSettings {
        pid_file: node.attribute("pid-file").map(PathBuf::from),
        log_dir: node.attribute("log-dir").map(PathBuf::from),
        socket_dir: node.attribute("socket-dir").map(PathBuf::from),
        kill_childs_on_exit: attr_positive(&node, "kill-childs-on-exit"),
        clean_start: attr_positive(&node, "clean-start"),
        no_detach: attr_positive(&node, "no-detach"),
    })
}

fn parse_modules(root: &Node) -> Result<Vec<ModuleConfig>, TurbulenceError> {
    let Some(modules_node) = child(root, "modules") else {
        return Ok(Vec::new());
    };

    let mut out = Vec::new();
    for node in modules_node.children().filter(|n| n.is_element()) {
        match node.tag_name().name() {
            "directory" => {
                let path = node
                    .attribute("src")
                    .ok_or_else(|| TurbulenceError::ConfigInvalid("<directory> missing src".into()))?;
                out.push(ModuleConfig::Directory(PathBuf::from(path)));
            }
            "module" => {
                let path = node
                    .attribute("location")
                    .ok_or_else(|| TurbulenceError::ConfigInvalid("<module> missing location".into()))?;
                out.push(ModuleConfig::File(PathBuf::from(path)));
            }
            other => {
                return Err(TurbulenceError::ConfigInvalid(format!(
                    "unexpected element <{other}> inside <modules>"
                )))
            }
        }
    }
    Ok(out)
}

fn parse_profile_path(root: &Node) -> Result<(PPath, AttrAlias), TurbulenceError> {
    let mut alias = AttrAlias::new();

    if let Some(features) = child(root, "features") {
        for alias_node in children(&features, "attr-alias") {
            let uri = alias_node
                .attribute("uri")
                .ok_or_else(|| TurbulenceError::ConfigInvalid("<attr-alias> missing uri".into()))?;
            let attr_key = alias_node
                .attribute("attr")
                .ok_or_else(|| TurbulenceError::ConfigInvalid("<attr-alias> missing attr".into()))?;
            alias.add(uri, attr_key);
        }
    }

    let Some(ppath_node) = child(root, "profile-path-configuration") else {
        return Ok((PPath::default(), alias));
    };

    let mut defs = Vec::new();
    for (idx, def_node) in children(&ppath_node, "path-def").into_iter().enumerate() {
        defs.push(parse_path_def(&def_node, idx as u32 + 1)?);
    }

    Ok((PPath { defs }, alias))
}

fn parse_opt_expr(node: &Node, attr: &str) -> Result<Option<Expr>, TurbulenceError> {
    match node.attribute(attr) {
        None => Ok(None),
        Some(raw) => Expr::compile(raw).map(Some),
    }
}

fn parse_path_def(node: &Node, id: u32) -> Result<PPathDef, TurbulenceError> {
    let user_id = attr_int(node, "run-as-user")?.map(|v| v as u32);
    let group_id = attr_int(node, "run-as-group")?.map(|v| v as u32);
    let child_limit = attr_int(node, "child-limit")?.unwrap_or(-1) as i32;

    let mut items = Vec::new();
    for child_node in node.children().filter(|n| n.is_element()) {
        items.push(parse_item(&child_node)?);
    }

    Ok(PPathDef {
        id,
        name: node.attribute("path-name").map(str::to_string),
        server_name: parse_opt_expr(node, "server-name")?,
        src: parse_opt_expr(node, "src")?,
        dst: parse_opt_expr(node, "dst")?,
        items,
        user_id,
        group_id,
        separate: attr_positive(node, "separate"),
        reuse: attr_positive(node, "reuse"),
        chroot: node.attribute("chroot").map(PathBuf::from),
        work_dir: node.attribute("work-dir").map(PathBuf::from),
        child_limit,
        children_running: std::sync::atomic::AtomicU32::new(0),
    })
}

fn parse_item(node: &Node) -> Result<PPathItem, TurbulenceError> {
    let kind = match node.tag_name().name() {
        "allow" => PPathItemKind::Allow,
        "if-success" => PPathItemKind::IfSuccess,
        other => {
            return Err(TurbulenceError::ConfigInvalid(format!(
                "unexpected element <{other}> inside <path-def>"
            )))
        }
    };

    let profile_text = node
        .attribute("profile")
        .ok_or_else(|| TurbulenceError::ConfigInvalid(format!("<{}> missing profile attribute", node.tag_name().name())))?;
    let profile = Expr::compile(profile_text)?;
    let connmark = node.attribute("connmark").map(str::to_string);
    let preconnmark = node.attribute("preconnmark").map(str::to_string);
    let max_per_conn = attr_int(node, "max-per-conn")?.unwrap_or(0) as u32;

    let mut children_items = Vec::new();
    for child_node in node.children().filter(|n| n.is_element()) {
        children_items.push(parse_item(&child_node)?);
    }

    match kind {
        PPathItemKind::Allow => PPathItem::allow(profile, connmark, preconnmark, max_per_conn).map(|mut item| {
            item.children = children_items;
            item
        }),
        PPathItemKind::IfSuccess => Ok(PPathItem::if_success(
            profile,
            connmark,
            preconnmark,
            max_per_conn,
            children_items,
        )),
    }
}

fn validate(doc: &ConfigDoc) -> Result<(), TurbulenceError> {
    doc.ppath.validate()
}

#[cfg(test)]
#[path = "parse_tests.rs"]
mod tests;
