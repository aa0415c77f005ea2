// SPDX-License-Identifier: LGPL-2.1-or-later
// Copyright (c) 2026 the turbulence contributors

//! The 14-field init string (spec.md §6.4).

use tbc_core::error::TurbulenceError;
use tbc_core::ppath::PathId;

const FIELD_SEP: &str = ";_;";
const SUBFIELD_SEP: &str = ";-;";
const FIELD_COUNT: usize = 14;

/// Position 11: the serialized connection-status sub-record. Index 5
/// of its sub-fields carries the requested serverName (spec.md §6.4);
/// a single trailing character (not a sub-field) flags whether the
/// first channel-start reply must be skipped at the child.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnStatus {
    pub subfields: Vec<String>,
    pub skip_first_reply: bool,
}

impl ConnStatus {
    pub fn server_name(&self) -> Option<&str> {
        self.subfields.get(5).map(String::as_str).filter(|s| !s.is_empty())
    }

    fn serialize(&self) -> String {
        let mut out = self.subfields.join(SUBFIELD_SEP);
        out.push(if self.skip_first_reply { '1' } else { '0' });
        out
    }

    fn parse(raw: &str) -> Result<Self, TurbulenceError> {
        let mut chars = raw.chars();
        let flag = chars.next_back().ok_or_else(|| {
            TurbulenceError::ConfigInvalid("empty connection-status field".to_string())
        })?;
        let skip_first_reply = match flag {
            '1' => true,
            '0' => false,
            other => {
                return Err(TurbulenceError::ConfigInvalid(format!(
                    "connection-status flag must be 0 or 1, got '{other}'"
                )))
            }
        };
        let body: String = chars.collect();
        let subfields = if body.is_empty() {
            Vec::new()
        } else {
            body.split(SUBFIELD_SEP).map(str::to_string).collect()
        };
        Ok(Self {
            subfields,
            skip_first_reply,
        })
    }
}

/// One four-pair-of-fds-plus-ten log/handover parameter set, indexed
/// exactly as spec.md §6.4 describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitString {
    pub conn_fd: i32,
    /// Four `(log_write_fd, log_read_fd_to_close)` pairs, in the order
    /// general, error, access, driver (spec.md §6.4 positions 1..8).
    pub log_fds: [(i32, i32); 4],
    pub console_flags: u32,
    pub path_id: PathId,
    pub conn_status: ConnStatus,
    pub parent_host: String,
    pub parent_port: String,
}

impl InitString {
    pub fn encode(&self) -> String {
        let mut fields: Vec<String> = Vec::with_capacity(FIELD_COUNT);
        fields.push(self.conn_fd.to_string());
        for (write_fd, read_fd) in self.log_fds {
            fields.push(write_fd.to_string());
            fields.push(read_fd.to_string());
        }
        fields.push(self.console_flags.to_string());
        fields.push(self.path_id.to_string());
        fields.push(self.conn_status.serialize());
        fields.push(self.parent_host.clone());
        fields.push(self.parent_port.clone());
        debug_assert_eq!(fields.len(), FIELD_COUNT);
        fields.join(FIELD_SEP)
    }

    pub fn decode(raw: &str) -> Result<Self, TurbulenceError> {
        let fields: Vec<&str> = raw.split(FIELD_SEP).collect();
        if fields.len() < FIELD_COUNT {
            return Err(TurbulenceError::ConfigInvalid(format!(
                "init string has {} fields, expected at least {FIELD_COUNT}",
                fields.len()
            )));
        }

        let parse_i32 = |s: &str, what: &str| -> Result<i32, TurbulenceError> {
            s.parse::<i32>()
                .map_err(|_| TurbulenceError::ConfigInvalid(format!("init string field {what}='{s}' is not an integer")))
        };

        let conn_fd = parse_i32(fields[0], "conn_fd")?;
        let mut log_fds = [(0i32, 0i32); 4];
        for (idx, pair) in log_fds.iter_mut().enumerate() {
            let write_fd = parse_i32(fields[1 + idx * 2], "log_write_fd")?;
            let read_fd = parse_i32(fields[2 + idx * 2], "log_read_fd")?;
            *pair = (write_fd, read_fd);
        }
        let console_flags: u32 = fields[9]
            .parse()
            .map_err(|_| TurbulenceError::ConfigInvalid(format!("console flags '{}' is not u32", fields[9])))?;
        let path_id: PathId = fields[10]
            .parse()
            .map_err(|_| TurbulenceError::ConfigInvalid(format!("path id '{}' is not u32", fields[10])))?;
        let conn_status = ConnStatus::parse(fields[11])?;
        let parent_host = fields[12].to_string();
        let parent_port = fields[13].to_string();

        Ok(Self {
            conn_fd,
            log_fds,
            console_flags,
            path_id,
            conn_status,
            parent_host,
            parent_port,
        })
    }
}

#[cfg(test)]
#[path = "init_string_tests.rs"]
mod tests;
