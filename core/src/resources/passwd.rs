//! Shared `/etc/passwd` / `/etc/group` parsing, used by the `user`/`group`
//! resources' `read()` and by the local `Facts` gatherer (§4.15) — reusing
//! one parser rather than duplicating ad hoc string splitting in both
//! places.

use std::collections::BTreeMap;
use std::fs;

#[derive(Clone, Debug)]
pub struct PasswdEntry {
    pub name: String,
    pub uid: u32,
    pub gid: u32,
    pub comment: String,
    pub home: String,
    pub shell: String,
}

pub fn read_passwd() -> BTreeMap<String, PasswdEntry> {
    let Ok(text) = fs::read_to_string("/etc/passwd") else {
        return BTreeMap::new();
    };
    parse_passwd(&text)
}

/// Reverse-maps a numeric uid to its username, for resources that observe
/// ids on disk (`stat`) but need to report and diff against names.
pub fn name_for_uid(passwd: &BTreeMap<String, PasswdEntry>, uid: u32) -> Option<String> {
    passwd.values().find(|e| e.uid == uid).map(|e| e.name.clone())
}

/// Reverse-maps a numeric gid to its group name.
pub fn name_for_gid(groups: &BTreeMap<String, GroupEntry>, gid: u32) -> Option<String> {
    groups.values().find(|e| e.gid == gid).map(|e| e.name.clone())
}

fn parse_passwd(text: &str) -> BTreeMap<String, PasswdEntry> {
    let mut out = BTreeMap::new();
    for line in text.lines() {
        let fields: Vec<&str> = line.split(':').collect();
        if fields.len() < 7 {
            continue;
        }
        let (Ok(uid), Ok(gid)) = (fields[2].parse(), fields[3].parse()) else {
            continue;
        };
        out.insert(
            fields[0].to_string(),
            PasswdEntry {
                name: fields[0].to_string(),
                uid,
                gid,
                comment: fields[4].to_string(),
                home: fields[5].to_string(),
                shell: fields[6].to_string(),
            },
        );
    }
    out
}

#[derive(Clone, Debug)]
pub struct GroupEntry {
    pub name: String,
    pub gid: u32,
    pub members: Vec<String>,
}

pub fn read_group() -> BTreeMap<String, GroupEntry> {
    let Ok(text) = fs::read_to_string("/etc/group") else {
        return BTreeMap::new();
    };
    parse_group(&text)
}

fn parse_group(text: &str) -> BTreeMap<String, GroupEntry> {
    let mut out = BTreeMap::new();
    for line in text.lines() {
        let fields: Vec<&str> = line.split(':').collect();
        if fields.len() < 4 {
            continue;
        }
        let Ok(gid) = fields[2].parse() else {
            continue;
        };
        let members = if fields[3].is_empty() {
            Vec::new()
        } else {
            fields[3].split(',').map(str::to_string).collect()
        };
        out.insert(
            fields[0].to_string(),
            GroupEntry {
                name: fields[0].to_string(),
                gid,
                members,
            },
        );
    }
    out
}
