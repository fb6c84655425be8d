//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! MLST/MLSD fact-list parsing (RFC 3659 §7).
//!
//! ```text
//! entry            = [ facts ] SP pathname
//! facts            = 1*( fact ";" )
//! fact             = factname "=" value
//! ```
//!
//! A single control response entry (MLST) begins with a leading space and
//! carries no facts; MLSD data entries carry the full fact list. Each parse
//! call builds its own parser state, so the module is freely shareable
//! across threads.

use crate::entry::{Access, EntryType, FtpEntry, Permission, ACCESS_CLASSES};
use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::debug;

/// Permission sets selected by a single octal mode digit, indexed 0..=7.
const UNIX_PERMS: [&[Permission]; 8] = [
    &[],
    &[Permission::Execute],
    &[Permission::Write],
    &[Permission::Write, Permission::Execute],
    &[Permission::Read],
    &[Permission::Read, Permission::Execute],
    &[Permission::Read, Permission::Write],
    &[Permission::Read, Permission::Write, Permission::Execute],
];

/// Parses a single listing line into an [`FtpEntry`].
///
/// Returns `None` for malformed entries: a missing trailing `;` on the fact
/// list, a fact without an `=` sign, an unparseable `size` or `modify`
/// value, or an empty pathname. Unknown facts and empty fact values are
/// ignored.
pub fn parse_entry(entry: &str) -> Option<FtpEntry> {
    // A leading space marks the factless MLST control-reply form.
    if let Some(name) = entry.strip_prefix(' ') {
        if name.is_empty() {
            return None;
        }
        let mut file = FtpEntry::new(name);
        file.set_raw_listing(entry);
        return Some(file);
    }

    // Only the first space separates facts from the pathname.
    let (facts, name) = entry.split_once(' ')?;
    if name.is_empty() {
        return None;
    }
    // Every fact is ";"-terminated; strip the final one so any empty token
    // left by the split marks a malformed list rather than the line end.
    let facts = facts.strip_suffix(';')?;

    let mut file = FtpEntry::new(name);
    file.set_raw_listing(entry);

    // A perm fact only contributes when no UNIX.mode fact is present.
    let has_unix_mode = facts.to_ascii_lowercase().contains("unix.mode=");

    for fact in facts.split(';') {
        // An empty token has no "=" sign, so "a;;b" style lists reject.
        let (fact_name, value) = fact.split_once('=')?;
        if value.is_empty() {
            continue;
        }
        let fact_name = fact_name.to_ascii_lowercase();
        match fact_name.as_str() {
            "size" => {
                let size = match value.parse::<u64>() {
                    Ok(size) => size,
                    Err(err) => {
                        debug!("rejecting entry with bad size fact {value:?}: {err}");
                        return None;
                    }
                };
                file.set_size(size);
            }
            "modify" => {
                let modify = parse_gmt_timestamp(value)?;
                file.set_modify_time(modify);
            }
            "type" => {
                file.set_entry_type(match value.to_ascii_lowercase().as_str() {
                    "file" => EntryType::File,
                    "dir" | "cdir" | "pdir" => EntryType::Directory,
                    _ => EntryType::Unknown,
                });
            }
            "unix.owner" => file.set_owner(value),
            "unix.group" => file.set_group(value),
            "unix.mode" => apply_unix_mode(&mut file, value),
            "perm" if !has_unix_mode => apply_perm_flags(&mut file, value),
            _ => {} // unknown facts ignored
        }
    }
    Some(file)
}

/// Parses a GMT timestamp of the form `YYYYMMDDhhmmss[.fff]`.
///
/// The whole value must be consumed; partial parses are rejected.
pub fn parse_gmt_timestamp(timestamp: &str) -> Option<DateTime<Utc>> {
    let format = if timestamp.contains('.') {
        "%Y%m%d%H%M%S%.3f"
    } else {
        "%Y%m%d%H%M%S"
    };
    NaiveDateTime::parse_from_str(timestamp, format)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Applies the last three octal digits of a `UNIX.mode` fact to the
/// permission matrix, one digit per access class.
fn apply_unix_mode(file: &mut FtpEntry, value: &str) {
    let digits = value.as_bytes();
    if digits.len() < 3 {
        return;
    }
    let off = digits.len() - 3;
    for (i, access) in ACCESS_CLASSES.into_iter().enumerate() {
        let digit = digits[off + i].wrapping_sub(b'0');
        if let Some(perms) = UNIX_PERMS.get(digit as usize) {
            for permission in *perms {
                file.set_permission(access, *permission, true);
            }
        }
    }
}

// perm-fact = "Perm" "=" *pvals
// pvals     = "a" / "c" / "d" / "e" / "f" / "l" / "m" / "p" / "r" / "w"
fn apply_perm_flags(file: &mut FtpEntry, value: &str) {
    for flag in value.chars() {
        match flag.to_ascii_lowercase() {
            // retrieval implies read
            'r' => file.set_permission(Access::User, Permission::Read, true),
            // append, create, delete, mkdir, purge and store all imply write
            'a' | 'c' | 'd' | 'm' | 'p' | 'w' => {
                file.set_permission(Access::User, Permission::Write, true);
            }
            // enter and list imply execute
            'e' | 'l' => file.set_permission(Access::User, Permission::Execute, true),
            // 'f' (renamable) deliberately maps to nothing
            _ => {}
        }
    }
}
