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

//! Integration tests for MLSx listing synthesis and re-parsing.

use retronet_ftp::{mlsx, Access, EntryType, FtpEntry, Permission};

fn sample_entry() -> FtpEntry {
    let mut entry = FtpEntry::new("reports/q3 summary.txt");
    entry.set_entry_type(EntryType::File);
    entry.set_size(48_213);
    entry.set_modify_time(
        mlsx::parse_gmt_timestamp("20240812161503").expect("fixture timestamp parses"),
    );
    entry.set_owner("alice");
    entry.set_group("staff");
    entry.set_permission(Access::User, Permission::Read, true);
    entry.set_permission(Access::User, Permission::Write, true);
    entry.set_permission(Access::Group, Permission::Read, true);
    entry.set_permission(Access::World, Permission::Read, true);
    entry
}

#[test]
fn synthesized_listing_line_round_trips() {
    let original = sample_entry();
    let line = original.to_listing_line();
    let reparsed = mlsx::parse_entry(&line).expect("synthesized line parses");

    assert_eq!(reparsed.name(), original.name());
    assert_eq!(reparsed.entry_type(), original.entry_type());
    assert_eq!(reparsed.size(), original.size());
    assert_eq!(reparsed.modify_time(), original.modify_time());
    assert_eq!(reparsed.owner(), original.owner());
    assert_eq!(reparsed.group(), original.group());
    for access in [Access::User, Access::Group, Access::World] {
        for permission in [Permission::Read, Permission::Write, Permission::Execute] {
            assert_eq!(
                reparsed.has_permission(access, permission),
                original.has_permission(access, permission),
                "{access:?}/{permission:?}"
            );
        }
    }
}

#[test]
fn directory_entry_round_trips() {
    let mut original = FtpEntry::new("incoming");
    original.set_entry_type(EntryType::Directory);
    original.set_permission(Access::User, Permission::Read, true);
    original.set_permission(Access::User, Permission::Write, true);
    original.set_permission(Access::User, Permission::Execute, true);

    let reparsed = mlsx::parse_entry(&original.to_listing_line()).expect("parses");
    assert_eq!(reparsed.entry_type(), EntryType::Directory);
    assert_eq!(reparsed.mode_digits(), "700");
}

#[test]
fn listing_lines_from_a_real_server_parse() {
    // Sampled from a ProFTPD MLSD response.
    let lines = [
        "modify=20240301120000;perm=flcdmpe;type=cdir;unique=13U1A6;UNIX.group=50;UNIX.mode=0755;UNIX.owner=14; .",
        "modify=20240301120000;perm=flcdmpe;type=pdir;unique=13U1A5;UNIX.group=50;UNIX.mode=0755;UNIX.owner=14; ..",
        "modify=20240215093512;perm=adfr;size=642;type=file;unique=13U8F2;UNIX.group=50;UNIX.mode=0644;UNIX.owner=14; welcome.msg",
    ];
    for line in lines {
        let entry = mlsx::parse_entry(line).unwrap_or_else(|| panic!("line parses: {line}"));
        assert!(!entry.name().is_empty());
    }
    let file = mlsx::parse_entry(lines[2]).expect("file entry parses");
    assert_eq!(file.entry_type(), EntryType::File);
    assert_eq!(file.size(), Some(642));
    assert_eq!(file.owner(), Some("14"));
    assert_eq!(file.mode_digits(), "644");
}
