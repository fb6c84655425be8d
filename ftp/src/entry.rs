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

//! Typed FTP listing entries.

use chrono::{DateTime, Utc};
use std::fmt;
use std::fmt::Write as _;

/// The kind of filesystem object a listing entry describes.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum EntryType {
    /// A regular file.
    File,
    /// A directory. The `cdir` (listed directory) and `pdir` (parent
    /// directory) facts collapse into this variant.
    Directory,
    /// A symbolic link.
    SymbolicLink,
    /// Anything the listing did not identify.
    #[default]
    Unknown,
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryType::File => write!(f, "file"),
            EntryType::Directory => write!(f, "dir"),
            EntryType::SymbolicLink => write!(f, "slink"),
            EntryType::Unknown => write!(f, "unknown"),
        }
    }
}

/// Access class of a permission matrix row, in UNIX mode-digit order.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Access {
    /// Owner permissions (first mode digit).
    User,
    /// Group permissions (second mode digit).
    Group,
    /// World permissions (third mode digit).
    World,
}

/// Access classes in the order their digits appear in a UNIX mode string.
pub(crate) const ACCESS_CLASSES: [Access; 3] = [Access::User, Access::Group, Access::World];

/// A single permission bit within an access class.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Permission {
    /// Read permission.
    Read,
    /// Write permission.
    Write,
    /// Execute (or directory search) permission.
    Execute,
}

impl Access {
    const fn index(self) -> usize {
        match self {
            Access::User => 0,
            Access::Group => 1,
            Access::World => 2,
        }
    }
}

impl Permission {
    const fn index(self) -> usize {
        match self {
            Permission::Read => 0,
            Permission::Write => 1,
            Permission::Execute => 2,
        }
    }

    /// Bit weight of this permission within a single octal mode digit.
    const fn weight(self) -> u8 {
        match self {
            Permission::Read => 4,
            Permission::Write => 2,
            Permission::Execute => 1,
        }
    }
}

/// A single parsed listing entry.
///
/// Every field except the name is optional; servers are free to omit any
/// fact. The permission matrix is populated either from a `UNIX.mode` fact
/// or, failing that, heuristically from the `perm` fact.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FtpEntry {
    name: String,
    raw_listing: String,
    entry_type: EntryType,
    size: Option<u64>,
    modify: Option<DateTime<Utc>>,
    owner: Option<String>,
    group: Option<String>,
    permissions: [[bool; 3]; 3],
}

impl FtpEntry {
    /// Creates an entry with the given pathname and no facts.
    pub fn new(name: impl Into<String>) -> Self {
        FtpEntry {
            name: name.into(),
            ..FtpEntry::default()
        }
    }

    /// The pathname of the entry. May contain spaces; only the first space
    /// on a listing line separates facts from the pathname.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The unparsed listing line this entry was produced from.
    pub fn raw_listing(&self) -> &str {
        &self.raw_listing
    }

    pub(crate) fn set_raw_listing(&mut self, raw: impl Into<String>) {
        self.raw_listing = raw.into();
    }

    /// The entry type, [`EntryType::Unknown`] when no `type` fact was seen.
    pub fn entry_type(&self) -> EntryType {
        self.entry_type
    }

    /// Sets the entry type.
    pub fn set_entry_type(&mut self, entry_type: EntryType) {
        self.entry_type = entry_type;
    }

    /// Size in bytes, if the server reported one.
    pub fn size(&self) -> Option<u64> {
        self.size
    }

    /// Sets the size in bytes.
    pub fn set_size(&mut self, size: u64) {
        self.size = Some(size);
    }

    /// Modification time in GMT, if the server reported one.
    pub fn modify_time(&self) -> Option<DateTime<Utc>> {
        self.modify
    }

    /// Sets the modification time.
    pub fn set_modify_time(&mut self, time: DateTime<Utc>) {
        self.modify = Some(time);
    }

    /// Owning user, from the `UNIX.owner` fact.
    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    /// Sets the owning user.
    pub fn set_owner(&mut self, owner: impl Into<String>) {
        self.owner = Some(owner.into());
    }

    /// Owning group, from the `UNIX.group` fact.
    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    /// Sets the owning group.
    pub fn set_group(&mut self, group: impl Into<String>) {
        self.group = Some(group.into());
    }

    /// Whether the given permission bit is set for the given access class.
    pub fn has_permission(&self, access: Access, permission: Permission) -> bool {
        self.permissions[access.index()][permission.index()]
    }

    /// Sets or clears a single permission bit.
    pub fn set_permission(&mut self, access: Access, permission: Permission, value: bool) {
        self.permissions[access.index()][permission.index()] = value;
    }

    /// The permission matrix rendered as the last three digits of a UNIX
    /// octal mode string, e.g. `"644"`.
    pub fn mode_digits(&self) -> String {
        let mut out = String::with_capacity(3);
        for access in ACCESS_CLASSES {
            let digit = [Permission::Read, Permission::Write, Permission::Execute]
                .into_iter()
                .filter(|p| self.has_permission(access, *p))
                .map(Permission::weight)
                .sum::<u8>();
            let _ = write!(out, "{digit}");
        }
        out
    }

    /// Synthesizes an MLSD listing line from the recognized facts.
    ///
    /// The output is parseable by [`crate::mlsx::parse_entry`] and yields an
    /// entry with identical semantic fields.
    pub fn to_listing_line(&self) -> String {
        let mut line = String::new();
        if self.entry_type != EntryType::Unknown {
            let _ = write!(line, "type={};", self.entry_type);
        }
        if let Some(size) = self.size {
            let _ = write!(line, "size={size};");
        }
        if let Some(modify) = self.modify {
            let _ = write!(line, "modify={};", modify.format("%Y%m%d%H%M%S"));
        }
        if let Some(owner) = &self.owner {
            let _ = write!(line, "UNIX.owner={owner};");
        }
        if let Some(group) = &self.group {
            let _ = write!(line, "UNIX.group={group};");
        }
        let _ = write!(line, "UNIX.mode=0{};", self.mode_digits());
        let _ = write!(line, " {}", self.name);
        line
    }
}
