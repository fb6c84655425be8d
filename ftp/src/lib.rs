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

//! # Retronet FTP Listing Parser
//!
//! This crate parses the machine-readable directory listings produced by the
//! FTP `MLST` and `MLSD` commands (RFC 3659 §7) into typed [`FtpEntry`]
//! values.
//!
//! An MLSx listing line is a sequence of semicolon-terminated `name=value`
//! facts followed by a single space and the pathname:
//!
//! ```text
//! type=file;size=1024;modify=20240115103000;UNIX.mode=0644; readme.txt
//! ```
//!
//! Fact names are case-insensitive and unknown facts are ignored, so the
//! parser copes with whatever a server chooses to emit. A single leading
//! space marks the factless `MLST` control-reply form where the remainder of
//! the line is the pathname.
//!
//! ## Usage
//!
//! ```
//! use retronet_ftp::{mlsx, Access, Permission};
//!
//! let entry = mlsx::parse_entry("type=file;size=17;UNIX.mode=0644; notes.txt")
//!     .expect("well-formed entry");
//! assert_eq!(entry.name(), "notes.txt");
//! assert_eq!(entry.size(), Some(17));
//! assert!(entry.has_permission(Access::User, Permission::Read));
//! assert!(!entry.has_permission(Access::World, Permission::Write));
//! ```
//!
//! Malformed entries (missing trailing `;`, a fact without `=`, an
//! unparseable `size` or `modify` value, an empty pathname) yield `None`
//! rather than an error: a listing is a stream of independent lines and one
//! bad line should not abort the rest.

#![warn(
    clippy::cargo,
    missing_docs,
    clippy::pedantic,
    future_incompatible,
    rust_2018_idioms
)]
#![allow(
    clippy::option_if_let_else,
    clippy::module_name_repetitions,
    clippy::missing_errors_doc
)]

mod entry;
pub mod mlsx;

pub use self::entry::{Access, EntryType, FtpEntry, Permission};
