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

//! # Retronet NNTP Threading
//!
//! An implementation of the classic netnews message-threading algorithm:
//! given a pile of articles, each carrying a `Message-Id` and a
//! `References:` chain of ancestor ids, reconstruct the conversation trees.
//!
//! The algorithm runs in five phases:
//!
//! 1. **Build containers.** One graph node per message id, including
//!    placeholder ("dummy") nodes for ids that are only ever mentioned in a
//!    `References:` header. Reference chains are linked parent-to-child,
//!    refusing links that would create a cycle.
//! 2. **Find the root set.** Every parentless node becomes a child of a
//!    synthetic root.
//! 3. **Prune.** Childless dummies are deleted; dummies with children are
//!    dissolved and their children promoted, except a multi-child dummy in
//!    the root set, which still marks a thread boundary.
//! 4. **Reverse.** Child lists are built newest-first, so each one is
//!    reversed to read in arrival order.
//! 5. **Gather by subject.** Root-set trees whose simplified subjects match
//!    are merged, preferring non-reply subjects as representatives.
//!
//! Anything article-like can be threaded by implementing [`Threadable`];
//! [`Article`] is a ready-made implementation with the usual subject
//! simplification (`Re:` prefix stripping and `(no subject)` collapsing).
//!
//! ```
//! use retronet_nntp::{Article, Threader};
//!
//! let first = Article::new("<a1@example.org>", "Lunar lander retrospective");
//! let mut reply = Article::new("<a2@example.org>", "Re: Lunar lander retrospective");
//! reply.add_reference("<a1@example.org>");
//!
//! let forest = Threader::new().thread(vec![first, reply]);
//! assert_eq!(forest.len(), 1);
//! assert_eq!(forest[0].children.len(), 1);
//! ```

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

mod article;
mod threadable;
mod threader;

pub use self::article::Article;
pub use self::threadable::Threadable;
pub use self::threader::{Thread, Threader};
