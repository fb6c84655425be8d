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

//! The contract between the threader and whatever it threads.

/// Anything the [`crate::Threader`] can build conversation trees from.
///
/// Implementations supply identity (`message_id`), ancestry (`references`,
/// oldest ancestor first) and the subject signals used by the
/// gather-by-subject phase.
pub trait Threadable {
    /// The unique message id of this article.
    fn message_id(&self) -> &str;

    /// Message ids of this article's ancestors, oldest first.
    fn references(&self) -> &[String];

    /// The subject with reply markers stripped, used to group stragglers
    /// that lost their `References:` header.
    fn simplified_subject(&self) -> &str;

    /// Whether the original subject carried a reply marker.
    fn subject_is_reply(&self) -> bool;

    /// Whether this value is a placeholder rather than a real article.
    /// Placeholders are skipped on input.
    fn is_dummy(&self) -> bool;

    /// Creates a placeholder standing in for this article's thread, used to
    /// represent a root whose real article was never seen.
    #[must_use]
    fn make_dummy(&self) -> Self
    where
        Self: Sized;
}
