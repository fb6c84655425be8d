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

//! A minimal netnews article header set.

use crate::threadable::Threadable;

/// An article's threading-relevant headers.
///
/// Holds the message id, subject, `From:`/`Date:` strings and the
/// `References:` chain. The simplified subject is computed once when the
/// subject is set.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Article {
    article_number: i64,
    message_id: String,
    subject: String,
    simplified_subject: String,
    from: String,
    date: String,
    references: Vec<String>,
    is_reply: bool,
}

impl Article {
    /// Creates an article with the given message id and subject.
    pub fn new(message_id: impl Into<String>, subject: impl Into<String>) -> Self {
        let mut article = Article {
            article_number: 0,
            message_id: message_id.into(),
            ..Article::default()
        };
        article.set_subject(subject);
        article
    }

    /// Creates a placeholder article.
    #[must_use]
    pub fn dummy() -> Self {
        Article {
            article_number: -1,
            ..Article::default()
        }
    }

    /// The article's number within its group, `-1` for placeholders.
    #[must_use]
    pub fn article_number(&self) -> i64 {
        self.article_number
    }

    /// Sets the article number.
    pub fn set_article_number(&mut self, number: i64) {
        self.article_number = number;
    }

    /// The raw subject header.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Sets the subject and recomputes its simplified form.
    pub fn set_subject(&mut self, subject: impl Into<String>) {
        self.subject = subject.into();
        let (simplified, was_reply) = simplify_subject(&self.subject);
        self.simplified_subject = simplified;
        if was_reply {
            self.is_reply = true;
        }
    }

    /// The `From:` header.
    #[must_use]
    pub fn from(&self) -> &str {
        &self.from
    }

    /// Sets the `From:` header.
    pub fn set_from(&mut self, from: impl Into<String>) {
        self.from = from.into();
    }

    /// The `Date:` header.
    #[must_use]
    pub fn date(&self) -> &str {
        &self.date
    }

    /// Sets the `Date:` header.
    pub fn set_date(&mut self, date: impl Into<String>) {
        self.date = date.into();
    }

    /// Appends one or more space-separated message ids to the references
    /// chain. An article with references is by definition a reply.
    pub fn add_reference(&mut self, message_ids: &str) {
        if message_ids.is_empty() {
            return;
        }
        self.is_reply = true;
        self.references
            .extend(message_ids.split(' ').map(str::to_string));
    }
}

impl Threadable for Article {
    fn message_id(&self) -> &str {
        &self.message_id
    }

    fn references(&self) -> &[String] {
        &self.references
    }

    fn simplified_subject(&self) -> &str {
        &self.simplified_subject
    }

    fn subject_is_reply(&self) -> bool {
        self.is_reply
    }

    fn is_dummy(&self) -> bool {
        self.article_number == -1
    }

    fn make_dummy(&self) -> Self {
        Article::dummy()
    }
}

/// Strips the typical reply signatures from a subject line.
///
/// Leading whitespace and any run of `Re:`, `Re[N]:` or `Re(N):` prefixes
/// (case-insensitive) are removed, the `(no subject)` placeholder collapses
/// to the empty string, and trailing control characters are trimmed.
/// Returns the simplified subject and whether any reply prefix was seen.
#[must_use]
pub(crate) fn simplify_subject(subject: &str) -> (String, bool) {
    let mut rest = subject;
    let mut was_reply = false;
    loop {
        rest = rest.trim_start_matches(' ');
        match strip_reply_prefix(rest) {
            Some(stripped) => {
                was_reply = true;
                rest = stripped;
            }
            None => break,
        }
    }
    let rest = rest.trim_end_matches(|c: char| (c as u32) < 0x20);
    if rest == "(no subject)" {
        return (String::new(), was_reply);
    }
    (rest.to_string(), was_reply)
}

/// Strips one `Re:` / `Re[N]:` / `Re(N):` prefix, if present.
fn strip_reply_prefix(subject: &str) -> Option<&str> {
    let bytes = subject.as_bytes();
    if bytes.len() < 3 || !bytes[0].eq_ignore_ascii_case(&b'r') || !bytes[1].eq_ignore_ascii_case(&b'e')
    {
        return None;
    }
    match bytes[2] {
        b':' => Some(&subject[3..]),
        open @ (b'[' | b'(') => {
            let close = if open == b'[' { b']' } else { b')' };
            let mut i = 3;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            if i + 1 < bytes.len() && bytes[i] == close && bytes[i + 1] == b':' {
                Some(&subject[i + 2..])
            } else {
                None
            }
        }
        _ => None,
    }
}
