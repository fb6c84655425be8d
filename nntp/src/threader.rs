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

//! The five-phase message-threading algorithm.
//!
//! Containers live in an arena (`Vec<Container>`) and refer to each other by
//! index, so cycle checks are plain index walks and no node ever aliases
//! another. A container without a message index is a dummy: a placeholder
//! for an id that was referenced but never seen.

use crate::threadable::Threadable;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Arena index of a container.
type NodeIx = usize;

/// One node in the threading graph.
#[derive(Clone, Copy, Debug, Default)]
struct Container {
    /// Index into the message table, `None` for dummies.
    message: Option<usize>,
    parent: Option<NodeIx>,
    child: Option<NodeIx>,
    next: Option<NodeIx>,
}

/// An owned conversation tree produced by [`Threader::thread`].
#[derive(Clone, Debug, PartialEq)]
pub struct Thread<T> {
    /// The article at this node. For a root whose real article was never
    /// seen this is a placeholder from [`Threadable::make_dummy`].
    pub article: T,
    /// Replies, oldest first.
    pub children: Vec<Thread<T>>,
}

/// Builds conversation trees from flat lists of articles.
#[derive(Clone, Copy, Debug, Default)]
pub struct Threader;

impl Threader {
    /// Creates a threader.
    #[must_use]
    pub fn new() -> Self {
        Threader
    }

    /// Threads `messages` into a forest of conversation trees.
    ///
    /// Placeholder inputs ([`Threadable::is_dummy`]) are skipped. An empty
    /// input produces an empty forest. Within each tree, children are
    /// ordered oldest first.
    pub fn thread<T: Threadable>(&self, messages: impl IntoIterator<Item = T>) -> Vec<Thread<T>> {
        let messages: Vec<T> = messages.into_iter().filter(|m| !m.is_dummy()).collect();
        if messages.is_empty() {
            return Vec::new();
        }

        let mut arena: Vec<Container> = Vec::with_capacity(messages.len() * 2);
        let mut id_table: HashMap<String, NodeIx> = HashMap::new();
        let mut bogus_id_count = 0usize;

        for index in 0..messages.len() {
            build_container(
                index,
                &messages,
                &mut arena,
                &mut id_table,
                &mut bogus_id_count,
            );
        }
        drop(id_table);

        let root = find_root_set(&mut arena);
        prune_empty_containers(&mut arena, root);
        reverse_children(&mut arena, root);
        gather_subjects(&mut arena, root, &messages);

        debug_assert!(arena[root].next.is_none(), "root must have no sibling");

        export_forest(&arena, root, messages)
    }
}

/// Phase 1: create or fill in the container for one message and wire up its
/// reference chain.
fn build_container<T: Threadable>(
    index: usize,
    messages: &[T],
    arena: &mut Vec<Container>,
    id_table: &mut HashMap<String, NodeIx>,
    bogus_id_count: &mut usize,
) {
    let message = &messages[index];
    let mut id = message.message_id().to_string();

    let container = match id_table.get(&id).copied() {
        // A container exists for this id already. Usually a forward
        // reference waiting for its message; on a duplicate id we file the
        // second occurrence under a synthesized key instead.
        Some(existing) => {
            if arena[existing].message.is_some() {
                *bogus_id_count += 1;
                id = format!("<Bogus-id:{bogus_id_count}>");
                warn!("duplicate message id {:?}, filing under {id}", message.message_id());
                None
            } else {
                arena[existing].message = Some(index);
                Some(existing)
            }
        }
        None => None,
    };
    let container = container.unwrap_or_else(|| {
        let ix = alloc(arena, Some(index));
        id_table.insert(id, ix);
        ix
    });

    // Chain the references together in the order they appear, creating
    // placeholder containers for ids we have not seen. A link is only made
    // if the child is still parentless and the link cannot close a cycle.
    let mut parent_ref: Option<NodeIx> = None;
    for reference in message.references() {
        let ref_ix = match id_table.get(reference).copied() {
            Some(ix) => ix,
            None => {
                let ix = alloc(arena, None);
                id_table.insert(reference.clone(), ix);
                ix
            }
        };
        if let Some(parent) = parent_ref {
            if arena[ref_ix].parent.is_none()
                && parent != ref_ix
                && !subtree_contains(arena, ref_ix, parent)
            {
                arena[ref_ix].parent = Some(parent);
                arena[ref_ix].next = arena[parent].child;
                arena[parent].child = Some(ref_ix);
            }
        }
        parent_ref = Some(ref_ix);
    }

    // The last reference becomes this container's parent, unless that would
    // make the container an ancestor of itself.
    let parent_ref = parent_ref.filter(|&p| p != container && !subtree_contains(arena, container, p));

    // An earlier References: header may have guessed a parent for us;
    // the message's own header is authoritative, so unlink the guess.
    if arena[container].parent.is_some() {
        unlink_from_parent(arena, container);
    }

    if let Some(parent) = parent_ref {
        arena[container].parent = Some(parent);
        arena[container].next = arena[parent].child;
        arena[parent].child = Some(container);
    }
}

/// Phase 2: gather every parentless container under a synthetic root.
///
/// Containers are visited in creation order, which keeps the forest
/// deterministic for a given input order.
fn find_root_set(arena: &mut Vec<Container>) -> NodeIx {
    let count = arena.len();
    let root = alloc(arena, None);
    for ix in 0..count {
        if arena[ix].parent.is_none() {
            debug_assert!(arena[ix].next.is_none(), "parentless container has a sibling");
            arena[ix].next = arena[root].child;
            arena[root].child = Some(ix);
        }
    }
    root
}

/// Phase 3: delete childless dummies and dissolve the rest, recursively.
fn prune_empty_containers(arena: &mut [Container], parent: NodeIx) {
    let mut prev: Option<NodeIx> = None;
    let mut cursor = arena[parent].child;
    while let Some(container) = cursor {
        let mut next = arena[container].next;

        if arena[container].message.is_none() && arena[container].child.is_none() {
            // An empty leaf; drop it from the sibling list.
            match prev {
                None => arena[parent].child = next,
                Some(prev) => arena[prev].next = next,
            }
        } else if arena[container].message.is_none()
            && (arena[container].parent.is_some() || only_child(arena, container))
        {
            // A dummy with children: splice the children into its place.
            // A multi-child dummy in the root set stays, preserving the
            // thread boundary.
            let kids = arena[container].child;
            match prev {
                None => arena[parent].child = kids,
                Some(prev) => arena[prev].next = kids,
            }
            let grandparent = arena[container].parent;
            let mut tail = kids;
            while let Some(kid) = tail {
                arena[kid].parent = grandparent;
                if arena[kid].next.is_none() {
                    arena[kid].next = arena[container].next;
                    break;
                }
                tail = arena[kid].next;
            }
            // Reprocess the promoted children on the next pass.
            next = kids;
        } else {
            if arena[container].child.is_some() {
                prune_empty_containers(arena, container);
            }
            prev = Some(container);
        }

        cursor = next;
    }
}

fn only_child(arena: &[Container], container: NodeIx) -> bool {
    arena[container]
        .child
        .is_some_and(|child| arena[child].next.is_none())
}

/// Phase 4: reverse every child list so iteration yields oldest first.
fn reverse_children(arena: &mut [Container], node: NodeIx) {
    let mut prev: Option<NodeIx> = None;
    let mut cursor = arena[node].child;
    while let Some(kid) = cursor {
        let rest = arena[kid].next;
        arena[kid].next = prev;
        prev = Some(kid);
        cursor = rest;
    }
    arena[node].child = prev;

    let mut cursor = arena[node].child;
    while let Some(kid) = cursor {
        reverse_children(arena, kid);
        cursor = arena[kid].next;
    }
}

/// Phase 5: merge root-set trees that share a simplified subject, to
/// accommodate replies that lost their `References:` header.
fn gather_subjects<T: Threadable>(arena: &mut Vec<Container>, root: NodeIx, messages: &[T]) {
    let mut subject_table: HashMap<String, NodeIx> = HashMap::new();
    let mut count = 0usize;

    // First pass: pick the best representative container per subject.
    // A dummy beats a real message; a non-reply subject beats a reply.
    let mut cursor = arena[root].child;
    while let Some(c) = cursor {
        cursor = arena[c].next;
        let Some(subject) = subject_of(arena, c, messages) else {
            continue;
        };
        if subject.is_empty() {
            continue;
        }
        let add = match subject_table.get(subject).copied() {
            None => true,
            Some(old) => {
                (arena[c].message.is_none() && arena[old].message.is_some())
                    || (container_is_reply(arena, old, messages)
                        && !container_is_reply(arena, c, messages)
                        && arena[c].message.is_some()
                        && arena[old].message.is_some())
            }
        };
        if add {
            subject_table.insert(subject.to_string(), c);
            count += 1;
        }
    }
    if count == 0 {
        return;
    }

    // Second pass: fold every other tree with a matching subject into the
    // representative.
    let mut prev: Option<NodeIx> = None;
    let mut cursor = arena[root].child;
    while let Some(c) = cursor {
        let rest = arena[c].next;
        let subject = match subject_of(arena, c, messages) {
            Some(subject) if !subject.is_empty() => subject.to_string(),
            _ => {
                prev = Some(c);
                cursor = rest;
                continue;
            }
        };
        let old = subject_table.get(&subject).copied();
        let Some(old) = old.filter(|&old| old != c) else {
            prev = Some(c);
            cursor = rest;
            continue;
        };

        // Detach c from the root set, then merge it into old.
        match prev {
            None => arena[root].child = rest,
            Some(prev) => arena[prev].next = rest,
        }
        arena[c].next = None;
        merge_by_subject(arena, old, c, messages);
        // prev intentionally stays put; c is gone from the list.

        cursor = rest;
    }
}

/// Merges root-set container `c` into the subject table entry `old`.
fn merge_by_subject<T: Threadable>(
    arena: &mut Vec<Container>,
    old: NodeIx,
    c: NodeIx,
    messages: &[T],
) {
    let old_is_dummy = arena[old].message.is_none();
    let c_is_dummy = arena[c].message.is_none();

    if old_is_dummy && c_is_dummy {
        // Two dummies: splice c's children onto old's tail.
        let mut tail = arena[old].child;
        while let Some(t) = tail {
            if arena[t].next.is_none() {
                break;
            }
            tail = arena[t].next;
        }
        if let Some(t) = tail {
            arena[t].next = arena[c].child;
        }
        let mut kid = arena[c].child;
        while let Some(k) = kid {
            arena[k].parent = Some(old);
            kid = arena[k].next;
        }
        arena[c].child = None;
    } else if old_is_dummy
        || (container_is_reply(arena, c, messages) && !container_is_reply(arena, old, messages))
    {
        // The newcomer is the reply (or the entry is a dummy thread):
        // attach it underneath.
        arena[c].parent = Some(old);
        arena[c].next = arena[old].child;
        arena[old].child = Some(c);
    } else {
        // Neither side wins: turn old into a dummy with both trees as its
        // children.
        let newc = alloc(arena, arena[old].message);
        arena[newc].child = arena[old].child;
        let mut kid = arena[newc].child;
        while let Some(k) = kid {
            arena[k].parent = Some(newc);
            kid = arena[k].next;
        }

        arena[old].message = None;
        arena[old].child = None;

        arena[c].parent = Some(old);
        arena[newc].parent = Some(old);

        // old is now a dummy with two kids, c and newc.
        arena[old].child = Some(c);
        arena[c].next = Some(newc);
    }
}

/// The simplified subject of a root-set container: its own message's, or
/// its first child's when the container is a dummy.
fn subject_of<'a, T: Threadable>(
    arena: &[Container],
    container: NodeIx,
    messages: &'a [T],
) -> Option<&'a str> {
    let message = arena[container]
        .message
        .or_else(|| arena[container].child.and_then(|child| arena[child].message))?;
    Some(messages[message].simplified_subject())
}

fn container_is_reply<T: Threadable>(arena: &[Container], container: NodeIx, messages: &[T]) -> bool {
    arena[container]
        .message
        .is_some_and(|m| messages[m].subject_is_reply())
}

/// Whether `target` appears anywhere in the subtree under `node`.
fn subtree_contains(arena: &[Container], node: NodeIx, target: NodeIx) -> bool {
    let mut kid = arena[node].child;
    while let Some(k) = kid {
        if k == target || subtree_contains(arena, k, target) {
            return true;
        }
        kid = arena[k].next;
    }
    false
}

/// Removes `container` from its parent's child list and clears its links.
fn unlink_from_parent(arena: &mut [Container], container: NodeIx) {
    let Some(parent) = arena[container].parent else {
        return;
    };
    let mut prev: Option<NodeIx> = None;
    let mut cursor = arena[parent].child;
    while let Some(c) = cursor {
        if c == container {
            match prev {
                None => arena[parent].child = arena[container].next,
                Some(prev) => arena[prev].next = arena[container].next,
            }
            arena[container].next = None;
            arena[container].parent = None;
            return;
        }
        prev = Some(c);
        cursor = arena[c].next;
    }
    debug!("container {container} not found in parent {parent} child list");
    arena[container].next = None;
    arena[container].parent = None;
}

fn alloc(arena: &mut Vec<Container>, message: Option<usize>) -> NodeIx {
    arena.push(Container {
        message,
        ..Container::default()
    });
    arena.len() - 1
}

/// Turns the container graph into owned trees, materializing a placeholder
/// article for each root-set dummy.
fn export_forest<T: Threadable>(arena: &[Container], root: NodeIx, messages: Vec<T>) -> Vec<Thread<T>> {
    let mut slots: Vec<Option<T>> = messages.into_iter().map(Some).collect();

    // Root-set dummies get a placeholder derived from their first child.
    let mut dummies: Vec<(NodeIx, T)> = Vec::new();
    let mut cursor = arena[root].child;
    while let Some(r) = cursor {
        if arena[r].message.is_none() {
            let first_child_message = arena[r]
                .child
                .and_then(|child| arena[child].message)
                .expect("a pruned root dummy always has a real first child");
            let placeholder = slots[first_child_message]
                .as_ref()
                .expect("child article still present")
                .make_dummy();
            dummies.push((r, placeholder));
        }
        cursor = arena[r].next;
    }
    let mut dummies: HashMap<NodeIx, T> = dummies.into_iter().collect();

    let mut forest = Vec::new();
    let mut cursor = arena[root].child;
    while let Some(r) = cursor {
        forest.push(export_tree(arena, r, &mut slots, &mut dummies));
        cursor = arena[r].next;
    }
    forest
}

fn export_tree<T: Threadable>(
    arena: &[Container],
    node: NodeIx,
    slots: &mut Vec<Option<T>>,
    dummies: &mut HashMap<NodeIx, T>,
) -> Thread<T> {
    let article = match arena[node].message {
        Some(m) => slots[m].take().expect("each article exported exactly once"),
        None => dummies
            .remove(&node)
            .expect("dummy placeholder prepared for root-set dummies"),
    };
    let mut children = Vec::new();
    let mut cursor = arena[node].child;
    while let Some(kid) = cursor {
        children.push(export_tree(arena, kid, slots, dummies));
        cursor = arena[kid].next;
    }
    Thread { article, children }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::article::Article;

    fn article(id: &str, subject: &str, refs: &[&str]) -> Article {
        let mut article = Article::new(id, subject);
        for r in refs {
            article.add_reference(r);
        }
        article
    }

    fn ids(thread: &Thread<Article>) -> Vec<String> {
        fn walk(t: &Thread<Article>, out: &mut Vec<String>) {
            out.push(t.article.message_id().to_string());
            for child in &t.children {
                walk(child, out);
            }
        }
        let mut out = Vec::new();
        walk(thread, &mut out);
        out
    }

    // ============================================================================
    // Basic Threading
    // ============================================================================

    #[test]
    fn empty_input_yields_empty_forest() {
        let forest = Threader::new().thread(Vec::<Article>::new());
        assert!(forest.is_empty());
    }

    #[test]
    fn dummy_inputs_are_skipped() {
        let forest = Threader::new().thread(vec![Article::dummy()]);
        assert!(forest.is_empty());
    }

    #[test]
    fn single_message_is_a_single_root() {
        let forest = Threader::new().thread(vec![article("<a@x>", "topic", &[])]);
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].article.message_id(), "<a@x>");
        assert!(forest[0].children.is_empty());
    }

    #[test]
    fn reply_nests_under_referenced_parent() {
        let forest = Threader::new().thread(vec![
            article("<a@x>", "topic", &[]),
            article("<b@x>", "Re: topic", &["<a@x>"]),
        ]);
        assert_eq!(forest.len(), 1);
        assert_eq!(ids(&forest[0]), ["<a@x>", "<b@x>"]);
    }

    #[test]
    fn reference_chain_builds_a_deep_thread() {
        let forest = Threader::new().thread(vec![
            article("<a@x>", "topic", &[]),
            article("<b@x>", "Re: topic", &["<a@x>"]),
            article("<c@x>", "Re: topic", &["<a@x>", "<b@x>"]),
        ]);
        assert_eq!(forest.len(), 1);
        assert_eq!(ids(&forest[0]), ["<a@x>", "<b@x>", "<c@x>"]);
        assert_eq!(forest[0].children.len(), 1);
        assert_eq!(forest[0].children[0].children.len(), 1);
    }

    #[test]
    fn children_iterate_oldest_first() {
        let forest = Threader::new().thread(vec![
            article("<a@x>", "topic", &[]),
            article("<b@x>", "Re: topic", &["<a@x>"]),
            article("<c@x>", "Re: topic", &["<a@x>"]),
            article("<d@x>", "Re: topic", &["<a@x>"]),
        ]);
        assert_eq!(forest.len(), 1);
        let children: Vec<_> = forest[0]
            .children
            .iter()
            .map(|c| c.article.message_id().to_string())
            .collect();
        assert_eq!(children, ["<b@x>", "<c@x>", "<d@x>"]);
    }

    #[test]
    fn out_of_order_arrival_still_threads() {
        let forest = Threader::new().thread(vec![
            article("<c@x>", "Re: topic", &["<a@x>", "<b@x>"]),
            article("<b@x>", "Re: topic", &["<a@x>"]),
            article("<a@x>", "topic", &[]),
        ]);
        assert_eq!(forest.len(), 1);
        assert_eq!(ids(&forest[0]), ["<a@x>", "<b@x>", "<c@x>"]);
    }

    // ============================================================================
    // Dummies and Pruning
    // ============================================================================

    #[test]
    fn missing_ancestor_with_one_child_is_pruned() {
        // <ghost@x> is referenced but never seen; its single child is
        // promoted into the root set.
        let forest = Threader::new().thread(vec![
            article("<b@x>", "Re: topic", &["<ghost@x>"]),
        ]);
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].article.message_id(), "<b@x>");
    }

    #[test]
    fn missing_ancestor_with_two_children_stays_as_dummy_root() {
        let forest = Threader::new().thread(vec![
            article("<b@x>", "reactor design", &["<ghost@x>"]),
            article("<c@x>", "reactor design", &["<ghost@x>"]),
        ]);
        assert_eq!(forest.len(), 1);
        let root = &forest[0];
        assert!(root.article.is_dummy(), "root must be a placeholder");
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[0].article.message_id(), "<b@x>");
        assert_eq!(root.children[1].article.message_id(), "<c@x>");
    }

    #[test]
    fn intermediate_missing_ancestors_collapse() {
        // b -> ghost2 -> ghost1; the two dummies each have one child and
        // both dissolve.
        let forest = Threader::new().thread(vec![
            article("<b@x>", "Re: topic", &["<ghost1@x>", "<ghost2@x>"]),
        ]);
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].article.message_id(), "<b@x>");
        assert!(forest[0].children.is_empty());
    }

    #[test]
    fn no_dummy_ever_has_exactly_one_child() {
        let forest = Threader::new().thread(vec![
            article("<a@x>", "one", &["<g1@x>"]),
            article("<b@x>", "two", &["<g2@x>", "<g3@x>"]),
            article("<c@x>", "two", &["<g2@x>"]),
        ]);
        fn check(thread: &Thread<Article>) {
            if thread.article.is_dummy() {
                assert!(thread.children.len() >= 2, "dummy with < 2 children");
            }
            for child in &thread.children {
                check(child);
            }
        }
        for tree in &forest {
            check(tree);
        }
    }

    // ============================================================================
    // Cycles and Duplicates
    // ============================================================================

    #[test]
    fn mutually_referencing_messages_do_not_cycle() {
        let forest = Threader::new().thread(vec![
            article("<a@x>", "topic", &["<b@x>"]),
            article("<b@x>", "topic", &["<a@x>"]),
        ]);
        // Whatever shape results, it must be finite and acyclic; walking it
        // must terminate and visit both ids.
        let mut all = Vec::new();
        for tree in &forest {
            all.extend(ids(tree));
        }
        all.sort();
        assert_eq!(all, ["<a@x>", "<b@x>"]);
    }

    #[test]
    fn self_reference_is_ignored() {
        let forest = Threader::new().thread(vec![article("<a@x>", "topic", &["<a@x>"])]);
        assert_eq!(forest.len(), 1);
        assert!(forest[0].children.is_empty());
    }

    #[test]
    fn duplicate_ids_both_survive() {
        let forest = Threader::new().thread(vec![
            article("<a@x>", "first copy", &[]),
            article("<a@x>", "second copy", &[]),
        ]);
        let total: usize = forest.iter().map(|t| ids(t).len()).sum();
        assert_eq!(total, 2);
    }

    // ============================================================================
    // Subject Gathering
    // ============================================================================

    #[test]
    fn reply_without_references_joins_by_subject() {
        // B is the non-reply and becomes the representative; A ("Re: foo")
        // becomes its child.
        let forest = Threader::new().thread(vec![
            article("<1@x>", "Re: foo", &[]),
            article("<2@x>", "foo", &[]),
        ]);
        assert_eq!(forest.len(), 1);
        assert_eq!(forest[0].article.message_id(), "<2@x>");
        assert_eq!(forest[0].children.len(), 1);
        assert_eq!(forest[0].children[0].article.message_id(), "<1@x>");
    }

    #[test]
    fn two_non_replies_with_same_subject_join_under_a_dummy() {
        let forest = Threader::new().thread(vec![
            article("<1@x>", "weekly report", &[]),
            article("<2@x>", "weekly report", &[]),
        ]);
        assert_eq!(forest.len(), 1);
        assert!(forest[0].article.is_dummy());
        assert_eq!(forest[0].children.len(), 2);
    }

    #[test]
    fn unrelated_subjects_stay_separate() {
        let forest = Threader::new().thread(vec![
            article("<1@x>", "alpha", &[]),
            article("<2@x>", "beta", &[]),
        ]);
        assert_eq!(forest.len(), 2);
    }

    // ============================================================================
    // Global Properties
    // ============================================================================

    fn shape(thread: &Thread<Article>) -> String {
        let mut children: Vec<String> = thread.children.iter().map(shape).collect();
        children.sort();
        format!("({}:[{}])", thread.article.message_id(), children.join(","))
    }

    #[test]
    fn threading_twice_yields_isomorphic_forests() {
        let input = || {
            vec![
                article("<a@x>", "topic", &[]),
                article("<b@x>", "Re: topic", &["<a@x>"]),
                article("<c@x>", "Re: topic", &["<a@x>", "<b@x>"]),
                article("<d@x>", "other", &["<missing@x>"]),
                article("<e@x>", "other", &[]),
                article("<f@x>", "Re: third", &[]),
                article("<g@x>", "third", &[]),
            ]
        };
        let threader = Threader::new();
        let mut first: Vec<String> = threader.thread(input()).iter().map(shape).collect();
        let mut second: Vec<String> = threader.thread(input()).iter().map(shape).collect();
        first.sort();
        second.sort();
        assert_eq!(first, second);
    }
}
