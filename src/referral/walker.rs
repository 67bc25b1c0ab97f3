// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Traversals over the referral forest.
//!
//! All walks go through [`UserDirectory`] one query at a time. Downward walks
//! use an explicit worklist, so deep or wide trees never grow the call stack.
//!
//! - [`TreeWalker::first_child_chain`] follows a single lineage
//! - [`TreeWalker::descendant_tree`] expands the whole subtree
//! - [`TreeWalker::ancestor_at_depth`] climbs a fixed number of parent links

use std::collections::HashSet;

use super::error::{ReferralError, ReferralResult};
use super::traits::UserDirectory;
use super::types::{ChainLink, ReferralNode, User, UserId};

/// Default number of levels the milestone ancestor sits above a user.
pub const DEFAULT_ANCESTOR_DEPTH: u32 = 7;

/// Direct referrals a user needs to complete the inner-sharing task.
pub const DEFAULT_INNER_SHARING_THRESHOLD: usize = 6;

pub struct TreeWalker<'a> {
    directory: &'a dyn UserDirectory,
    inner_sharing_threshold: usize,
}

/// Arena slot used while expanding a subtree.
struct Slot {
    user: User,
    depth: u32,
    parent: Option<usize>,
}

impl<'a> TreeWalker<'a> {
    pub fn new(directory: &'a dyn UserDirectory) -> Self {
        Self {
            directory,
            inner_sharing_threshold: DEFAULT_INNER_SHARING_THRESHOLD,
        }
    }

    pub fn with_inner_sharing_threshold(mut self, threshold: usize) -> Self {
        self.inner_sharing_threshold = threshold;
        self
    }

    /// Follow the first referral of each user, starting at `user_id`.
    ///
    /// Each link carries all direct referrals of its user; the walk moves on
    /// to the earliest registered one and stops at a user without referrals.
    pub fn first_child_chain(&self, user_id: UserId) -> ReferralResult<Vec<ChainLink>> {
        let mut current = Some(self.directory.get(user_id)?);
        let mut seen = HashSet::new();
        let mut chain = Vec::new();

        while let Some(user) = current.take() {
            if !seen.insert(user.user_id) {
                return Err(ReferralError::Integrity(user.user_id));
            }
            let referrals = self.directory.find_children_of(user.user_id)?;
            current = referrals.first().cloned();
            chain.push(ChainLink { user, referrals });
        }

        Ok(chain)
    }

    /// Expand the full subtree rooted at `root_id`.
    ///
    /// Users are collected breadth-first into an arena, then folded
    /// bottom-up so every node knows its live and descendant counts.
    pub fn descendant_tree(&self, root_id: UserId) -> ReferralResult<ReferralNode> {
        let root = self.directory.get(root_id)?;

        let mut seen = HashSet::from([root.user_id]);
        let mut arena = vec![Slot {
            user: root,
            depth: 0,
            parent: None,
        }];

        let mut cursor = 0;
        while cursor < arena.len() {
            let user_id = arena[cursor].user.user_id;
            let depth = arena[cursor].depth;
            for child in self.directory.find_children_of(user_id)? {
                if !seen.insert(child.user_id) {
                    return Err(ReferralError::Integrity(child.user_id));
                }
                arena.push(Slot {
                    user: child,
                    depth: depth + 1,
                    parent: Some(cursor),
                });
            }
            cursor += 1;
        }

        tracing::debug!(root = %root_id, nodes = arena.len(), "Expanded referral subtree");

        // Breadth-first order puts every child after its parent, so a reverse
        // pass sees all children of a slot before the slot itself.
        let mut finished: Vec<Vec<ReferralNode>> = (0..arena.len()).map(|_| Vec::new()).collect();
        for (index, slot) in arena.into_iter().enumerate().rev() {
            let mut referrals = std::mem::take(&mut finished[index]);
            referrals.reverse();

            let live_below: u64 = referrals.iter().map(|n| n.live_referral_count).sum();
            let descendant_count: u64 = referrals.iter().map(|n| n.descendant_count + 1).sum();
            let node = ReferralNode {
                live_referral_count: u64::from(slot.user.is_live()) + live_below,
                descendant_count,
                completed_inner_sharing: referrals.len() >= self.inner_sharing_threshold,
                depth: slot.depth,
                user: slot.user,
                referrals,
            };

            match slot.parent {
                Some(parent) => finished[parent].push(node),
                None => return Ok(node),
            }
        }

        Err(ReferralError::Integrity(root_id))
    }

    /// The user exactly `depth` parent links above `user_id`.
    ///
    /// Depth 0 is the user itself. Returns `None` when a root is reached
    /// before `depth` steps.
    pub fn ancestor_at_depth(&self, user_id: UserId, depth: u32) -> ReferralResult<Option<User>> {
        let mut current = self.directory.get(user_id)?;
        for _ in 0..depth {
            let Some(parent_id) = current.parent_user_id else {
                return Ok(None);
            };
            current = self.directory.get(parent_id)?;
        }
        Ok(Some(current))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::referral::types::UserStatus;
    use crate::test_support::{seed_chain, seed_user, temp_db};

    #[test]
    fn first_child_chain_follows_earliest_referral() {
        let (db, _dir) = temp_db();
        let a = seed_user(&db, "a", None);
        let b = seed_user(&db, "b", Some(&a));
        let _b2 = seed_user(&db, "b2", Some(&a));
        let c = seed_user(&db, "c", Some(&b));

        let chain = TreeWalker::new(&db).first_child_chain(a.user_id).unwrap();
        let ids: Vec<_> = chain.iter().map(|l| l.user.user_id).collect();
        assert_eq!(ids, vec![a.user_id, b.user_id, c.user_id]);
        assert_eq!(chain[0].referrals.len(), 2);
        assert!(chain[2].referrals.is_empty());
    }

    #[test]
    fn first_child_chain_of_leaf_is_single_link() {
        let (db, _dir) = temp_db();
        let a = seed_user(&db, "a", None);

        let chain = TreeWalker::new(&db).first_child_chain(a.user_id).unwrap();
        assert_eq!(chain.len(), 1);
        assert!(chain[0].referrals.is_empty());
    }

    #[test]
    fn descendant_tree_visits_every_node() {
        let (db, _dir) = temp_db();
        let root = seed_user(&db, "root", None);

        // Depth 3, branching factor 2: 1 + 2 + 4 + 8 nodes.
        let mut level = vec![root.clone()];
        for depth in 1..=3 {
            let mut next = Vec::new();
            for parent in &level {
                for i in 0..2 {
                    next.push(seed_user(&db, &format!("n{depth}-{}-{i}", parent.user_id), Some(parent)));
                }
            }
            level = next;
        }

        let tree = TreeWalker::new(&db).descendant_tree(root.user_id).unwrap();
        assert_eq!(tree.descendant_count, 14);
        assert_eq!(tree.referrals.len(), 2);
        assert_eq!(tree.referrals[0].descendant_count, 6);

        let mut stack = vec![&tree];
        let mut visited = 0;
        let mut max_depth = 0;
        while let Some(node) = stack.pop() {
            visited += 1;
            max_depth = max_depth.max(node.depth);
            stack.extend(node.referrals.iter());
        }
        assert_eq!(visited, 15);
        assert_eq!(max_depth, 3);
    }

    #[test]
    fn descendant_tree_accumulates_live_counts_bottom_up() {
        let (db, _dir) = temp_db();
        let a = seed_user(&db, "a", None);
        let b = seed_user(&db, "b", Some(&a));
        let c = seed_user(&db, "c", Some(&b));
        let d = seed_user(&db, "d", Some(&a));

        for id in [b.user_id, c.user_id, d.user_id] {
            db.advance_status(id, UserStatus::Live).unwrap();
        }

        let tree = TreeWalker::new(&db).descendant_tree(a.user_id).unwrap();
        assert_eq!(tree.live_referral_count, 3);
        assert_eq!(tree.referrals[0].user.user_id, b.user_id);
        assert_eq!(tree.referrals[0].live_referral_count, 2);
        assert_eq!(tree.referrals[1].live_referral_count, 1);
        assert_eq!(tree.referrals[0].referrals[0].depth, 2);
    }

    #[test]
    fn inner_sharing_flag_follows_direct_referral_count() {
        let (db, _dir) = temp_db();
        let root = seed_user(&db, "root", None);
        let sharer = seed_user(&db, "sharer", Some(&root));
        for i in 0..6 {
            seed_user(&db, &format!("inner{i}"), Some(&sharer));
        }

        let tree = TreeWalker::new(&db).descendant_tree(root.user_id).unwrap();
        // Grandchildren do not count toward the root's task.
        assert!(!tree.completed_inner_sharing);
        assert!(tree.referrals[0].completed_inner_sharing);
        assert!(!tree.referrals[0].referrals[0].completed_inner_sharing);

        let strict = TreeWalker::new(&db)
            .with_inner_sharing_threshold(7)
            .descendant_tree(root.user_id)
            .unwrap();
        assert!(!strict.referrals[0].completed_inner_sharing);

        let lenient = TreeWalker::new(&db)
            .with_inner_sharing_threshold(1)
            .descendant_tree(root.user_id)
            .unwrap();
        assert!(lenient.completed_inner_sharing);
    }

    #[test]
    fn leaf_has_no_descendants() {
        let (db, _dir) = temp_db();
        let a = seed_user(&db, "a", None);

        assert!(db.find_children_of(a.user_id).unwrap().is_empty());
        let tree = TreeWalker::new(&db).descendant_tree(a.user_id).unwrap();
        assert!(tree.referrals.is_empty());
        assert_eq!(tree.descendant_count, 0);
    }

    #[test]
    fn missing_entry_point_is_not_found() {
        let (db, _dir) = temp_db();
        let walker = TreeWalker::new(&db);

        assert!(matches!(
            walker.descendant_tree(UserId(404)),
            Err(ReferralError::NotFound(_))
        ));
        assert!(matches!(
            walker.first_child_chain(UserId(404)),
            Err(ReferralError::NotFound(_))
        ));
        assert!(matches!(
            walker.ancestor_at_depth(UserId(404), 1),
            Err(ReferralError::NotFound(_))
        ));
    }

    #[test]
    fn ancestor_at_depth_zero_is_self() {
        let (db, _dir) = temp_db();
        let a = seed_user(&db, "a", None);

        let found = TreeWalker::new(&db).ancestor_at_depth(a.user_id, 0).unwrap();
        assert_eq!(found.map(|u| u.user_id), Some(a.user_id));
    }

    #[test]
    fn ancestor_seven_levels_up_in_eight_level_chain() {
        let (db, _dir) = temp_db();
        let chain = seed_chain(&db, 8);
        let walker = TreeWalker::new(&db);
        let (a, h) = (&chain[0], &chain[7]);

        let found = walker.ancestor_at_depth(h.user_id, DEFAULT_ANCESTOR_DEPTH).unwrap();
        assert_eq!(found.map(|u| u.user_id), Some(a.user_id));

        // Only seven ancestors exist above H.
        assert!(walker.ancestor_at_depth(h.user_id, 8).unwrap().is_none());
        assert!(walker
            .ancestor_at_depth(chain[3].user_id, DEFAULT_ANCESTOR_DEPTH)
            .unwrap()
            .is_none());
    }
}
