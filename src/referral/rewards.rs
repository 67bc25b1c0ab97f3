// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Activation and Reward Engine
//!
//! Drives the forward-only status machine (`pending → live → closed`) and
//! pays two kinds of bonus when a user goes live:
//!
//! 1. **Direct bonus**: the parent's ledger earns `direct_bonus`.
//! 2. **Milestone bonus**: the ancestor `milestone_depth` levels above the
//!    activated user is expanded; every direct-child branch of that ancestor
//!    whose live count has reached `milestone_threshold` earns the ancestor
//!    `milestone_bonus`.
//!
//! Each credit carries an idempotency key (see [`BonusAward`]), so running
//! the activation again (after a partial failure, or a duplicate request)
//! never pays twice. A beneficiary without a ledger entry is skipped.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::error::ReferralResult;
use super::traits::{Ledger, UserDirectory};
use super::types::{BonusAward, CreditOutcome, User, UserId, UserStatus};
use super::walker::{TreeWalker, DEFAULT_ANCESTOR_DEPTH};

pub const DEFAULT_DIRECT_BONUS: u64 = 100;
pub const DEFAULT_MILESTONE_BONUS: u64 = 500;
pub const DEFAULT_MILESTONE_THRESHOLD: u64 = 7;

/// Reward policy constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardPolicy {
    /// Paid to the parent of a user that goes live
    pub direct_bonus: u64,
    /// Paid to the milestone ancestor per qualifying branch
    pub milestone_bonus: u64,
    /// Levels between the activated user and the milestone ancestor
    pub milestone_depth: u32,
    /// Live users a branch needs before it qualifies
    pub milestone_threshold: u64,
}

impl Default for RewardPolicy {
    fn default() -> Self {
        Self {
            direct_bonus: DEFAULT_DIRECT_BONUS,
            milestone_bonus: DEFAULT_MILESTONE_BONUS,
            milestone_depth: DEFAULT_ANCESTOR_DEPTH,
            milestone_threshold: DEFAULT_MILESTONE_THRESHOLD,
        }
    }
}

/// A bonus and what happened when it was credited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BonusResult {
    pub award: BonusAward,
    pub outcome: CreditOutcome,
}

/// Summary of a status update and the rewards it triggered.
#[derive(Debug, Clone, Serialize)]
pub struct ActivationReport {
    pub user: User,
    pub previous_status: UserStatus,
    /// Whether the user's own ledger entry was flipped to live
    pub ledger_marked_live: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direct_bonus: Option<BonusResult>,
    pub milestone_bonuses: Vec<BonusResult>,
}

pub struct RewardEngine<'a> {
    directory: &'a dyn UserDirectory,
    ledger: &'a dyn Ledger,
    policy: RewardPolicy,
}

impl<'a> RewardEngine<'a> {
    pub fn new(directory: &'a dyn UserDirectory, ledger: &'a dyn Ledger, policy: RewardPolicy) -> Self {
        Self {
            directory,
            ledger,
            policy,
        }
    }

    /// Move `user_id` to `target` and apply activation rewards when the
    /// target is live.
    ///
    /// A missing user fails with `NotFound` before anything is written.
    /// Moving backwards fails with `Validation`, checked against the status
    /// read inside the same write as the update. Repeating the current status
    /// is accepted; for `live` the rewards are re-evaluated and already paid
    /// awards report [`CreditOutcome::AlreadyApplied`].
    pub fn update_status(&self, user_id: UserId, target: UserStatus) -> ReferralResult<ActivationReport> {
        let (previous_status, user) = self.directory.advance_status(user_id, target)?;

        info!(
            user_id = %user_id,
            from = %previous_status,
            to = %target,
            "User status updated"
        );

        let mut report = ActivationReport {
            user,
            previous_status,
            ledger_marked_live: false,
            direct_bonus: None,
            milestone_bonuses: Vec::new(),
        };

        if target == UserStatus::Live {
            self.apply_activation_rewards(&mut report)?;
        }

        Ok(report)
    }

    fn apply_activation_rewards(&self, report: &mut ActivationReport) -> ReferralResult<()> {
        let user_id = report.user.user_id;

        report.ledger_marked_live = match self.ledger.mark_live(user_id)? {
            Some(_) => true,
            None => {
                warn!(user_id = %user_id, "Activated user has no ledger entry");
                false
            }
        };

        if let Some(parent_id) = report.user.parent_user_id {
            let award = BonusAward::direct(parent_id, user_id, self.policy.direct_bonus);
            report.direct_bonus = Some(self.credit(award)?);
        }

        report.milestone_bonuses = self.evaluate_milestones(&report.user)?;
        Ok(())
    }

    fn evaluate_milestones(&self, user: &User) -> ReferralResult<Vec<BonusResult>> {
        let walker = TreeWalker::new(self.directory);

        let Some(ancestor) = walker.ancestor_at_depth(user.user_id, self.policy.milestone_depth)? else {
            debug!(
                user_id = %user.user_id,
                depth = self.policy.milestone_depth,
                "No milestone ancestor at configured depth"
            );
            return Ok(Vec::new());
        };

        let tree = walker.descendant_tree(ancestor.user_id)?;
        let mut results = Vec::new();

        for branch in &tree.referrals {
            if branch.live_referral_count < self.policy.milestone_threshold {
                continue;
            }
            let award = BonusAward::milestone(
                ancestor.user_id,
                branch.user.user_id,
                self.policy.milestone_bonus,
            );
            results.push(self.credit(award)?);
        }

        Ok(results)
    }

    fn credit(&self, award: BonusAward) -> ReferralResult<BonusResult> {
        let outcome = self.ledger.credit_bonus(&award)?;
        match outcome {
            CreditOutcome::Credited { earn_amount } => info!(
                kind = award.kind.as_str(),
                beneficiary = %award.beneficiary,
                subject = %award.subject,
                amount = award.amount,
                earn_amount,
                "Bonus credited"
            ),
            CreditOutcome::AlreadyApplied => debug!(
                key = %award.idempotency_key(),
                "Bonus already applied"
            ),
            // Treated as "no reward relationship" rather than an error.
            CreditOutcome::NoLedgerEntry => debug!(
                kind = award.kind.as_str(),
                beneficiary = %award.beneficiary,
                "Beneficiary has no ledger entry, bonus skipped"
            ),
        }
        Ok(BonusResult { award, outcome })
    }
}
