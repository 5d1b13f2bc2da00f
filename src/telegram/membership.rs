//! Forced-join membership gate.
//!
//! Before a retrieval is served, the sender must be a member of every
//! registered channel. All channels are checked concurrently; a check
//! that errors (unknown channel, bot not in channel, malformed id)
//! counts as unmet — the gate fails closed.

use async_trait::async_trait;
use futures_util::future::join_all;
use teloxide::prelude::*;
use teloxide::types::{ChatMemberKind, Recipient, UserId};

use crate::storage::repository::ChannelMap;

/// Verdict of one membership check. Unknown is treated as absent.
#[async_trait]
pub trait MembershipChecker: Send + Sync {
    async fn is_member(&self, channel_id: &str, user_id: i64) -> bool;
}

/// Aggregated gate outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// Member of every required channel
    Pass,
    /// The channels still to join, keyed like the full map
    Missing(ChannelMap),
}

/// Checks every channel concurrently and collects the unmet ones.
pub async fn check_membership(
    checker: &dyn MembershipChecker,
    channels: &ChannelMap,
    user_id: i64,
) -> GateOutcome {
    if channels.is_empty() {
        return GateOutcome::Pass;
    }
    let verdicts = join_all(channels.keys().map(|id| checker.is_member(id, user_id))).await;
    let missing: ChannelMap = channels
        .iter()
        .zip(verdicts)
        .filter(|(_, member)| !member)
        .map(|((id, info), _)| (id.clone(), info.clone()))
        .collect();
    if missing.is_empty() {
        GateOutcome::Pass
    } else {
        GateOutcome::Missing(missing)
    }
}

/// `@username` or numeric `-100…` form, verbatim as stored.
pub(crate) fn parse_recipient(channel_id: &str) -> Option<Recipient> {
    if let Some(username) = channel_id.strip_prefix('@') {
        if username.is_empty() {
            return None;
        }
        Some(Recipient::ChannelUsername(channel_id.to_string()))
    } else {
        channel_id.parse::<i64>().ok().map(|id| Recipient::Id(ChatId(id)))
    }
}

#[async_trait]
impl MembershipChecker for Bot {
    async fn is_member(&self, channel_id: &str, user_id: i64) -> bool {
        let Some(recipient) = parse_recipient(channel_id) else {
            log::warn!("Unparseable channel id {:?}, treating as unmet", channel_id);
            return false;
        };
        let Ok(user_id) = u64::try_from(user_id) else { return false };
        match self.get_chat_member(recipient, UserId(user_id)).await {
            Ok(member) => !matches!(member.kind, ChatMemberKind::Left | ChatMemberKind::Banned(_)),
            Err(e) => {
                log::debug!("Membership check failed for {} in {}: {}", user_id, channel_id, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::repository::ChannelInfo;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    struct Scripted {
        member_of: HashSet<&'static str>,
    }

    #[async_trait]
    impl MembershipChecker for Scripted {
        async fn is_member(&self, channel_id: &str, _user_id: i64) -> bool {
            self.member_of.contains(channel_id)
        }
    }

    fn channels(ids: &[&str]) -> ChannelMap {
        ids.iter()
            .map(|id| {
                (
                    id.to_string(),
                    ChannelInfo { title: id.to_string(), link: format!("https://t.me/{id}") },
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn empty_channel_list_passes() {
        let checker = Scripted { member_of: HashSet::new() };
        assert_eq!(check_membership(&checker, &ChannelMap::new(), 1).await, GateOutcome::Pass);
    }

    #[tokio::test]
    async fn member_of_all_passes() {
        let checker = Scripted { member_of: HashSet::from(["@a", "@b"]) };
        assert_eq!(check_membership(&checker, &channels(&["@a", "@b"]), 1).await, GateOutcome::Pass);
    }

    #[tokio::test]
    async fn unmet_channels_are_reported() {
        let checker = Scripted { member_of: HashSet::from(["@a"]) };
        let outcome = check_membership(&checker, &channels(&["@a", "@b", "@c"]), 1).await;
        let GateOutcome::Missing(missing) = outcome else { panic!("expected missing channels") };
        assert_eq!(missing.keys().collect::<Vec<_>>(), vec!["@b", "@c"]);
    }

    #[test]
    fn recipients_parse_both_forms() {
        assert!(matches!(parse_recipient("@news"), Some(Recipient::ChannelUsername(_))));
        assert!(matches!(parse_recipient("-1001234567890"), Some(Recipient::Id(ChatId(-1001234567890)))));
        assert!(parse_recipient("not a channel").is_none());
        assert!(parse_recipient("@").is_none());
    }
}
