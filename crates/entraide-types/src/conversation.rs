//! Conversations are not stored. They are derived from the message log by
//! grouping every message a user takes part in under the key
//! `(other party, need)`, and keeping the most recent message of each group
//! as its representative.

use std::collections::HashSet;

use uuid::Uuid;

use crate::models::Message;

/// Identity of a conversation, relative to one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConversationKey {
    pub other_user_id: Uuid,
    /// `None` is its own group and never merges with a concrete need.
    pub need_id: Option<Uuid>,
}

/// A conversation thread and its most recent message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationThread<'a> {
    pub key: ConversationKey,
    pub last_message: &'a Message,
}

/// Group `messages` into the conversations `user_id` takes part in.
///
/// `messages` must be in insertion order; messages that do not involve
/// `user_id` are ignored. Threads are returned most recently active first.
/// Two messages with the same timestamp are ordered by their position in
/// the input, later meaning more recent.
pub fn group_conversations(user_id: Uuid, messages: &[Message]) -> Vec<ConversationThread<'_>> {
    let mut ordered: Vec<(usize, &Message)> = messages
        .iter()
        .enumerate()
        .filter(|(_, m)| m.involves(user_id))
        .collect();

    ordered.sort_by(|(ia, a), (ib, b)| b.created_at.cmp(&a.created_at).then(ib.cmp(ia)));

    let mut seen = HashSet::new();
    ordered
        .into_iter()
        .filter_map(|(_, message)| {
            let key = ConversationKey {
                other_user_id: message.other_party(user_id),
                need_id: message.need_id,
            };
            seen.insert(key).then_some(ConversationThread {
                key,
                last_message: message,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};

    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn msg(sender: Uuid, recipient: Uuid, need: Option<Uuid>, t: i64, content: &str) -> Message {
        Message {
            id: Uuid::new_v4(),
            sender_id: sender,
            recipient_id: recipient,
            need_id: need,
            content: content.to_string(),
            read: false,
            created_at: at(t),
        }
    }

    #[test]
    fn no_messages_no_conversations() {
        assert!(group_conversations(Uuid::new_v4(), &[]).is_empty());
    }

    #[test]
    fn groups_by_other_party_and_need() {
        let (x, y) = (Uuid::new_v4(), Uuid::new_v4());
        let (n1, n2) = (Uuid::new_v4(), Uuid::new_v4());
        let log = vec![
            msg(x, y, Some(n1), 1, "A"),
            msg(y, x, Some(n1), 2, "B"),
            msg(x, y, Some(n2), 3, "C"),
        ];

        let threads = group_conversations(x, &log);
        assert_eq!(threads.len(), 2);

        assert_eq!(threads[0].key, ConversationKey { other_user_id: y, need_id: Some(n2) });
        assert_eq!(threads[0].last_message.content, "C");
        assert_eq!(threads[1].key, ConversationKey { other_user_id: y, need_id: Some(n1) });
        assert_eq!(threads[1].last_message.content, "B");

        // Same grouping seen from the other side.
        let from_y = group_conversations(y, &log);
        assert_eq!(from_y.len(), 2);
        assert!(from_y.iter().all(|t| t.key.other_user_id == x));
    }

    #[test]
    fn missing_need_is_its_own_group() {
        let (x, y) = (Uuid::new_v4(), Uuid::new_v4());
        let n1 = Uuid::new_v4();
        let log = vec![msg(x, y, None, 1, "sans besoin"), msg(x, y, Some(n1), 2, "avec besoin")];

        let threads = group_conversations(x, &log);
        assert_eq!(threads.len(), 2);
        assert_eq!(threads[0].key.need_id, Some(n1));
        assert_eq!(threads[1].key.need_id, None);
    }

    #[test]
    fn ignores_unrelated_messages() {
        let (x, y, z) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let log = vec![msg(y, z, None, 1, "pas pour x"), msg(z, x, None, 2, "pour x")];

        let threads = group_conversations(x, &log);
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].key.other_user_id, z);
    }

    #[test]
    fn input_order_is_irrelevant_except_for_ties() {
        let (x, y) = (Uuid::new_v4(), Uuid::new_v4());
        let log = vec![msg(y, x, None, 5, "recent"), msg(x, y, None, 1, "ancien")];
        let threads = group_conversations(x, &log);
        assert_eq!(threads[0].last_message.content, "recent");

        let tied = vec![msg(x, y, None, 3, "premier"), msg(y, x, None, 3, "second")];
        let threads = group_conversations(x, &tied);
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].last_message.content, "second");
    }

    #[test]
    fn threads_ordered_most_recent_first() {
        let (x, y, z) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let log = vec![
            msg(x, y, None, 1, "y1"),
            msg(z, x, None, 2, "z1"),
            msg(y, x, None, 3, "y2"),
        ];
        let threads = group_conversations(x, &log);
        let others: Vec<Uuid> = threads.iter().map(|t| t.key.other_user_id).collect();
        assert_eq!(others, vec![y, z]);
    }
}
