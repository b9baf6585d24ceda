//! History capping policy.

use super::traits::{Message, Role};

/// Truncate `messages` to at most `max_history` entries.
///
/// A leading system message survives capping; the remaining slots hold the
/// most recent messages. When `max_history == 1` a leading system message is
/// all that remains.
pub fn cap_history(mut messages: Vec<Message>, max_history: usize) -> Vec<Message> {
    if messages.len() <= max_history {
        return messages;
    }

    let keep_system = messages.first().is_some_and(|m| m.role == Role::System);
    if keep_system && max_history > 0 {
        let recent = max_history - 1;
        let tail_start = messages.len() - recent;
        messages.drain(1..tail_start);
        messages
    } else {
        let start = messages.len() - max_history;
        messages.split_off(start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(n: usize) -> Vec<Message> {
        (0..n).map(|i| Message::user(format!("m{i}"))).collect()
    }

    #[test]
    fn under_cap_is_untouched() {
        let msgs = numbered(3);
        assert_eq!(cap_history(msgs.clone(), 3), msgs);
        assert_eq!(cap_history(msgs.clone(), 10), msgs);
    }

    #[test]
    fn empty_stays_empty() {
        assert!(cap_history(Vec::new(), 5).is_empty());
    }

    #[test]
    fn without_system_keeps_most_recent() {
        let msgs = numbered(7);
        let capped = cap_history(msgs.clone(), 4);
        assert_eq!(capped, msgs[3..].to_vec());
    }

    #[test]
    fn system_preamble_is_preserved() {
        let msgs = vec![
            Message::system("be terse"),
            Message::user("hi"),
            Message::assistant("hello"),
            Message::user("bye"),
        ];
        let capped = cap_history(msgs, 3);
        assert_eq!(
            capped,
            vec![
                Message::system("be terse"),
                Message::assistant("hello"),
                Message::user("bye"),
            ]
        );
    }

    #[test]
    fn system_alone_at_capacity_one() {
        let msgs = vec![Message::system("X"), Message::user("hi")];
        assert_eq!(cap_history(msgs, 1), vec![Message::system("X")]);
    }

    #[test]
    fn non_leading_system_gets_no_priority() {
        let msgs = vec![
            Message::user("a"),
            Message::system("late"),
            Message::user("b"),
            Message::assistant("c"),
        ];
        let capped = cap_history(msgs, 2);
        assert_eq!(capped, vec![Message::user("b"), Message::assistant("c")]);
    }

    #[test]
    fn capped_length_matches_limit_for_all_sizes() {
        for max in 1..6 {
            for len in 0..12 {
                let mut msgs = numbered(len);
                if len > 0 {
                    msgs[0] = Message::system("sys");
                }
                let capped = cap_history(msgs.clone(), max);
                assert_eq!(capped.len(), len.min(max), "len={len} max={max}");
                if len > max {
                    assert_eq!(capped[0], msgs[0]);
                    assert_eq!(capped[1..], msgs[len - (max - 1)..]);
                }
            }
        }
    }
}
