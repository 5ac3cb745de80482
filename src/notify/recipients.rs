use std::collections::HashSet;

use serde::Serialize;

use crate::models::DonorContact;

/// Device tokens must be longer than this to be considered real.
const MIN_TOKEN_EXCLUSIVE: usize = 10;

/// One device to notify.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recipient {
    pub user_id: String,
    #[serde(skip)]
    pub token: String,
}

pub fn is_valid_token(token: &str) -> bool {
    token.chars().count() > MIN_TOKEN_EXCLUSIVE
}

/// Keep donors with a valid token, one recipient per distinct token,
/// in first-seen order.
pub fn unique_recipients(donors: Vec<DonorContact>) -> Vec<Recipient> {
    let mut seen = HashSet::new();
    let mut recipients = Vec::new();

    for donor in donors {
        let Some(token) = donor.fcm_token else {
            continue;
        };
        if !is_valid_token(&token) || !seen.insert(token.clone()) {
            continue;
        }
        recipients.push(Recipient {
            user_id: donor.user_id,
            token,
        });
    }

    recipients
}

/// Last six characters of a token, safe to log and return.
pub fn token_hint(token: &str) -> String {
    let tail: String = token
        .chars()
        .rev()
        .take(6)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("…{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_and_short_tokens_reduce_to_one_recipient() {
        let donors = vec![
            DonorContact::new("u1", Some("abc")),
            DonorContact::new("u2", Some("validtoken123")),
            DonorContact::new("u3", Some("validtoken123")),
            DonorContact::new("u4", Some("")),
        ];
        let recipients = unique_recipients(donors);
        assert_eq!(
            recipients,
            vec![Recipient {
                user_id: "u2".into(),
                token: "validtoken123".into()
            }]
        );
    }

    #[test]
    fn missing_tokens_skipped() {
        let donors = vec![
            DonorContact::new("u1", None),
            DonorContact::new("u2", Some("another-valid-token")),
        ];
        let recipients = unique_recipients(donors);
        assert_eq!(recipients.len(), 1);
        assert_eq!(recipients[0].user_id, "u2");
    }

    #[test]
    fn first_seen_order_preserved() {
        let donors = vec![
            DonorContact::new("u9", Some("zzzzzzzzzzzz")),
            DonorContact::new("u1", Some("aaaaaaaaaaaa")),
            DonorContact::new("u5", Some("zzzzzzzzzzzz")),
        ];
        let ids: Vec<_> = unique_recipients(donors).into_iter().map(|r| r.user_id).collect();
        assert_eq!(ids, vec!["u9", "u1"]);
    }

    #[test]
    fn token_length_boundary() {
        assert!(!is_valid_token("0123456789"));
        assert!(is_valid_token("0123456789a"));
    }

    #[test]
    fn hint_keeps_only_tail() {
        assert_eq!(token_hint("abcdefghijklmnop"), "…klmnop");
        assert_eq!(token_hint("xy"), "…xy");
    }

    #[test]
    fn token_not_serialized() {
        let recipient = Recipient {
            user_id: "u1".into(),
            token: "secret-device-token".into(),
        };
        let json = serde_json::to_string(&recipient).unwrap();
        assert!(!json.contains("secret-device-token"));
    }
}
