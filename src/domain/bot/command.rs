//! Button payloads from the chat front-end, parsed at the boundary.
//!
//! Wire form is `<action>:<arg>[:<arg>...]`, e.g. `rate_user:12:4242:5`.

use std::fmt;
use std::str::FromStr;

use crate::utils::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    JoinSlot { slot_id: i32 },
    LeaveSlot { slot_id: i32 },
    CreateSlot { movie_id: i32 },
    RateUser { room_id: i32, user_id: i64, score: i32 },
    DeleteSlot { slot_id: i32 },
    CompleteSlot { slot_id: i32 },
}

impl CallbackAction {
    pub fn name(&self) -> &'static str {
        match self {
            CallbackAction::JoinSlot { .. } => "join_slot",
            CallbackAction::LeaveSlot { .. } => "leave_slot",
            CallbackAction::CreateSlot { .. } => "create_slot",
            CallbackAction::RateUser { .. } => "rate_user",
            CallbackAction::DeleteSlot { .. } => "delete_slot",
            CallbackAction::CompleteSlot { .. } => "complete_slot",
        }
    }
}

impl FromStr for CallbackAction {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let mut parts = raw.trim().split(':');
        let action = parts.next().unwrap_or_default();
        let args: Vec<&str> = parts.collect();

        let parsed = match (action, args.as_slice()) {
            ("join_slot", [id]) => CallbackAction::JoinSlot {
                slot_id: arg(id, raw)?,
            },
            ("leave_slot", [id]) => CallbackAction::LeaveSlot {
                slot_id: arg(id, raw)?,
            },
            ("create_slot", [id]) => CallbackAction::CreateSlot {
                movie_id: arg(id, raw)?,
            },
            ("delete_slot", [id]) => CallbackAction::DeleteSlot {
                slot_id: arg(id, raw)?,
            },
            ("complete_slot", [id]) => CallbackAction::CompleteSlot {
                slot_id: arg(id, raw)?,
            },
            ("rate_user", [room, user, score]) => CallbackAction::RateUser {
                room_id: arg(room, raw)?,
                user_id: arg(user, raw)?,
                score: arg(score, raw)?,
            },
            _ => return Err(malformed(raw)),
        };

        Ok(parsed)
    }
}

impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackAction::JoinSlot { slot_id }
            | CallbackAction::LeaveSlot { slot_id }
            | CallbackAction::DeleteSlot { slot_id }
            | CallbackAction::CompleteSlot { slot_id } => write!(f, "{}:{}", self.name(), slot_id),
            CallbackAction::CreateSlot { movie_id } => write!(f, "{}:{}", self.name(), movie_id),
            CallbackAction::RateUser {
                room_id,
                user_id,
                score,
            } => write!(f, "{}:{}:{}:{}", self.name(), room_id, user_id, score),
        }
    }
}

fn arg<T: FromStr>(value: &str, raw: &str) -> Result<T, AppError> {
    value.parse().map_err(|_| malformed(raw))
}

fn malformed(raw: &str) -> AppError {
    AppError::BadRequest(format!("Unrecognized callback payload: '{}'", raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_parse_single_argument_actions() {
        assert_eq!(
            "join_slot:12".parse::<CallbackAction>().unwrap(),
            CallbackAction::JoinSlot { slot_id: 12 }
        );
        assert_eq!(
            "create_slot:3".parse::<CallbackAction>().unwrap(),
            CallbackAction::CreateSlot { movie_id: 3 }
        );
        assert_eq!(
            "complete_slot:9".parse::<CallbackAction>().unwrap(),
            CallbackAction::CompleteSlot { slot_id: 9 }
        );
    }

    #[test]
    fn should_parse_rate_user() {
        assert_eq!(
            "rate_user:5:123456789:4".parse::<CallbackAction>().unwrap(),
            CallbackAction::RateUser {
                room_id: 5,
                user_id: 123_456_789,
                score: 4
            }
        );
    }

    #[test]
    fn should_reject_malformed_payloads() {
        for raw in [
            "",
            "join_slot",
            "join_slot:",
            "join_slot:abc",
            "join_slot:1:2",
            "rate_user:1:2",
            "unknown:1",
        ] {
            let err = raw.parse::<CallbackAction>().unwrap_err();
            assert_eq!(err.error_code(), "COMMON400", "payload {:?}", raw);
        }
    }

    #[test]
    fn display_should_render_wire_form() {
        let actions = [
            CallbackAction::LeaveSlot { slot_id: 1 },
            CallbackAction::DeleteSlot { slot_id: 2 },
            CallbackAction::RateUser {
                room_id: 3,
                user_id: 44,
                score: 5,
            },
        ];
        let rendered: Vec<String> = actions.iter().map(ToString::to_string).collect();

        assert_eq!(rendered, ["leave_slot:1", "delete_slot:2", "rate_user:3:44:5"]);
        for (action, wire) in actions.iter().zip(&rendered) {
            assert_eq!(&wire.parse::<CallbackAction>().unwrap(), action);
        }
    }
}
