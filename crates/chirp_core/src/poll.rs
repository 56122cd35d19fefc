//! crates/chirp_core/src/poll.rs
//!
//! The per-(user, poll) vote state machine.
//!
//! ```text
//! NoVote        --respond(x)--> Voted(x)
//! Voted(x)      --respond(x)--> NoVote      (same option toggles off)
//! Voted(x)      --respond(y)--> Voted(y)    (one atomic move)
//! Voted(x)      --retract-----> NoVote
//! ```
//!
//! Every transition requires the poll to still be open.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Poll, PollResponse};
use crate::error::{ServiceError, ServiceResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteState {
    NoVote,
    Voted { response_id: Uuid, option_id: Uuid },
}

impl From<Option<&PollResponse>> for VoteState {
    fn from(response: Option<&PollResponse>) -> Self {
        match response {
            Some(r) => VoteState::Voted {
                response_id: r.id,
                option_id: r.poll_option_id,
            },
            None => VoteState::NoVote,
        }
    }
}

/// The single storage mutation a transition needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteTransition {
    Insert { option_id: Uuid },
    Delete { response_id: Uuid },
    Move { response_id: Uuid, option_id: Uuid },
}

fn ensure_open(poll: &Poll, now: DateTime<Utc>) -> ServiceResult<()> {
    if poll.is_open_at(now) {
        Ok(())
    } else {
        Err(ServiceError::bad_request("Poll has expired"))
    }
}

/// The user clicked `option_id`.
pub fn respond(
    poll: &Poll,
    state: VoteState,
    option_id: Uuid,
    now: DateTime<Utc>,
) -> ServiceResult<VoteTransition> {
    ensure_open(poll, now)?;
    Ok(match state {
        VoteState::NoVote => VoteTransition::Insert { option_id },
        VoteState::Voted {
            response_id,
            option_id: current,
        } if current == option_id => VoteTransition::Delete { response_id },
        VoteState::Voted { response_id, .. } => VoteTransition::Move {
            response_id,
            option_id,
        },
    })
}

/// The user withdrew their vote explicitly.
pub fn retract(poll: &Poll, state: VoteState, now: DateTime<Utc>) -> ServiceResult<VoteTransition> {
    let VoteState::Voted { response_id, .. } = state else {
        return Err(ServiceError::not_found(format!(
            "No poll response found for poll ID {}",
            poll.id
        )));
    };
    ensure_open(poll, now)?;
    Ok(VoteTransition::Delete { response_id })
}
