//! Admin broadcast conversation - pure decision logic.
//!
//! `decide` takes the current state and an admin input and returns the next
//! state plus the command to execute. No IO happens here; the conversation
//! layer owns the sessions and runs the commands.
//!
//! ```text
//! Idle ──select──► AwaitingAudience ──choose(p)──► AwaitingMessage(p) ──text──► Idle (dispatch)
//!   ▲                      │                               │
//!   └───────── cancel ─────┴───────────── cancel ──────────┘
//! ```

use crate::domains::broadcast::Audience;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminState {
    Idle,
    AwaitingAudience,
    AwaitingMessage(Audience),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminInput {
    SelectBroadcast,
    ChooseAudience(Audience),
    SubmitText(String),
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    PresentAudiences,
    PromptForMessage(Audience),
    Dispatch { audience: Audience, body: String },
    RejectEmptyMessage,
    Discard,
    /// Input does not belong to a broadcast conversation
    Ignore,
}

pub fn decide(state: AdminState, input: &AdminInput) -> (AdminState, AdminCommand) {
    match (state, input) {
        // Starting over is always allowed; there is only ever one session
        (_, AdminInput::SelectBroadcast) => {
            (AdminState::AwaitingAudience, AdminCommand::PresentAudiences)
        }

        (AdminState::Idle, AdminInput::ChooseAudience(_)) => {
            (AdminState::Idle, AdminCommand::Ignore)
        }
        (_, AdminInput::ChooseAudience(audience)) => (
            AdminState::AwaitingMessage(*audience),
            AdminCommand::PromptForMessage(*audience),
        ),

        (AdminState::AwaitingMessage(audience), AdminInput::SubmitText(body)) => {
            if body.trim().is_empty() {
                (
                    AdminState::AwaitingMessage(audience),
                    AdminCommand::RejectEmptyMessage,
                )
            } else {
                (
                    AdminState::Idle,
                    AdminCommand::Dispatch {
                        audience,
                        body: body.clone(),
                    },
                )
            }
        }
        // Stray text is never broadcast content
        (state, AdminInput::SubmitText(_)) => (state, AdminCommand::Ignore),

        (AdminState::Idle, AdminInput::Cancel) => (AdminState::Idle, AdminCommand::Ignore),
        (_, AdminInput::Cancel) => (AdminState::Idle, AdminCommand::Discard),
    }
}
