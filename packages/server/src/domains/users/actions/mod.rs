//! User domain actions - business logic functions
//!
//! Actions take `ServerDeps` and are called by request handlers; none of them
//! holds state between calls.

mod grant;
mod privileges;
mod roster;
mod touch;
mod traffic;

pub use grant::{grant_profile, GrantOutcome};
pub use privileges::sync_admins;
pub use roster::{member_roster, refresh_member_flags};
pub use touch::{diff_profile, touch_user, ObservedProfile, TouchOutcome};
pub use traffic::user_traffic;
