use serde::{Deserialize, Serialize};

use crate::common::MembershipFilter;

/// Who receives a broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Audience {
    Members,
    NonMembers,
    All,
}

impl Audience {
    /// Choices in the order they are offered to the admin
    pub const CHOICES: [Audience; 3] = [Audience::Members, Audience::NonMembers, Audience::All];

    /// Key carried by the button that selects this audience
    pub fn callback_key(self) -> &'static str {
        match self {
            Audience::Members => "target_chat_members",
            Audience::NonMembers => "target_not_chat_members",
            Audience::All => "target_all",
        }
    }

    /// Inverse of [`Audience::callback_key`]; unknown keys select nothing.
    pub fn from_callback_key(key: &str) -> Option<Self> {
        Self::CHOICES
            .into_iter()
            .find(|audience| audience.callback_key() == key)
    }

    pub fn label(self) -> &'static str {
        match self {
            Audience::Members => "Group members",
            Audience::NonMembers => "Non-members",
            Audience::All => "All users",
        }
    }

    pub fn filter(self) -> MembershipFilter {
        match self {
            Audience::Members => MembershipFilter::Members,
            Audience::NonMembers => MembershipFilter::NonMembers,
            Audience::All => MembershipFilter::All,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_keys_round_trip() {
        for audience in Audience::CHOICES {
            assert_eq!(
                Audience::from_callback_key(audience.callback_key()),
                Some(audience)
            );
        }
    }

    #[test]
    fn test_misspelled_key_does_not_fall_through_to_all() {
        assert_eq!(Audience::from_callback_key("target_not_chat_memebers"), None);
        assert_eq!(Audience::from_callback_key("target_not"), None);
        assert_eq!(Audience::from_callback_key(""), None);
    }

    #[test]
    fn test_non_members_filter() {
        assert_eq!(Audience::NonMembers.filter(), MembershipFilter::NonMembers);
    }
}
