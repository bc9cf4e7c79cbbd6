use serde::Deserialize;

/// Envelope every Bot API method responds with.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
    pub error_code: Option<u16>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMemberStatus {
    Creator,
    Administrator,
    Member,
    Restricted,
    Left,
    Kicked,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatMember {
    pub status: ChatMemberStatus,
    /// Only present for restricted members.
    #[serde(default)]
    pub is_member: Option<bool>,
}

impl ChatMember {
    /// Whether the user currently belongs to the chat.
    ///
    /// Restricted users still count when Telegram reports them as members.
    pub fn is_present(&self) -> bool {
        match self.status {
            ChatMemberStatus::Creator
            | ChatMemberStatus::Administrator
            | ChatMemberStatus::Member => true,
            ChatMemberStatus::Restricted => self.is_member.unwrap_or(false),
            ChatMemberStatus::Left | ChatMemberStatus::Kicked => false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SentMessage {
    pub message_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(json: &str) -> ChatMember {
        let response: ApiResponse<ChatMember> = serde_json::from_str(json).unwrap();
        response.result.unwrap()
    }

    #[test]
    fn test_regular_statuses() {
        assert!(member(r#"{"ok":true,"result":{"status":"creator"}}"#).is_present());
        assert!(member(r#"{"ok":true,"result":{"status":"administrator"}}"#).is_present());
        assert!(member(r#"{"ok":true,"result":{"status":"member"}}"#).is_present());
        assert!(!member(r#"{"ok":true,"result":{"status":"left"}}"#).is_present());
        assert!(!member(r#"{"ok":true,"result":{"status":"kicked"}}"#).is_present());
    }

    #[test]
    fn test_restricted_depends_on_is_member() {
        assert!(member(r#"{"ok":true,"result":{"status":"restricted","is_member":true}}"#)
            .is_present());
        assert!(!member(r#"{"ok":true,"result":{"status":"restricted","is_member":false}}"#)
            .is_present());
    }

    #[test]
    fn test_error_envelope() {
        let response: ApiResponse<ChatMember> = serde_json::from_str(
            r#"{"ok":false,"error_code":403,"description":"Forbidden: bot was blocked by the user"}"#,
        )
        .unwrap();
        assert!(!response.ok);
        assert_eq!(response.error_code, Some(403));
        assert!(response.result.is_none());
    }
}
