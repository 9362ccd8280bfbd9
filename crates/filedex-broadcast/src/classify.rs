//! Classifies a platform send failure by substring match against its
//! error text, the same coarse classification the broadcast loop uses to
//! decide whether a principal should be dropped from future broadcasts.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    Blocked,
    Deleted,
    Failed,
}

pub fn classify_failure(message: &str) -> FailureClass {
    let lower = message.to_ascii_lowercase();
    if lower.contains("deactivated") || lower.contains("user is deleted") || lower.contains("chat not found") {
        FailureClass::Deleted
    } else if lower.contains("blocked") || lower.contains("bot was blocked") {
        FailureClass::Blocked
    } else {
        FailureClass::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deactivated_account_classifies_as_deleted() {
        assert_eq!(
            classify_failure("Forbidden: user is deactivated"),
            FailureClass::Deleted
        );
    }

    #[test]
    fn blocked_bot_classifies_as_blocked() {
        assert_eq!(
            classify_failure("Forbidden: bot was blocked by the user"),
            FailureClass::Blocked
        );
    }

    #[test]
    fn unrecognized_error_classifies_as_failed() {
        assert_eq!(classify_failure("Internal server error"), FailureClass::Failed);
    }

    #[test]
    fn chat_not_found_classifies_as_deleted() {
        assert_eq!(classify_failure("Bad Request: chat not found"), FailureClass::Deleted);
    }
}
