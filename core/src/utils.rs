//! Utility functions and helpers

/// String utilities
pub mod string {
    /// Maximum channel name length accepted by most networks
    pub const MAX_CHANNEL_NAME_LENGTH: usize = 50;

    /// Check if a string is a valid IRC channel name
    pub fn is_valid_channel_name(name: &str) -> bool {
        let first_char = match name.chars().next() {
            Some(c) => c,
            None => return false,
        };

        if !"#&+!".contains(first_char) || name.len() > MAX_CHANNEL_NAME_LENGTH {
            return false;
        }

        // Channel name should not contain spaces or control characters
        name.chars()
            .all(|c| c.is_ascii() && !c.is_control() && c != ' ' && c != ',' && c != ':')
    }

    /// Check if a string is a valid IRC nickname
    pub fn is_valid_nickname(nick: &str, max_length: usize) -> bool {
        if nick.is_empty() || nick.len() > max_length {
            return false;
        }

        let mut chars = nick.chars();

        // First character must be letter or special character
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || "[]\\`_^{|}~".contains(c) => {}
            _ => return false,
        }

        // Remaining characters may also be digits or '-'
        chars.all(|c| c.is_ascii_alphanumeric() || "[]\\`_^{|}~-".contains(c))
    }
}

#[cfg(test)]
mod tests {
    use super::string::*;

    #[test]
    fn test_channel_names() {
        assert!(is_valid_channel_name("#toxirc"));
        assert!(is_valid_channel_name("&local"));
        assert!(!is_valid_channel_name("toxirc"));
        assert!(!is_valid_channel_name(""));
        assert!(!is_valid_channel_name("#tox irc"));
        assert!(!is_valid_channel_name("#a,#b"));
        assert!(!is_valid_channel_name("#bell\u{7}"));
        assert!(!is_valid_channel_name(&format!("#{}", "a".repeat(50))));
    }

    #[test]
    fn test_nicknames() {
        assert!(is_valid_nickname("toxirc", 30));
        assert!(is_valid_nickname("[bot]-1", 30));
        assert!(!is_valid_nickname("", 30));
        assert!(!is_valid_nickname("1bot", 30));
        assert!(!is_valid_nickname("tox irc", 30));
        assert!(!is_valid_nickname("toolongnick", 9));
    }
}
