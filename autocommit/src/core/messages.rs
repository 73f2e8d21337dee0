//! Commit message pool editing rules.
//!
//! Positions are 1-based, matching the numbered list shown to users.

use thiserror::Error;

/// Messages used when the configuration has none of its own.
pub const DEFAULT_MESSAGES: [&str; 10] = [
    "Update documentation",
    "Fix typo",
    "Update README",
    "Add new feature",
    "Improve performance",
    "Fix bug",
    "Clean up code",
    "Refactor code",
    "Update dependencies",
    "Add tests",
];

pub fn default_messages() -> Vec<String> {
    DEFAULT_MESSAGES.iter().map(|m| m.to_string()).collect()
}

/// Rejected edit to the message pool.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    #[error("cannot remove the last remaining commit message")]
    LastMessage,
    #[error("message position {position} out of range (1..={len})")]
    OutOfRange { position: usize, len: usize },
    #[error("commit message must not be empty")]
    Empty,
}

fn normalized(text: &str) -> Result<String, MessageError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(MessageError::Empty);
    }
    Ok(text.to_string())
}

fn index_of(position: usize, len: usize) -> Result<usize, MessageError> {
    if position == 0 || position > len {
        return Err(MessageError::OutOfRange { position, len });
    }
    Ok(position - 1)
}

pub fn add_message(messages: &mut Vec<String>, text: &str) -> Result<(), MessageError> {
    messages.push(normalized(text)?);
    Ok(())
}

/// Replace the message at `position`, returning the previous text.
pub fn edit_message(
    messages: &mut [String],
    position: usize,
    text: &str,
) -> Result<String, MessageError> {
    let idx = index_of(position, messages.len())?;
    let text = normalized(text)?;
    Ok(std::mem::replace(&mut messages[idx], text))
}

/// Remove the message at `position`. The pool never drops below one entry.
pub fn remove_message(messages: &mut Vec<String>, position: usize) -> Result<String, MessageError> {
    let idx = index_of(position, messages.len())?;
    if messages.len() <= 1 {
        return Err(MessageError::LastMessage);
    }
    Ok(messages.remove(idx))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn defaults_are_non_empty() {
        let defaults = default_messages();
        assert_eq!(defaults.len(), 10);
        assert!(defaults.contains(&"Update documentation".to_string()));
    }

    #[test]
    fn add_trims_and_rejects_blank() {
        let mut messages = pool(&["a"]);
        add_message(&mut messages, "  b  ").expect("add");
        assert_eq!(messages, pool(&["a", "b"]));
        assert_eq!(add_message(&mut messages, " "), Err(MessageError::Empty));
    }

    #[test]
    fn edit_replaces_by_position() {
        let mut messages = pool(&["a", "b"]);
        let old = edit_message(&mut messages, 2, "c").expect("edit");
        assert_eq!(old, "b");
        assert_eq!(messages, pool(&["a", "c"]));
        assert_eq!(
            edit_message(&mut messages, 3, "d"),
            Err(MessageError::OutOfRange {
                position: 3,
                len: 2
            })
        );
    }

    #[test]
    fn remove_never_empties_the_pool() {
        let mut messages = pool(&["a", "b"]);
        assert_eq!(remove_message(&mut messages, 1).expect("remove"), "a");
        assert_eq!(
            remove_message(&mut messages, 1),
            Err(MessageError::LastMessage)
        );
        assert_eq!(messages, pool(&["b"]));
    }

    #[test]
    fn position_zero_is_out_of_range() {
        let mut messages = pool(&["a", "b"]);
        assert!(matches!(
            remove_message(&mut messages, 0),
            Err(MessageError::OutOfRange { position: 0, .. })
        ));
    }
}
