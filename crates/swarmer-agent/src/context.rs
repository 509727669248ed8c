use swarmer_core::{Message, Role};

/// One agent's conversation with the model: a system prompt plus a bounded
/// history, oldest messages dropped first.
#[derive(Debug, Clone)]
pub struct ContextWindow {
    messages: Vec<Message>,
    system_prompt: Option<String>,
    max_messages: usize,
}

impl ContextWindow {
    pub fn new(max_messages: usize) -> Self {
        Self {
            messages: Vec::new(),
            system_prompt: None,
            max_messages: max_messages.max(1),
        }
    }

    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        self.system_prompt = Some(prompt.into());
    }

    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
        self.truncate();
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    fn truncate(&mut self) {
        if self.messages.len() > self.max_messages {
            let excess = self.messages.len() - self.max_messages;
            self.messages.drain(..excess);
        }
        // Providers expect the history to open with a user turn.
        while self
            .messages
            .first()
            .is_some_and(|m| m.role != Role::User)
        {
            self.messages.remove(0);
        }
    }

    /// Rough token estimation (4 chars ≈ 1 token).
    pub fn estimated_tokens(&self) -> usize {
        let sys_tokens = self.system_prompt.as_ref().map_or(0, |s| s.len() / 4);
        let msg_tokens: usize = self.messages.iter().map(|m| m.content.len() / 4).sum();
        sys_tokens + msg_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_is_bounded() {
        let mut window = ContextWindow::new(3);
        for i in 0..5 {
            window.push(Message::user(format!("m{i}"), "a"));
        }
        let contents: Vec<&str> = window.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m2", "m3", "m4"]);
    }

    #[test]
    fn test_truncation_keeps_user_first() {
        let mut window = ContextWindow::new(2);
        window.push(Message::user("q1", "a"));
        window.push(Message::assistant("r1", "a"));
        window.push(Message::user("q2", "a"));
        assert_eq!(window.messages().len(), 1);
        assert_eq!(window.messages()[0].content, "q2");
    }

    #[test]
    fn test_estimated_tokens() {
        let mut window = ContextWindow::new(10);
        window.set_system_prompt("12345678");
        window.push(Message::user("1234", "a"));
        assert_eq!(window.estimated_tokens(), 3);
        assert_eq!(window.system_prompt(), Some("12345678"));
    }
}
