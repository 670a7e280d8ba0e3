//! Conversation state for the chat extension.
//!
//! A [`ChatSession`] is stored per browser session and holds the active model
//! plus the rolling history. The first history entry, once seeded, is the
//! system prompt; it primes the model but is never rendered or replayed.

use serde::{Deserialize, Serialize};

/// Number of history entries shown on the page.
pub const RENDER_WINDOW: usize = 10;

pub const SYSTEM_PROMPT: &str = "Please provide your response in plain text using only ASCII characters. \n\
Never use any special or esoteric characters that might not be supported by older systems.\n\
Your responses will be presented to the user within the body of an html document. Be aware that any html tags you respond with will be interpreted and rendered as html. \n\
Therefore, when discussing an html tag, do not wrap it in <>, as it will be rendered as html. Instead, wrap the name of the tag in <b> tags to emphasize it, for example \"the <b>a</b> tag\". \n\
You do not need to provide a <body> tag. \n\
When responding with a list, ALWAYS format it using <ol> or <ul> with individual list items wrapped in <li> tags. \n\
When responding with a link, use the <a> tag.\n\
When responding with code or other formatted text (including prose or poetry), always insert <pre></pre> tags with <code></code> tags nested inside (which contain the formatted content).\n\
If the user asks you to respond 'in a code block', this is what they mean.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn model(content: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationHistory {
    messages: Vec<Message>,
}

impl ConversationHistory {
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Seed the system prompt into an empty history. Returns true if seeded.
    pub fn seed_system_prompt(&mut self, prompt: &str) -> bool {
        if !self.messages.is_empty() {
            return false;
        }
        self.messages.push(Message::system(prompt));
        true
    }

    /// The seeded system prompt, if any.
    pub fn system_prompt(&self) -> Option<&str> {
        self.messages
            .first()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
    }

    /// Prior turns to replay to the model: everything after the system entry.
    pub fn replay(&self) -> &[Message] {
        match self.messages.first() {
            Some(first) if first.role == Role::System => &self.messages[1..],
            _ => &self.messages,
        }
    }

    /// Append one user turn and the model's answer (or the error shown in its place).
    pub fn record_exchange(&mut self, user_input: &str, model_reply: String) {
        self.messages.push(Message::user(user_input));
        self.messages.push(Message::model(model_reply));
    }

    /// Render the last [`RENDER_WINDOW`] entries newest-first as an HTML fragment.
    /// Content is emitted as-is: replies are expected to carry HTML.
    pub fn render_recent(&self) -> String {
        let start = self.messages.len().saturating_sub(RENDER_WINDOW);
        self.messages[start..]
            .iter()
            .rev()
            .filter_map(|message| {
                let label = match message.role {
                    Role::User => "User",
                    Role::Model => "Gemini",
                    Role::System => return None,
                };
                Some(format!("<b>{}:</b> {}<br>", label, message.content))
            })
            .collect()
    }
}

/// Per-session chat state: active model plus history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSession {
    pub model: String,
    pub history: ConversationHistory,
}

impl ChatSession {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            history: ConversationHistory::default(),
        }
    }

    /// Adopt `model`. A different model drops the history, since it was shaped for
    /// the previous one. Returns true if the model changed.
    pub fn select_model(&mut self, model: &str) -> bool {
        if self.model == model {
            return false;
        }
        self.model = model.to_string();
        self.history.clear();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_with_exchanges(n: usize) -> ChatSession {
        let mut session = ChatSession::new("gemini-1.5-pro-latest");
        session.history.seed_system_prompt(SYSTEM_PROMPT);
        for i in 0..n {
            session
                .history
                .record_exchange(&format!("question {i}"), format!("answer {i}"));
        }
        session
    }

    #[test]
    fn seeding_only_happens_once() {
        let mut history = ConversationHistory::default();
        assert!(history.seed_system_prompt("prompt"));
        assert!(!history.seed_system_prompt("prompt"));
        assert_eq!(history.len(), 1);
        assert_eq!(history.system_prompt(), Some("prompt"));
    }

    #[test]
    fn replay_skips_system_entry() {
        let session = session_with_exchanges(2);
        let replay = session.history.replay();
        assert_eq!(replay.len(), 4);
        assert!(replay.iter().all(|m| m.role != Role::System));
        assert_eq!(replay[0], Message::user("question 0"));
    }

    #[test]
    fn render_is_newest_first_and_hides_system() {
        let session = session_with_exchanges(1);
        assert_eq!(
            session.history.render_recent(),
            "<b>Gemini:</b> answer 0<br><b>User:</b> question 0<br>"
        );
    }

    #[test]
    fn render_caps_at_window() {
        let session = session_with_exchanges(8);
        let rendered = session.history.render_recent();
        assert_eq!(rendered.matches("<br>").count(), RENDER_WINDOW);
        assert!(rendered.starts_with("<b>Gemini:</b> answer 7<br>"));
        assert!(!rendered.contains("question 2<br>"));
        assert!(rendered.contains("question 3<br>"));
    }

    #[test]
    fn render_window_counts_system_entry() {
        // 1 system + 10 turns = 11 entries; the window of 10 drops the system entry.
        let session = session_with_exchanges(5);
        assert_eq!(session.history.render_recent().matches("<br>").count(), 10);

        // 1 system + 8 turns: the system entry sits inside the window and is skipped.
        let session = session_with_exchanges(4);
        assert_eq!(session.history.render_recent().matches("<br>").count(), 8);
    }

    #[test]
    fn switching_model_clears_history() {
        let mut session = session_with_exchanges(2);
        assert!(!session.select_model("gemini-1.5-pro-latest"));
        assert_eq!(session.history.len(), 5);

        assert!(session.select_model("gemini-1.5-flash-8b"));
        assert!(session.history.is_empty());
        assert_eq!(session.model, "gemini-1.5-flash-8b");
    }
}
