/// Persona and scope given to the completion service as the first turn.
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant for SoftSell, a platform that helps businesses sell unused software licenses. Answer questions about the license selling process, types of licenses accepted, payment methods, and other related inquiries. Keep responses concise and friendly.";

/// Opening bot message; mirrored as the seeded assistant turn.
pub const GREETING: &str = "Hi there! How can I help you today?";

/// Substituted when the service answers without usable content.
pub const FALLBACK_REPLY: &str = "I'm sorry, I couldn't process your request.";

/// Shown when the completion request fails.
pub const APOLOGY: &str =
    "I'm sorry, I encountered an error. Please try again later or contact support.";

pub const WIDGET_TITLE: &str = "SoftSell Support";

pub const INPUT_PLACEHOLDER: &str = "Type your message...";

/// Suggestions are offered only while the transcript is shorter than this.
pub const SUGGESTION_LIMIT: usize = 3;

pub fn default_suggested_questions() -> Vec<String> {
    [
        "How do I sell my license?",
        "What types of licenses do you accept?",
        "How long does the process take?",
        "How do I get paid?",
    ]
    .iter()
    .map(|q| q.to_string())
    .collect()
}
