//! Character-based token estimation.
//!
//! No tokenizer is bundled; one token is taken as four characters, which is
//! close enough for quota pre-flight checks.

use bentofolio_core::Message;

pub const CHARS_PER_TOKEN: usize = 4;

/// Fixed per-message cost for role and framing.
pub const MESSAGE_OVERHEAD_TOKENS: u32 = 10;

/// `ceil(chars / 4)`; empty text costs nothing.
pub fn estimate_tokens(text: &str) -> u32 {
    let chars = text.chars().count();
    chars.div_ceil(CHARS_PER_TOKEN) as u32
}

/// Overhead plus content, tool call names and arguments, and the tool call id.
pub fn count_message_tokens(message: &Message) -> u32 {
    let mut tokens = MESSAGE_OVERHEAD_TOKENS + estimate_tokens(&message.content);
    for call in &message.tool_calls {
        tokens += estimate_tokens(&call.name) + estimate_tokens(&call.arguments);
    }
    if let Some(id) = &message.tool_call_id {
        tokens += estimate_tokens(id);
    }
    tokens
}

pub fn count_conversation_tokens(messages: &[Message]) -> u32 {
    messages.iter().map(count_message_tokens).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use bentofolio_core::MessageToolCall;

    #[test]
    fn estimate_rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abc"), 1);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }

    #[test]
    fn message_counts_overhead_and_tool_parts() {
        assert_eq!(count_message_tokens(&Message::user("")), 10);

        let call = MessageToolCall {
            id: "call_1".into(),
            name: "add_card".into(),
            arguments: r#"{"sectionIndex":0}"#.into(),
        };
        let assistant = Message::assistant("").with_tool_calls(vec![call]);
        // 10 + "add_card" (2) + 18-char arguments (5)
        assert_eq!(count_message_tokens(&assistant), 17);

        let tool = Message::tool_result("call_1", "add_card", "ok");
        // 10 + "ok" (1) + "call_1" (2)
        assert_eq!(count_message_tokens(&tool), 13);
    }

    #[test]
    fn conversation_is_sum_of_messages() {
        let messages = vec![Message::system("abcd"), Message::user("abcdefgh")];
        assert_eq!(count_conversation_tokens(&messages), 11 + 12);
    }
}
