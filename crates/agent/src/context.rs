//! Context optimization: shrink a conversation before it is sent to the model.
//!
//! Two passes, applied in order:
//! 1. **Compression** strips redundant whitespace and filler phrases from
//!    user messages.
//! 2. **Trimming** drops the oldest conversation messages until the estimate
//!    fits the budget. System messages are always kept, and so are the
//!    newest [`MIN_CONVERSATION_MESSAGES`] messages.
//!
//! When trimming removes anything, a short system hint records how many turns
//! were dropped so the model knows the history is partial.

use bentofolio_core::message::{Message, Role};
use bentofolio_telemetry::count_conversation_tokens;
use serde::Serialize;

pub const DEFAULT_MAX_CONTEXT_TOKENS: u32 = 4000;

/// Conversation messages that survive trimming regardless of the budget.
pub const MIN_CONVERSATION_MESSAGES: usize = 2;

const FILLERS: &[&str] = &["please", "thanks", "kindly", "could you", "would you", "can you"];

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Remove filler phrases (whole words only, any case) and collapse whitespace.
pub fn compress_text(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut out = String::with_capacity(collapsed.len());
    let mut rest = collapsed.as_str();
    let mut after_word = false;

    'scan: while let Some(c) = rest.chars().next() {
        if !after_word {
            for filler in FILLERS {
                let Some(head) = rest.get(..filler.len()) else {
                    continue;
                };
                let tail = &rest[filler.len()..];
                if head.eq_ignore_ascii_case(filler) && !tail.chars().next().is_some_and(is_word_char) {
                    rest = tail;
                    after_word = true;
                    continue 'scan;
                }
            }
        }
        out.push(c);
        after_word = is_word_char(c);
        rest = &rest[c.len_utf8()..];
    }

    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Compress every user message. Returns the new list and the tokens saved.
pub fn compress_conversation(messages: &[Message]) -> (Vec<Message>, u32) {
    let before = count_conversation_tokens(messages);
    let compressed: Vec<Message> = messages
        .iter()
        .map(|m| {
            if m.role == Role::User && !m.content.is_empty() {
                Message { content: compress_text(&m.content), ..m.clone() }
            } else {
                m.clone()
            }
        })
        .collect();
    let after = count_conversation_tokens(&compressed);
    (compressed, before.saturating_sub(after))
}

/// Outcome of [`trim_history`].
#[derive(Debug, Clone)]
pub struct Trimmed {
    pub messages: Vec<Message>,
    pub trimmed: bool,
    pub tokens_removed: u32,
    /// The conversation messages that were dropped, oldest first.
    pub dropped: Vec<Message>,
}

/// Drop the oldest conversation messages until the estimate fits `max_tokens`.
///
/// System messages stay in front. At least `min_messages` conversation
/// messages are kept even if that leaves the list over budget. Tool results
/// whose assistant message was dropped are dropped with it.
pub fn trim_history(messages: &[Message], max_tokens: u32, min_messages: usize) -> Trimmed {
    let unchanged = || Trimmed {
        messages: messages.to_vec(),
        trimmed: false,
        tokens_removed: 0,
        dropped: Vec::new(),
    };

    let before = count_conversation_tokens(messages);
    if before <= max_tokens {
        return unchanged();
    }

    let (system, conversation): (Vec<Message>, Vec<Message>) =
        messages.iter().cloned().partition(|m| m.role == Role::System);
    if conversation.len() <= min_messages {
        return unchanged();
    }

    let system_tokens = count_conversation_tokens(&system);
    let mut start = 0;
    let last_start = conversation.len() - min_messages;
    while start < last_start && system_tokens + count_conversation_tokens(&conversation[start..]) > max_tokens {
        start += 1;
    }
    while start < last_start && conversation[start].role == Role::Tool {
        start += 1;
    }
    if start == 0 {
        return unchanged();
    }

    let dropped = conversation[..start].to_vec();
    let mut kept = system;
    kept.extend_from_slice(&conversation[start..]);
    let after = count_conversation_tokens(&kept);
    Trimmed {
        messages: kept,
        trimmed: true,
        tokens_removed: before.saturating_sub(after),
        dropped,
    }
}

/// A one-line note describing dropped history, or `None` if nothing
/// conversational was dropped.
pub fn summary_hint(dropped: &[Message]) -> Option<String> {
    let users = dropped.iter().filter(|m| m.role == Role::User).count();
    let assistants = dropped.iter().filter(|m| m.role == Role::Assistant).count();
    if users + assistants == 0 {
        return None;
    }
    Some(format!(
        "[Earlier in conversation ({users} user + {assistants} assistant messages): context trimmed to fit token limits]"
    ))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationStats {
    pub original_tokens: u32,
    pub final_tokens: u32,
    pub tokens_removed: u32,
    /// Passes that changed something: `compression`, `trimming`.
    pub optimizations: Vec<&'static str>,
    pub percent_reduction: u32,
}

/// Compress, then trim to `max_tokens`.
pub fn optimize_context(messages: &[Message], max_tokens: u32) -> (Vec<Message>, OptimizationStats) {
    let mut stats = OptimizationStats {
        original_tokens: count_conversation_tokens(messages),
        ..Default::default()
    };

    let (mut working, saved) = compress_conversation(messages);
    if saved > 0 {
        stats.optimizations.push("compression");
    }

    let trimmed = trim_history(&working, max_tokens, MIN_CONVERSATION_MESSAGES);
    if trimmed.trimmed {
        stats.optimizations.push("trimming");
        working = trimmed.messages;
        if let Some(hint) = summary_hint(&trimmed.dropped) {
            let at = working.iter().take_while(|m| m.role == Role::System).count();
            working.insert(at, Message::system(hint));
        }
    }

    stats.final_tokens = count_conversation_tokens(&working);
    stats.tokens_removed = stats.original_tokens.saturating_sub(stats.final_tokens);
    stats.percent_reduction = if stats.original_tokens == 0 {
        0
    } else {
        ((stats.tokens_removed as f64 / stats.original_tokens as f64) * 100.0).round() as u32
    };
    (working, stats)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetFit {
    pub fits: bool,
    pub shortfall: u32,
    pub input_tokens: u32,
    pub estimated_output_tokens: u32,
}

/// Would these messages plus a reply of `estimated_output` tokens fit?
pub fn will_fit_budget(messages: &[Message], estimated_output: u32, max_tokens: u32) -> BudgetFit {
    let input_tokens = count_conversation_tokens(messages);
    let needed = input_tokens + estimated_output;
    BudgetFit {
        fits: needed <= max_tokens,
        shortfall: needed.saturating_sub(max_tokens),
        input_tokens,
        estimated_output_tokens: estimated_output,
    }
}
