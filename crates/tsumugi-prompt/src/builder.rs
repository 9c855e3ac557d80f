use std::fmt::Write;

use tsumugi_core::{ContextMessage, InboundMessage, PromptConfig};

pub const CONTEXT_HEADER: &str = "Previous messages in this conversation:";
pub const CURRENT_HEADER: &str = "Current message:";
pub const RESPONSE_CUE: &str = "Response:";

/// Renders the prompt text sent to the model. Pure: same input, same output.
pub struct PromptBuilder;

impl PromptBuilder {
    pub fn build(target: &InboundMessage, context: &[ContextMessage], config: &PromptConfig) -> String {
        let mut prompt = String::new();

        push_line(&mut prompt, config.persona());
        push_line(&mut prompt, config.style());
        push_line(&mut prompt, config.constraints());
        push_line(&mut prompt, "");

        if !context.is_empty() {
            push_line(&mut prompt, CONTEXT_HEADER);
            for msg in context {
                if config.include_usernames {
                    let _ = write!(prompt, "{}: ", msg.author_name);
                }
                prompt.push_str(&msg.content);
                if config.include_timestamps {
                    let _ = write!(prompt, " [{}]", msg.timestamp.format("%H:%M"));
                }
                prompt.push('\n');
            }
            push_line(&mut prompt, "");
        }

        push_line(&mut prompt, CURRENT_HEADER);
        push_line(&mut prompt, &format!("\"{}\"", target.content));
        push_line(&mut prompt, "");
        push_line(&mut prompt, RESPONSE_CUE);

        prompt
    }
}

fn push_line(prompt: &mut String, line: &str) {
    prompt.push_str(line);
    prompt.push('\n');
}
