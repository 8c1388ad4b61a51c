//! Prompt templates for the LLM service.
//!
//! All text sent to the generation runtime is assembled here, so the
//! wording lives in one place and the builders stay trivially testable.

use crate::ollama::ChatMessage;

const SYSTEM_PROMPT: &str =
    "You are a helpful assistant for a personal knowledge management system. \
     Be concise and helpful.";

/// At most this many context items are embedded into the chat prompt;
/// anything beyond is informational only.
const MAX_CONTEXT_ITEMS: usize = 3;

/// Build the message list for a chat completion: system prompt, an
/// optional context block holding the first few context items, then
/// the user message.
pub fn build_chat_messages(message: &str, context: &[String]) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::system(SYSTEM_PROMPT)];

    if !context.is_empty() {
        let context_text = context
            .iter()
            .take(MAX_CONTEXT_ITEMS)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n");
        messages.push(ChatMessage::system(format!(
            "Context from documents:\n{}",
            context_text
        )));
    }

    messages.push(ChatMessage::user(message));
    messages
}

/// Build the tool-selection prompt embedding the user question and the
/// tool catalogue. The model is asked for a bare JSON list; the caller
/// scans the raw response for the first array literal.
pub fn build_tool_selection_prompt(question: &str) -> String {
    format!(
        "Analyze this user question and determine which GitHub data sources would help answer it.\n\
         \n\
         User question: {question}\n\
         \n\
         Available GitHub tools:\n\
         - github_repos: Search or list the user's GitHub repositories\n\
         - github_code: Search for code examples in the user's repositories\n\
         - github_issues: Get issues/bugs from the user's repositories\n\
         - github_commits: Get recent commits from repositories\n\
         - none: GitHub data not needed\n\
         \n\
         Return ONLY a JSON list of needed tools. Examples:\n\
         - [\"github_repos\"]\n\
         - [\"github_code\"]\n\
         - [\"github_repos\", \"github_issues\"]\n\
         - []\n\
         \n\
         Consider the question needs GitHub data if it mentions:\n\
         - \"my projects\", \"my repos\", \"my code\", \"my repositories\"\n\
         - \"what have I built\", \"what am I working on\"\n\
         - \"my issues\", \"my bugs\", \"my commits\"\n\
         - \"code examples\", \"show me code\"\n\
         \n\
         JSON list:"
    )
}

/// Build the entity extraction prompt. The model is asked for a single
/// JSON object matching [`crate::models::EntityExtraction`].
pub fn build_extraction_prompt(text: &str) -> String {
    format!(
        "Extract key information from this text and return ONLY a JSON object:\n\
         \n\
         {{\n\
           \"people\": [\"list of people mentioned\"],\n\
           \"organizations\": [\"list of companies/organizations\"],\n\
           \"concepts\": [\"key topics or concepts\"],\n\
           \"summary\": \"brief summary in one sentence\"\n\
         }}\n\
         \n\
         Text: {text}\n\
         \n\
         JSON:"
    )
}

/// Build the task extraction prompt. The model is asked for a single
/// JSON object matching [`crate::models::TaskExtraction`].
pub fn build_task_extraction_prompt(text: &str) -> String {
    format!(
        "Extract actionable tasks and TODOs from this text.\n\
         Return ONLY a JSON object with this structure:\n\
         \n\
         {{\n\
           \"tasks\": [\n\
             {{\n\
               \"task\": \"specific action to take\",\n\
               \"priority\": \"high/medium/low\",\n\
               \"category\": \"category name\",\n\
               \"deadline\": null,\n\
               \"estimated_hours\": 1\n\
             }}\n\
           ],\n\
           \"estimated_time\": \"total estimated time\"\n\
         }}\n\
         \n\
         Text: {text}\n\
         \n\
         JSON:"
    )
}

/// Build the summarization prompt.
pub fn build_summarization_prompt(text: &str, max_length: usize) -> String {
    format!(
        "Summarize this text in about {max_length} characters. \
         Be concise and capture the main points:\n\
         \n\
         Text: {text}\n\
         \n\
         Summary:"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_messages_without_context() {
        let messages = build_chat_messages("hello", &[]);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].role, "user");
        assert_eq!(messages[1].content, "hello");
    }

    #[test]
    fn chat_messages_embed_at_most_three_context_items() {
        let context: Vec<String> = (1..=5).map(|i| format!("doc {}", i)).collect();
        let messages = build_chat_messages("q", &context);

        assert_eq!(messages.len(), 3);
        let block = &messages[1].content;
        assert!(block.contains("doc 1"));
        assert!(block.contains("doc 3"));
        assert!(!block.contains("doc 4"));
    }

    #[test]
    fn tool_selection_prompt_names_every_tool() {
        let prompt = build_tool_selection_prompt("what are my repos?");
        assert!(prompt.contains("what are my repos?"));
        for tool in [
            "github_repos",
            "github_code",
            "github_issues",
            "github_commits",
            "none",
        ] {
            assert!(prompt.contains(tool), "missing tool {}", tool);
        }
    }

    #[test]
    fn summarization_prompt_mentions_length() {
        let prompt = build_summarization_prompt("some text", 120);
        assert!(prompt.contains("120"));
        assert!(prompt.contains("some text"));
    }
}
