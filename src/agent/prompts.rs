//! Prompt construction for the iteration loop
//!
//! The system prompt describes the REPL capabilities and a metadata-only
//! summary of the context; the raw context is never included. Per-turn
//! instructions remind the model of the query, with a first-turn safeguard
//! and a forced-final variant once the iteration budget is spent.

use crate::core::{ContextMetadata, Message};

const SYSTEM_PROMPT: &str = r#"You are tasked with answering a query with associated context. You can access, transform, and analyze this context interactively in a REPL environment that can recursively query sub-LLMs, which you are strongly encouraged to use as much as possible. You will be queried iteratively until you provide a final answer.

Your context is a {context_type} with {context_total_length} total characters, and is broken up into chunks of char lengths: {context_lengths}.

The REPL environment is initialized with:
1. A 'context' variable that contains extremely important information about your query. You should check the content of the 'context' variable to understand what you are working with. Make sure you look through it sufficiently as you answer your query.
2. A 'llm_query' function that allows you to query an LLM (that can handle around 500K chars) inside your REPL environment.
3. The ability to use 'print()' statements to view the output of your REPL code and continue your reasoning.

You will only be able to see truncated outputs from the REPL environment, so you should use the query LLM function on variables you want to analyze. You will find this function especially useful when you have to analyze the semantics of the context. Use these variables as buffers to build up your final answer.

Make sure to explicitly look through the entire context in REPL before answering your query. An example strategy is to first look at the context and figure out a chunking strategy, then break up the context into smart chunks, and query an LLM per chunk with a particular question and save the answers to a buffer, then query an LLM with all the buffers to produce your final answer.

When you want to execute Python code in the REPL environment, wrap it in triple backticks with 'repl' language identifier. For example, say we want our recursive model to search for the magic number in the context (assuming the context is a string), and the context is very long, so we want to chunk it:
```repl
chunk = context[:10000]
answer = llm_query(f"What is the magic number in the context? Here is the chunk: {chunk}")
print(answer)
```

As an example, suppose you're trying to answer a question about a book. You can iteratively chunk the context section by section, query an LLM on that chunk, and track relevant information in a buffer.
```repl
query = "Did Gryffindor win the House Cup because they led?"
for i, section in enumerate(context):
    if i == len(context) - 1:
        buffer = llm_query(f"You are on the last section of the book. So far you know that: {buffers}. Gather from this last section to answer {query}. Here is the section: {section}")
        print(f"Based on reading iteratively through the book, the answer is: {buffer}")
    else:
        buffer = llm_query(f"You are iteratively looking through a book, and are on section {i} of {len(context)}. Gather information to help answer {query}. Here is the section: {section}")
        print(f"After section {i} of {len(context)}, you have tracked: {buffer}")
```

As another example, when the context is a List[str], a simple but viable strategy is, based on the context chunk lengths, to combine them and recursively query an LLM over chunks with the same question:
```repl
chunk_size = len(context) // 10
answers = []
for i in range(10):
    if i < 9:
        chunk_str = "\n".join(context[i*chunk_size:(i+1)*chunk_size])
    else:
        chunk_str = "\n".join(context[i*chunk_size:])
    answer = llm_query(f"Try to answer the following query: {query}. Here are the documents:\n{chunk_str}. Only answer if you are confident in your answer based on the evidence.")
    answers.append(answer)
    print(f"I got the answer from chunk {i}: {answer}")
final_answer = llm_query(f"Aggregating all the answers per chunk, answer the original query: {query}\n\nAnswers:\n" + "\n".join(answers))
```
In the next step, we can return FINAL_VAR(final_answer).

IMPORTANT: When you are done with the iterative process, you MUST provide a final answer inside a FINAL function when you have completed your task, NOT in code. Do not use these tags unless you have completed your task. You have two options:
1. Use FINAL(your final answer here) to provide the answer directly
2. Use FINAL_VAR(variable_name) to return a variable you have created in the REPL environment as your final output

Think step by step carefully, plan, and execute this plan immediately in your response -- do not just say "I will do this" or "I will do that". Output to the REPL environment and recursive LLMs as much as possible. Remember to explicitly answer the original query in your final answer."#;

/// Cost-caution preamble for models prone to excessive sub-calls
const BATCHING_PREAMBLE: &str = r#"IMPORTANT: Be very careful about using 'llm_query' as it incurs high runtime costs. Always batch as much information as reasonably possible into each call (aim for around ~200k characters per call). For example, if you have 1000 lines of information to process, it's much better to split into chunks of 5 and call 'llm_query' on each chunk (200 calls total) rather than making 1000 individual calls. Minimize the number of 'llm_query' calls by batching related information together.

"#;

/// Build the system message for a session
///
/// Only the context metadata is surfaced; the payload itself stays in the
/// REPL environment.
pub fn system_message(model: &str, meta: &ContextMetadata) -> Message {
    let template = if model.to_lowercase().contains("qwen") {
        format!("{}{}", BATCHING_PREAMBLE, SYSTEM_PROMPT)
    } else {
        SYSTEM_PROMPT.to_string()
    };

    let content = template
        .replace("{context_type}", &meta.type_name)
        .replace(
            "{context_total_length}",
            &meta.total_length.to_string(),
        )
        .replace("{context_lengths}", &format!("{:?}", meta.chunk_lengths));

    Message::system(content)
}

/// Build the per-turn user instruction
pub fn next_action_prompt(query: &str, iteration: usize) -> Message {
    let body = format!(
        "Think step-by-step on what to do using the REPL environment (which contains the context) to answer the original query: \"{}\".\n\nContinue using the REPL environment, which has the `context` variable, and querying sub-LLMs by writing to ```repl``` tags, and determine your answer. Your next action:",
        query
    );

    if iteration == 0 {
        Message::user(format!(
            "You have not interacted with the REPL environment or seen your context yet. Your next action should be to look through, don't just provide a final answer yet.\n\n{}",
            body
        ))
    } else {
        Message::user(format!(
            "The history before is your previous interactions with the REPL environment. {}",
            body
        ))
    }
}

/// Instruction for the forced final turn after the iteration budget is spent
pub fn forced_final_prompt() -> Message {
    Message::user(
        "Based on all the information you have, provide a final answer to the user's query.",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ContextPayload;

    #[test]
    fn test_system_message_carries_metadata_only() {
        let payload = ContextPayload::from("secret payload text");
        let msg = system_message("gpt-5", &payload.metadata());
        assert_eq!(msg.role, "system");
        assert!(msg.content.contains("a str with 19 total characters"));
        assert!(!msg.content.contains("secret payload text"));
    }

    #[test]
    fn test_qwen_gets_batching_preamble() {
        let meta = ContextPayload::from("x").metadata();
        let qwen = system_message("qwen3-coder", &meta);
        let gpt = system_message("gpt-5", &meta);
        assert!(qwen.content.starts_with("IMPORTANT: Be very careful"));
        assert!(!gpt.content.starts_with("IMPORTANT: Be very careful"));
    }

    #[test]
    fn test_first_turn_safeguard() {
        let first = next_action_prompt("find it", 0);
        let later = next_action_prompt("find it", 3);
        assert!(first.content.contains("have not interacted"));
        assert!(!later.content.contains("have not interacted"));
        assert!(later.content.contains("previous interactions"));
    }

    #[test]
    fn test_forced_final_prompt() {
        let msg = forced_final_prompt();
        assert_eq!(msg.role, "user");
        assert!(msg.content.contains("final answer"));
    }
}
