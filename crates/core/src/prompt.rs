use crate::models::RetrievedChunk;

pub const DEFAULT_SUMMARY_DETAIL: &str = "a concise paragraph";

const DELIMITER: &str = "---";

/// Summarization prompt. The text to summarize is fenced so the model can
/// tell the instruction apart from the content.
pub fn compose_summary_prompt(system_prompt: Option<&str>, text: &str, detail: &str) -> String {
    let detail = if detail.trim().is_empty() {
        DEFAULT_SUMMARY_DETAIL
    } else {
        detail
    };

    with_system_prefix(
        system_prompt,
        format!(
            "Please provide a summary of the following text in the format of {detail}.\n\
             Text:\n{DELIMITER}\n{text}\n{DELIMITER}"
        ),
    )
}

/// One `Source:`/`Content:` pair per chunk, in retrieval order.
pub fn format_context(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .map(|chunk| {
            format!(
                "Source: {}\nContent: {}",
                chunk.metadata.source, chunk.document
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn compose_answer_prompt(
    system_prompt: Option<&str>,
    chunks: &[RetrievedChunk],
    question: &str,
) -> String {
    let context = format_context(chunks);
    with_system_prefix(
        system_prompt,
        format!(
            "Based *only* on the following context, please answer the user's question. \
             If the context does not contain the answer, say so.\n\n\
             Context:\n{DELIMITER}\n{context}\n{DELIMITER}\n\n\
             User's Question: {question}"
        ),
    )
}

fn with_system_prefix(system_prompt: Option<&str>, body: String) -> String {
    match system_prompt.map(str::trim).filter(|prompt| !prompt.is_empty()) {
        Some(prompt) => format!("{prompt}\n\n{body}"),
        None => body,
    }
}
