//! Prompt templates for answer generation.

/// Build the generation prompt for `question`.
///
/// With an empty `context` the knowledge-base framing is omitted entirely so
/// the model is not told it has grounding it does not have.
pub fn build_prompt(question: &str, context: &str) -> String {
    if context.trim().is_empty() {
        return format!("Answer the following question:\n\nQUESTION: {question}\n\nANSWER:");
    }

    format!(
        "You are a helpful assistant with access to a knowledge base.\n\
         Based on the following knowledge base content, provide a clear and accurate answer to the question.\n\
         If the context doesn't contain relevant information, say so honestly.\n\
         \n\
         KNOWLEDGE BASE CONTENT:\n\
         {context}\n\
         \n\
         QUESTION: {question}\n\
         \n\
         ANSWER:"
    )
}
