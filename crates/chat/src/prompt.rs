//! Prompt compiler.
//!
//! Output order is fixed: one system instruction, the session history
//! oldest first, then the user's new query.

use crate::session::Turn;
use supportline_core::message::{Message, Role};
use supportline_core::retrieval::RetrievedSnippet;

const GROUNDED_GUIDELINES: &str = "\
GUIDELINES:
1. When the customer greets you (hi, hello, hey, or similar), greet them warmly and introduce yourself as the customer support assistant.
2. When the customer says goodbye or thanks you, respond in a warm, friendly, professional way.
3. Answer using ONLY the knowledge base information above. Never invent or assume details that are not stated there.
4. Be empathetic, clear, and concise. If the customer sounds frustrated, acknowledge their concern before answering.
5. NEVER mention documents, sources, chunks, scores, or file names in your answer. Do not write phrases like \"Document 1\" or \"according to the documents\".
6. If the information above does not fully answer the question, say so politely and suggest contacting the support team directly. Do not guess.";

const UNGROUNDED_GUIDELINES: &str = "\
GUIDELINES:
1. Greet customers warmly and introduce yourself as the customer support assistant.
2. Respond to farewells and thanks warmly and professionally.
3. Handle greetings, small talk, and courtesies naturally and directly.
4. Only when the customer asks a specific question about policies, products, pricing, or services: explain plainly that you do not currently have the information needed to answer it accurately, and suggest trying again once documentation is available or contacting the support team.
5. Never claim to have checked documentation or a knowledge base. You have none for this question.
6. Be empathetic, clear, and professional. Never speculate or fabricate answers.";

const ROLE_PREAMBLE: &str = "You are a helpful and professional AI customer support assistant for this organization.";

/// Render snippets as labeled blocks, in the given order.
pub fn render_context(snippets: &[RetrievedSnippet]) -> String {
    snippets
        .iter()
        .enumerate()
        .map(|(i, s)| format!("[Document {} — Score: {:.2}]\n{}", i + 1, s.score, s.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// The system instruction for this turn.
pub fn system_instruction(snippets: &[RetrievedSnippet], has_context: bool) -> String {
    if has_context {
        format!(
            "{ROLE_PREAMBLE} Your role is to answer customer questions accurately from the organization's official documentation, policies, and knowledge base.\n\n\
             Relevant information from our knowledge base:\n{}\n\n{GROUNDED_GUIDELINES}",
            render_context(snippets)
        )
    } else {
        format!(
            "{ROLE_PREAMBLE} Your role is to help customers with their questions and concerns about the organization's products, services, and policies.\n\n{UNGROUNDED_GUIDELINES}"
        )
    }
}

/// Build the ordered message sequence for the generation call.
///
/// History turns with a role other than user or assistant are skipped.
pub fn compile(
    query: &str,
    snippets: &[RetrievedSnippet],
    has_context: bool,
    history: &[Turn],
) -> Vec<Message> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(Message::system(system_instruction(snippets, has_context)));

    messages.extend(history.iter().filter_map(|turn| match turn.role {
        Role::User => Some(Message::user(&turn.content)),
        Role::Assistant => Some(Message::assistant(&turn.content)),
        Role::System => None,
    }));

    messages.push(Message::user(query));
    messages
}
