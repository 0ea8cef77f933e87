//! Conversation manager: condense → retrieve → generate.
//!
//! Each user turn runs to completion under the session's lock: the prior
//! transcript and new question are condensed into a standalone query, the
//! query is run against the session's index, and a grounded prompt is sent
//! to the language model. Both turns are appended to the transcript only
//! after generation succeeds; a failed turn leaves the transcript and index
//! untouched.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::Config;
use crate::embedding::Embedder;
use crate::error::EngineError;
use crate::index::VectorIndex;
use crate::llm::{ChatMessage, LanguageModel};
use crate::models::{ConversationTurn, Role, ScoredChunk, SourceRef};
use crate::retriever::retrieve;
use crate::session::{ChatSession, EngineState};

/// Default grounded-answer instruction: answer from the provided context
/// when it is relevant, and say plainly when the context lacks the answer.
const DEFAULT_SYSTEM_PROMPT: &str = "You are an assistant that answers questions about the user's uploaded documents. \
Answer from the provided context when it is relevant, taking the prior conversation into account. \
If the context does not contain the answer, say plainly that you do not know.";

/// Instruction for the condensation sub-call.
const CONDENSE_INSTRUCTION: &str = "Rewrite the user's latest question as a single standalone question, \
resolving any pronouns or references using the conversation so far. \
Reply with the rewritten question only.";

/// Approximate chars-per-token ratio used to bound the transcript slice
/// carried into prompts.
const CHARS_PER_TOKEN: usize = 4;

/// Answer plus the chunk references that grounded it.
#[derive(Debug)]
pub struct ChatReply {
    pub answer: String,
    pub sources: Vec<SourceRef>,
}

/// Conversation manager. Holds the service handles and configuration;
/// per-session state lives in [`ChatSession`].
pub struct ChatEngine {
    config: Config,
    embedder: Arc<dyn Embedder>,
    model: Arc<dyn LanguageModel>,
}

impl ChatEngine {
    pub fn new(
        config: Config,
        embedder: Arc<dyn Embedder>,
        model: Arc<dyn LanguageModel>,
    ) -> Self {
        Self {
            config,
            embedder,
            model,
        }
    }

    /// Run one user turn against the session.
    ///
    /// Fails with [`EngineError::NotReady`] before any index is attached.
    /// On success, appends the user turn and the assistant turn to the
    /// transcript and returns the answer with its provenance. On any
    /// failure the transcript is left unchanged.
    pub async fn chat(
        &self,
        session: &mut ChatSession,
        question: &str,
    ) -> Result<ChatReply, EngineError> {
        let index = match &session.index {
            Some(index) => Arc::clone(index),
            None => return Err(EngineError::NotReady),
        };

        session.state = EngineState::Answering;
        let result = self.run_turn(&session.transcript, &index, question).await;
        session.state = EngineState::Ready;

        let reply = result?;
        session.transcript.push(ConversationTurn {
            role: Role::User,
            content: question.to_string(),
        });
        session.transcript.push(ConversationTurn {
            role: Role::Assistant,
            content: reply.answer.clone(),
        });
        Ok(reply)
    }

    async fn run_turn(
        &self,
        transcript: &[ConversationTurn],
        index: &VectorIndex,
        question: &str,
    ) -> Result<ChatReply, EngineError> {
        let query = self.condense(transcript, question).await?;
        debug!(%query, "condensed query");

        let retrieved = retrieve(
            index,
            self.embedder.as_ref(),
            &query,
            self.config.retrieval.top_k,
        )
        .await?;

        let messages = self.assemble(transcript, &retrieved, question);
        let completion = self.model.complete(&messages).await?;

        let sources = retrieved
            .iter()
            .map(|sc| SourceRef {
                source: sc.chunk.source.clone(),
                chunk_id: sc.chunk.id.clone(),
                score: sc.score,
            })
            .collect();

        info!(sources = retrieved.len(), "turn answered");
        Ok(ChatReply {
            answer: completion.text,
            sources,
        })
    }

    /// Condense the prior transcript and new question into a standalone
    /// query. A first question has no referents to resolve and passes
    /// through verbatim; an empty rewrite falls back to the raw question.
    async fn condense(
        &self,
        transcript: &[ConversationTurn],
        question: &str,
    ) -> Result<String, EngineError> {
        if transcript.is_empty() {
            return Ok(question.to_string());
        }

        let mut messages = vec![ChatMessage::system(CONDENSE_INSTRUCTION)];
        for turn in bounded_transcript(transcript, self.config.chat.context_window) {
            messages.push(ChatMessage {
                role: turn.role.as_str().to_string(),
                content: turn.content.clone(),
            });
        }
        messages.push(ChatMessage::user(question));

        let completion = self.model.complete(&messages).await?;
        let condensed = completion.text.trim().to_string();
        if condensed.is_empty() {
            return Ok(question.to_string());
        }
        Ok(condensed)
    }

    /// Assemble the grounded prompt: system instruction plus retrieved
    /// context, the bounded prior transcript, then the new question.
    fn assemble(
        &self,
        transcript: &[ConversationTurn],
        retrieved: &[ScoredChunk],
        question: &str,
    ) -> Vec<ChatMessage> {
        let system_prompt = self
            .config
            .chat
            .system_prompt
            .as_deref()
            .unwrap_or(DEFAULT_SYSTEM_PROMPT);

        let mut context = String::new();
        for sc in retrieved {
            context.push_str(&format!("[{}]\n{}\n\n", sc.chunk.source, sc.chunk.text));
        }

        let mut messages = vec![ChatMessage::system(format!(
            "{}\n\nContext:\n{}",
            system_prompt,
            context.trim_end()
        ))];
        for turn in bounded_transcript(transcript, self.config.chat.context_window) {
            messages.push(ChatMessage {
                role: turn.role.as_str().to_string(),
                content: turn.content.clone(),
            });
        }
        messages.push(ChatMessage::user(question));
        messages
    }
}

/// Most recent transcript suffix whose total content fits the context
/// window budget. Whole turns only; the newest turn wins when the budget
/// is tight.
fn bounded_transcript(transcript: &[ConversationTurn], context_window: usize) -> &[ConversationTurn] {
    let budget = context_window * CHARS_PER_TOKEN;
    let mut used = 0usize;
    let mut start = transcript.len();
    while start > 0 {
        let len = transcript[start - 1].content.len();
        if used + len > budget {
            break;
        }
        used += len;
        start -= 1;
    }
    &transcript[start..]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn turn(role: Role, content: &str) -> ConversationTurn {
        ConversationTurn {
            role,
            content: content.to_string(),
        }
    }

    #[test]
    fn bounded_transcript_keeps_everything_under_budget() {
        let transcript = vec![
            turn(Role::User, "one"),
            turn(Role::Assistant, "two"),
        ];
        let bounded = bounded_transcript(&transcript, 4096);
        assert_eq!(bounded.len(), 2);
    }

    #[test]
    fn bounded_transcript_prefers_the_most_recent_turns() {
        let transcript = vec![
            turn(Role::User, &"a".repeat(40)),
            turn(Role::Assistant, &"b".repeat(40)),
            turn(Role::User, &"c".repeat(40)),
        ];
        // budget of 20 tokens => 80 chars => two newest turns fit
        let bounded = bounded_transcript(&transcript, 20);
        assert_eq!(bounded.len(), 2);
        assert!(bounded[0].content.starts_with('b'));
        assert!(bounded[1].content.starts_with('c'));
    }

    #[test]
    fn bounded_transcript_handles_empty_input() {
        let bounded = bounded_transcript(&[], 4096);
        assert!(bounded.is_empty());
    }
}
