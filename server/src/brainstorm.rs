//! Brainstorm sessions — transcript capture and regex idea extraction.
//!
//! Voice transcripts arrive as text chunks over HTTP. Each appended chunk is
//! scanned for action phrases, feature phrases and open questions; extracted
//! ideas are deduplicated per session and can later be finalized into tasks.

use regex::Regex;
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdeaKind {
    Action,
    Feature,
    Question,
}

impl IdeaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdeaKind::Action => "action",
            IdeaKind::Feature => "feature",
            IdeaKind::Question => "question",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Idea {
    pub id: String,
    pub text: String,
    pub kind: IdeaKind,
    pub captured_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Completed,
}

#[derive(Debug, Clone, Serialize)]
pub struct BrainstormSession {
    pub id: String,
    pub topic: String,
    pub created_by: Option<String>,
    pub status: SessionStatus,
    pub transcript: Vec<String>,
    pub ideas: Vec<Idea>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl BrainstormSession {
    pub fn new(topic: String, created_by: Option<String>) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            topic,
            created_by,
            status: SessionStatus::Active,
            transcript: Vec::new(),
            ideas: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a transcript chunk and return the ideas it newly contributed
    pub fn append_transcript(&mut self, text: &str, extractor: &IdeaExtractor) -> Vec<Idea> {
        let now = chrono::Utc::now().timestamp();
        self.transcript.push(text.to_string());
        self.updated_at = now;

        let mut fresh = Vec::new();
        for (candidate, kind) in extractor.extract(text) {
            let normalized = normalize(&candidate);
            let duplicate = self.ideas.iter().any(|idea| normalize(&idea.text) == normalized);
            if duplicate {
                continue;
            }
            let idea = Idea {
                id: uuid::Uuid::new_v4().to_string(),
                text: candidate,
                kind,
                captured_at: now,
            };
            self.ideas.push(idea.clone());
            fresh.push(idea);
        }

        if !fresh.is_empty() {
            info!(
                "Brainstorm {}: extracted {} new ideas from chunk",
                self.id,
                fresh.len()
            );
        }
        fresh
    }

    /// Ideas worth turning into tasks (questions stay open)
    pub fn actionable_ideas(&self) -> Vec<&Idea> {
        self.ideas
            .iter()
            .filter(|i| i.kind != IdeaKind::Question)
            .collect()
    }

    pub fn complete(&mut self) {
        self.status = SessionStatus::Completed;
        self.updated_at = chrono::Utc::now().timestamp();
    }
}

fn normalize(text: &str) -> String {
    text.trim()
        .trim_end_matches(['.', '!', '?'])
        .to_lowercase()
}

/// Compiled extraction patterns, built once at startup
pub struct IdeaExtractor {
    action: Regex,
    feature: Regex,
    question: Regex,
}

impl IdeaExtractor {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            action: Regex::new(
                r"(?i)\b(?:we should|let'?s|need to|have to|todo:?)\s+([^.!?\n]{3,120})",
            )?,
            feature: Regex::new(
                r"(?i)\b(?:add|build|implement|create|support)\s+([^.!?\n]{3,120})",
            )?,
            question: Regex::new(r"([^.!?\n]{8,200})\?")?,
        })
    }

    /// Extract (text, kind) idea candidates from a transcript chunk
    pub fn extract(&self, text: &str) -> Vec<(String, IdeaKind)> {
        let mut ideas: Vec<(String, IdeaKind)> = Vec::new();

        for capture in self.action.captures_iter(text) {
            if let Some(m) = capture.get(1) {
                ideas.push((m.as_str().trim().to_string(), IdeaKind::Action));
            }
        }

        for capture in self.feature.captures_iter(text) {
            if let Some(m) = capture.get(1) {
                let candidate = m.as_str().trim().to_string();
                // "we should add X" already surfaced as an action idea
                let covered = ideas
                    .iter()
                    .any(|(existing, _)| existing.contains(&candidate) || candidate.contains(existing));
                if !covered {
                    ideas.push((candidate, IdeaKind::Feature));
                }
            }
        }

        for capture in self.question.captures_iter(text) {
            if let Some(m) = capture.get(1) {
                ideas.push((format!("{}?", m.as_str().trim()), IdeaKind::Question));
            }
        }

        ideas
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> IdeaExtractor {
        IdeaExtractor::new().unwrap()
    }

    #[test]
    fn test_extract_action_phrases() {
        let ideas = extractor().extract("We should refactor the payment flow. Also let's split the module.");
        let actions: Vec<_> = ideas
            .iter()
            .filter(|(_, k)| *k == IdeaKind::Action)
            .collect();
        assert_eq!(actions.len(), 2);
        assert!(actions[0].0.contains("refactor the payment flow"));
    }

    #[test]
    fn test_extract_feature_phrases() {
        let ideas = extractor().extract("Build a dark mode toggle. Implement keyboard shortcuts!");
        let features: Vec<_> = ideas
            .iter()
            .filter(|(_, k)| *k == IdeaKind::Feature)
            .collect();
        assert_eq!(features.len(), 2);
    }

    #[test]
    fn test_extract_questions() {
        let ideas = extractor().extract("What happens when the queue is full? Fine otherwise.");
        let questions: Vec<_> = ideas
            .iter()
            .filter(|(_, k)| *k == IdeaKind::Question)
            .collect();
        assert_eq!(questions.len(), 1);
        assert!(questions[0].0.ends_with('?'));
    }

    #[test]
    fn test_action_subsumes_feature() {
        let ideas = extractor().extract("We should add retry logic to the webhook sender.");
        let kinds: Vec<IdeaKind> = ideas.iter().map(|(_, k)| *k).collect();
        assert_eq!(kinds, vec![IdeaKind::Action]);
    }

    #[test]
    fn test_extract_nothing_from_plain_text() {
        let ideas = extractor().extract("The weather is nice today.");
        assert!(ideas.is_empty());
    }

    #[test]
    fn test_todo_marker() {
        let ideas = extractor().extract("todo: wire up the staging deploy");
        assert_eq!(ideas.len(), 1);
        assert_eq!(ideas[0].1, IdeaKind::Action);
        assert!(ideas[0].0.contains("wire up the staging deploy"));
    }

    #[test]
    fn test_session_appends_and_dedupes() {
        let extractor = extractor();
        let mut session = BrainstormSession::new("payments".into(), Some("alice".into()));

        let first = session.append_transcript("We should simplify checkout.", &extractor);
        assert_eq!(first.len(), 1);

        // Same idea again, different casing and punctuation
        let second = session.append_transcript("we should simplify checkout!", &extractor);
        assert!(second.is_empty());
        assert_eq!(session.ideas.len(), 1);
        assert_eq!(session.transcript.len(), 2);
    }

    #[test]
    fn test_session_actionable_excludes_questions() {
        let extractor = extractor();
        let mut session = BrainstormSession::new("infra".into(), None);
        session.append_transcript(
            "We should upgrade postgres. Should we also move to kubernetes?",
            &extractor,
        );
        let actionable = session.actionable_ideas();
        assert_eq!(actionable.len(), 1);
        assert_eq!(actionable[0].kind, IdeaKind::Action);
    }

    #[test]
    fn test_session_complete() {
        let mut session = BrainstormSession::new("x".into(), None);
        assert_eq!(session.status, SessionStatus::Active);
        session.complete();
        assert_eq!(session.status, SessionStatus::Completed);
    }
}
