//! Record kind vocabularies and their wire spellings.
//!
//! Kinds are stored as text columns; these enums are the single source of
//! truth for the accepted spellings at the request boundary.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
	User,
	Assistant,
	System,
}
impl MessageRole {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::User => "user",
			Self::Assistant => "assistant",
			Self::System => "system",
		}
	}
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnowledgeCategory {
	Preference,
	Pattern,
	Entity,
	Insight,
}
impl KnowledgeCategory {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Preference => "preference",
			Self::Pattern => "pattern",
			Self::Entity => "entity",
			Self::Insight => "insight",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		match raw {
			"preference" => Some(Self::Preference),
			"pattern" => Some(Self::Pattern),
			"entity" => Some(Self::Entity),
			"insight" => Some(Self::Insight),
			_ => None,
		}
	}
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightType {
	Lesson,
	Mistake,
	Retrospective,
	Playbook,
	Idea,
}
impl InsightType {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Lesson => "lesson",
			Self::Mistake => "mistake",
			Self::Retrospective => "retrospective",
			Self::Playbook => "playbook",
			Self::Idea => "idea",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		match raw {
			"lesson" => Some(Self::Lesson),
			"mistake" => Some(Self::Mistake),
			"retrospective" => Some(Self::Retrospective),
			"playbook" => Some(Self::Playbook),
			"idea" => Some(Self::Idea),
			_ => None,
		}
	}
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskResult {
	Success,
	Partial,
	Failure,
}
impl TaskResult {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Success => "success",
			Self::Partial => "partial",
			Self::Failure => "failure",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		match raw {
			"success" => Some(Self::Success),
			"partial" => Some(Self::Partial),
			"failure" => Some(Self::Failure),
			_ => None,
		}
	}
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoEventType {
	Commit,
	Pr,
	Release,
	Tag,
}
impl RepoEventType {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Commit => "commit",
			Self::Pr => "pr",
			Self::Release => "release",
			Self::Tag => "tag",
		}
	}
}
