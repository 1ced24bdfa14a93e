//! Agent definition primitives.

pub mod builder;
pub mod skill;

pub use builder::{Agent, AgentBuilder, AgentDefinition, CompletionHook, ErrorFormatter};
pub use skill::{
    Injected, SkillDefinition, SkillHandler, SkillNeeds, SkillOutput, SkillParams, SkillReply,
};
