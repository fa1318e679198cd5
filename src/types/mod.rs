mod compilation;
mod error;
mod record;
mod rule;
mod update;

pub use compilation::Compilation;
pub use error::{MalformedRuleError, RecordField};
pub use record::RuleRecord;
pub use rule::{
    CompiledRule, Redirect, ResourceType, RuleAction, RuleCondition, UrlTransform,
    REDIRECT_PRIORITY,
};
pub use update::RuleUpdate;
