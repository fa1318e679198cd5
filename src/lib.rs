//! Compile domain redirect rules into declarative URL-rewrite rules and keep a
//! native redirect engine's rule table in sync with them.
//!
//! ```
//! use domain_redirect::{compile, RuleRecord};
//!
//! let records = vec![
//!     RuleRecord::new(1, "https://old.example.com", "https://new.example.org"),
//!     RuleRecord::new(2, "garbage", "https://new.example.org"),
//! ];
//! let compiled = compile(&records);
//! assert_eq!(compiled.rules().len(), 1);
//! assert_eq!(compiled.skipped().len(), 1);
//! ```

mod compile;
mod engine;
mod error;
mod service;
mod sync;
mod types;

pub mod book;
pub mod config;
pub mod logging;
pub mod parse;
pub mod store;

pub use book::{RuleBook, RulePage, RuleQuery};
pub use compile::compile;
pub use config::Config;
pub use engine::{InMemoryEngine, NativeSyncError, RedirectEngine, MAX_DYNAMIC_RULES};
pub use error::RedirectError;
pub use service::RedirectService;
pub use store::{KvStore, RuleStore, StoreError, StoreEvent};
pub use sync::{SyncEngine, SyncOutcome, SyncReport};
pub use types::{
    Compilation, CompiledRule, MalformedRuleError, RecordField, Redirect, ResourceType,
    RuleAction, RuleCondition, RuleRecord, RuleUpdate, UrlTransform, REDIRECT_PRIORITY,
};
