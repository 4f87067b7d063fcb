pub mod budget;
pub mod config;
pub mod error;
pub mod file_config;
pub mod filter;
pub mod skills;
pub mod types;

pub use budget::{parse_budget, ParsedBudget};
pub use config::Secrets;
pub use error::GigSignalError;
pub use file_config::{
    load_config, AppConfig, ScannerConfig, ScoringConfig, SiteConfig, SourceKind, StoreBackend,
    StoreConfig,
};
pub use filter::FilterConfig;
pub use skills::SkillMatcher;
pub use types::{
    BudgetType, JobPost, Opportunity, OpportunityStatus, Platform, ScoreDetails,
};
