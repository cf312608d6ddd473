pub mod capability;
pub mod credentials;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod event;
pub mod loader;
pub mod platform;
pub mod rule;
pub mod script;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use capability::{Capability, CapabilitySink, IssueSubject};
pub use credentials::{CredentialProvider, ResolvedClient};
pub use dispatch::{Dispatcher, InstallationSweep, RepoSweep};
pub use engine::{RuleEngine, RuleOutcome, RuleStatus, RunReport, SkipReason};
pub use error::{AuthError, LoadError, ScriptError};
pub use event::{Event, Trigger};
pub use loader::{RuleLoader, RulesLocation};
pub use platform::{AppClient, ContentReader, Installation, PlatformError, RepoClient, RepoRef};
pub use rule::{Rule, RuleSet};
