//! Agent module - the iteration loop and its collaborators

pub mod controller;
pub mod ledger;
pub mod parser;
pub mod prompts;
pub mod session;
pub mod sub_model;

pub use controller::RlmAgent;
pub use ledger::{CostLedger, CostSummary};
pub use parser::{FinalMarker, ParsedResponse};
pub use session::{Session, SessionState};
pub use sub_model::SubModelInvoker;
