pub mod form;
pub mod id;
pub mod question;
pub mod rule;

pub use form::FormSpec;
pub use id::{ItemId, scalar_key};
pub use question::{OptionSpec, QuestionSpec, QuestionType};
pub use rule::{LogicRule, RuleAction};
