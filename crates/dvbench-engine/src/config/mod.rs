//! Technology table and workflow parameters.

pub mod parser;
pub mod types;
pub mod validator;

pub use parser::{builtin_technologies, parse_technologies, parse_technologies_str};
pub use types::{
    AppendStrategy, CommandSpec, FileSuffix, FlushPolicy, TechnologiesConfig, TechnologySpec,
    WorkflowParams,
};
pub use validator::{validate_params, validate_technologies};
