pub mod assemble;
pub mod bankrules;
pub mod checks;
pub mod error;
pub mod fs;
pub mod inject;
pub mod payload;
pub mod shell;

pub use assemble::{assemble, AssembleOptions, CLOSING_MARKUP};
pub use bankrules::{derive_bank_rules, ensure_bank_rules};
pub use checks::{check_payload, PayloadChecks};
pub use error::{AssembleError, AssembleResult, ExitCode};
pub use fs::write_atomic;
pub use inject::render_injection;
pub use payload::{load_payload, parse_payload, strip_code_fences, Payload, PayloadSource};
pub use shell::{split_at_marker, ShellSplit};
