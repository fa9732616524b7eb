// Execution - Deterministic state machine
// Principle: one handler per transaction kind, pure checks before any write

pub mod code;
pub mod gas;
pub mod handler;
pub mod handlers;
pub mod pipeline;
pub mod response;

pub use code::Code;
pub use handler::{Handler, TxContext};
pub use pipeline::{BlockOutcome, Executor};
pub use response::{Event, Response, Tag};
