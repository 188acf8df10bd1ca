pub mod coordinator;
pub mod input;
pub mod safety;

pub use coordinator::ActionExecutor;
pub use input::{EnigoPointer, PointerDriver};
pub use safety::{confirm, ClickPlan, ConfirmationGate, Confirmed, ReplyGate};
