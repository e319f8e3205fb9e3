//! qwen chat runner
//!
//! The interactive turn loop, the in-memory session it owns, and the bound on
//! how much of that session is kept in context.

pub mod chat_driver;
pub mod context_window;
pub mod session_state;

pub use chat_driver::{
    ASSISTANT_PREFIX, CancelSignal, ChatDriver, EndReason, InputEvent, InputSource, USER_PROMPT,
    ctrl_c_signal,
};
pub use context_window::{ContextWindow, trim};
pub use session_state::SessionState;
