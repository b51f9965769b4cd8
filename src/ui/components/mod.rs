mod command_input;
mod confirm;
mod input;
mod key_result;
mod prompt;
mod toast;

pub use command_input::{CommandEvent, CommandInput};
pub use confirm::{ConfirmDialog, ConfirmEvent};
pub use key_result::KeyResult;
pub use prompt::{Prompt, PromptEvent};
pub use toast::Toasts;
