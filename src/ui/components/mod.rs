mod confirm;
mod input;
mod key_result;
mod name_prompt;
mod status_picker;

pub use confirm::{ConfirmDialog, ConfirmEvent};
pub use key_result::KeyResult;
pub use name_prompt::{NamePrompt, PromptEvent};
pub use status_picker::{StatusPicker, StatusPickerEvent};
