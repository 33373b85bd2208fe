//! Terminal output for the feedpager binary
//!
//! Uses `cliclack` log lines on an interactive terminal and bracketed plain
//! lines everywhere else, so piped output and CI logs stay greppable.

mod output;

pub use output::{
    intro, key_value, remark, section, step_error_detail, step_info, step_ok,
    step_ok_detail, step_warn_hint,
};

use std::io::IsTerminal;

/// Output behavior for the current process
#[derive(Debug, Clone)]
pub struct UiContext {
    interactive: bool,
}

impl UiContext {
    /// Detect the current environment
    pub fn detect() -> Self {
        let interactive = std::io::stdout().is_terminal()
            && std::env::var_os("CI").is_none()
            && std::env::var_os("NO_COLOR").is_none();
        Self { interactive }
    }

    /// Plain output regardless of the terminal
    pub fn non_interactive() -> Self {
        Self { interactive: false }
    }

    /// Check if we should use fancy output
    pub fn use_fancy_output(&self) -> bool {
        self.interactive
    }
}
