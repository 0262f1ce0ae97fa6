//! Terminal output for the CLI
//!
//! Uses `cliclack` for interactive terminals with automatic fallback to
//! plain lines in CI/non-interactive environments.
//!
//! # Example
//!
//! ```rust,ignore
//! use precache::ui::{self, UiContext, TaskSpinner};
//!
//! let ctx = UiContext::detect();
//!
//! ui::intro(&ctx, "Installing v2");
//!
//! let mut spinner = TaskSpinner::new(&ctx);
//! spinner.start("Fetching 12 resources...");
//! // ... install ...
//! spinner.stop("Cached 12 resources");
//!
//! ui::step_ok_detail(&ctx, "Removed stale cache", "v1");
//! ui::outro_success(&ctx, "v2 is active");
//! ```

mod context;
mod output;
mod progress;
mod prompts;

pub use context::UiContext;
pub use output::{
    intro, key_value, outro_success, outro_warn, remark, step_error, step_info,
    step_ok_detail, step_warn, step_warn_hint,
};
pub use progress::TaskSpinner;
pub use prompts::confirm;
