//! Host UI collaborator: messages, clipboard, workspace trust and the
//! modal confirmation prompt.

use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait HostUi: Send + Sync {
    fn show_info(&self, message: &str);

    fn show_warning(&self, message: &str);

    fn write_clipboard(&self, text: &str) -> Result<()>;

    /// The host's workspace-trust flag.
    fn is_workspace_trusted(&self) -> bool;

    /// Modal single-choice prompt. Resolves to the label the user picked,
    /// or `None` when the prompt was dismissed.
    async fn confirm(&self, message: &str, detail: &str, choice: &str) -> Option<String>;
}

impl std::fmt::Debug for dyn HostUi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("HostUi")
    }
}
