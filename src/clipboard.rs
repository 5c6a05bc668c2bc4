// Clipboard access: hands the apply command to the user. Copying is best
// effort; callers ignore failures.

/// Somewhere the final command can be copied to.
pub trait Clipboard {
    /// Write text to the clipboard.
    fn write_text(&mut self, text: &str) -> Result<(), String>;
}

/// System clipboard backed by `arboard`.
///
/// The handle is opened on first use: headless machines have no clipboard,
/// and that must not stop a run that never gets to the copy step.
#[derive(Default)]
pub struct SystemClipboard {
    clipboard: Option<arboard::Clipboard>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clipboard for SystemClipboard {
    fn write_text(&mut self, text: &str) -> Result<(), String> {
        if self.clipboard.is_none() {
            let clipboard = arboard::Clipboard::new()
                .map_err(|e| format!("Failed to open clipboard: {}", e))?;
            self.clipboard = Some(clipboard);
        }
        match self.clipboard.as_mut() {
            Some(clipboard) => clipboard
                .set_text(text.to_string())
                .map_err(|e| format!("Failed to set clipboard text: {}", e)),
            None => Err("clipboard unavailable".to_string()),
        }
    }
}
