// src/results.rs

//! Per-package outcome records

use std::path::PathBuf;

/// Severity of an attached message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Info,
    Note,
    Warn,
    Error,
}

/// One message attached to a package outcome, in emission order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultMessage {
    pub kind: MessageKind,
    pub text: String,
}

/// Outcome record for one package operation
#[derive(Debug, Clone, PartialEq)]
pub struct PackageResult {
    pub name: String,
    pub version: String,
    pub install_location: Option<PathBuf>,
    pub exit_code: i32,
    pub success: bool,
    pub warning: bool,
    pub inconclusive: bool,
    pub messages: Vec<ResultMessage>,
}

impl PackageResult {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            install_location: None,
            exit_code: 0,
            success: true,
            warning: false,
            inconclusive: false,
            messages: Vec::new(),
        }
    }

    /// An already-failed result, used when a package never reached a runner
    pub fn failure(name: impl Into<String>, text: impl Into<String>) -> Self {
        let mut result = Self::new(name, "");
        result.fail(text);
        result
    }

    pub fn message(&mut self, kind: MessageKind, text: impl Into<String>) {
        let text = text.into();
        match kind {
            MessageKind::Warn => self.warning = true,
            MessageKind::Error => self.success = false,
            _ => {}
        }
        self.messages.push(ResultMessage { kind, text });
    }

    /// Record an error message and mark the result failed
    pub fn fail(&mut self, text: impl Into<String>) {
        self.message(MessageKind::Error, text);
    }

    pub fn warn(&mut self, text: impl Into<String>) {
        self.message(MessageKind::Warn, text);
    }

    pub fn note(&mut self, text: impl Into<String>) {
        self.message(MessageKind::Note, text);
    }

    /// First error-kind message, if any
    pub fn first_error(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.kind == MessageKind::Error)
            .map(|m| m.text.as_str())
    }

    /// First warning-kind message, if any
    pub fn first_warning(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.kind == MessageKind::Warn)
            .map(|m| m.text.as_str())
    }

    /// The installer asked for a reboot
    pub fn wants_reboot(&self) -> bool {
        crate::exit::is_reboot_code(self.exit_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fail_marks_unsuccessful() {
        let mut result = PackageResult::new("vim", "9.1.0");
        assert!(result.success);
        result.fail("installer exited 1603");
        assert!(!result.success);
        assert_eq!(result.first_error(), Some("installer exited 1603"));
    }

    #[test]
    fn test_warn_sets_flag_without_failing() {
        let mut result = PackageResult::new("vim", "9.1.0");
        result.warn("checksum skipped");
        assert!(result.success);
        assert!(result.warning);
        assert_eq!(result.first_warning(), Some("checksum skipped"));
    }

    #[test]
    fn test_wants_reboot() {
        let mut result = PackageResult::new("dotnet", "8.0.1");
        result.exit_code = 3010;
        assert!(result.wants_reboot());
        result.exit_code = 0;
        assert!(!result.wants_reboot());
    }
}
