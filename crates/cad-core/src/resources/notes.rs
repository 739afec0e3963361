//! Investigation note accumulator.
//!
//! A run collects human-readable findings into one [`NoteWriter`].
//! Escalations and silences append its rendering to what they deliver.
//! Writes are serialized by a single internal lock.

use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteLevel {
    Success,
    Warning,
    Automation,
    Info,
}

impl NoteLevel {
    fn marker(self) -> &'static str {
        match self {
            NoteLevel::Success => "✓",
            NoteLevel::Warning => "⚠",
            NoteLevel::Automation => "⚙",
            NoteLevel::Info => "•",
        }
    }
}

#[derive(Debug)]
pub struct NoteWriter {
    title: String,
    lines: Mutex<Vec<(NoteLevel, String)>>,
}

impl NoteWriter {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            lines: Mutex::new(Vec::new()),
        }
    }

    pub fn append(&self, level: NoteLevel, message: impl Into<String>) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((level, message.into()));
    }

    pub fn append_success(&self, message: impl Into<String>) {
        self.append(NoteLevel::Success, message);
    }

    pub fn append_warning(&self, message: impl Into<String>) {
        self.append(NoteLevel::Warning, message);
    }

    pub fn append_automation(&self, message: impl Into<String>) {
        self.append(NoteLevel::Automation, message);
    }

    pub fn append_info(&self, message: impl Into<String>) {
        self.append(NoteLevel::Info, message);
    }

    pub fn is_empty(&self) -> bool {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Title line followed by one marked line per entry, in append order.
    pub fn render(&self) -> String {
        let lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        let mut out = format!("Automated investigation: {}\n", self.title);
        for (level, message) in lines.iter() {
            out.push_str(level.marker());
            out.push(' ');
            out.push_str(message);
            out.push('\n');
        }
        out
    }
}
