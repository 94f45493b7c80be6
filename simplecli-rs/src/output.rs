//! User-visible output sink.
//!
//! Every message the shell prints (confirmations from primitives, help
//! listings, error reports) goes through an [`Output`].  In the binary it
//! writes straight to stdout; tests build a capturing sink and inspect the
//! lines afterwards.
//!
//! The sink is cheap to clone and all clones share one buffer, so the Lua
//! primitives and the dispatch loop write into the same place.

use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, Default)]
pub struct Output {
    captured: Option<Rc<RefCell<Vec<String>>>>,
}

impl Output {
    /// Sink that prints each line to stdout.
    pub fn stdout() -> Self {
        Self { captured: None }
    }

    /// Sink that records lines in memory.
    pub fn capture() -> Self {
        Self { captured: Some(Rc::new(RefCell::new(Vec::new()))) }
    }

    /// Emit one line of text.
    pub fn line(&self, text: impl AsRef<str>) {
        match &self.captured {
            Some(buf) => buf.borrow_mut().push(text.as_ref().to_owned()),
            None => println!("{}", text.as_ref()),
        }
    }

    /// Drain the captured lines.  Always empty for a stdout sink.
    pub fn take(&self) -> Vec<String> {
        match &self.captured {
            Some(buf) => std::mem::take(&mut *buf.borrow_mut()),
            None => Vec::new(),
        }
    }
}
