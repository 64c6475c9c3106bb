//! Output sink for `print`

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

/// Writer shared by every machine of a run
pub type Output = Rc<RefCell<dyn Write>>;

/// Standard output
pub fn stdout() -> Output {
    Rc::new(RefCell::new(io::stdout()))
}

/// In-memory sink, used by tests and embedders that want the printed text.
#[derive(Debug, Clone, Default)]
pub struct Capture {
    buffer: Rc<RefCell<Vec<u8>>>,
}

impl Capture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writer handle feeding this capture
    pub fn output(&self) -> Output {
        self.buffer.clone()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.borrow()).into_owned()
    }
}
