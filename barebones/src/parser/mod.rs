//! Statement dispatch
//!
//! A statement is parsed on every fetch: the first word is the keyword and
//! the remaining words are its arguments. The keyword selects a handler from
//! a mutable table, so defining a function extends the language for the rest
//! of the run.

use crate::interp::Statement;
use crate::interp::control::{BranchHeader, End, FunctionDefinition, If, While};
use crate::interp::statements::{ArithOp, Arithmetic, Clear, CopyValue, Decr, Incr, Init, Print, Set};
use crate::lexer;
use crate::util::closest_keyword;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// Keywords registered by [`Dispatcher::with_builtins`]. Functions may not
/// take these names.
pub const BUILTIN_KEYWORDS: &[&str] = &[
    "init", "incr", "decr", "clear", "while", "copy", "end", "if", "elif", "else", "print",
    "add", "sub", "mul", "div", "mod", "set", "function",
];

pub fn is_builtin(keyword: &str) -> bool {
    BUILTIN_KEYWORDS.contains(&keyword)
}

/// Dispatch table shared by every machine of a run
pub type DispatchRef = Rc<RefCell<Dispatcher>>;

/// A statement split into its keyword, handler and arguments
pub struct Parsed {
    pub keyword: String,
    pub handler: Rc<dyn Statement>,
    pub args: Vec<String>,
}

/// Keyword to handler mapping
#[derive(Clone, Default)]
pub struct Dispatcher {
    mappings: HashMap<String, Rc<dyn Statement>>,
}

impl Dispatcher {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder {
            dispatcher: Dispatcher::new(),
        }
    }

    /// Table holding every built-in statement
    pub fn with_builtins() -> Self {
        Dispatcher::builder()
            .map("init", Init)
            .map("incr", Incr)
            .map("decr", Decr)
            .map("clear", Clear)
            .map("copy", CopyValue)
            .map("set", Set)
            .map("print", Print)
            .map("add", Arithmetic(ArithOp::Add))
            .map("sub", Arithmetic(ArithOp::Sub))
            .map("mul", Arithmetic(ArithOp::Mul))
            .map("div", Arithmetic(ArithOp::Div))
            .map("mod", Arithmetic(ArithOp::Mod))
            .map("while", While)
            .map("if", If)
            .map("elif", BranchHeader)
            .map("else", BranchHeader)
            .map("end", End)
            .map("function", FunctionDefinition)
            .finish()
    }

    pub fn into_ref(self) -> DispatchRef {
        Rc::new(RefCell::new(self))
    }

    /// Install or replace the handler for `keyword`
    pub fn add_mapping(&mut self, keyword: impl Into<String>, handler: Rc<dyn Statement>) {
        self.mappings.insert(keyword.into(), handler);
    }

    pub fn handler_for(&self, keyword: &str) -> Option<Rc<dyn Statement>> {
        self.mappings.get(keyword).cloned()
    }

    /// Bound keywords, sorted
    pub fn keywords(&self) -> Vec<&str> {
        let mut keywords: Vec<&str> = self.mappings.keys().map(String::as_str).collect();
        keywords.sort_unstable();
        keywords
    }

    /// Split `line` and look up its keyword. `None` for an empty statement or
    /// an unbound keyword.
    pub fn parse(&self, line: &str) -> Option<Parsed> {
        let words = lexer::words(line);
        let (keyword, args) = words.split_first()?;
        let handler = self.handler_for(keyword)?;
        Some(Parsed {
            keyword: (*keyword).to_string(),
            handler,
            args: args.iter().map(|w| (*w).to_string()).collect(),
        })
    }

    /// Nearest bound keyword to the first word of `line`
    pub fn suggest(&self, line: &str) -> Option<String> {
        let words = lexer::words(line);
        let first = words.first()?;
        closest_keyword(first, self.keywords()).map(str::to_string)
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("keywords", &self.keywords())
            .finish()
    }
}

/// Chained setup of a [`Dispatcher`]
pub struct DispatcherBuilder {
    dispatcher: Dispatcher,
}

impl DispatcherBuilder {
    pub fn map(mut self, keyword: &str, handler: impl Statement + 'static) -> Self {
        self.dispatcher.add_mapping(keyword, Rc::new(handler));
        self
    }

    pub fn finish(self) -> Dispatcher {
        self.dispatcher
    }
}
