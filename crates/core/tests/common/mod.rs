//! In-process stand-ins for the formatting engine and the editor host.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::ffi::CString;
use std::os::raw::{c_char, c_ulong};
use std::rc::Rc;

use savefmt_core::{
    AllocCallback, DocCookie, Document, DocumentTable, ErrorCallback, FormatEngine,
    ReplaceOptions, SaveNotifier, SubscriptionHandle,
};

/// How the stub engine answers a call.
#[derive(Debug, Clone)]
pub enum Mode {
    /// Put every statement on its own line and indent blocks by two spaces.
    Expand,
    /// Return this text verbatim.
    Fixed(String),
    /// Return null.
    Null,
    /// Allocate an output buffer, then panic before returning it.
    PanicAfterAlloc,
    /// Return a pointer the memory bridge never handed out.
    Foreign,
    /// Allocate a scratch buffer it never returns, then answer like `Expand`.
    Leaky,
    /// Ask for a zero-byte buffer and return whatever comes back.
    ZeroAlloc,
}

/// How the stub engine answers a version query.
#[derive(Debug, Clone, Copy)]
pub enum Version {
    Fixed,
    Null,
    Panic,
}

pub struct StubEngine {
    mode: Mode,
    version: Version,
    report: Vec<(i32, CString)>,
    pub calls: Rc<Cell<usize>>,
    pub last_options: Rc<RefCell<String>>,
}

static FOREIGN: [u16; 4] = [b'b' as u16, b'a' as u16, b'd' as u16, 0];

impl StubEngine {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            version: Version::Fixed,
            report: Vec::new(),
            calls: Rc::new(Cell::new(0)),
            last_options: Rc::new(RefCell::new(String::new())),
        }
    }

    /// Report `message` through the error callback on every call.
    pub fn reporting(mut self, code: i32, message: &str) -> Self {
        self.report.push((code, CString::new(message).unwrap()));
        self
    }

    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }
}

unsafe fn read_wide(ptr: *const u16) -> String {
    let mut len = 0;
    unsafe {
        while *ptr.add(len) != 0 {
            len += 1;
        }
        String::from_utf16(std::slice::from_raw_parts(ptr, len)).unwrap()
    }
}

fn write_wide(text: &str, alloc: AllocCallback) -> *mut u16 {
    let wide: Vec<u16> = text.encode_utf16().chain(Some(0)).collect();
    let ptr = alloc((wide.len() * 2) as c_ulong).cast::<u16>();
    if !ptr.is_null() {
        unsafe { std::ptr::copy_nonoverlapping(wide.as_ptr(), ptr, wide.len()) };
    }
    ptr
}

impl FormatEngine for StubEngine {
    unsafe fn format_utf16(
        &self,
        source: *const u16,
        options: *const u16,
        on_error: ErrorCallback,
        alloc: AllocCallback,
    ) -> *mut u16 {
        self.calls.set(self.calls.get() + 1);
        let (source, options) = unsafe { (read_wide(source), read_wide(options)) };
        *self.last_options.borrow_mut() = options;

        for (code, message) in &self.report {
            on_error(*code, message.as_ptr());
        }

        match &self.mode {
            Mode::Expand => write_wide(&expand(&source), alloc),
            Mode::Fixed(text) => write_wide(text, alloc),
            Mode::Null => std::ptr::null_mut(),
            Mode::PanicAfterAlloc => {
                let _ = write_wide(&source, alloc);
                panic!("engine stub fault");
            }
            Mode::Foreign => FOREIGN.as_ptr().cast_mut(),
            Mode::Leaky => {
                let _scratch = alloc(64);
                write_wide(&expand(&source), alloc)
            }
            Mode::ZeroAlloc => alloc(0).cast::<u16>(),
        }
    }

    fn version(&self) -> *const c_char {
        match self.version {
            Version::Fixed => c"Artistic Style 3.4.13".as_ptr(),
            Version::Null => std::ptr::null(),
            Version::Panic => panic!("version table unavailable"),
        }
    }
}

/// A toy brace-style formatter. Formatting its own output changes nothing.
pub fn expand(source: &str) -> String {
    let mut lines = Vec::new();
    let mut depth = 0usize;
    let mut segment = String::new();

    let indent = |depth: usize, text: &str| format!("{}{}", "  ".repeat(depth), text);

    for ch in source.chars() {
        match ch {
            '{' | '}' | ';' => {
                let s = segment.split_whitespace().collect::<Vec<_>>().join(" ");
                segment.clear();
                match ch {
                    '{' => {
                        let open = if s.is_empty() { "{".to_string() } else { format!("{s} {{") };
                        lines.push(indent(depth, &open));
                        depth += 1;
                    }
                    ';' => lines.push(indent(depth, &format!("{s};"))),
                    _ => {
                        if !s.is_empty() {
                            lines.push(indent(depth, &s));
                        }
                        depth = depth.saturating_sub(1);
                        lines.push(indent(depth, "}"));
                    }
                }
            }
            _ => segment.push(ch),
        }
    }
    let rest = segment.split_whitespace().collect::<Vec<_>>().join(" ");
    if !rest.is_empty() {
        lines.push(indent(depth, &rest));
    }
    lines.join("\n")
}

#[derive(Debug, Clone, PartialEq)]
pub struct Replace {
    pub document: String,
    pub text: String,
    pub options: ReplaceOptions,
}

pub struct StubDocument {
    pub name: String,
    pub language: String,
    pub read_only: bool,
    pub text: String,
    replaces: Rc<RefCell<Vec<Replace>>>,
}

impl Document for StubDocument {
    fn full_name(&self) -> &str {
        &self.name
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn language(&self) -> &str {
        &self.language
    }

    fn text(&self) -> String {
        self.text.clone()
    }

    fn replace_text(&mut self, text: &str, options: ReplaceOptions) -> savefmt_core::Result<()> {
        self.replaces.borrow_mut().push(Replace {
            document: self.name.clone(),
            text: text.to_string(),
            options,
        });
        self.text = text.to_string();
        Ok(())
    }
}

/// Cookie `n` names the `n`th document added (starting at 1). Cookies past
/// the end resolve to a path that is no longer open.
#[derive(Default)]
pub struct StubHost {
    pub documents: Vec<StubDocument>,
    pub replaces: Rc<RefCell<Vec<Replace>>>,
    pub advised: Rc<Cell<u32>>,
    pub unadvised: Rc<Cell<u32>>,
}

impl StubHost {
    pub fn open(&mut self, name: &str, language: &str, text: &str) -> DocCookie {
        self.documents.push(StubDocument {
            name: name.to_string(),
            language: language.to_string(),
            read_only: false,
            text: text.to_string(),
            replaces: Rc::clone(&self.replaces),
        });
        DocCookie(self.documents.len() as u32)
    }

    pub fn text_of(&self, name: &str) -> &str {
        &self
            .documents
            .iter()
            .find(|d| d.name == name)
            .expect("document is open")
            .text
    }
}

impl DocumentTable for StubHost {
    type Document = StubDocument;

    fn moniker(&self, cookie: DocCookie) -> Option<String> {
        let index = cookie.0.checked_sub(1)? as usize;
        Some(
            self.documents
                .get(index)
                .map_or_else(|| format!("/closed/{}", cookie.0), |d| d.name.clone()),
        )
    }

    fn documents_mut(&mut self) -> Box<dyn Iterator<Item = &mut StubDocument> + '_> {
        Box::new(self.documents.iter_mut())
    }
}

impl SaveNotifier for StubHost {
    fn advise(&mut self) -> savefmt_core::Result<SubscriptionHandle> {
        self.advised.set(self.advised.get() + 1);
        Ok(SubscriptionHandle(7))
    }

    fn unadvise(&mut self, _handle: SubscriptionHandle) -> savefmt_core::Result<()> {
        self.unadvised.set(self.unadvised.get() + 1);
        Ok(())
    }
}
