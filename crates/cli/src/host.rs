//! A file-backed editor host.
//!
//! Each file on the command line is an open document. "Saving" writes the
//! document's current text back to disk, after the before-save notification
//! has had its chance to format it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use savefmt_core::{
    DocCookie, Document, DocumentTable, Error, ReplaceOptions, SaveNotifier, SubscriptionHandle,
};

/// Host language tag for a file, derived from its extension.
pub fn language_tag(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "c" | "cc" | "cpp" | "cxx" | "c++" | "h" | "hh" | "hpp" | "hxx" | "inl" | "ino" => {
            "C/C++"
        }
        "cs" => "CSharp",
        "java" => "Java",
        _ => "Plain Text",
    }
}

/// A file loaded into memory.
#[derive(Debug)]
pub struct FileDocument {
    path: PathBuf,
    full_name: String,
    language: &'static str,
    read_only: bool,
    text: String,
    saved: String,
}

impl FileDocument {
    pub fn open(path: &Path) -> io::Result<Self> {
        let path = fs::canonicalize(path)?;
        let text = fs::read_to_string(&path)?;
        let read_only = fs::metadata(&path)?.permissions().readonly();
        Ok(Self {
            full_name: path.display().to_string(),
            language: language_tag(&path),
            read_only,
            saved: text.clone(),
            text,
            path,
        })
    }

    /// True when the in-memory text differs from what is on disk.
    pub fn is_modified(&self) -> bool {
        self.text != self.saved
    }

    /// Write the text to disk if it changed. Returns whether it wrote.
    pub fn save(&mut self) -> io::Result<bool> {
        if !self.is_modified() {
            return Ok(false);
        }
        fs::write(&self.path, &self.text)?;
        self.saved.clone_from(&self.text);
        Ok(true)
    }
}

impl Document for FileDocument {
    fn full_name(&self) -> &str {
        &self.full_name
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn language(&self) -> &str {
        self.language
    }

    fn text(&self) -> String {
        self.text.clone()
    }

    fn replace_text(&mut self, text: &str, _options: ReplaceOptions) -> savefmt_core::Result<()> {
        // No caret or selection to carry over for a file on disk.
        self.text = text.to_string();
        Ok(())
    }
}

/// Open files plus the single save subscription.
#[derive(Debug, Default)]
pub struct FileHost {
    documents: Vec<FileDocument>,
    subscription: Option<SubscriptionHandle>,
    next_handle: u32,
}

impl FileHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `path`. Cookies start at 1 and follow the order files were opened.
    ///
    /// A file that is already open keeps its cookie.
    pub fn open(&mut self, path: &Path) -> io::Result<DocCookie> {
        let canonical = fs::canonicalize(path)?;
        if let Some(index) = self.documents.iter().position(|d| d.path == canonical) {
            tracing::debug!(path = %canonical.display(), "already open");
            return Ok(DocCookie(index as u32 + 1));
        }
        let document = FileDocument::open(&canonical)?;
        tracing::debug!(path = %document.full_name, language = document.language, "opened");
        self.documents.push(document);
        Ok(DocCookie(self.documents.len() as u32))
    }

    pub fn document(&self, cookie: DocCookie) -> Option<&FileDocument> {
        let index = cookie.0.checked_sub(1)? as usize;
        self.documents.get(index)
    }

    fn document_mut(&mut self, cookie: DocCookie) -> Option<&mut FileDocument> {
        let index = cookie.0.checked_sub(1)? as usize;
        self.documents.get_mut(index)
    }

    /// Persist the document behind `cookie`. Returns whether it wrote.
    pub fn save(&mut self, cookie: DocCookie) -> io::Result<bool> {
        match self.document_mut(cookie) {
            Some(document) => document.save(),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no open document for cookie {}", cookie.0),
            )),
        }
    }

    pub fn is_advised(&self) -> bool {
        self.subscription.is_some()
    }
}

impl DocumentTable for FileHost {
    type Document = FileDocument;

    fn moniker(&self, cookie: DocCookie) -> Option<String> {
        self.document(cookie).map(|d| d.full_name.clone())
    }

    fn documents_mut(&mut self) -> Box<dyn Iterator<Item = &mut FileDocument> + '_> {
        Box::new(self.documents.iter_mut())
    }
}

impl SaveNotifier for FileHost {
    fn advise(&mut self) -> savefmt_core::Result<SubscriptionHandle> {
        if self.subscription.is_some() {
            return Err(Error::Host("a before-save listener is already advised".into()));
        }
        self.next_handle += 1;
        let handle = SubscriptionHandle(self.next_handle);
        self.subscription = Some(handle);
        Ok(handle)
    }

    fn unadvise(&mut self, handle: SubscriptionHandle) -> savefmt_core::Result<()> {
        match self.subscription {
            Some(current) if current == handle => {
                self.subscription = None;
                Ok(())
            }
            _ => Err(Error::Host(format!("unknown subscription {}", handle.0))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_language_tags() {
        assert_eq!(language_tag(Path::new("src/main.cpp")), "C/C++");
        assert_eq!(language_tag(Path::new("include/Foo.HPP")), "C/C++");
        assert_eq!(language_tag(Path::new("Program.cs")), "CSharp");
        assert_eq!(language_tag(Path::new("Main.java")), "Java");
        assert_eq!(language_tag(Path::new("README")), "Plain Text");
    }

    #[test]
    fn test_open_replace_save() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("main.cpp");
        fs::write(&file, "int main(){return 0;}").unwrap();

        let mut host = FileHost::new();
        let cookie = host.open(&file).unwrap();
        assert_eq!(cookie, DocCookie(1));

        let name = host.moniker(cookie).unwrap();
        let document = host
            .documents_mut()
            .find(|d| d.full_name() == name)
            .unwrap();
        assert_eq!(document.language(), "C/C++");
        document
            .replace_text("int main() {\n  return 0;\n}", ReplaceOptions::PRESERVE)
            .unwrap();

        assert!(host.document(cookie).unwrap().is_modified());
        assert!(host.save(cookie).unwrap());
        assert!(!host.save(cookie).unwrap());
        assert_eq!(
            fs::read_to_string(&file).unwrap(),
            "int main() {\n  return 0;\n}"
        );
    }

    #[test]
    fn test_unknown_cookie() {
        let mut host = FileHost::new();
        assert_eq!(host.moniker(DocCookie(0)), None);
        assert_eq!(host.moniker(DocCookie(3)), None);
        assert!(host.save(DocCookie(3)).is_err());
    }

    #[test]
    fn test_reopening_a_file_keeps_its_cookie() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.cpp");
        fs::write(&file, "int a;").unwrap();

        let mut host = FileHost::new();
        let first = host.open(&file).unwrap();
        let again = host.open(&dir.path().join(".").join("a.cpp")).unwrap();

        assert_eq!(first, again);
        assert_eq!(host.documents_mut().count(), 1);
    }

    #[test]
    fn test_single_subscription() {
        let mut host = FileHost::new();
        let handle = host.advise().unwrap();
        assert!(host.advise().is_err());
        host.unadvise(handle).unwrap();
        assert!(host.unadvise(handle).is_err());
        assert!(!host.is_advised());
    }
}
