//! What the core needs from the editor hosting it.
//!
//! The host owns documents and the save notification source. The core only
//! sees them through these traits.

use crate::error::Result;

/// Identifies a document in the host's running document table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocCookie(pub u32);

/// Token returned by the host when the core subscribes to save notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(pub u32);

/// How a full-text replace should be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaceOptions {
    /// Remap caret, selection and bookmarks onto the new text instead of
    /// invalidating them.
    pub keep_markers: bool,
    /// Apply as one undoable edit.
    pub single_edit: bool,
}

impl ReplaceOptions {
    /// Options used when writing formatted text back before a save.
    pub const PRESERVE: Self = Self {
        keep_markers: true,
        single_edit: true,
    };
}

/// A document open in the host.
pub trait Document {
    /// Canonical full path, as used by the running document table.
    fn full_name(&self) -> &str;

    fn is_read_only(&self) -> bool;

    /// Host language tag, e.g. `"C/C++"`.
    fn language(&self) -> &str;

    /// The full current text.
    fn text(&self) -> String;

    /// Replace the full text.
    fn replace_text(&mut self, text: &str, options: ReplaceOptions) -> Result<()>;
}

/// Lookup services over the documents the host has open.
pub trait DocumentTable {
    type Document: Document;

    /// Resolve a cookie to the document's canonical full name.
    fn moniker(&self, cookie: DocCookie) -> Option<String>;

    /// Every open document.
    fn documents_mut(&mut self) -> Box<dyn Iterator<Item = &mut Self::Document> + '_>;
}

/// The host's "document about to be saved" notification source.
pub trait SaveNotifier {
    fn advise(&mut self) -> Result<SubscriptionHandle>;

    fn unadvise(&mut self, handle: SubscriptionHandle) -> Result<()>;
}
