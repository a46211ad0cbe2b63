//! savefmt Core
//!
//! Formats source code right before an editor saves it, by handing the text to
//! Artistic Style through its C ABI and writing the result back into the
//! document with caret and selection markers preserved.
//!
//! # Pieces
//!
//! - [`FormatEngineBinding`]: calls the engine, copies and frees the buffer it
//!   returns, and never lets a fault escape. Problems are published on its
//!   [`ErrorChannel`].
//! - [`SaveInterceptor`]: the one subscription to the host's "about to save"
//!   notification, and resolution of the document being saved.
//! - [`FormatOrchestrator`]: eligibility checks, per-language options,
//!   conditional replace.
//!
//! # Quick Start
//!
//! ```no_run
//! use savefmt_core::{
//!     FormatEngineBinding, FormatOrchestrator, LibraryEngine, OptionsTable, SaveInterceptor,
//! };
//! # use savefmt_core::{
//! #     DocCookie, Document, DocumentTable, ReplaceOptions, SaveNotifier, SubscriptionHandle,
//! # };
//! # struct Buffer(String);
//! # impl Document for Buffer {
//! #     fn full_name(&self) -> &str { "/src/main.cpp" }
//! #     fn is_read_only(&self) -> bool { false }
//! #     fn language(&self) -> &str { "C/C++" }
//! #     fn text(&self) -> String { self.0.clone() }
//! #     fn replace_text(&mut self, text: &str, _: ReplaceOptions) -> savefmt_core::Result<()> {
//! #         self.0 = text.to_string();
//! #         Ok(())
//! #     }
//! # }
//! # struct Editor(Vec<Buffer>);
//! # impl DocumentTable for Editor {
//! #     type Document = Buffer;
//! #     fn moniker(&self, _: DocCookie) -> Option<String> { Some("/src/main.cpp".into()) }
//! #     fn documents_mut(&mut self) -> Box<dyn Iterator<Item = &mut Buffer> + '_> {
//! #         Box::new(self.0.iter_mut())
//! #     }
//! # }
//! # impl SaveNotifier for Editor {
//! #     fn advise(&mut self) -> savefmt_core::Result<SubscriptionHandle> {
//! #         Ok(SubscriptionHandle(1))
//! #     }
//! #     fn unadvise(&mut self, _: SubscriptionHandle) -> savefmt_core::Result<()> { Ok(()) }
//! # }
//! # let editor_host = Editor(vec![Buffer("int main(){return 0;}".into())]);
//! # let cookie = DocCookie(1);
//!
//! let mut binding = FormatEngineBinding::new(LibraryEngine::load_default()?);
//! binding.errors_mut().subscribe(|e| eprintln!("AStyle formatter error: {e}"));
//!
//! let mut interceptor = SaveInterceptor::new(editor_host);
//! FormatOrchestrator::new(binding, OptionsTable::default()).attach_to(&mut interceptor);
//! interceptor.register()?;
//!
//! // The host calls this from its save path.
//! interceptor.notify_before_save(cookie);
//! # Ok::<(), savefmt_core::Error>(())
//! ```


pub mod engine;
pub mod error;
pub mod error_channel;
pub mod host;
pub mod interceptor;
pub mod memory;
pub mod options;
pub mod orchestrator;
pub mod types;

pub use engine::{AllocCallback, ErrorCallback, FormatEngine, FormatEngineBinding, LibraryEngine};
pub use error::{Error, Result};
pub use error_channel::{on_engine_error, ErrorChannel, SubscriberId};
pub use host::{
    DocCookie, Document, DocumentTable, ReplaceOptions, SaveNotifier, SubscriptionHandle,
};
pub use interceptor::{SaveInterceptor, SubscriptionState};
pub use memory::{on_engine_alloc, BridgeStats};
pub use options::{OptionsTable, CPP_DEFAULT_OPTIONS};
pub use orchestrator::{FormatOrchestrator, FormatOutcome, SkipReason};
pub use types::*;
