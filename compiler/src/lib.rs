pub mod attachments;
pub mod compiler;
pub mod error;
pub mod ids;

pub use attachments::{Attachment, AttachmentPolicy, extract_attachments};
pub use compiler::{Compiled, Compiler, compile};
pub use error::{CompileError, DuplicateIdentifier};
pub use ids::{IdAssigner, assign_ids};
