pub mod djvu_dir;
pub mod djvu_doceditor;
pub mod djvu_document;
pub mod djvu_nav;
pub mod document_encoder;
pub mod page_encoder;

// Re-export public items
pub use djvu_dir::*;
pub use djvu_doceditor::*;
pub use djvu_document::*;
pub use document_encoder::DocumentEncoder;
pub use page_encoder::{PageComponents, PageEncodeParams};
