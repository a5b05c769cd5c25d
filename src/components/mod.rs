pub mod ui;

mod child_documents;
mod content_view;
mod media_panel;
mod sidebar;
mod toc;

pub use child_documents::ChildDocuments;
pub use content_view::ContentView;
pub use media_panel::MediaPanel;
pub use sidebar::DocumentSidebar;
pub use toc::TableOfContents;
