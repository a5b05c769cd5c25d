use super::{next_sibling_position, DocumentTreeService};
use crate::content::ContentNode;
use crate::error::{AppError, AppResult};
use crate::models::{Document, DocumentPatch, NewDocument, UserSummary, DEFAULT_TITLE};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// In-process document tree for a single owner, following the backend's
/// ordering and archive rules.
pub struct MemoryDocumentTree {
    owner_id: String,
    documents: Mutex<Vec<Document>>,
    counter: AtomicU64,
}

impl MemoryDocumentTree {
    pub fn new(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            documents: Mutex::new(Vec::new()),
            counter: AtomicU64::new(1),
        }
    }

    /// Seed a document as stored, bypassing creation defaults.
    pub fn insert(&self, document: Document) {
        self.store().push(document);
    }

    /// Hide a document from listings and reads without deleting it.
    pub fn archive(&self, id: &str) -> AppResult<()> {
        let mut docs = self.store();
        let doc = docs
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| AppError::NotFound(id.to_string()))?;
        doc.is_archived = true;
        Ok(())
    }

    fn store(&self) -> MutexGuard<'_, Vec<Document>> {
        // Nothing panics while holding the lock, so a poisoned guard is still consistent.
        self.documents
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn next_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let mut bytes = [0u8; 6];
        match getrandom::getrandom(&mut bytes) {
            Ok(()) => {
                let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
                format!("doc{n}{hex}")
            }
            Err(_) => format!("doc{n}"),
        }
    }

    fn with_relations(&self, docs: &[Document], doc: &Document) -> Document {
        let mut children: Vec<&Document> = docs
            .iter()
            .filter(|d| !d.is_archived && d.parent_id.as_deref() == Some(doc.id.as_str()))
            .collect();
        children.sort_by_key(|d| d.position);

        let mut out = doc.clone();
        out.children = children.into_iter().map(Document::to_ref).collect();
        if out.owner.is_none() {
            out.owner = out.owner_id.clone().map(|id| UserSummary {
                id,
                name: None,
                email: None,
                image: None,
            });
        }
        out
    }

    fn live_sorted<'a>(
        &self,
        docs: &'a [Document],
        filter: impl Fn(&Document) -> bool,
    ) -> Vec<&'a Document> {
        let mut out: Vec<&Document> = docs
            .iter()
            .filter(|d| !d.is_archived && filter(d))
            .collect();
        out.sort_by_key(|d| d.position);
        out
    }
}

#[async_trait(?Send)]
impl DocumentTreeService for MemoryDocumentTree {
    async fn list(&self) -> AppResult<Vec<Document>> {
        let docs = self.store();
        Ok(self
            .live_sorted(&docs, |_| true)
            .into_iter()
            .map(|d| self.with_relations(&docs, d))
            .collect())
    }

    async fn list_children(&self, parent_id: Option<&str>) -> AppResult<Vec<Document>> {
        let docs = self.store();
        Ok(self
            .live_sorted(&docs, |d| d.parent_id.as_deref() == parent_id)
            .into_iter()
            .map(|d| self.with_relations(&docs, d))
            .collect())
    }

    async fn create(&self, new: NewDocument) -> AppResult<Document> {
        let parent_id = new.parent_id.filter(|p| !p.is_empty());
        let content = new.content.unwrap_or_else(ContentNode::empty_doc);
        content.validate()?;

        let id = self.next_id();
        let mut docs = self.store();
        if let Some(parent) = parent_id.as_deref() {
            if !docs.iter().any(|d| d.id == parent) {
                return Err(AppError::NotFound(parent.to_string()));
            }
        }

        // Archived siblings still hold their slot.
        let position = next_sibling_position(
            docs.iter()
                .filter(|d| d.parent_id == parent_id)
                .filter(|d| d.owner_id.as_deref() == Some(self.owner_id.as_str()))
                .map(|d| d.position),
        );

        let document = Document {
            id,
            title: new
                .title
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            icon: new.icon.filter(|i| !i.is_empty()),
            content: Some(content),
            parent_id,
            position,
            owner_id: Some(self.owner_id.clone()),
            is_archived: false,
            owner: None,
            children: Vec::new(),
            permissions: Vec::new(),
            created_at: None,
            updated_at: None,
        };
        debug!(id = %document.id, position, "created document");
        docs.push(document.clone());
        Ok(self.with_relations(&docs, &document))
    }

    async fn get(&self, id: &str) -> AppResult<Document> {
        let docs = self.store();
        let doc = docs
            .iter()
            .find(|d| d.id == id && !d.is_archived)
            .ok_or_else(|| AppError::NotFound(id.to_string()))?;
        Ok(self.with_relations(&docs, doc))
    }

    async fn update(&self, id: &str, patch: DocumentPatch) -> AppResult<Document> {
        if let Some(content) = &patch.content {
            content.validate()?;
        }

        let mut docs = self.store();
        let doc = docs
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| AppError::NotFound(id.to_string()))?;
        if let Some(title) = patch.title {
            doc.title = title;
        }
        if let Some(icon) = patch.icon {
            doc.icon = Some(icon).filter(|i| !i.is_empty());
        }
        if let Some(content) = patch.content {
            doc.content = Some(content);
        }
        let updated = doc.clone();
        Ok(self.with_relations(&docs, &updated))
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        let mut docs = self.store();
        if !docs.iter().any(|d| d.id == id) {
            return Err(AppError::NotFound(id.to_string()));
        }

        let mut doomed: HashSet<String> = HashSet::from([id.to_string()]);
        loop {
            let before = doomed.len();
            for d in docs.iter() {
                if d.parent_id.as_ref().is_some_and(|p| doomed.contains(p)) {
                    doomed.insert(d.id.clone());
                }
            }
            if doomed.len() == before {
                break;
            }
        }

        docs.retain(|d| !doomed.contains(&d.id));
        debug!(id, removed = doomed.len(), "deleted document subtree");
        Ok(())
    }
}
