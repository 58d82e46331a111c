//! Data-source collaborator.
//!
//! The document never touches storage directly; it reads and writes through
//! a [`DataSource`] and can subscribe to change notifications for sources
//! that are edited elsewhere. [`MemoryDataSource`] backs tests and
//! scratch documents.

use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;

/// Notification that a source changed outside the document.
#[derive(Debug, Clone)]
pub struct DataChange {
    pub url: String,
}

#[allow(async_fn_in_trait)]
pub trait DataSource {
    async fn read(&self, url: &str) -> io::Result<String>;
    async fn write(&self, url: &str, content: &str) -> io::Result<()>;
    fn changes(&self) -> broadcast::Receiver<DataChange>;
}

/// In-memory data source.
#[derive(Debug, Clone)]
pub struct MemoryDataSource {
    files: Arc<Mutex<HashMap<String, String>>>,
    changes: broadcast::Sender<DataChange>,
}

impl Default for MemoryDataSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDataSource {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(16);
        Self {
            files: Arc::new(Mutex::new(HashMap::new())),
            changes,
        }
    }

    pub fn with_file(self, url: &str, content: &str) -> Self {
        self.insert(url, content);
        self
    }

    pub fn insert(&self, url: &str, content: &str) {
        self.files
            .lock()
            .unwrap()
            .insert(url.to_string(), content.to_string());
    }

    pub fn get(&self, url: &str) -> Option<String> {
        self.files.lock().unwrap().get(url).cloned()
    }
}

impl DataSource for MemoryDataSource {
    async fn read(&self, url: &str) -> io::Result<String> {
        self.files
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no source at {url}")))
    }

    async fn write(&self, url: &str, content: &str) -> io::Result<()> {
        self.insert(url, content);
        // Nobody listening is fine.
        let _ = self.changes.send(DataChange {
            url: url.to_string(),
        });
        Ok(())
    }

    fn changes(&self) -> broadcast::Receiver<DataChange> {
        self.changes.subscribe()
    }
}
