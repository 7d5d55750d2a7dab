//! Test fixtures and sample models.
//!
//! Common setup code for integration tests.

use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use persistkit::Model;
use persistkit_core::{CodecError, Color, DataSize, Point, Record, Rect};
use persistkit_store::StoreHandle;
use tempfile::TempDir;

/// A store in a fresh temporary directory, removed on drop.
pub struct TempStore {
    dir: TempDir,
    handle: StoreHandle,
}

impl TempStore {
    /// Open a new store under a temporary directory.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let handle = StoreHandle::open_at(dir.path().join("Database.sqlite")).expect("open temp store");
        Self { dir, handle }
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self) -> PathBuf {
        self.dir.path().join("Database.sqlite")
    }

    pub fn handle(&self) -> &StoreHandle {
        &self.handle
    }

    /// An independent second handle to the same database file.
    pub fn reopen(&self) -> StoreHandle {
        StoreHandle::open_at(self.path()).expect("reopen temp store")
    }
}

impl Default for TempStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for TempStore {
    type Target = StoreHandle;

    fn deref(&self) -> &StoreHandle {
        &self.handle
    }
}

/// A model with an integer primary key.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub id: i64,
    pub title: String,
    pub body: Option<String>,
    pub pinned: bool,
    pub created: SystemTime,
}

impl Note {
    pub fn new(id: i64, title: &str) -> Self {
        Self {
            id,
            title: title.to_string(),
            body: None,
            pinned: false,
            created: UNIX_EPOCH + Duration::from_secs(1_700_000_000),
        }
    }

    pub fn with_body(mut self, body: &str) -> Self {
        self.body = Some(body.to_string());
        self
    }
}

impl Model for Note {
    const TYPE_NAME: &'static str = "Note";
    const PRIMARY_KEY: Option<&'static str> = Some("id");

    fn to_record(&self) -> Record {
        Record::new()
            .with("id", self.id)
            .with("title", self.title.as_str())
            .with("body", self.body.clone())
            .with("pinned", self.pinned)
            .with_bridged("created", &self.created)
    }

    fn from_record(record: &Record) -> Result<Self, CodecError> {
        Ok(Self {
            id: record.int("id")?,
            title: record.text("title")?.to_string(),
            body: record.optional_text("body")?.map(str::to_string),
            pinned: record.bool("pinned")?,
            created: record.bridged("created")?,
        })
    }
}

/// A model with a text primary key.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub name: String,
    pub color: Color,
    pub uses: i64,
}

impl Label {
    pub fn new(name: &str, color: Color) -> Self {
        Self {
            name: name.to_string(),
            color,
            uses: 0,
        }
    }
}

impl Model for Label {
    const TYPE_NAME: &'static str = "Label";
    const PRIMARY_KEY: Option<&'static str> = Some("name");

    fn to_record(&self) -> Record {
        Record::new()
            .with("name", self.name.as_str())
            .with_bridged("color", &self.color)
            .with("uses", self.uses)
    }

    fn from_record(record: &Record) -> Result<Self, CodecError> {
        Ok(Self {
            name: record.text("name")?.to_string(),
            color: record.bridged("color")?,
            uses: record.int("uses")?,
        })
    }
}

/// A keyless model built from bridged values.
#[derive(Debug, Clone, PartialEq)]
pub struct Sketch {
    pub name: String,
    pub frame: Rect,
    pub anchor: Point,
    pub tint: Color,
    pub duration: Duration,
    pub size: DataSize,
    pub source: Option<PathBuf>,
}

impl Sketch {
    pub fn new(name: &str, frame: Rect) -> Self {
        Self {
            name: name.to_string(),
            frame,
            anchor: frame.origin,
            tint: Color::BLACK,
            duration: Duration::from_millis(1500),
            size: DataSize::bytes(2048),
            source: None,
        }
    }
}

impl Model for Sketch {
    const TYPE_NAME: &'static str = "Sketch";

    fn to_record(&self) -> Record {
        Record::new()
            .with("name", self.name.as_str())
            .with_bridged("frame", &self.frame)
            .with("layout", Record::new().with_bridged("anchor", &self.anchor))
            .with_bridged("tint", &self.tint)
            .with_bridged("duration", &self.duration)
            .with_bridged("size", &self.size)
            .with_optional_bridged("source", self.source.as_ref())
    }

    fn from_record(record: &Record) -> Result<Self, CodecError> {
        Ok(Self {
            name: record.text("name")?.to_string(),
            frame: record.bridged("frame")?,
            anchor: record.embedded("layout")?.bridged("anchor")?,
            tint: record.bridged("tint")?,
            duration: record.bridged("duration")?,
            size: record.bridged("size")?,
            source: record.optional_bridged("source")?,
        })
    }
}
