//! Edit sessions binding a decoded resource to an archive file
//!
//! A session decodes one file of a [`RarcArchive`] into a resource
//! ([`BcsvTable`](crate::bcsv::BcsvTable), [`MsbtFile`](crate::msbt::MsbtFile),
//! [`MsbfFile`](crate::msbf::MsbfFile), or any other [`GalaxyFormat`]),
//! tracks whether it has unsaved edits, and writes it back into the
//! archive's copy of the file on [`save`](EditSession::save). Writing the
//! archive itself is a separate call to [`RarcArchive::save`].
//!
//! ```text
//! Unloaded --load--> Loaded --resource_mut--> Modified --save--> Saved
//!                      |                        ^   |              |
//!                      |                        +---+--------------+
//!                      +-------------------close----------------> Closed
//! ```
//!
//! # Example
//!
//! ```
//! use starbit_formats::bcsv::{BcsvTable, FieldType, FieldValue};
//! use starbit_formats::rarc::RarcArchive;
//! use starbit_formats::session::{EditSession, SessionState};
//!
//! let mut table = BcsvTable::new();
//! table.add_field("HitPointNum", FieldType::Int).unwrap();
//! table.add_entry();
//!
//! let mut archive = RarcArchive::new("Stage");
//! let handle = archive.create_file("", "data.bcsv").unwrap();
//! archive.set_contents(&handle, table.build().unwrap()).unwrap();
//!
//! let mut session = EditSession::<BcsvTable>::open(&mut archive, "data.bcsv").unwrap();
//! session
//!     .resource_mut()
//!     .unwrap()
//!     .set_value(0, "HitPointNum", FieldValue::Int(5))
//!     .unwrap();
//! assert_eq!(session.state(), SessionState::Modified);
//!
//! session.save(&mut archive).unwrap();
//! session.close(&mut archive).unwrap();
//! ```

use thiserror::Error;
use tracing::{debug, info};

use crate::rarc::{Binding, FileHandle, RarcArchive, RarcError};
use crate::{FormatError, GalaxyFormat};

/// Session errors
#[derive(Debug, Error)]
pub enum SessionError {
    /// Session was already closed
    #[error("session is closed")]
    Closed,

    /// No file has been loaded yet
    #[error("session has no resource loaded")]
    NotLoaded,

    /// A file is already loaded
    #[error("session already holds {0}")]
    AlreadyLoaded(String),

    /// Archive lookup or binding failed
    #[error(transparent)]
    Archive(#[from] RarcError),

    /// File contents could not be decoded
    #[error("failed to decode {path}: {source}")]
    Decode {
        /// File being decoded
        path: String,
        /// Decoder error
        source: FormatError,
    },

    /// Resource could not be encoded
    #[error("failed to encode {path}: {source}")]
    Encode {
        /// File being encoded
        path: String,
        /// Encoder error
        source: FormatError,
    },
}

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Lifecycle state of an [`EditSession`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Nothing loaded
    Unloaded,
    /// Decoded and unchanged
    Loaded,
    /// Changed since it was loaded or last saved
    Modified,
    /// Written back to the archive
    Saved,
    /// Finished; every operation fails
    Closed,
}

/// Editing session over one archive file
///
/// Dropping a session without [`close`](Self::close) also releases its
/// file, discarding unsaved edits.
#[derive(Debug)]
pub struct EditSession<R> {
    state: SessionState,
    binding: Option<Binding>,
    resource: Option<R>,
}

impl<R: GalaxyFormat> Default for EditSession<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: GalaxyFormat> EditSession<R> {
    /// Create an unloaded session
    pub const fn new() -> Self {
        Self {
            state: SessionState::Unloaded,
            binding: None,
            resource: None,
        }
    }

    /// Create a session and load the file at `path`
    pub fn open(archive: &mut RarcArchive, path: &str) -> SessionResult<Self> {
        let mut session = Self::new();
        session.load(archive, path)?;
        Ok(session)
    }

    /// Bind the file at `path` and decode it
    ///
    /// The file stays bound until the session is closed or dropped, so no
    /// other session can load it and it cannot be removed or renamed.
    pub fn load(&mut self, archive: &mut RarcArchive, path: &str) -> SessionResult<()> {
        match self.state {
            SessionState::Closed => return Err(SessionError::Closed),
            SessionState::Unloaded => {}
            _ => {
                let held = self
                    .binding
                    .as_ref()
                    .map_or("", |binding| binding.handle().path());
                return Err(SessionError::AlreadyLoaded(held.to_string()));
            }
        }

        let handle = archive.open_file(path)?;
        let binding = archive.bind(&handle)?;

        let parsed = match archive.read(&handle) {
            Ok(data) => R::parse(data).map_err(|source| SessionError::Decode {
                path: handle.path().to_string(),
                source,
            }),
            Err(error) => Err(error.into()),
        };
        let resource = match parsed {
            Ok(resource) => resource,
            Err(error) => {
                archive.unbind(binding);
                return Err(error);
            }
        };

        debug!("Loaded {} for editing", handle.path());
        self.binding = Some(binding);
        self.resource = Some(resource);
        self.state = SessionState::Loaded;
        Ok(())
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Check whether there are edits not yet saved
    #[must_use]
    pub fn is_modified(&self) -> bool {
        self.state == SessionState::Modified
    }

    /// Handle of the bound file
    pub fn handle(&self) -> SessionResult<&FileHandle> {
        self.check_open()?;
        self.binding
            .as_ref()
            .map(Binding::handle)
            .ok_or(SessionError::NotLoaded)
    }

    /// Read access to the decoded resource
    pub fn resource(&self) -> SessionResult<&R> {
        self.check_open()?;
        self.resource.as_ref().ok_or(SessionError::NotLoaded)
    }

    /// Write access to the decoded resource
    ///
    /// Moves the session to [`SessionState::Modified`].
    pub fn resource_mut(&mut self) -> SessionResult<&mut R> {
        self.check_open()?;
        let resource = self.resource.as_mut().ok_or(SessionError::NotLoaded)?;
        self.state = SessionState::Modified;
        Ok(resource)
    }

    /// Encode the resource into the archive's copy of the file
    pub fn save(&mut self, archive: &mut RarcArchive) -> SessionResult<()> {
        self.check_open()?;
        let (Some(binding), Some(resource)) = (&self.binding, &self.resource) else {
            return Err(SessionError::NotLoaded);
        };
        let handle = binding.handle();

        let data = resource.build().map_err(|source| SessionError::Encode {
            path: handle.path().to_string(),
            source,
        })?;
        archive.set_contents(handle, data)?;

        info!("Saved {} into the archive", handle.path());
        self.state = SessionState::Saved;
        Ok(())
    }

    /// Unbind the file and end the session
    ///
    /// Unsaved edits are discarded.
    pub fn close(&mut self, archive: &mut RarcArchive) -> SessionResult<()> {
        self.check_open()?;
        if let Some(binding) = self.binding.take() {
            if self.state == SessionState::Modified {
                debug!("Discarding unsaved edits to {}", binding.handle().path());
            }
            archive.unbind(binding);
        }
        self.resource = None;
        self.state = SessionState::Closed;
        Ok(())
    }

    fn check_open(&self) -> SessionResult<()> {
        if self.state == SessionState::Closed {
            return Err(SessionError::Closed);
        }
        Ok(())
    }
}
