//! Hash to name recovery table
//!
//! BCSV files only carry field hashes. A [`FieldNameTable`] remembers every
//! name that has been hashed so far, so tables can be shown with readable
//! column names. Hashes without a known name are displayed as the raw hash.
//!
//! The table is append-only and is normally backed by a lookup file with
//! one entry per two lines:
//!
//! ```text
//! # 00337A8B
//! name
//! ```
//!
//! Lines starting with `#` are comments; every other non-blank line is a
//! name which is hashed on load.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use tracing::debug;

use crate::error::{HashError, HashResult};
use crate::jmap;

/// Field names found in nearly every Galaxy placement and scenario table
const DEFAULT_NAMES: &[&str] = &[
    "name",
    "l_id",
    "pos_x",
    "pos_y",
    "pos_z",
    "dir_x",
    "dir_y",
    "dir_z",
    "scale_x",
    "scale_y",
    "scale_z",
    "Obj_arg0",
    "Obj_arg1",
    "Obj_arg2",
    "Obj_arg3",
    "Obj_arg4",
    "Obj_arg5",
    "Obj_arg6",
    "Obj_arg7",
    "SW_APPEAR",
    "SW_DEAD",
    "SW_A",
    "SW_B",
    "SW_SLEEP",
    "CommonPath_ID",
    "ClippingGroupId",
    "GroupId",
    "DemoGroupId",
    "MapParts_ID",
    "Obj_ID",
    "CameraSetId",
    "MessageId",
    "ShapeModelNo",
    "ParentID",
    "ZoneName",
    "ScenarioNo",
    "ScenarioName",
    "PowerStarId",
    "AppearPowerStarObj",
    "HitPointNum",
];

/// Append-only mapping from JMap hash to plaintext field name
#[derive(Debug, Clone, Default)]
pub struct FieldNameTable {
    names: HashMap<u32, String>,
}

impl FieldNameTable {
    /// Create a table seeded with common field names
    pub fn with_defaults() -> Self {
        let mut table = Self::empty();
        for name in DEFAULT_NAMES {
            table.add(name);
        }
        table
    }

    /// Create an empty table
    pub fn empty() -> Self {
        Self {
            names: HashMap::new(),
        }
    }

    /// Hash a name and remember it, returning the hash
    ///
    /// The first name recorded for a hash wins; later colliding names do
    /// not replace it.
    pub fn add(&mut self, name: &str) -> u32 {
        let hash = jmap::hash(name);
        self.names.entry(hash).or_insert_with(|| name.to_string());
        hash
    }

    /// Look up the name recorded for a hash
    pub fn name_of(&self, hash: u32) -> Option<&str> {
        self.names.get(&hash).map(String::as_str)
    }

    /// Name for display: the recorded name, or the hash as `[XXXXXXXX]`
    pub fn display_name(&self, hash: u32) -> Cow<'_, str> {
        match self.name_of(hash) {
            Some(name) => Cow::Borrowed(name),
            None => Cow::Owned(format!("[{hash:08X}]")),
        }
    }

    /// Check whether a hash has a recorded name
    pub fn contains(&self, hash: u32) -> bool {
        self.names.contains_key(&hash)
    }

    /// Number of recorded names
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterate over `(hash, name)` pairs in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> + '_ {
        self.names.iter().map(|(&hash, name)| (hash, name.as_str()))
    }

    /// Load names from lookup file content, returning how many were read
    ///
    /// # Example
    ///
    /// ```
    /// use starbit_hash::FieldNameTable;
    ///
    /// let content = "# 00337A8B\nname\n\n# 61169069\nHitPointNum\n";
    /// let mut names = FieldNameTable::empty();
    /// assert_eq!(names.load_from_str(content), 2);
    /// assert_eq!(names.name_of(0x6116_9069), Some("HitPointNum"));
    /// ```
    pub fn load_from_str(&mut self, content: &str) -> usize {
        let mut count = 0;

        for line in content.lines() {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }

            self.add(line);
            count += 1;
        }

        count
    }

    /// Load names from a lookup file
    ///
    /// A missing file is treated as empty so a fresh installation can start
    /// with no lookup file at all.
    pub fn load(&mut self, path: &Path) -> HashResult<usize> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No name lookup file at {}", path.display());
                return Ok(0);
            }
            Err(e) => return Err(e.into()),
        };

        let count = self.load_from_str(&content);
        debug!("Loaded {} field names from {}", count, path.display());
        Ok(count)
    }

    /// Record a newly discovered name and append it to the lookup file
    ///
    /// Names already present in the table are not written again.
    pub fn append_to_file(&mut self, path: &Path, name: &str) -> HashResult<u32> {
        if name.trim().is_empty() || name.contains(['\n', '\r']) || name.starts_with('#') {
            return Err(HashError::InvalidName(name.to_string()));
        }

        let hash = jmap::hash(name);
        if self.name_of(hash) == Some(name) {
            return Ok(hash);
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "# {hash:08X}")?;
        writeln!(file, "{name}")?;

        self.add(name);
        debug!("Appended field name {} ({:08X}) to {}", name, hash, path.display());
        Ok(hash)
    }
}
