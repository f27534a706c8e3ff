//! Editable RARC archive

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Weak};

use tracing::{debug, info};

use super::error::{RarcError, RarcResult};
use super::reader;
use super::tree::{self, RarcDirectory, RarcFile, RarcNode};
use super::writer::{self, RarcWriteOptions};
use crate::{FormatError, GalaxyFormat, yaz0};

/// Handle to a file inside a [`RarcArchive`]
///
/// Handles name a path, not a buffer; they stay valid across
/// [`RarcArchive::set_contents`] and become stale if the file is removed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileHandle {
    path: String,
}

impl FileHandle {
    /// Path of the file relative to the archive root
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Claim on an archive file returned by [`RarcArchive::bind`]
///
/// The file stays bound while the binding is alive. Dropping it releases
/// the file just like [`RarcArchive::unbind`].
#[derive(Debug)]
pub struct Binding {
    handle: FileHandle,
    _token: Arc<()>,
}

impl Binding {
    /// Handle of the bound file
    pub fn handle(&self) -> &FileHandle {
        &self.handle
    }
}

/// Decoded RARC archive
///
/// All mutations happen in memory; nothing is written until [`save`]
/// or [`save_to`] is called.
///
/// [`save`]: RarcArchive::save
/// [`save_to`]: RarcArchive::save_to
#[derive(Debug)]
pub struct RarcArchive {
    root: RarcDirectory,
    options: RarcWriteOptions,
    compressed: bool,
    bound: HashMap<String, Weak<()>>,
}

impl PartialEq for RarcArchive {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root && self.options == other.options
    }
}

impl RarcArchive {
    /// Create an empty archive whose root directory is `root_name`
    pub fn new(root_name: impl Into<String>) -> Self {
        Self {
            root: RarcDirectory::new(root_name),
            options: RarcWriteOptions::default(),
            compressed: false,
            bound: HashMap::new(),
        }
    }

    /// Decode an uncompressed archive
    pub fn open(data: &[u8]) -> RarcResult<Self> {
        let decoded = reader::decode(data)?;
        Ok(Self {
            root: decoded.root,
            options: RarcWriteOptions::default().with_sync_file_ids(decoded.sync_file_ids),
            compressed: false,
            bound: HashMap::new(),
        })
    }

    /// Decode an archive, removing a Yaz0 layer if present
    pub fn load(data: &[u8]) -> RarcResult<Self> {
        if yaz0::is_yaz0(data) {
            let raw = yaz0::decompress(data)?;
            let mut archive = Self::open(&raw)?;
            archive.compressed = true;
            return Ok(archive);
        }
        Self::open(data)
    }

    /// Read and decode an archive file
    pub fn open_path(path: &Path) -> RarcResult<Self> {
        let data = std::fs::read(path)?;
        let archive = Self::load(&data)?;
        info!(
            "Opened {} ({} files{})",
            path.display(),
            archive.root.file_count(),
            if archive.compressed { ", Yaz0" } else { "" }
        );
        Ok(archive)
    }

    /// Encode the archive without compression
    pub fn save(&self) -> RarcResult<Vec<u8>> {
        writer::encode(&self.root, self.options)
    }

    /// Encode the archive, compressing it if it was loaded compressed
    pub fn save_to(&self, path: &Path) -> RarcResult<()> {
        let mut data = self.save()?;
        if self.compressed {
            data = yaz0::compress(&data)?;
        }
        std::fs::write(path, &data)?;
        info!("Saved {} ({} bytes)", path.display(), data.len());
        Ok(())
    }

    /// Release the archive
    pub fn close(self) {
        let live = self.live_bindings().count();
        if live > 0 {
            debug!(
                "Closing archive '{}' with {} bound files",
                self.root.name, live
            );
        }
    }

    /// Whether [`save_to`](Self::save_to) compresses with Yaz0
    pub const fn is_compressed(&self) -> bool {
        self.compressed
    }

    /// Choose whether [`save_to`](Self::save_to) compresses with Yaz0
    pub fn set_compressed(&mut self, compressed: bool) {
        self.compressed = compressed;
    }

    /// Write options used by [`save`](Self::save)
    pub const fn options(&self) -> RarcWriteOptions {
        self.options
    }

    /// Replace the write options
    pub fn set_options(&mut self, options: RarcWriteOptions) {
        self.options = options;
    }

    /// Root directory
    pub const fn root(&self) -> &RarcDirectory {
        &self.root
    }

    /// Name of the root directory
    pub fn root_name(&self) -> &str {
        &self.root.name
    }

    /// Paths of all files, depth-first in on-disk order
    ///
    /// Every call starts a new traversal.
    pub fn files(&self) -> impl Iterator<Item = String> + '_ {
        self.walk().map(|(path, _)| path)
    }

    /// Files with their paths, depth-first in on-disk order
    pub fn walk(&self) -> Walk<'_> {
        Walk {
            stack: vec![(String::new(), self.root.children.iter())],
        }
    }

    /// Paths of all directories below the root, depth-first
    pub fn directories(&self) -> Vec<String> {
        fn visit(dir: &RarcDirectory, prefix: &str, out: &mut Vec<String>) {
            for child in &dir.children {
                if let RarcNode::Directory(sub) = child {
                    let path = join(prefix, &sub.name);
                    out.push(path.clone());
                    visit(sub, &path, out);
                }
            }
        }

        let mut out = Vec::new();
        visit(&self.root, "", &mut out);
        out
    }

    /// Check whether a file or directory exists at `path`
    pub fn exists(&self, path: &str) -> bool {
        tree::is_root(path).unwrap_or(false) || self.root.lookup(path).is_ok()
    }

    /// Get a handle to the file at `path`
    pub fn open_file(&self, path: &str) -> RarcResult<FileHandle> {
        reject_root(path)?;
        match self.root.lookup(path)? {
            RarcNode::File(_) => Ok(FileHandle {
                path: canonical(path)?,
            }),
            RarcNode::Directory(_) => Err(RarcError::NotAFile(path.to_string())),
        }
    }

    /// Contents of the file behind `handle`
    pub fn read(&self, handle: &FileHandle) -> RarcResult<&[u8]> {
        Ok(&self.file(&handle.path)?.data)
    }

    /// Contents of the file at `path`
    pub fn read_file(&self, path: &str) -> RarcResult<&[u8]> {
        Ok(&self.file(path)?.data)
    }

    /// Attribute flags of the file behind `handle`
    pub fn attributes(&self, handle: &FileHandle) -> RarcResult<u8> {
        Ok(self.file(&handle.path)?.attributes)
    }

    /// Replace the contents of the file behind `handle`
    pub fn set_contents(&mut self, handle: &FileHandle, data: Vec<u8>) -> RarcResult<()> {
        let file = self.file_mut(&handle.path)?;
        debug!(
            "Replacing {} ({} -> {} bytes)",
            handle.path,
            file.data.len(),
            data.len()
        );
        file.data = data;
        Ok(())
    }

    /// Create an empty file named `name` in directory `dir`
    pub fn create_file(&mut self, dir: &str, name: &str) -> RarcResult<FileHandle> {
        let path = join(&canonical(dir)?, name);
        self.root
            .directory_mut(dir)?
            .insert(RarcNode::File(RarcFile::new(name)), &path)?;
        Ok(FileHandle { path })
    }

    /// Create an empty directory named `name` in directory `parent`
    pub fn create_directory(&mut self, parent: &str, name: &str) -> RarcResult<()> {
        let path = join(&canonical(parent)?, name);
        self.root
            .directory_mut(parent)?
            .insert(RarcNode::Directory(RarcDirectory::new(name)), &path)
    }

    /// Remove the file or directory at `path`
    ///
    /// Fails with [`RarcError::Bound`] if the path, or any file below it,
    /// is bound to an edit session.
    pub fn remove(&mut self, path: &str) -> RarcResult<()> {
        self.ensure_unbound(path)?;
        self.root.remove(path)?;
        Ok(())
    }

    /// Rename the file or directory at `path`
    pub fn rename(&mut self, path: &str, new_name: &str) -> RarcResult<()> {
        self.ensure_unbound(path)?;
        self.root.rename(path, new_name)
    }

    /// Attach an edit session to the file behind `handle`
    ///
    /// The file is released by [`unbind`](Self::unbind) or by dropping
    /// the returned [`Binding`].
    pub fn bind(&mut self, handle: &FileHandle) -> RarcResult<Binding> {
        self.file(&handle.path)?;
        self.bound.retain(|_, token| token.strong_count() > 0);

        let key = tree::normalize(&handle.path)?;
        if self.bound.contains_key(&key) {
            return Err(RarcError::AlreadyBound(handle.path.clone()));
        }

        let token = Arc::new(());
        self.bound.insert(key, Arc::downgrade(&token));
        Ok(Binding {
            handle: handle.clone(),
            _token: token,
        })
    }

    /// Release a binding made on this archive
    pub fn unbind(&mut self, binding: Binding) {
        drop(binding);
        self.bound.retain(|_, token| token.strong_count() > 0);
    }

    /// Check whether the file behind `handle` is bound
    pub fn is_bound(&self, handle: &FileHandle) -> bool {
        tree::normalize(&handle.path).is_ok_and(|key| {
            self.live_bindings().any(|bound| *bound == key)
        })
    }

    fn live_bindings(&self) -> impl Iterator<Item = &String> + '_ {
        self.bound
            .iter()
            .filter(|(_, token)| token.strong_count() > 0)
            .map(|(key, _)| key)
    }

    fn ensure_unbound(&self, path: &str) -> RarcResult<()> {
        let key = tree::normalize(path)?;
        let prefix = format!("{key}/");
        match self
            .live_bindings()
            .find(|bound| **bound == key || bound.starts_with(&prefix))
        {
            Some(bound) => Err(RarcError::Bound(bound.clone())),
            None => Ok(()),
        }
    }

    fn file(&self, path: &str) -> RarcResult<&RarcFile> {
        reject_root(path)?;
        match self.root.lookup(path)? {
            RarcNode::File(file) => Ok(file),
            RarcNode::Directory(_) => Err(RarcError::NotAFile(path.to_string())),
        }
    }

    fn file_mut(&mut self, path: &str) -> RarcResult<&mut RarcFile> {
        reject_root(path)?;
        match self.root.lookup_mut(path)? {
            RarcNode::File(file) => Ok(file),
            RarcNode::Directory(_) => Err(RarcError::NotAFile(path.to_string())),
        }
    }
}

impl GalaxyFormat for RarcArchive {
    fn parse(data: &[u8]) -> Result<Self, FormatError> {
        Ok(Self::open(data)?)
    }

    fn build(&self) -> Result<Vec<u8>, FormatError> {
        Ok(self.save()?)
    }
}

/// Depth-first iterator over the files of an archive
pub struct Walk<'a> {
    stack: Vec<(String, std::slice::Iter<'a, RarcNode>)>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (String, &'a RarcFile);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (prefix, children) = self.stack.last_mut()?;
            match children.next() {
                None => {
                    self.stack.pop();
                }
                Some(RarcNode::File(file)) => return Some((join(prefix, &file.name), file)),
                Some(RarcNode::Directory(dir)) => {
                    let path = join(prefix, &dir.name);
                    self.stack.push((path, dir.children.iter()));
                }
            }
        }
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}

/// Path with empty components removed, original case kept
/// The root is a directory, so it never resolves to a file
fn reject_root(path: &str) -> RarcResult<()> {
    if tree::is_root(path)? {
        return Err(RarcError::NotAFile(path.to_string()));
    }
    Ok(())
}

fn canonical(path: &str) -> RarcResult<String> {
    Ok(tree::components(path)?.join("/"))
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::rarc::header::{ATTR_FILE, ATTR_PRELOAD_ARAM};
    use pretty_assertions::assert_eq;

    fn stage() -> RarcArchive {
        let mut archive = RarcArchive::new("stage");
        archive.create_directory("", "jmp").unwrap();
        archive.create_directory("jmp", "Placement").unwrap();
        let obj = archive.create_file("jmp/Placement", "ObjInfo").unwrap();
        archive.set_contents(&obj, vec![1, 2, 3]).unwrap();
        archive.create_file("", "camera.bcam").unwrap();
        archive
    }

    #[test]
    fn test_create_file_is_empty() {
        let mut archive = RarcArchive::new("root");
        let handle = archive.create_file("", "test.bin").unwrap();
        assert_eq!(handle.path(), "test.bin");

        let opened = archive.open_file("test.bin").unwrap();
        assert_eq!(archive.read(&opened).unwrap().len(), 0);
    }

    #[test]
    fn test_set_contents_then_read() {
        let mut archive = stage();
        let handle = archive.open_file("jmp/placement/objinfo").unwrap();
        archive.set_contents(&handle, vec![9; 100]).unwrap();
        assert_eq!(archive.read(&handle).unwrap(), &[9; 100][..]);
        assert_eq!(archive.read_file("JMP/Placement/ObjInfo").unwrap().len(), 100);
    }

    #[test]
    fn test_open_file_errors() {
        let archive = stage();
        assert!(matches!(
            archive.open_file("missing.bin"),
            Err(RarcError::NotFound(_))
        ));
        assert!(matches!(
            archive.open_file("jmp"),
            Err(RarcError::NotAFile(_))
        ));
        for root in ["", "/"] {
            assert!(matches!(
                archive.open_file(root),
                Err(RarcError::NotAFile(_))
            ));
            assert!(matches!(archive.read_file(root), Err(RarcError::NotAFile(_))));
            assert!(archive.exists(root));
        }
    }

    #[test]
    fn test_create_file_duplicate() {
        let mut archive = stage();
        assert!(matches!(
            archive.create_file("", "Camera.bcam"),
            Err(RarcError::AlreadyExists(_))
        ));
        assert!(matches!(
            archive.create_file("nowhere", "x"),
            Err(RarcError::NotFound(_))
        ));
    }

    #[test]
    fn test_files_depth_first_and_restartable() {
        let archive = stage();
        let expected = vec!["jmp/Placement/ObjInfo".to_string(), "camera.bcam".to_string()];
        assert_eq!(archive.files().collect::<Vec<_>>(), expected);
        assert_eq!(archive.files().collect::<Vec<_>>(), expected);
        assert_eq!(archive.directories(), vec!["jmp", "jmp/Placement"]);
    }

    #[test]
    fn test_single_file_round_trip() {
        let mut archive = RarcArchive::new("root");
        let handle = archive.create_file("", "test.bin").unwrap();
        archive.set_contents(&handle, vec![1, 2, 3, 4]).unwrap();

        let reopened = RarcArchive::open(&archive.save().unwrap()).unwrap();
        let handle = reopened.open_file("test.bin").unwrap();
        assert_eq!(reopened.read(&handle).unwrap(), &[1, 2, 3, 4]);
        assert_eq!(reopened, archive);
    }

    #[test]
    fn test_round_trip_preserves_attributes() {
        let mut archive = stage();
        archive.root.children.push(RarcNode::File(RarcFile {
            name: "sound.aw".to_string(),
            data: vec![0x55; 0x31],
            attributes: ATTR_FILE | ATTR_PRELOAD_ARAM,
        }));

        crate::assert_round_trip!(archive);

        let reopened = RarcArchive::open(&archive.save().unwrap()).unwrap();
        let handle = reopened.open_file("sound.aw").unwrap();
        assert_eq!(reopened.attributes(&handle).unwrap(), 0x21);
    }

    #[test]
    fn test_save_is_stable() {
        let archive = stage();
        let first = archive.save().unwrap();
        let second = RarcArchive::open(&first).unwrap().save().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_load_compressed() {
        let archive = stage();
        let compressed = yaz0::compress(&archive.save().unwrap()).unwrap();

        let loaded = RarcArchive::load(&compressed).unwrap();
        assert!(loaded.is_compressed());
        assert_eq!(loaded, archive);
        assert!(matches!(
            RarcArchive::open(&compressed),
            Err(RarcError::InvalidMagic(_))
        ));
    }

    #[test]
    fn test_save_to_and_open_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stage.arc");

        let mut archive = stage();
        archive.set_compressed(true);
        archive.save_to(&path).unwrap();

        let on_disk = std::fs::read(&path).unwrap();
        assert!(yaz0::is_yaz0(&on_disk));

        let reopened = RarcArchive::open_path(&path).unwrap();
        assert_eq!(reopened, archive);
        reopened.close();
    }

    #[test]
    fn test_binding_blocks_removal() {
        let mut archive = stage();
        let handle = archive.open_file("jmp/Placement/ObjInfo").unwrap();
        let binding = archive.bind(&handle).unwrap();
        assert!(archive.is_bound(&handle));
        assert_eq!(binding.handle(), &handle);

        assert!(matches!(archive.bind(&handle), Err(RarcError::AlreadyBound(_))));
        assert!(matches!(archive.remove("jmp"), Err(RarcError::Bound(_))));
        assert!(matches!(
            archive.rename("jmp/placement/objinfo", "Other"),
            Err(RarcError::Bound(_))
        ));

        // Unrelated paths are unaffected
        archive.remove("camera.bcam").unwrap();

        archive.unbind(binding);
        archive.remove("jmp").unwrap();
        assert_eq!(archive.files().count(), 0);
    }

    #[test]
    fn test_dropping_binding_releases_file() {
        let mut archive = stage();
        let handle = archive.open_file("jmp/Placement/ObjInfo").unwrap();
        let binding = archive.bind(&handle).unwrap();
        drop(binding);

        assert!(!archive.is_bound(&handle));
        let again = archive.bind(&handle).unwrap();
        assert!(archive.is_bound(&handle));

        // Releasing another archive's binding leaves this one bound
        let mut other = stage();
        let foreign = other.bind(&handle).unwrap();
        archive.unbind(foreign);
        assert!(archive.is_bound(&handle));

        archive.unbind(again);
        archive.remove("jmp").unwrap();
    }

    #[test]
    fn test_rename_keeps_contents() {
        let mut archive = stage();
        archive.rename("jmp/Placement", "Start").unwrap();
        assert_eq!(archive.read_file("jmp/Start/ObjInfo").unwrap(), &[1, 2, 3]);
        assert!(!archive.exists("jmp/Placement"));
    }

    #[test]
    fn test_structural_corruption_rejected() {
        let data = stage().save().unwrap();

        // Node count far beyond the buffer
        let mut corrupt = data.clone();
        corrupt[0x20..0x24].copy_from_slice(&0x0100_0000u32.to_be_bytes());
        assert!(matches!(
            RarcArchive::open(&corrupt),
            Err(RarcError::CountExceedsBuffer { what: "node", .. })
        ));

        // Data section past the end of the buffer
        let mut corrupt = data.clone();
        corrupt[0x10..0x14].copy_from_slice(&0x10_0000u32.to_be_bytes());
        assert!(matches!(
            RarcArchive::open(&corrupt),
            Err(RarcError::OffsetOutOfBounds { what: "data", .. })
        ));

        crate::assert_invalid_data_rejected!(RarcArchive, &data[..0x30]);
    }

    #[test]
    fn test_directory_cycle_rejected() {
        let mut archive = RarcArchive::new("root");
        archive.create_directory("", "a").unwrap();
        let mut data = archive.save().unwrap();

        // Point the "a" entry (entry 0) back at the root node
        let entry_offset = 0x20 + u32::from_be_bytes(data[0x2C..0x30].try_into().unwrap()) as usize;
        data[entry_offset + 8..entry_offset + 12].copy_from_slice(&0u32.to_be_bytes());

        assert!(matches!(
            RarcArchive::open(&data),
            Err(RarcError::DirectoryCycle(0))
        ));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn files_survive_save(contents in prop::collection::vec(
                prop::collection::vec(any::<u8>(), 0..96), 0..8
            )) {
                let mut archive = RarcArchive::new("root");
                archive.create_directory("", "dir").unwrap();
                for (i, data) in contents.iter().enumerate() {
                    let dir = if i % 2 == 0 { "" } else { "dir" };
                    let handle = archive.create_file(dir, &format!("f{i}.bin")).unwrap();
                    archive.set_contents(&handle, data.clone()).unwrap();
                }

                let reopened = RarcArchive::open(&archive.save().unwrap()).unwrap();
                prop_assert_eq!(&reopened, &archive);
            }
        }
    }
}
