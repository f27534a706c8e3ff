//! In-memory RARC directory tree

use super::error::{RarcError, RarcResult};
use super::header::DEFAULT_FILE_ATTRIBUTES;

/// Node in the archive tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RarcNode {
    /// Directory with ordered children
    Directory(RarcDirectory),
    /// File with owned contents
    File(RarcFile),
}

impl RarcNode {
    /// Entry name
    pub fn name(&self) -> &str {
        match self {
            Self::Directory(dir) => &dir.name,
            Self::File(file) => &file.name,
        }
    }

    /// Check if this node is a directory
    pub const fn is_directory(&self) -> bool {
        matches!(self, Self::Directory(_))
    }

    fn set_name(&mut self, name: String) {
        match self {
            Self::Directory(dir) => dir.name = name,
            Self::File(file) => file.name = name,
        }
    }
}

/// Directory node
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RarcDirectory {
    /// Directory name
    pub name: String,
    /// Children in on-disk order
    pub children: Vec<RarcNode>,
}

/// File node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RarcFile {
    /// File name
    pub name: String,
    /// File contents, exactly as long as the file
    pub data: Vec<u8>,
    /// Attribute flags (load destination, compression)
    pub attributes: u8,
}

impl RarcFile {
    /// Create an empty file with default attributes
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: Vec::new(),
            attributes: DEFAULT_FILE_ATTRIBUTES,
        }
    }
}

impl RarcDirectory {
    /// Create an empty directory
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }

    /// Index of the child named `name`, compared case-insensitively
    pub fn position(&self, name: &str) -> Option<usize> {
        self.children
            .iter()
            .position(|child| names_equal(child.name(), name))
    }

    /// Child named `name`
    pub fn child(&self, name: &str) -> Option<&RarcNode> {
        self.position(name).map(|index| &self.children[index])
    }

    /// Mutable child named `name`
    pub fn child_mut(&mut self, name: &str) -> Option<&mut RarcNode> {
        self.position(name).map(|index| &mut self.children[index])
    }

    /// Resolve a path relative to this directory
    pub(crate) fn lookup(&self, path: &str) -> RarcResult<&RarcNode> {
        let (parent, name) = self.lookup_parent(path)?;
        parent
            .child(name)
            .ok_or_else(|| RarcError::NotFound(path.to_string()))
    }

    /// Resolve a path relative to this directory, mutably
    pub(crate) fn lookup_mut(&mut self, path: &str) -> RarcResult<&mut RarcNode> {
        let (parent, name) = self.lookup_parent_mut(path)?;
        parent
            .child_mut(name)
            .ok_or_else(|| RarcError::NotFound(path.to_string()))
    }

    /// Resolve a directory path; the empty path is this directory
    pub(crate) fn directory(&self, path: &str) -> RarcResult<&Self> {
        let mut current = self;
        for component in components(path)? {
            current = match current.child(component) {
                Some(RarcNode::Directory(dir)) => dir,
                Some(RarcNode::File(_)) => return Err(RarcError::NotADirectory(path.to_string())),
                None => return Err(RarcError::NotFound(path.to_string())),
            };
        }
        Ok(current)
    }

    /// Resolve a directory path mutably; the empty path is this directory
    pub(crate) fn directory_mut(&mut self, path: &str) -> RarcResult<&mut Self> {
        let mut current = self;
        for component in components(path)? {
            current = match current.child_mut(component) {
                Some(RarcNode::Directory(dir)) => dir,
                Some(RarcNode::File(_)) => return Err(RarcError::NotADirectory(path.to_string())),
                None => return Err(RarcError::NotFound(path.to_string())),
            };
        }
        Ok(current)
    }

    fn lookup_parent<'p>(&self, path: &'p str) -> RarcResult<(&Self, &'p str)> {
        let (parent, name) = split_last(path)?;
        Ok((self.directory(parent)?, name))
    }

    fn lookup_parent_mut<'p>(&mut self, path: &'p str) -> RarcResult<(&mut Self, &'p str)> {
        let (parent, name) = split_last(path)?;
        Ok((self.directory_mut(parent)?, name))
    }

    /// Insert a child, rejecting duplicate names
    pub(crate) fn insert(&mut self, node: RarcNode, path: &str) -> RarcResult<()> {
        validate_name(node.name())?;
        if self.position(node.name()).is_some() {
            return Err(RarcError::AlreadyExists(path.to_string()));
        }
        self.children.push(node);
        Ok(())
    }

    /// Remove the node at `path` and return it
    pub(crate) fn remove(&mut self, path: &str) -> RarcResult<RarcNode> {
        let (parent, name) = self.lookup_parent_mut(path)?;
        let index = parent
            .position(name)
            .ok_or_else(|| RarcError::NotFound(path.to_string()))?;
        Ok(parent.children.remove(index))
    }

    /// Rename the node at `path`
    pub(crate) fn rename(&mut self, path: &str, new_name: &str) -> RarcResult<()> {
        validate_name(new_name)?;
        let (parent, name) = self.lookup_parent_mut(path)?;
        let index = parent
            .position(name)
            .ok_or_else(|| RarcError::NotFound(path.to_string()))?;

        if let Some(existing) = parent.position(new_name)
            && existing != index
        {
            return Err(RarcError::AlreadyExists(new_name.to_string()));
        }

        parent.children[index].set_name(new_name.to_string());
        Ok(())
    }

    /// Count of files below this directory
    pub fn file_count(&self) -> usize {
        self.children
            .iter()
            .map(|child| match child {
                RarcNode::Directory(dir) => dir.file_count(),
                RarcNode::File(_) => 1,
            })
            .sum()
    }
}

/// Case-insensitive name comparison used for all path lookups
pub(crate) fn names_equal(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// Normalised lowercase form of a path, used as a binding key
pub(crate) fn normalize(path: &str) -> RarcResult<String> {
    Ok(components(path)?
        .iter()
        .map(|c| c.to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join("/"))
}

/// Split a path into its components, ignoring empty ones
pub(crate) fn components(path: &str) -> RarcResult<Vec<&str>> {
    let parts: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
    if parts.iter().any(|c| *c == "." || *c == "..") {
        return Err(RarcError::InvalidName(path.to_string()));
    }
    Ok(parts)
}

/// Check whether `path` names the root directory itself
pub(crate) fn is_root(path: &str) -> RarcResult<bool> {
    Ok(components(path)?.is_empty())
}

/// Split a path into its parent directory and final component
fn split_last(path: &str) -> RarcResult<(&str, &str)> {
    let trimmed = path.trim_end_matches('/');
    let (parent, name) = trimmed.rsplit_once('/').unwrap_or(("", trimmed));
    if name.is_empty() || name == "." || name == ".." {
        return Err(RarcError::NotFound(path.to_string()));
    }
    Ok((parent, name))
}

/// Reject names the format cannot hold
pub(crate) fn validate_name(name: &str) -> RarcResult<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\0']) {
        return Err(RarcError::InvalidName(name.to_string()));
    }
    Ok(())
}
