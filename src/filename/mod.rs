//! Local path assignment
//!
//! A [`FilenameGenerator`] proposes a path for a resource; [`OccupiedNames`]
//! makes the proposal unique by appending `_N` before the extension.
//! Generated paths are relative to the output root, use `/` as separator and
//! never contain `..` components.

mod by_site_structure;
mod by_type;
mod sanitize;

pub use by_site_structure::BySiteStructure;
pub use by_type::ByType;
pub use sanitize::{decode_segment, sanitize_component, shorten_component, split_extension};

use crate::config::{FilenameStrategy, OutputConfig};
use crate::state::ResourceKind;
use std::collections::HashSet;
use std::sync::Arc;
use url::Url;

/// Everything a strategy needs to name one resource
#[derive(Debug, Clone, Copy)]
pub struct FilenameRequest<'a> {
    pub url: &'a Url,
    /// Name requested for a seed in the configuration
    pub preferred: Option<&'a str>,
    pub kind: ResourceKind,
}

/// Strategy that maps a resource to a local relative path
///
/// The result only needs to be a candidate: the crawl state resolves
/// collisions with the names already taken.
pub trait FilenameGenerator: Send + Sync {
    fn generate(&self, request: &FilenameRequest<'_>, occupied: &OccupiedNames) -> String;
}

impl<F> FilenameGenerator for F
where
    F: Fn(&FilenameRequest<'_>, &OccupiedNames) -> String + Send + Sync,
{
    fn generate(&self, request: &FilenameRequest<'_>, occupied: &OccupiedNames) -> String {
        self(request, occupied)
    }
}

/// Builds the generator selected in the output configuration
pub fn generator_from_config(output: &OutputConfig) -> Arc<dyn FilenameGenerator> {
    match output.filename_generator {
        FilenameStrategy::ByType => Arc::new(ByType::new(
            output.subdirectories.clone(),
            output.default_filename.clone(),
        )),
        FilenameStrategy::BySiteStructure => {
            Arc::new(BySiteStructure::new(output.default_filename.clone()))
        }
    }
}

/// Paths already taken in this crawl, in claim order
///
/// Files and directories are tracked apart: a file can never take the name
/// of a directory already in use, and a path never runs through a name
/// already claimed by a file.
#[derive(Debug, Default, Clone)]
pub struct OccupiedNames {
    ordered: Vec<String>,
    files: HashSet<String>,
    directories: HashSet<String>,
}

impl OccupiedNames {
    /// Reserves directory names up front (the configured subdirectories)
    pub fn reserve<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            let name = name.into();
            if self.directories.insert(name.clone()) {
                self.ordered.push(name);
            }
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains(path) || self.directories.contains(path)
    }

    /// Names in the order they were claimed or reserved
    pub fn as_slice(&self) -> &[String] {
        &self.ordered
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    /// Makes `candidate` unique, records it and returns the final path
    ///
    /// Collisions get `_1`, `_2`, ... appended to the basename before the
    /// extension. A directory component that is already a file gets the
    /// same kind of suffix.
    pub fn claim(&mut self, candidate: &str) -> String {
        let candidate = if candidate.is_empty() { "_" } else { candidate };

        let (dirs, name) = match candidate.rsplit_once('/') {
            Some((dirs, name)) => (Some(dirs), name),
            None => (None, candidate),
        };

        let mut prefix = String::new();
        for component in dirs.into_iter().flat_map(|dirs| dirs.split('/')) {
            let mut directory = join(&prefix, component);
            let mut n = 1;
            while self.files.contains(&directory) {
                directory = join(&prefix, &format!("{}_{}", component, n));
                n += 1;
            }
            prefix = directory;
        }

        let file = join(&prefix, name);
        let mut path = file.clone();
        let mut n = 1;
        while self.contains(&path) {
            path = with_suffix(&file, n);
            n += 1;
        }

        self.insert_file(path.clone());
        path
    }

    fn insert_file(&mut self, path: String) {
        let mut parent = path.as_str();
        while let Some((dir, _)) = parent.rsplit_once('/') {
            self.directories.insert(dir.to_string());
            parent = dir;
        }

        self.files.insert(path.clone());
        self.ordered.push(path);
    }
}

fn join(prefix: &str, component: &str) -> String {
    if prefix.is_empty() {
        component.to_string()
    } else {
        format!("{}/{}", prefix, component)
    }
}

/// `img/logo.png` with n = 2 becomes `img/logo_2.png`
fn with_suffix(path: &str, n: usize) -> String {
    let (dir, name) = match path.rsplit_once('/') {
        Some((dir, name)) => (Some(dir), name),
        None => (None, path),
    };

    let name = match split_extension(name) {
        (stem, Some(extension)) => format!("{}_{}{}", stem, n, extension),
        (stem, None) => format!("{}_{}", stem, n),
    };

    match dir {
        Some(dir) => format!("{}/{}", dir, name),
        None => name,
    }
}
