//! Filesystem page mirror built on `cap_std`.
//!
//! Pages live at `{root}/{username}/{slug}.html`. Writes go to a hidden
//! temporary file in the owner directory and are renamed into place, so a
//! concurrent reader sees either the previous copy or the new one. All
//! filesystem calls run on the blocking pool.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use cap_std::{ambient_authority, fs::Dir};
use tokio::task;
use tracing::debug;
use uuid::Uuid;

use crate::domain::ports::{PageMirror, PageMirrorError};
use crate::domain::{Slug, Username};

/// Page mirror rooted at one directory.
#[derive(Clone)]
pub struct FsPageMirror {
    root: Arc<Dir>,
    root_path: PathBuf,
}

impl FsPageMirror {
    /// Open (creating if needed) the mirror root at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`PageMirrorError::Io`] when the directory cannot be created or
    /// opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PageMirrorError> {
        let path = path.as_ref();
        Dir::create_ambient_dir_all(path, ambient_authority())
            .map_err(|error| io_error(path, &error))?;
        let root = Dir::open_ambient_dir(path, ambient_authority())
            .map_err(|error| io_error(path, &error))?;
        Ok(Self {
            root: Arc::new(root),
            root_path: path.to_path_buf(),
        })
    }

    /// Directory the mirror writes into.
    #[must_use]
    pub fn root_path(&self) -> &Path {
        self.root_path.as_path()
    }

    async fn run_blocking<T, F>(&self, op: F) -> Result<T, PageMirrorError>
    where
        T: Send + 'static,
        F: FnOnce(&Dir) -> Result<T, PageMirrorError> + Send + 'static,
    {
        let root = Arc::clone(&self.root);
        task::spawn_blocking(move || op(root.as_ref()))
            .await
            .map_err(|error| PageMirrorError::io(format!("mirror task failed: {error}")))?
    }
}

fn page_path(owner: &str, slug: &str) -> PathBuf {
    Path::new(owner).join(format!("{slug}.html"))
}

fn io_error(path: &Path, error: &io::Error) -> PageMirrorError {
    PageMirrorError::io(format!("{}: {error}", path.display()))
}

fn write_page(root: &Dir, owner: &str, slug: &str, html: &str) -> Result<(), PageMirrorError> {
    let owner_dir = Path::new(owner);
    root.create_dir_all(owner_dir)
        .map_err(|error| io_error(owner_dir, &error))?;

    let target = page_path(owner, slug);
    let staged = owner_dir.join(format!(".{slug}.html.tmp.{}", Uuid::new_v4().simple()));
    root.write(&staged, html.as_bytes())
        .map_err(|error| io_error(&staged, &error))?;
    if let Err(error) = root.rename(&staged, root, &target) {
        if let Err(cleanup) = root.remove_file(&staged) {
            debug!(path = %staged.display(), error = %cleanup, "staged mirror file left behind");
        }
        return Err(io_error(&target, &error));
    }
    Ok(())
}

fn read_page(root: &Dir, owner: &str, slug: &str) -> Result<Option<String>, PageMirrorError> {
    let target = page_path(owner, slug);
    match root.read_to_string(&target) {
        Ok(html) => Ok(Some(html)),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(error) => Err(io_error(&target, &error)),
    }
}

#[async_trait]
impl PageMirror for FsPageMirror {
    async fn store(&self, owner: &Username, slug: &Slug, html: &str) -> Result<(), PageMirrorError> {
        let owner = owner.as_ref().to_owned();
        let slug = slug.as_ref().to_owned();
        let html = html.to_owned();
        self.run_blocking(move |root| write_page(root, &owner, &slug, &html))
            .await
    }

    async fn load(&self, owner: &Username, slug: &Slug) -> Result<Option<String>, PageMirrorError> {
        let owner = owner.as_ref().to_owned();
        let slug = slug.as_ref().to_owned();
        self.run_blocking(move |root| read_page(root, &owner, &slug))
            .await
    }
}
