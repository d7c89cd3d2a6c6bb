use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;

use crate::catalog::{ArticleSpec, Category};

pub const IMAGES_DIR_NAME: &str = "images";
pub const ARTICLE_EXTENSION: &str = "html";

/// Output tree: `<root>/<category>/<slug>.html` and `<root>/images/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn images_dir(&self) -> PathBuf {
        self.root.join(IMAGES_DIR_NAME)
    }

    pub fn category_dir(&self, category: Category) -> PathBuf {
        self.root.join(category.as_str())
    }

    pub fn article_path(&self, spec: &ArticleSpec) -> PathBuf {
        self.category_dir(spec.category)
            .join(format!("{}.{ARTICLE_EXTENSION}", spec.slug()))
    }

    /// Create the images directory and one directory per category.
    /// Returns the directories that did not exist before.
    pub fn prepare(&self, categories: &[Category]) -> Result<Vec<PathBuf>> {
        let mut required_dirs = vec![self.images_dir()];
        required_dirs.extend(categories.iter().map(|category| self.category_dir(*category)));

        let mut created_dirs = Vec::new();
        for dir in &required_dirs {
            if !dir.exists() {
                fs::create_dir_all(dir)
                    .with_context(|| format!("failed to create {}", dir.display()))?;
                created_dirs.push(dir.clone());
            }
        }
        Ok(created_dirs)
    }

    /// Regular files directly under the images directory.
    pub fn count_images(&self) -> Result<usize> {
        let images_dir = self.images_dir();
        if !images_dir.exists() {
            return Ok(0);
        }
        let mut count = 0usize;
        for entry in WalkDir::new(&images_dir).min_depth(1).max_depth(1) {
            let entry =
                entry.with_context(|| format!("failed to scan {}", images_dir.display()))?;
            if entry.file_type().is_file() {
                count += 1;
            }
        }
        Ok(count)
    }
}

/// Write `content` to `path` through a temporary sibling that is renamed
/// into place, so readers never observe a half-written file.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent)
        .with_context(|| format!("failed to create parent directory {}", parent.display()))?;
    let mut temp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("failed to create temporary file in {}", parent.display()))?;
    temp.write_all(content)
        .with_context(|| format!("failed to write {}", path.display()))?;
    temp.persist(path)
        .with_context(|| format!("failed to move temporary file to {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::{OutputLayout, write_atomic};
    use crate::catalog::{ArticleSpec, Category};

    #[test]
    fn article_path_uses_category_and_slug() {
        let layout = OutputLayout::new("/tmp/content/articles");
        let spec = ArticleSpec {
            title: "Yagi-Uda_antenna".to_string(),
            category: Category::Antennas,
        };
        assert!(
            layout
                .article_path(&spec)
                .ends_with("content/articles/antennas/yagi-uda-antenna.html")
        );
    }

    #[test]
    fn prepare_creates_images_and_category_dirs_once() {
        let temp = tempdir().expect("tempdir");
        let layout = OutputLayout::new(temp.path().join("articles"));

        let created = layout.prepare(&Category::ALL).expect("prepare");
        assert_eq!(created.len(), Category::ALL.len() + 1);
        assert!(layout.images_dir().is_dir());
        assert!(layout.category_dir(Category::DigitalModes).is_dir());

        let created = layout.prepare(&Category::ALL).expect("prepare again");
        assert!(created.is_empty());
    }

    #[test]
    fn count_images_ignores_subdirectories() {
        let temp = tempdir().expect("tempdir");
        let layout = OutputLayout::new(temp.path());
        assert_eq!(layout.count_images().expect("count"), 0);

        layout.prepare(&[]).expect("prepare");
        fs::write(layout.images_dir().join("img_a.png"), b"a").expect("write");
        fs::write(layout.images_dir().join("img_b.jpg"), b"b").expect("write");
        fs::create_dir_all(layout.images_dir().join("nested")).expect("mkdir");
        fs::write(layout.images_dir().join("nested/img_c.png"), b"c").expect("write");

        assert_eq!(layout.count_images().expect("count"), 2);
    }

    #[test]
    fn write_atomic_replaces_existing_file() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("radios/icom.html");
        write_atomic(&path, b"first").expect("write");
        write_atomic(&path, b"second").expect("overwrite");
        assert_eq!(fs::read_to_string(&path).expect("read"), "second");
        let leftovers = fs::read_dir(temp.path().join("radios"))
            .expect("read dir")
            .count();
        assert_eq!(leftovers, 1);
    }
}
