use std::{
    path::{Path, PathBuf},
    time::SystemTime,
};

use crate::{error::Result, partition::DEFAULT_LANGUAGE};

/// Page file extensions eligible for indexing.
const PAGE_EXTENSIONS: &[&str] = &["md", "txt"];

/// Space assigned to pages at the root of a partition source directory.
pub const ROOT_SPACE: &str = "Main";

/// A page file discovered in a partition source directory, with its
/// wiki coordinates already parsed out of the path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredPage {
    /// Dot-joined space built from the subdirectory chain
    /// (`Dev/API/V1.md` lives in space `Dev.API`); root-level pages
    /// fall into [`ROOT_SPACE`].
    pub space: String,
    /// Page name: the file stem with any language infix stripped.
    pub name: String,
    /// Two-letter code from the filename infix (`WebHome.fr.md`),
    /// or the `default` sentinel.
    pub language: String,
    /// Path relative to the partition source directory.
    pub relative_path: PathBuf,
    /// Fully resolved absolute path.
    pub absolute_path: PathBuf,
    /// Last modification time as seconds since the Unix epoch.
    pub mtime: u64,
}

/// Walk a partition source directory and return every indexable page,
/// sorted by relative path.
///
/// Hidden entries are skipped. Symlinks pointing back inside the tree
/// are skipped too: their target is discovered under its own path, and
/// following them would loop.
pub fn discover_pages(root: &Path) -> Result<Vec<DiscoveredPage>> {
    let root = root.canonicalize()?;
    let mut pages = Vec::new();
    let mut pending = vec![root.clone()];

    while let Some(dir) = pending.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }

            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                pending.push(entry.path());
                continue;
            }

            let abs = match entry.path().canonicalize() {
                Ok(p) => p,
                Err(_) => continue, // broken symlink
            };
            if file_type.is_symlink() && abs.starts_with(&root) {
                continue;
            }
            if abs.is_file()
                && has_page_extension(&entry.path())
                && let Some(page) = parse_page(&root, &entry.path(), &abs)?
            {
                pages.push(page);
            }
        }
    }

    pages.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(pages)
}

fn has_page_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| PAGE_EXTENSIONS.contains(&ext))
}

/// Split a file stem into (page name, language code).
///
/// A trailing `.xx` infix of two lowercase ASCII letters marks a
/// translation; anything else is part of the name and the page carries
/// the `default` sentinel.
fn split_language(stem: &str) -> (String, String) {
    if let Some((name, code)) = stem.rsplit_once('.')
        && !name.is_empty()
        && code.len() == 2
        && code.chars().all(|c| c.is_ascii_lowercase())
    {
        return (name.to_string(), code.to_string());
    }
    (stem.to_string(), DEFAULT_LANGUAGE.to_string())
}

fn parse_page(
    root: &Path,
    seen_at: &Path,
    absolute_path: &Path,
) -> Result<Option<DiscoveredPage>> {
    let relative_path = seen_at
        .strip_prefix(root)
        .unwrap_or(seen_at)
        .to_path_buf();

    let Some(stem) = relative_path.file_stem().and_then(|s| s.to_str())
    else {
        return Ok(None);
    };
    let (name, language) = split_language(stem);

    let space = match relative_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("."),
        _ => ROOT_SPACE.to_string(),
    };

    let mtime = std::fs::metadata(absolute_path)?
        .modified()
        .unwrap_or(SystemTime::UNIX_EPOCH)
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    Ok(Some(DiscoveredPage {
        space,
        name,
        language,
        relative_path,
        absolute_path: absolute_path.to_path_buf(),
        mtime,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn by_name<'a>(
        pages: &'a [DiscoveredPage],
        name: &str,
    ) -> &'a DiscoveredPage {
        pages
            .iter()
            .find(|p| p.name == name)
            .unwrap_or_else(|| panic!("no page named {name}"))
    }

    #[test]
    fn root_pages_fall_into_main_space() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("WebHome.md"), "# Home").unwrap();

        let pages = discover_pages(tmp.path()).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].space, "Main");
        assert_eq!(pages[0].name, "WebHome");
        assert_eq!(pages[0].language, "default");
    }

    #[test]
    fn subdirectories_become_dotted_spaces() {
        let tmp = tempfile::tempdir().unwrap();
        let api = tmp.path().join("Dev").join("API");
        std::fs::create_dir_all(&api).unwrap();
        std::fs::write(api.join("V1.md"), "versioned api page").unwrap();
        std::fs::write(
            tmp.path().join("Dev").join("Guide.md"),
            "developer guide",
        )
        .unwrap();

        let pages = discover_pages(tmp.path()).unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(by_name(&pages, "V1").space, "Dev.API");
        assert_eq!(by_name(&pages, "Guide").space, "Dev");
    }

    #[test]
    fn language_infix_becomes_translation() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("WebHome.fr.md"), "bonjour").unwrap();
        std::fs::write(tmp.path().join("WebHome.md"), "hello").unwrap();

        let pages = discover_pages(tmp.path()).unwrap();
        assert_eq!(pages.len(), 2);

        let langs: Vec<_> = pages
            .iter()
            .map(|p| (p.name.as_str(), p.language.as_str()))
            .collect();
        assert!(langs.contains(&("WebHome", "fr")));
        assert!(langs.contains(&("WebHome", "default")));
    }

    #[test]
    fn split_language_rejects_non_codes() {
        assert_eq!(
            split_language("Page.EN"),
            ("Page.EN".to_string(), "default".to_string())
        );
        assert_eq!(
            split_language("v1.2"),
            ("v1.2".to_string(), "default".to_string())
        );
        assert_eq!(
            split_language("fr"),
            ("fr".to_string(), "default".to_string())
        );
        assert_eq!(
            split_language("Notes.de"),
            ("Notes".to_string(), "de".to_string())
        );
    }

    #[test]
    fn only_page_extensions_are_discovered() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("WebHome.md"), "page").unwrap();
        std::fs::write(tmp.path().join("notes.txt"), "page").unwrap();
        std::fs::write(tmp.path().join("logo.png"), "binary").unwrap();
        std::fs::write(tmp.path().join("Makefile"), "all:").unwrap();

        let pages = discover_pages(tmp.path()).unwrap();
        let names: Vec<_> = pages.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["WebHome", "notes"]);
    }

    #[test]
    fn hidden_entries_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join(".draft.md"), "wip").unwrap();
        let vcs = tmp.path().join(".git");
        std::fs::create_dir(&vcs).unwrap();
        std::fs::write(vcs.join("page.md"), "not a page").unwrap();
        std::fs::write(tmp.path().join("Published.md"), "live").unwrap();

        let pages = discover_pages(tmp.path()).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].name, "Published");
    }

    #[test]
    fn pages_come_back_in_path_order_with_mtime() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("Zoo.md"), "z").unwrap();
        std::fs::write(tmp.path().join("Atlas.md"), "a").unwrap();

        let pages = discover_pages(tmp.path()).unwrap();
        let names: Vec<_> = pages.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Atlas", "Zoo"]);
        assert!(pages.iter().all(|p| p.mtime > 0));
    }

    #[test]
    fn empty_source_directory_yields_no_pages() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(discover_pages(tmp.path()).unwrap().is_empty());
    }
}
