//! `fsak clean info` and `fsak clean dirty`

use super::{catalog_skip, open_catalog};
use crate::catalog::CatalogStore;
use crate::clean::{
    clean_catalog, find_dirty, move_dirty, CleanEvent, CleanSummary, DirtyCategory, DirtyItem,
    DirtySummary,
};
use crate::config::{CleanDirtyArgs, FileConfig, Workspace};
use crate::scanner::canonical_roots;
use crate::types::FsakError;
use crate::ui::{ProgressReporter, Selector};
use indicatif::HumanBytes;
use std::collections::BTreeMap;

/// Drop catalog rows for files that no longer exist
pub fn run_info(workspace: &Workspace) -> Result<CleanSummary, FsakError> {
    let store = open_catalog(workspace)?;
    let mut reporter = ProgressReporter::new();
    let total = store.count()?;
    reporter.finish_scan("catalog", total);
    reporter.start_work(total as u64);

    let progress_cb = |event: &CleanEvent| match event {
        CleanEvent::Checked { index, total } => {
            reporter.step(format!("[ {} / {} ] checked", index, total));
        }
        CleanEvent::Removed { path } => {
            reporter.report_error("Removed stale row", path, "file no longer exists")
        }
    };
    let summary = clean_catalog(&store, Some(&progress_cb))?;
    let line = format!(
        "Checked {} entries, removed {}",
        summary.checked, summary.removed
    );
    reporter.finish_work(line.clone());
    println!("{}", line);
    if summary.undetermined > 0 {
        println!(
            "{} entries kept because their files could not be checked",
            summary.undetermined
        );
    }
    Ok(summary)
}

/// Ask which categories to sweep; an empty answer means all of them
pub fn choose_categories(selector: &mut dyn Selector) -> Result<Vec<DirtyCategory>, FsakError> {
    let labels: Vec<String> = DirtyCategory::ALL
        .iter()
        .map(|c| c.label().to_string())
        .collect();
    let picked = selector.select_many(
        "Select types of dirty files to clean (none selected means all):",
        &labels,
    )?;
    if picked.is_empty() {
        return Ok(DirtyCategory::ALL.to_vec());
    }
    Ok(picked
        .into_iter()
        .filter_map(|i| DirtyCategory::ALL.get(i).copied())
        .collect())
}

/// Listing grouped by category, in category order
pub fn format_dirty_listing(items: &[DirtyItem]) -> String {
    let mut groups: BTreeMap<DirtyCategory, Vec<&DirtyItem>> = BTreeMap::new();
    for item in items {
        groups.entry(item.category).or_default().push(item);
    }

    let mut lines = Vec::new();
    for (category, members) in groups {
        lines.push(format!("{} ({}):", category.label(), members.len()));
        for item in members {
            lines.push(format!("  {}", item.path.display()));
        }
    }
    lines.push(format!("Total dirty items found: {}", items.len()));
    lines.join("\n")
}

pub fn run_dirty(
    args: &CleanDirtyArgs,
    workspace: &Workspace,
    config: &FileConfig,
    selector: &mut dyn Selector,
) -> Result<DirtySummary, FsakError> {
    let roots = canonical_roots(&args.dirs)?;
    let dest_dir = config.deleted_dir(args.delete_to_dir.as_deref(), workspace);

    let categories = choose_categories(selector)?;
    let items = find_dirty(&roots, &categories, &catalog_skip(workspace));
    if items.is_empty() {
        println!("No dirty files found matching your selection.");
        return Ok(DirtySummary::default());
    }

    println!("{}", format_dirty_listing(&items));
    let bytes: u64 = items.iter().map(|i| i.size).sum();
    println!("{} in total", HumanBytes(bytes));

    if args.list {
        println!("Listing only - nothing was moved.");
        return Ok(DirtySummary::default());
    }
    let prompt = format!("Move these items to {}?", dest_dir.display());
    if !selector.confirm(&prompt, false)? {
        println!("Operation cancelled.");
        return Ok(DirtySummary::default());
    }

    let store = open_catalog(workspace)?;
    let summary = move_dirty(&items, &roots, &dest_dir, &store)?;
    println!(
        "Moved {} item(s), {} failed, {} catalog row(s) removed",
        summary.moved, summary.failed, summary.rows_removed
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    struct Answers(Vec<usize>);

    impl Selector for Answers {
        fn select_one(&mut self, _: &str, _: &[String]) -> Result<usize, FsakError> {
            Ok(0)
        }
        fn select_many(&mut self, _: &str, options: &[String]) -> Result<Vec<usize>, FsakError> {
            assert_eq!(options.len(), DirtyCategory::ALL.len());
            Ok(self.0.clone())
        }
        fn confirm(&mut self, _: &str, default: bool) -> Result<bool, FsakError> {
            Ok(default)
        }
    }

    #[test]
    fn test_empty_choice_means_all_categories() {
        let categories = choose_categories(&mut Answers(vec![])).expect("categories");
        assert_eq!(categories, DirtyCategory::ALL.to_vec());
    }

    #[test]
    fn test_choice_maps_indices_to_categories() {
        let categories = choose_categories(&mut Answers(vec![0, 4])).expect("categories");
        assert_eq!(
            categories,
            vec![DirtyCategory::EmptyFile, DirtyCategory::EmptyFolder]
        );
    }

    #[test]
    fn test_listing_groups_by_category() {
        let items = vec![
            DirtyItem {
                path: PathBuf::from("/d/.DS_Store"),
                category: DirtyCategory::DsStore,
                size: 6,
                is_dir: false,
            },
            DirtyItem {
                path: PathBuf::from("/d/zero"),
                category: DirtyCategory::EmptyFile,
                size: 0,
                is_dir: false,
            },
        ];
        let listing = format_dirty_listing(&items);
        assert!(listing.contains("Files with size 0 (1):"));
        assert!(listing.contains("macOS .DS_Store files (1):"));
        assert!(listing.find("size 0").unwrap() < listing.find("DS_Store").unwrap());
        assert!(listing.ends_with("Total dirty items found: 2"));
    }
}
