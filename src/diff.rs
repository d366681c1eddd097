use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// Paths that never show up in the file summary sent to the model.
static EXCLUDED_PATHS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        (^|/)(package-lock\.json|yarn\.lock|pnpm-lock\.yaml|npm-shrinkwrap\.json)$
        | \.lock$
        | \.min\.(js|css)$
        | (^|/)(dist|build|out|target)/
        | \.log$
        ",
    )
    .expect("exclusion pattern is valid")
});

/// The staged change set handed to the prompt builder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub files: Vec<String>,
    pub additions: usize,
    pub deletions: usize,
    pub raw_diff: String,
}

impl ChangeSet {
    /// Build a change set from `git diff --numstat -z --no-renames` output
    /// (NUL-terminated `added\tremoved\tpath` records) and the full diff text.
    ///
    /// Counts only cover files that survive the exclusion filter, so they
    /// always agree with the file list.
    pub fn from_numstat(numstat: &str, raw_diff: String) -> Self {
        let mut additions = 0;
        let mut deletions = 0;
        let mut paths = Vec::new();

        for record in numstat.split('\0') {
            let mut parts = record.splitn(3, '\t');
            let (Some(added), Some(removed), Some(path)) = (parts.next(), parts.next(), parts.next())
            else {
                continue;
            };
            if path.is_empty() || is_excluded(path) {
                continue;
            }

            // Binary files report "-" for both counts.
            additions += added.parse::<usize>().unwrap_or(0);
            deletions += removed.parse::<usize>().unwrap_or(0);
            paths.push(path.to_string());
        }

        ChangeSet {
            files: filter_excluded(&paths),
            additions,
            deletions,
            raw_diff,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.raw_diff.trim().is_empty()
    }
}

pub fn is_excluded(path: &str) -> bool {
    EXCLUDED_PATHS.is_match(path)
}

/// Drop excluded and duplicate paths, keeping first-seen order.
pub fn filter_excluded<S: AsRef<str>>(paths: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    paths
        .iter()
        .map(|p| p.as_ref().trim())
        .filter(|p| !p.is_empty() && !is_excluded(p))
        .filter(|p| seen.insert(p.to_string()))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_lockfiles_and_build_output() {
        let input = ["a.ts", "yarn.lock", "dist/bundle.js", "b.ts"];
        assert_eq!(filter_excluded(&input), vec!["a.ts", "b.ts"]);
    }

    #[test]
    fn filter_is_idempotent() {
        let input = [
            "src/main.rs",
            "Cargo.lock",
            "web/app.min.js",
            "web/site.min.css",
            "logs/server.log",
            "packages/ui/build/index.js",
            "src/main.rs",
            "README.md",
        ];
        let once = filter_excluded(&input);
        let twice = filter_excluded(&once);
        assert_eq!(once, twice);
        assert_eq!(once, vec!["src/main.rs", "README.md"]);
    }

    #[test]
    fn similar_names_are_kept() {
        let input = ["src/builder.rs", "docs/distribution.md", "lockfile.rs"];
        assert_eq!(filter_excluded(&input), input.to_vec());
    }

    #[test]
    fn numstat_counts_only_kept_files() {
        let numstat = "7\t2\tsrc/lib.rs\03\t1\tsrc/git.rs\0400\t380\tpackage-lock.json\0-\t-\tassets/logo.png\0";
        let cs = ChangeSet::from_numstat(numstat, "diff --git ...".into());

        assert_eq!(cs.files, vec!["src/lib.rs", "src/git.rs", "assets/logo.png"]);
        assert_eq!(cs.additions, 10);
        assert_eq!(cs.deletions, 3);
        assert_eq!(cs.raw_diff, "diff --git ...");
    }

    #[test]
    fn numstat_paths_are_not_quoted() {
        let numstat = "1\t0\tメモ.md\02\t2\tmy notes.md\0";
        let cs = ChangeSet::from_numstat(numstat, "diff".into());

        assert_eq!(cs.files, vec!["メモ.md", "my notes.md"]);
        assert_eq!(cs.additions, 3);
        assert_eq!(cs.deletions, 2);
    }

    #[test]
    fn empty_numstat_gives_empty_change_set() {
        let cs = ChangeSet::from_numstat("", String::new());
        assert!(cs.is_empty());
        assert_eq!(cs.additions, 0);
    }
}
