// src/exec/command.rs

use std::path::{Path, PathBuf};

use crate::watch::path_utils::relative_str;

/// Placeholder replaced by the affected target paths.
pub const TARGETS_PLACEHOLDER: &str = "{targets}";

/// One request to run the configured command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub run_id: u64,
    /// Fully built shell command line.
    pub cmd: String,
    /// The template `cmd` was built from.
    pub template: String,
    /// Full paths of the targets this run covers.
    pub targets: Vec<PathBuf>,
    /// Working directory (the project root).
    pub cwd: PathBuf,
}

impl RunRequest {
    pub fn new(run_id: u64, template: &str, cwd: &Path, targets: Vec<PathBuf>) -> Self {
        Self {
            run_id,
            cmd: build_command(template, cwd, &targets),
            template: template.to_string(),
            targets,
            cwd: cwd.to_path_buf(),
        }
    }

    /// Take over the targets of an older request that will not run, keeping
    /// its targets first, and rebuild the command line.
    pub fn absorb(&mut self, older: RunRequest) {
        let mut targets = older.targets;
        for target in self.targets.drain(..) {
            if !targets.contains(&target) {
                targets.push(target);
            }
        }
        self.targets = targets;
        self.cmd = build_command(&self.template, &self.cwd, &self.targets);
    }
}

/// Build the shell command line for `targets`.
///
/// Targets are written relative to `root` when they live under it and are
/// quoted when they contain shell-special characters. They replace every
/// `{targets}` in `template`, or are appended after a space when the
/// template has no placeholder.
pub fn build_command(template: &str, root: &Path, targets: &[PathBuf]) -> String {
    let args = targets
        .iter()
        .map(|target| {
            let shown = relative_str(root, target)
                .unwrap_or_else(|| target.to_string_lossy().into_owned());
            shell_quote(&shown)
        })
        .collect::<Vec<_>>()
        .join(" ");

    if template.contains(TARGETS_PLACEHOLDER) {
        template.replace(TARGETS_PLACEHOLDER, &args)
    } else if args.is_empty() {
        template.to_string()
    } else {
        format!("{template} {args}")
    }
}

/// Quote `arg` for `sh` if needed.
pub fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./@%+=:,".contains(c));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets(items: &[&str]) -> Vec<PathBuf> {
        items.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn absorbing_an_older_request_merges_targets() {
        let root = Path::new("/proj");
        let older = RunRequest::new(2, "mocha {targets}", root, targets(&["/proj/b.js", "/proj/a.js"]));
        let mut newer = RunRequest::new(3, "mocha {targets}", root, targets(&["/proj/a.js", "/proj/c.js"]));

        newer.absorb(older);

        assert_eq!(newer.run_id, 3);
        assert_eq!(newer.targets, targets(&["/proj/b.js", "/proj/a.js", "/proj/c.js"]));
        assert_eq!(newer.cmd, "mocha b.js a.js c.js");
    }

    #[test]
    fn appends_relative_targets() {
        let cmd = build_command(
            "mocha",
            Path::new("/proj"),
            &targets(&["/proj/test/a-test.js", "/proj/test/b-test.js"]),
        );
        assert_eq!(cmd, "mocha test/a-test.js test/b-test.js");
    }

    #[test]
    fn substitutes_placeholder() {
        let cmd = build_command(
            "node --test {targets} --reporter dot",
            Path::new("/proj"),
            &targets(&["/proj/test/a.js"]),
        );
        assert_eq!(cmd, "node --test test/a.js --reporter dot");
    }

    #[test]
    fn quotes_unsafe_paths() {
        let cmd = build_command(
            "mocha",
            Path::new("/proj"),
            &targets(&["/proj/test/it's a test.js"]),
        );
        assert_eq!(cmd, r"mocha 'test/it'\''s a test.js'");
    }

    #[test]
    fn keeps_paths_outside_root_absolute() {
        let cmd = build_command("run", Path::new("/proj"), &targets(&["/other/x.js"]));
        assert_eq!(cmd, "run /other/x.js");
    }
}
