// src/resolve/scanner.rs

//! Import specifier extraction.
//!
//! This is a lexical scan, not a parser: comments are blanked out, then a
//! handful of patterns pick up the quoted specifier of `import`, `export ...
//! from`, `require()` and dynamic `import()`.

use regex::Regex;

use crate::errors::Result;

const COMMENTS: &str = r"(?s)/\*.*?\*/|(?m)^\s*//[^\n]*";

const IMPORT_PATTERNS: &[&str] = &[
    // import x from 'a'; import { y } from "a"; import 'a';
    r#"\bimport\s+(?:[\w*{}\s,$]+?\s+from\s+)?["']([^"'\n]+)["']"#,
    // export { x } from 'a'; export * from 'a';
    r#"\bexport\s+(?:[\w*{}\s,$]+?\s+)?from\s+["']([^"'\n]+)["']"#,
    // require('a')
    r#"\brequire\s*\(\s*["']([^"'\n]+)["']\s*\)"#,
    // import('a')
    r#"\bimport\s*\(\s*["']([^"'\n]+)["']\s*\)"#,
];

/// Compiled import patterns.
#[derive(Debug, Clone)]
pub struct ImportScanner {
    comments: Regex,
    patterns: Vec<Regex>,
}

impl ImportScanner {
    pub fn new() -> Result<Self> {
        let comments = Regex::new(COMMENTS).map_err(anyhow::Error::from)?;
        let patterns = IMPORT_PATTERNS
            .iter()
            .map(|pattern| Regex::new(pattern).map_err(anyhow::Error::from))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { comments, patterns })
    }

    /// Return the import specifiers of `source` in order of appearance,
    /// without duplicates.
    pub fn scan(&self, source: &str) -> Vec<String> {
        let code = self.comments.replace_all(source, "");

        let mut found: Vec<(usize, &str)> = self
            .patterns
            .iter()
            .flat_map(|re| re.captures_iter(&code))
            .filter_map(|caps| caps.get(1))
            .map(|m| (m.start(), m.as_str()))
            .collect();
        found.sort_by_key(|(pos, _)| *pos);

        let mut specifiers: Vec<String> = Vec::with_capacity(found.len());
        for (_, spec) in found {
            if !specifiers.iter().any(|s| s == spec) {
                specifiers.push(spec.to_string());
            }
        }
        specifiers
    }
}

/// Whether a specifier points into the project rather than at a package.
pub fn is_local(specifier: &str) -> bool {
    specifier.starts_with("./")
        || specifier.starts_with("../")
        || specifier.starts_with('/')
        || specifier == "."
        || specifier == ".."
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_specifiers(source: &str) -> Vec<String> {
        ImportScanner::new().unwrap().scan(source)
    }

    #[test]
    fn finds_every_import_form_in_order() {
        let source = r#"
import fs from 'fs';
import { a, b as c } from "./lib/a";
import './side-effect';
export * from '../shared';
const util = require('./util');
const lazy = () => import("./lazy.js");
"#;
        assert_eq!(
            scan_specifiers(source),
            vec!["fs", "./lib/a", "./side-effect", "../shared", "./util", "./lazy.js"]
        );
    }

    #[test]
    fn multi_line_import_list() {
        let source = "import {\n  one,\n  two,\n} from './numbers';\n";
        assert_eq!(scan_specifiers(source), vec!["./numbers"]);
    }

    #[test]
    fn ignores_commented_out_imports() {
        let source = r#"
// const old = require('./old');
/* import gone from './gone';
*/
const kept = require('./kept');
"#;
        assert_eq!(scan_specifiers(source), vec!["./kept"]);
    }

    #[test]
    fn repeated_specifier_reported_once() {
        let source = "require('./a'); require('./a');";
        assert_eq!(scan_specifiers(source), vec!["./a"]);
    }

    #[test]
    fn local_specifiers() {
        assert!(is_local("./a"));
        assert!(is_local("../a"));
        assert!(is_local("/abs/a"));
        assert!(!is_local("lodash"));
        assert!(!is_local("@scope/pkg"));
    }
}
