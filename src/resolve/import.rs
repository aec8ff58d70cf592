// src/resolve/import.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::DfsPostOrder;
use tracing::{debug, trace, warn};

use crate::config::ResolveSection;
use crate::errors::{QuickscopeError, Result};
use crate::fs::FileSystem;
use crate::resolve::DependencyResolver;
use crate::resolve::scanner::{ImportScanner, is_local};
use crate::watch::path_utils::{is_excluded, normalize};

/// Resolver for JavaScript/TypeScript projects.
///
/// Follows local specifiers (`./`, `../`, `/`) only; bare package imports
/// are never followed. A specifier without a matching file is skipped.
#[derive(Debug, Clone)]
pub struct ImportResolver {
    fs: Arc<dyn FileSystem>,
    scanner: ImportScanner,
    extensions: Vec<String>,
    exclude: Vec<String>,
}

impl ImportResolver {
    pub fn new(fs: Arc<dyn FileSystem>, settings: &ResolveSection) -> Result<Self> {
        Ok(Self {
            fs,
            scanner: ImportScanner::new()?,
            extensions: settings.extensions.clone(),
            exclude: settings.exclude.clone(),
        })
    }

    /// Map one specifier found in `from` to a file on disk.
    fn resolve_specifier(&self, root: &Path, from: &Path, specifier: &str) -> Option<PathBuf> {
        if !is_local(specifier) {
            return None;
        }

        let base = if let Some(stripped) = specifier.strip_prefix('/') {
            let absolute = PathBuf::from(specifier);
            if absolute.starts_with(root) {
                absolute
            } else {
                root.join(stripped)
            }
        } else {
            from.parent().unwrap_or(root).join(specifier)
        };
        let base = normalize(&base);

        let resolved = self.probe(&base)?;
        if is_excluded(root, &resolved, &self.exclude) {
            trace!(file = ?resolved, "skipping excluded dependency");
            return None;
        }
        Some(resolved)
    }

    /// Try `base` as a file, then with each extension, then as a directory
    /// with an index file.
    fn probe(&self, base: &Path) -> Option<PathBuf> {
        if self.fs.is_file(base) {
            return Some(base.to_path_buf());
        }

        let file_name = base.file_name()?.to_string_lossy().into_owned();
        let with_ext = self
            .extensions
            .iter()
            .map(|ext| base.with_file_name(format!("{file_name}.{ext}")));
        let index = self
            .extensions
            .iter()
            .map(|ext| base.join(format!("index.{ext}")));

        with_ext.chain(index).find(|candidate| self.fs.is_file(candidate))
    }

    fn imports_of(&self, root: &Path, file: &Path) -> anyhow::Result<Vec<PathBuf>> {
        let source = self.fs.read_to_string(file)?;
        Ok(self
            .scanner
            .scan(&source)
            .iter()
            .filter_map(|spec| self.resolve_specifier(root, file, spec))
            .collect())
    }
}

impl DependencyResolver for ImportResolver {
    fn resolve(&self, root: &Path, file: &Path) -> Result<Vec<PathBuf>> {
        let entry = normalize(file);

        let mut graph: DiGraph<PathBuf, ()> = DiGraph::new();
        let mut index: HashMap<PathBuf, NodeIndex> = HashMap::new();

        let start = graph.add_node(entry.clone());
        index.insert(entry.clone(), start);

        let mut pending = vec![start];
        while let Some(node) = pending.pop() {
            let path = graph[node].clone();
            let imports = match self.imports_of(root, &path) {
                Ok(imports) => imports,
                Err(e) if node == start => {
                    return Err(QuickscopeError::parse_failure(path, e));
                }
                Err(e) => {
                    warn!(file = ?path, error = %e, "could not read dependency, not following it");
                    continue;
                }
            };

            for import in imports {
                let next = match index.get(&import) {
                    Some(existing) => *existing,
                    None => {
                        let added = graph.add_node(import.clone());
                        index.insert(import, added);
                        pending.push(added);
                        added
                    }
                };
                graph.update_edge(node, next, ());
            }
        }

        // Post-order puts every file after the files it imports, so the
        // entry comes last. Cycles are cut where the walk re-enters them.
        let mut order = Vec::with_capacity(graph.node_count());
        let mut dfs = DfsPostOrder::new(&graph, start);
        while let Some(node) = dfs.next(&graph) {
            order.push(graph[node].clone());
        }

        debug!(file = ?entry, dependencies = order.len() - 1, "resolved");
        Ok(order)
    }
}
