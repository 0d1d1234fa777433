//! Project classifier: stops the planner from treating identical boilerplate
//! in sibling project folders as a "move".
//!
//! The catalog below is carried in full from `original_source/config.py`'s
//! `PROJECT_TEMPLATES` — eleven kinds, not just a minimal handful — because
//! the boilerplate-protection invariant only fires reliably against a
//! realistic multi-project source tree.

use crate::index::Index;
use std::collections::{HashMap, HashSet};

struct ProjectTemplate {
    kind: &'static str,
    marker_files: &'static [&'static str],
    always_copy: &'static [&'static str],
}

const CATALOG: &[ProjectTemplate] = &[
    ProjectTemplate {
        kind: "nodejs",
        marker_files: &["package.json"],
        always_copy: &[
            ".gitignore",
            ".npmrc",
            ".nvmrc",
            ".node-version",
            "package-lock.json",
            "yarn.lock",
            "pnpm-lock.yaml",
        ],
    },
    ProjectTemplate {
        kind: "typescript",
        marker_files: &["tsconfig.json"],
        always_copy: &["tsconfig.json", "tsconfig.app.json", "tsconfig.node.json", "tsconfig.build.json"],
    },
    ProjectTemplate {
        kind: "vite",
        marker_files: &["vite.config.ts", "vite.config.js"],
        always_copy: &[
            "vite.config.ts",
            "vite.config.js",
            "postcss.config.js",
            "postcss.config.cjs",
            "tailwind.config.js",
            "tailwind.config.ts",
            "index.html",
        ],
    },
    ProjectTemplate {
        kind: "react",
        marker_files: &["src/App.tsx", "src/App.jsx", "src/main.tsx", "src/main.jsx"],
        always_copy: &[
            "src/App.tsx",
            "src/App.jsx",
            "src/main.tsx",
            "src/main.jsx",
            "src/index.css",
            "src/App.css",
            "src/vite-env.d.ts",
        ],
    },
    ProjectTemplate { kind: "swc", marker_files: &[".swcrc"], always_copy: &[".swcrc"] },
    ProjectTemplate {
        kind: "eslint",
        marker_files: &["eslint.config.js", "eslint.config.mjs", ".eslintrc.js", ".eslintrc.json", ".eslintrc.cjs"],
        always_copy: &[
            "eslint.config.js",
            "eslint.config.mjs",
            ".eslintrc.js",
            ".eslintrc.json",
            ".eslintrc.cjs",
            ".prettierrc",
            ".prettierrc.json",
            ".prettierrc.js",
            ".editorconfig",
        ],
    },
    ProjectTemplate {
        kind: "jest",
        marker_files: &["jest.config.js", "jest.config.ts", "jest.config.mjs"],
        always_copy: &["jest.config.js", "jest.config.ts", "jest.config.mjs", "jest.setup.js", "jest.setup.ts"],
    },
    ProjectTemplate {
        kind: "pwa",
        marker_files: &["public/favicon/site.webmanifest", "public/site.webmanifest", "public/manifest.json"],
        always_copy: &[
            "public/favicon/site.webmanifest",
            "public/favicon/favicon.ico",
            "public/favicon/favicon-16x16.png",
            "public/favicon/favicon-32x32.png",
            "public/favicon/apple-touch-icon.png",
            "public/favicon/android-chrome-192x192.png",
            "public/favicon/android-chrome-512x512.png",
            "public/site.webmanifest",
            "public/manifest.json",
            "public/favicon.ico",
        ],
    },
    ProjectTemplate {
        kind: "shadcn",
        marker_files: &["components.json", "src/lib/utils.ts"],
        always_copy: &[
            "src/lib/utils.ts",
            "components.json",
            "src/components/ui/button.tsx",
            "src/components/ui/input.tsx",
            "src/components/ui/card.tsx",
        ],
    },
    ProjectTemplate {
        kind: "python",
        marker_files: &["pyproject.toml", "setup.py", "requirements.txt"],
        always_copy: &[
            "pyproject.toml",
            "setup.py",
            "setup.cfg",
            "requirements.txt",
            "requirements-dev.txt",
            ".python-version",
            "pytest.ini",
            "conftest.py",
            "tox.ini",
        ],
    },
    ProjectTemplate {
        kind: "git",
        marker_files: &[".git"],
        always_copy: &[".gitignore", ".gitattributes", "LICENSE", "LICENSE.md", "LICENSE.txt", "README.md", "CHANGELOG.md"],
    },
];

/// `project_root -> set of detected project_kind`, derived once from the
/// source index and read-only during planning.
#[derive(Debug, Default)]
pub struct ProjectMap {
    roots: HashMap<String, HashSet<&'static str>>,
}

impl ProjectMap {
    /// Longest known root that is an ancestor of `path`; `None` if `path`
    /// isn't inside any detected project.
    pub fn project_root_of(&self, path: &str) -> Option<&str> {
        let parts: Vec<&str> = path.split('/').collect();
        for i in (0..parts.len()).rev() {
            let candidate = parts[..i].join("/");
            if let Some((root, _)) = self.roots.get_key_value(&candidate) {
                return Some(root.as_str());
            }
        }
        None
    }

    pub fn roots(&self) -> impl Iterator<Item = (&str, &HashSet<&'static str>)> {
        self.roots.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Detect project roots by marker file, from the source index alone.
pub fn detect_project_roots(src_index: &Index) -> ProjectMap {
    let mut roots: HashMap<String, HashSet<&'static str>> = HashMap::new();

    for record in src_index.all_files() {
        let filename = record.relative_path.rsplit('/').next().unwrap_or(&record.relative_path);

        for template in CATALOG {
            for marker in template.marker_files {
                if marker.contains('/') {
                    if let Some(root) = project_root_for_nested_marker(&record.relative_path, marker) {
                        roots.entry(root).or_default().insert(template.kind);
                    }
                } else if filename == *marker {
                    let root = parent_of(&record.relative_path);
                    roots.entry(root).or_default().insert(template.kind);
                }
            }
        }
    }

    ProjectMap { roots }
}

fn project_root_for_nested_marker(relative_path: &str, marker: &str) -> Option<String> {
    if !relative_path.ends_with(marker) {
        return None;
    }
    let marker_depth = marker.matches('/').count() + 1;
    let parts: Vec<&str> = relative_path.split('/').collect();
    if parts.len() > marker_depth {
        Some(parts[..parts.len() - marker_depth].join("/"))
    } else {
        Some(String::new())
    }
}

fn parent_of(relative_path: &str) -> String {
    match relative_path.rsplit_once('/') {
        Some((parent, _)) => parent.to_string(),
        None => String::new(),
    }
}

/// The set of relative paths that must never be treated as a move target
/// across distinct project roots — every `always_copy` entry of every
/// detected kind, joined to its project root.
pub fn always_copy_paths(map: &ProjectMap) -> HashSet<String> {
    let mut paths = HashSet::new();
    for (root, kinds) in map.roots() {
        for kind in kinds {
            let template = CATALOG.iter().find(|t| t.kind == *kind).expect("kind came from the catalog");
            for filename in template.always_copy {
                let path = if root.is_empty() { filename.to_string() } else { format!("{root}/{filename}") };
                paths.insert(path);
            }
        }
    }
    paths
}

/// True iff moving `candidate_path` onto `src_path` would actually be a
/// cross-project copy of shared boilerplate.
pub fn is_cross_project_boilerplate(
    src_path: &str,
    candidate_path: &str,
    map: &ProjectMap,
    always_copy_paths: &HashSet<String>,
) -> bool {
    if !always_copy_paths.contains(src_path) {
        return false;
    }
    map.project_root_of(src_path) != map.project_root_of(candidate_path)
}
