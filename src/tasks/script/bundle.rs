//! Relative-import linking for script entries.
//!
//! An entry that imports sibling modules (`./x`, `../y`) is linked into one
//! file. Every imported module becomes a function in a small registry that
//! runs it once, on first `__pk_require`, and the entry's imports of it turn
//! into reads from that registry:
//!
//! ```text
//! const __pk_require = ((modules) => { ... })([
//!   /* _util.js */
//!   (__pk_exports, __pk_require, __pk_export, __pk_reexport) => { ... },
//! ]);
//! const __pk_m0 = __pk_require(0);
//! const greet = __pk_m0.greet;
//! document.title = greet("world");
//! ```
//!
//! Bare specifiers (`lit`, `https://...`) stay as `import` statements in the
//! entry, which keeps its own `export`s. Inside an imported module they
//! cannot be resolved and fail the build. Imported bindings are copied when
//! the importing module starts, so a cycle sees the values as they were at
//! that point.

use anyhow::{Context, Result, anyhow, bail};
use oxc::allocator::Allocator;
use oxc::ast::ast::{
    Declaration, ExportDefaultDeclarationKind, ImportDeclarationSpecifier, Statement,
};
use oxc::parser::Parser;
use oxc::span::{GetSpan, SourceType, Span};
use rustc_hash::FxHashMap;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};

use super::strip_types;
use crate::utils::path::normalize_lexical;

/// Extensions tried, in order, for a specifier that names no existing file.
const EXTENSIONS: [&str; 3] = ["ts", "js", "mjs"];

const RUNTIME: &str = r#"const __pk_require = ((modules) => {
  const cache = [];
  const define = (target, getters) => {
    for (const name of Object.keys(getters)) {
      Object.defineProperty(target, name, { enumerable: true, get: getters[name] });
    }
  };
  const reexport = (target, source) => {
    for (const name of Object.keys(source)) {
      if (name !== "default" && !(name in target)) {
        Object.defineProperty(target, name, { enumerable: true, get: () => source[name] });
      }
    }
  };
  const require = (id) => {
    if (!cache[id]) {
      cache[id] = {};
      modules[id](cache[id], require, define, reexport);
    }
    return cache[id];
  };
  return require;
})(["#;

/// Link `entry` with every relative module it reaches.
///
/// `code` is the entry as plain JavaScript. Returns `None` when the entry
/// imports nothing relative and compiles on its own.
pub fn link(entry: &Path, code: &str) -> Result<Option<String>> {
    let items = analyze(code)?;
    if !items.iter().filter_map(Item::source).any(is_relative) {
        return Ok(None);
    }

    let mut linker = Linker {
        entry: entry.to_path_buf(),
        ids: FxHashMap::default(),
        modules: Vec::new(),
    };
    let targets = linker.link(entry, &items, Role::Entry)?;
    let body = rewrite(code, &items, &targets, Role::Entry)?;

    let mut out = String::from(RUNTIME);
    out.push('\n');
    for module in &linker.modules {
        out.push_str(module);
    }
    out.push_str("]);\n");
    out.push_str(&body);
    Ok(Some(out))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    /// Top level of the output; keeps bare imports and its own exports.
    Entry,
    /// Wrapped in a registry function; exports become getters.
    Dependency,
}

/// Bindings introduced by one `import` specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Binding {
    Named { imported: String, local: String },
    Default(String),
    Namespace(String),
}

/// A top-level module statement, with the byte ranges a rewrite needs.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Item {
    /// `import ... from "source"`
    Import {
        span: Range<usize>,
        source: String,
        bindings: Vec<Binding>,
    },
    /// `export <declaration>`; `prefix` covers the `export ` keyword.
    Declaration { prefix: Range<usize>, names: Vec<String> },
    /// `export default ...`; `prefix` covers `export default `.
    Default {
        prefix: Range<usize>,
        end: usize,
        /// Name of a named function or class declaration.
        name: Option<String>,
        /// An anonymous function or class declaration, which needs a `;`
        /// once it becomes an initializer.
        declaration: bool,
    },
    /// `export { local as exported }`
    List {
        span: Range<usize>,
        names: Vec<(String, String)>,
    },
    /// `export { imported as exported } from "source"`
    Reexport {
        span: Range<usize>,
        source: String,
        names: Vec<(String, String)>,
    },
    /// `export * from "source"` or `export * as alias from "source"`
    ReexportAll {
        span: Range<usize>,
        source: String,
        alias: Option<String>,
    },
}

impl Item {
    fn source(&self) -> Option<&str> {
        match self {
            Self::Import { source, .. } | Self::Reexport { source, .. } | Self::ReexportAll { source, .. } => {
                Some(source)
            }
            Self::Declaration { .. } | Self::Default { .. } | Self::List { .. } => None,
        }
    }
}

fn range(span: Span) -> Range<usize> {
    span.start as usize..span.end as usize
}

/// Collect the import and export statements of `code`.
fn analyze(code: &str) -> Result<Vec<Item>> {
    let allocator = Allocator::default();
    let parsed = Parser::new(&allocator, code, SourceType::mjs()).parse();
    if let Some(error) = parsed.errors.first() {
        bail!("{error}");
    }

    let mut items = Vec::new();
    for statement in &parsed.program.body {
        match statement {
            Statement::ImportDeclaration(decl) if !decl.import_kind.is_type() => {
                let bindings = decl
                    .specifiers
                    .iter()
                    .flat_map(|specifiers| specifiers.iter())
                    .filter_map(|specifier| match specifier {
                        ImportDeclarationSpecifier::ImportSpecifier(s) if s.import_kind.is_type() => None,
                        ImportDeclarationSpecifier::ImportSpecifier(s) => Some(Binding::Named {
                            imported: s.imported.name().to_string(),
                            local: s.local.name.to_string(),
                        }),
                        ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => {
                            Some(Binding::Default(s.local.name.to_string()))
                        }
                        ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => {
                            Some(Binding::Namespace(s.local.name.to_string()))
                        }
                    })
                    .collect();
                items.push(Item::Import {
                    span: range(decl.span),
                    source: decl.source.value.to_string(),
                    bindings,
                });
            }
            Statement::ExportNamedDeclaration(decl) if !decl.export_kind.is_type() => {
                let names = decl
                    .specifiers
                    .iter()
                    .filter(|s| !s.export_kind.is_type())
                    .map(|s| (s.local.name().to_string(), s.exported.name().to_string()))
                    .collect();
                items.push(match (&decl.declaration, &decl.source) {
                    (Some(declaration), _) => Item::Declaration {
                        prefix: decl.span.start as usize..declaration.span().start as usize,
                        names: declared_names(declaration),
                    },
                    (None, Some(source)) => Item::Reexport {
                        span: range(decl.span),
                        source: source.value.to_string(),
                        names,
                    },
                    (None, None) => Item::List {
                        span: range(decl.span),
                        names,
                    },
                });
            }
            Statement::ExportDefaultDeclaration(decl) => {
                let (name, declaration) = match &decl.declaration {
                    ExportDefaultDeclarationKind::FunctionDeclaration(f) => {
                        (f.name().map(|n| n.to_string()), true)
                    }
                    ExportDefaultDeclarationKind::ClassDeclaration(c) => {
                        (c.name().map(|n| n.to_string()), true)
                    }
                    _ => (None, false),
                };
                items.push(Item::Default {
                    prefix: decl.span.start as usize..decl.declaration.span().start as usize,
                    end: decl.span.end as usize,
                    name,
                    declaration,
                });
            }
            Statement::ExportAllDeclaration(decl) if !decl.export_kind.is_type() => {
                items.push(Item::ReexportAll {
                    span: range(decl.span),
                    source: decl.source.value.to_string(),
                    alias: decl.exported.as_ref().map(|e| e.name().to_string()),
                });
            }
            _ => {}
        }
    }
    Ok(items)
}

fn declared_names(declaration: &Declaration) -> Vec<String> {
    match declaration {
        Declaration::VariableDeclaration(var) => var
            .declarations
            .iter()
            .flat_map(|d| d.id.get_binding_identifiers())
            .map(|id| id.name.to_string())
            .collect(),
        other => other.id().map(|id| id.name.to_string()).into_iter().collect(),
    }
}

fn is_relative(specifier: &str) -> bool {
    specifier.starts_with("./") || specifier.starts_with("../")
}

/// File a relative `specifier` refers to: the exact path, a `.ts` twin of a
/// `.js` path, the path plus a known extension, then a directory index.
fn resolve(importer: &Path, specifier: &str) -> Option<PathBuf> {
    let base = normalize_lexical(&importer.parent()?.join(specifier));
    let name = base.file_name()?.to_string_lossy().into_owned();

    let mut candidates = vec![base.clone()];
    if let Some(stem) = name.strip_suffix(".js") {
        candidates.push(base.with_file_name(format!("{stem}.ts")));
    }
    candidates.extend(EXTENSIONS.iter().map(|ext| base.with_file_name(format!("{name}.{ext}"))));
    candidates.extend(EXTENSIONS.iter().map(|ext| base.join(format!("index.{ext}"))));
    candidates.into_iter().find(|candidate| candidate.is_file())
}

/// Registry under construction. Ids are assigned before a module's own
/// imports are followed, so cycles terminate.
struct Linker {
    entry: PathBuf,
    ids: FxHashMap<PathBuf, usize>,
    modules: Vec<String>,
}

impl Linker {
    /// Registry id of `path`, loading it on first sight.
    fn require(&mut self, path: PathBuf) -> Result<usize> {
        if let Some(&id) = self.ids.get(&path) {
            return Ok(id);
        }
        if path == self.entry {
            bail!("{} is imported back by one of its own modules", path.display());
        }

        let id = self.modules.len();
        self.ids.insert(path.clone(), id);
        self.modules.push(String::new());

        let source =
            fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))?;
        let code = strip_types(&path, &source).with_context(|| format!("failed to compile {}", path.display()))?;
        let items = analyze(&code).with_context(|| format!("failed to parse {}", path.display()))?;
        let targets = self.link(&path, &items, Role::Dependency)?;
        let body = rewrite(&code, &items, &targets, Role::Dependency)?;

        let label = path
            .file_name()
            .map(|name| name.to_string_lossy().replace("*/", "* /"))
            .unwrap_or_default();
        self.modules[id] = format!(
            "/* {label} */\n(__pk_exports, __pk_require, __pk_export, __pk_reexport) => {{\n{}\n}},\n",
            body.trim_end()
        );
        Ok(id)
    }

    /// Registry id behind each item's specifier; `None` for items without
    /// one and for bare specifiers left to the browser.
    fn link(&mut self, importer: &Path, items: &[Item], role: Role) -> Result<Vec<Option<usize>>> {
        items
            .iter()
            .map(|item| {
                let Some(specifier) = item.source() else {
                    return Ok(None);
                };
                if !is_relative(specifier) {
                    if role == Role::Entry {
                        return Ok(None);
                    }
                    bail!("cannot bundle bare import \"{specifier}\" in {}", importer.display());
                }
                let path = resolve(importer, specifier).ok_or_else(|| {
                    anyhow!("cannot resolve \"{specifier}\" from {}", importer.display())
                })?;
                self.require(path).map(Some)
            })
            .collect()
    }
}

/// Rewrite the module statements of `code` into registry reads and, for a
/// dependency, export getters.
fn rewrite(code: &str, items: &[Item], targets: &[Option<usize>], role: Role) -> Result<String> {
    let dependency = role == Role::Dependency;
    let mut edits: Vec<(Range<usize>, String)> = Vec::new();
    let mut header: Vec<String> = Vec::new();
    let mut getters: Vec<(String, String)> = Vec::new();
    let mut hoisted: Vec<usize> = Vec::new();

    // `__pk_m<id>`, declared once at the top of the module
    let mut module_var = |id: usize, header: &mut Vec<String>| {
        if !hoisted.contains(&id) {
            hoisted.push(id);
            header.push(format!("const __pk_m{id} = __pk_require({id});"));
        }
        format!("__pk_m{id}")
    };

    for (index, (item, target)) in items.iter().zip(targets).enumerate() {
        match (item, *target) {
            (Item::Import { span, bindings, .. }, Some(id)) => {
                let module = module_var(id, &mut header);
                for binding in bindings {
                    header.push(match binding {
                        Binding::Named { imported, local } => {
                            format!("const {local} = {module}{};", member(imported))
                        }
                        Binding::Default(local) => format!("const {local} = {module}.default;"),
                        Binding::Namespace(local) => format!("const {local} = {module};"),
                    });
                }
                edits.push((span.clone(), String::new()));
            }
            (Item::Declaration { prefix, names }, _) if dependency => {
                edits.push((prefix.clone(), String::new()));
                getters.extend(names.iter().map(|name| (name.clone(), name.clone())));
            }
            (
                Item::Default {
                    prefix,
                    end,
                    name,
                    declaration,
                },
                _,
            ) if dependency => match name {
                Some(name) => {
                    edits.push((prefix.clone(), String::new()));
                    getters.push(("default".into(), name.clone()));
                }
                None => {
                    edits.push((prefix.clone(), "const __pk_default = ".into()));
                    if *declaration {
                        edits.push((*end..*end, ";".into()));
                    }
                    getters.push(("default".into(), "__pk_default".into()));
                }
            },
            (Item::List { span, names }, _) if dependency => {
                edits.push((span.clone(), String::new()));
                getters.extend(names.iter().map(|(local, exported)| (exported.clone(), local.clone())));
            }
            (Item::Reexport { span, names, .. }, Some(id)) => {
                let module = module_var(id, &mut header);
                if dependency {
                    edits.push((span.clone(), String::new()));
                    getters.extend(
                        names
                            .iter()
                            .map(|(imported, exported)| (exported.clone(), format!("{module}{}", member(imported)))),
                    );
                } else {
                    let mut text = String::new();
                    let mut list = Vec::with_capacity(names.len());
                    for (n, (imported, exported)) in names.iter().enumerate() {
                        let local = format!("__pk_r{index}_{n}");
                        text.push_str(&format!("const {local} = {module}{};\n", member(imported)));
                        list.push(format!("{local} as {}", export_name(exported)));
                    }
                    text.push_str(&format!("export {{ {} }};", list.join(", ")));
                    edits.push((span.clone(), text));
                }
            }
            (Item::ReexportAll { span, alias, .. }, Some(id)) => {
                let module = module_var(id, &mut header);
                match (alias, dependency) {
                    (None, true) => {
                        header.push(format!("__pk_reexport(__pk_exports, {module});"));
                        edits.push((span.clone(), String::new()));
                    }
                    (None, false) => bail!("`export *` from a bundled module is not supported in an entry"),
                    (Some(alias), true) => {
                        getters.push((alias.clone(), module));
                        edits.push((span.clone(), String::new()));
                    }
                    (Some(alias), false) => {
                        edits.push((span.clone(), format!("export {{ {module} as {} }};", export_name(alias))));
                    }
                }
            }
            _ => {}
        }
    }

    edits.sort_by(|a, b| b.0.start.cmp(&a.0.start));
    let mut body = code.to_string();
    for (range, text) in edits {
        body.replace_range(range, &text);
    }

    let mut out = String::new();
    if !getters.is_empty() {
        let entries: Vec<String> = getters
            .iter()
            .map(|(exported, local)| format!("{}: () => {local}", quote(exported)))
            .collect();
        out.push_str(&format!("__pk_export(__pk_exports, {{ {} }});\n", entries.join(", ")));
    }
    for line in header {
        out.push_str(&line);
        out.push('\n');
    }
    out.push_str(&body);
    Ok(out)
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// Property access for an export name: `.name` or `["some name"]`.
fn member(name: &str) -> String {
    if is_identifier(name) {
        format!(".{name}")
    } else {
        format!("[{}]", quote(name))
    }
}

/// Name in an `export { x as <name> }` clause.
fn export_name(name: &str) -> String {
    if is_identifier(name) {
        name.to_string()
    } else {
        quote(name)
    }
}

fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
