//! Include/variable template language for `.tpl` pages.
//!
//! # Syntax
//!
//! | Tag                   | Meaning                                        |
//! |-----------------------|------------------------------------------------|
//! | `{{> _nav }}`         | inline another template (`.tpl` implied)        |
//! | `{{> /parts/_foot }}` | same, resolved from the source root            |
//! | `{{ url.href }}`      | builder variable (see [`BuilderVars`])         |
//! | `{{ size "a.png" }}`  | `width="W" height="H"` read from the image     |
//!
//! Includes are spliced at compile time, so a [`CompiledTemplate`] renders
//! without touching the disk for markup and lists every file it inlined.

use anyhow::{Context, Result, anyhow, bail};
use std::fs;
use std::path::{Path, PathBuf};

use super::vars::BuilderVars;
use crate::utils::path::normalize_lexical;

const TEMPLATE_EXT: &str = "tpl";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Var(String),
    Size(String),
}

/// A parsed template with all includes inlined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledTemplate {
    segments: Vec<Segment>,
    /// Every file inlined, transitively, in first-seen order.
    dependencies: Vec<PathBuf>,
}

impl CompiledTemplate {
    /// Template consisting of literal text only.
    pub fn from_text(text: &str) -> Self {
        Self {
            segments: vec![Segment::Text(text.to_string())],
            dependencies: Vec::new(),
        }
    }

    pub fn dependencies(&self) -> &[PathBuf] {
        &self.dependencies
    }

    /// Render with builder variables; `size` resolves image dimensions.
    pub fn render(
        &self,
        vars: &BuilderVars,
        size: impl Fn(&str) -> Option<(u32, u32)>,
    ) -> Result<String> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Var(name) => {
                    let value = vars
                        .get(name)
                        .ok_or_else(|| anyhow!("unknown variable `{name}`"))?;
                    out.push_str(value);
                }
                Segment::Size(src) => out.push_str(&super::size::size_attrs(size(src.as_str()))),
            }
        }
        Ok(out)
    }
}

/// Compile `path`, inlining includes resolved against `src_root`.
pub fn compile_file(path: &Path, src_root: &Path) -> Result<CompiledTemplate> {
    let mut compiler = Compiler {
        src_root,
        stack: Vec::new(),
        segments: Vec::new(),
        dependencies: Vec::new(),
    };
    compiler.compile(path)?;

    Ok(CompiledTemplate {
        segments: compiler.segments,
        dependencies: compiler.dependencies,
    })
}

struct Compiler<'a> {
    src_root: &'a Path,
    /// Files currently being inlined, for cycle detection.
    stack: Vec<PathBuf>,
    segments: Vec<Segment>,
    dependencies: Vec<PathBuf>,
}

impl Compiler<'_> {
    fn compile(&mut self, path: &Path) -> Result<()> {
        if self.stack.iter().any(|p| p == path) {
            let chain: Vec<_> = self
                .stack
                .iter()
                .chain(std::iter::once(&path.to_path_buf()))
                .map(|p| p.display().to_string())
                .collect();
            bail!("include cycle: {}", chain.join(" -> "));
        }

        let source =
            fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;

        self.stack.push(path.to_path_buf());
        self.parse(&source, path)
            .with_context(|| format!("in {}", path.display()))?;
        self.stack.pop();
        Ok(())
    }

    fn parse(&mut self, source: &str, path: &Path) -> Result<()> {
        let mut rest = source;

        while let Some(start) = rest.find("{{") {
            self.push_text(&rest[..start]);
            let after = &rest[start + 2..];
            let end = after
                .find("}}")
                .ok_or_else(|| anyhow!("unclosed `{{{{` at byte {}", source.len() - rest.len() + start))?;
            self.tag(after[..end].trim(), path)?;
            rest = &after[end + 2..];
        }

        self.push_text(rest);
        Ok(())
    }

    fn tag(&mut self, tag: &str, path: &Path) -> Result<()> {
        if let Some(target) = tag.strip_prefix('>') {
            let include = self.resolve_include(unquote(target.trim()), path)?;
            if !self.dependencies.contains(&include) {
                self.dependencies.push(include.clone());
            }
            return self.compile(&include);
        }

        if let Some(arg) = tag.strip_prefix("size ") {
            let arg = arg.trim();
            let src = unquote(arg);
            if src == arg || src.is_empty() {
                bail!("`size` expects a quoted image path, got `{arg}`");
            }
            self.segments.push(Segment::Size(src.to_string()));
            return Ok(());
        }

        if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_') {
            bail!("invalid tag `{{{{ {tag} }}}}`");
        }
        self.segments.push(Segment::Var(tag.to_string()));
        Ok(())
    }

    fn resolve_include(&self, target: &str, including: &Path) -> Result<PathBuf> {
        if target.is_empty() {
            bail!("empty include");
        }

        let mut resolved = match target.strip_prefix('/') {
            Some(rooted) => self.src_root.join(rooted),
            None => including.parent().unwrap_or(self.src_root).join(target),
        };
        if resolved.extension().is_none() {
            resolved.set_extension(TEMPLATE_EXT);
        }
        Ok(normalize_lexical(&resolved))
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Segment::Text(last)) = self.segments.last_mut() {
            last.push_str(text);
        } else {
            self.segments.push(Segment::Text(text.to_string()));
        }
    }
}

fn unquote(s: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = s.strip_prefix(quote).and_then(|r| r.strip_suffix(quote)) {
            return inner;
        }
    }
    s
}
