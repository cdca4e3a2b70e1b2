//! Script task: each entry is parsed, stripped of TypeScript syntax and
//! (unless debugging in development) minified with `console`/`debugger`
//! calls dropped. Relative imports are linked into the entry (see
//! [`bundle`]); readable output carries a source map.
//!
//! The map of an entry with no relative imports points at the entry itself.
//! A linked entry maps onto the combined JavaScript, which is embedded in
//! the map.

mod bundle;

use anyhow::{Context, Result, anyhow, bail};
use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::semantic::SemanticBuilder;
use oxc::span::SourceType;
use oxc::transformer::{TransformOptions, Transformer};
use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{Emitted, MapComment, blocking, for_each_file, sources, write_emitted};
use crate::builder::TaskOptions;
use crate::core::{BuildContext, SourceKind, artifact_path};
use crate::debug;

/// How compiled JavaScript is printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmitOptions {
    pub minify: bool,
    pub source_map: bool,
}

impl EmitOptions {
    fn for_context(ctx: &BuildContext) -> Self {
        Self {
            minify: ctx.minify(),
            source_map: ctx.source_maps(),
        }
    }
}

pub async fn run(ctx: Arc<BuildContext>, options: TaskOptions) -> Result<()> {
    let entries = sources(&ctx, SourceKind::Script, &options);
    let count = for_each_file(&ctx, entries, build_entry).await?;
    debug!("script"; "emitted {} script(s)", count);
    Ok(())
}

async fn build_entry(ctx: Arc<BuildContext>, entry: PathBuf) -> Result<()> {
    let output = artifact_path(
        SourceKind::Script,
        &entry,
        &ctx.paths,
        ctx.config.build.image_optimization,
    )
    .ok_or_else(|| anyhow!("script outside source root"))?;

    let options = EmitOptions::for_context(&ctx);
    let emitted = blocking(move || {
        let source = fs::read_to_string(&entry)
            .with_context(|| format!("failed to read {}", entry.display()))?;
        compile(&entry, &source, options)
    })
    .await?;
    write_emitted(&output, emitted, MapComment::Js).await
}

/// Compile an entry together with the relative modules it imports.
pub fn compile(entry: &Path, source: &str, options: EmitOptions) -> Result<Emitted> {
    let plain = strip_types(entry, source)?;
    match bundle::link(entry, &plain)? {
        Some(linked) => transform(&entry.with_extension("js"), &linked, options),
        None => transform(entry, source, options),
    }
}

/// TypeScript source as plain JavaScript; JavaScript is returned as is.
fn strip_types<'a>(path: &Path, source: &'a str) -> Result<Cow<'a, str>> {
    let source_type = SourceType::from_path(path).map_err(|e| anyhow!("{e}"))?;
    if !source_type.is_typescript() {
        return Ok(Cow::Borrowed(source));
    }

    let allocator = Allocator::default();
    let parsed = Parser::new(&allocator, source, source_type).parse();
    if let Some(error) = parsed.errors.first() {
        bail!("{error}");
    }
    let mut program = parsed.program;
    strip_program(&allocator, path, &mut program)?;
    Ok(Cow::Owned(Codegen::new().build(&program).code))
}

fn strip_program<'a>(
    allocator: &'a Allocator,
    path: &Path,
    program: &mut oxc::ast::ast::Program<'a>,
) -> Result<()> {
    let scoping = SemanticBuilder::new().build(program).semantic.into_scoping();
    let transformed = Transformer::new(allocator, path, &TransformOptions::default())
        .build_with_scoping(scoping, program);
    if let Some(error) = transformed.errors.first() {
        bail!("{error}");
    }
    Ok(())
}

/// Compile one script to plain JavaScript.
pub fn transform(path: &Path, source: &str, options: EmitOptions) -> Result<Emitted> {
    let allocator = Allocator::default();
    let source_type = SourceType::from_path(path).map_err(|e| anyhow!("{e}"))?;

    let parsed = Parser::new(&allocator, source, source_type).parse();
    if let Some(error) = parsed.errors.first() {
        bail!("{error}");
    }
    let mut program = parsed.program;

    if source_type.is_typescript() {
        strip_program(&allocator, path, &mut program)?;
    }

    // Sources in the map are named relative to the map itself
    let source_map_path = options
        .source_map
        .then(|| path.file_name().map(PathBuf::from))
        .flatten();

    let printed = if options.minify {
        let minifier = MinifierOptions {
            mangle: Some(MangleOptions::default()),
            compress: Some(CompressOptions {
                drop_console: true,
                drop_debugger: true,
                ..CompressOptions::smallest()
            }),
        };
        let minified = Minifier::new(minifier).minify(&allocator, &mut program);
        Codegen::new()
            .with_options(CodegenOptions {
                minify: true,
                comments: CommentOptions::disabled(),
                source_map_path,
                ..CodegenOptions::default()
            })
            .with_scoping(minified.scoping)
            .build(&program)
    } else {
        Codegen::new()
            .with_options(CodegenOptions {
                source_map_path,
                ..CodegenOptions::default()
            })
            .build(&program)
    };

    Ok(Emitted {
        code: printed.code,
        map: printed.map.map(|map| map.to_json_string()),
    })
}
