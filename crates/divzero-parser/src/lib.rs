/*! Parse textual LLVM IR into the divzero IR.
 *
 * The analysis needs real programs, and the easiest place to get them is `clang -S -emit-llvm`.
 * This crate reads the integer subset of that output (functions, declarations, globals, `!dbg`
 * locations) and lowers it into a [`divzero_core::Module`]. Instructions outside the modelled set
 * survive as opaque instructions so a whole file still analyzes.
 */

#![allow(unreachable_patterns)]

use divzero_core::{IrError, Module};
use pest::Parser;
use pest_derive::Parser;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

pub mod lower;
pub mod metadata;

#[derive(Parser)]
#[grammar = "grammar.pest"]
pub struct LlvmParser;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Syntax error: {0}")]
    Syntax(#[from] Box<pest::error::Error<Rule>>),
    #[error("Invalid integer literal {text} at line {line}")]
    InvalidInteger { text: String, line: usize },
    #[error("Unsupported type {text} at line {line}")]
    InvalidType { text: String, line: usize },
    #[error("Undefined label %{label} in function {function} at line {line}")]
    UndefinedLabel {
        function: String,
        label: String,
        line: usize,
    },
    #[error("Undefined metadata {reference} at line {line}")]
    UndefinedMetadata { reference: String, line: usize },
    #[error(transparent)]
    Ir(#[from] IrError),
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type ParseResult<T> = Result<T, ParseError>;

pub fn parse(input: &str) -> ParseResult<pest::iterators::Pairs<'_, Rule>> {
    LlvmParser::parse(Rule::module, input).map_err(|e| ParseError::Syntax(Box::new(e)))
}

pub fn check(input: &str) -> bool {
    parse(input).is_ok()
}

pub fn parse_module(input: &str) -> ParseResult<Module> {
    parse_module_named("module", input)
}

pub fn parse_module_named(name: &str, input: &str) -> ParseResult<Module> {
    lower::lower_module(name, parse(input)?)
}

/// Reads and lowers one `.ll` file; the module is named after the file stem.
pub fn parse_file<P: AsRef<Path>>(path: P) -> ParseResult<Module> {
    let path = path.as_ref();
    let input = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "module".to_string());
    parse_module_named(&name, &input)
}

/// `root` itself when it is a file, otherwise every `*.ll` file below it in sorted order.
pub fn find_ir_files<P: AsRef<Path>>(root: P) -> Vec<PathBuf> {
    let root = root.as_ref();
    if root.is_file() {
        return vec![root.to_path_buf()];
    }

    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().map_or(false, |ext| ext == "ll"))
        .collect();
    files.sort();
    files
}
