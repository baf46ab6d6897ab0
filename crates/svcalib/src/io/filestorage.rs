use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::error::FileStorageError;

const YAML_HEADER: &str = "%YAML:1.0";
const MATRIX_TAG: &str = "!!opencv-matrix";

// OpenCV wraps matrix data once a line grows past this width
const MAX_LINE_WIDTH: usize = 70;
const DATA_CONTINUATION_INDENT: &str = "       ";

/// Element type of an `!!opencv-matrix` node, the `dt` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElemType {
    /// 32-bit signed integer, `i`.
    I32,
    /// 32-bit float, `f`.
    F32,
    /// 64-bit float, `d`.
    F64,
}

impl ElemType {
    fn code(self) -> &'static str {
        match self {
            ElemType::I32 => "i",
            ElemType::F32 => "f",
            ElemType::F64 => "d",
        }
    }

    fn from_code(code: &str) -> Option<Self> {
        match code {
            "i" => Some(ElemType::I32),
            "f" => Some(ElemType::F32),
            "d" => Some(ElemType::F64),
            _ => None,
        }
    }

    fn format(self, value: f64) -> String {
        match self {
            // saturating cast, out of range values cannot be stored as int
            ElemType::I32 => format!("{}", value as i32),
            ElemType::F32 => format_real(value as f32 as f64, 8),
            ElemType::F64 => format_real(value, 16),
        }
    }
}

/// A dense matrix node.
#[derive(Debug, Clone, PartialEq)]
pub struct MatNode {
    /// Number of rows.
    pub rows: usize,
    /// Number of columns.
    pub cols: usize,
    /// Element type.
    pub dt: ElemType,
    /// Row-major values, widened to f64.
    pub data: Vec<f64>,
}

/// A top-level value of a FileStorage file.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Integer scalar.
    Int(i64),
    /// Floating point scalar.
    Real(f64),
    /// String scalar.
    Str(String),
    /// `!!opencv-matrix` node.
    Mat(MatNode),
}

/// Format a real number the way OpenCV does: integral values as `N.`, the rest
/// in scientific notation with a signed two-digit exponent.
pub fn format_real(value: f64, precision: usize) -> String {
    if value.is_nan() {
        return ".Nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { ".Inf" } else { "-.Inf" }.to_string();
    }

    if value == value.trunc() && value.abs() < i32::MAX as f64 {
        return format!("{}.", value as i64);
    }

    let formatted = format!("{:.*e}", precision, value);
    match formatted.split_once('e') {
        Some((mantissa, exponent)) => {
            let exponent: i32 = exponent.parse().unwrap_or(0);
            let sign = if exponent < 0 { '-' } else { '+' };
            format!("{mantissa}e{sign}{:02}", exponent.abs())
        }
        None => formatted,
    }
}

fn needs_quotes(s: &str) -> bool {
    let Some(first) = s.chars().next() else {
        return true;
    };
    // anything that reads back as a number must stay a string
    s.parse::<f64>().is_ok()
        || first.is_ascii_digit()
        || matches!(first, '+' | '-' | '.')
        || first.is_whitespace()
        || s.ends_with(char::is_whitespace)
        || s.chars().any(|c| c.is_control() || ":#'\"[]{},&*!|>%@`\\".contains(c))
}

fn quote(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len() + 2);
    escaped.push('"');
    for c in s.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\t' => escaped.push_str("\\t"),
            '\r' => escaped.push_str("\\r"),
            _ => escaped.push(c),
        }
    }
    escaped.push('"');
    escaped
}

/// Writer for a FileStorage YAML file.
///
/// The file is created on construction and closed when the writer is dropped;
/// [`FileStorageWriter::release`] flushes it and reports any pending error.
pub struct FileStorageWriter {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl FileStorageWriter {
    /// Create or truncate the file at `path` and write the YAML header.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, FileStorageError> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|source| FileStorageError::Io {
            path: path.clone(),
            source,
        })?;

        let mut fs = Self {
            path,
            writer: BufWriter::new(file),
        };
        fs.write_line(&format!("{YAML_HEADER}\n---"))?;

        Ok(fs)
    }

    fn write_line(&mut self, line: &str) -> Result<(), FileStorageError> {
        writeln!(self.writer, "{line}").map_err(|source| FileStorageError::Io {
            path: self.path.clone(),
            source,
        })
    }

    /// Write a floating point scalar in double precision.
    pub fn write_real(&mut self, key: &str, value: f64) -> Result<(), FileStorageError> {
        self.write_line(&format!("{key}: {}", format_real(value, 16)))
    }

    /// Write an integer scalar.
    pub fn write_int(&mut self, key: &str, value: i64) -> Result<(), FileStorageError> {
        self.write_line(&format!("{key}: {value}"))
    }

    /// Write a string scalar, quoted when it could be mistaken for another type.
    pub fn write_str(&mut self, key: &str, value: &str) -> Result<(), FileStorageError> {
        let value = if needs_quotes(value) {
            quote(value)
        } else {
            value.to_string()
        };
        self.write_line(&format!("{key}: {value}"))
    }

    /// Write a row-major matrix as an `!!opencv-matrix` node.
    ///
    /// PRECONDITION: `data.len() == rows * cols`.
    pub fn write_mat(
        &mut self,
        key: &str,
        rows: usize,
        cols: usize,
        dt: ElemType,
        data: &[f64],
    ) -> Result<(), FileStorageError> {
        debug_assert_eq!(data.len(), rows * cols);

        self.write_line(&format!("{key}: {MATRIX_TAG}"))?;
        self.write_line(&format!("   rows: {rows}"))?;
        self.write_line(&format!("   cols: {cols}"))?;
        self.write_line(&format!("   dt: {}", dt.code()))?;

        let mut text = String::from("   data: [ ");
        let mut line_len = text.len();
        for (i, value) in data.iter().enumerate() {
            let item = dt.format(*value);
            if i > 0 {
                if line_len + item.len() + 2 > MAX_LINE_WIDTH {
                    text.push_str(",\n");
                    text.push_str(DATA_CONTINUATION_INDENT);
                    line_len = DATA_CONTINUATION_INDENT.len();
                } else {
                    text.push_str(", ");
                    line_len += 2;
                }
            }
            text.push_str(&item);
            line_len += item.len();
        }
        text.push_str(" ]");

        self.write_line(&text)
    }

    /// Flush and close the file.
    pub fn release(mut self) -> Result<(), FileStorageError> {
        self.writer.flush().map_err(|source| FileStorageError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

/// A parsed FileStorage file: its top-level nodes in file order.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
    nodes: Vec<(String, Node)>,
}

impl FileStorage {
    /// Read and parse the file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FileStorageError> {
        let path = path.as_ref().to_path_buf();
        let io_err = |source| FileStorageError::Io {
            path: path.clone(),
            source,
        };

        let file = File::open(&path).map_err(io_err)?;
        let lines = BufReader::new(file)
            .lines()
            .collect::<Result<Vec<_>, _>>()
            .map_err(io_err)?;

        let nodes = parse_nodes(&lines).map_err(|message| FileStorageError::Parse {
            path: path.clone(),
            message,
        })?;

        Ok(Self { path, nodes })
    }

    /// The path the file was read from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The top-level nodes in file order.
    pub fn nodes(&self) -> &[(String, Node)] {
        &self.nodes
    }

    /// Look up a top-level node.
    pub fn get(&self, key: &str) -> Result<&Node, FileStorageError> {
        self.nodes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, node)| node)
            .ok_or_else(|| FileStorageError::MissingKey {
                path: self.path.clone(),
                key: key.to_string(),
            })
    }

    fn mismatch(&self, key: &str, expected: &str) -> FileStorageError {
        FileStorageError::TypeMismatch {
            path: self.path.clone(),
            key: key.to_string(),
            expected: expected.to_string(),
        }
    }

    /// Read a real scalar. Integers are widened.
    pub fn real(&self, key: &str) -> Result<f64, FileStorageError> {
        match self.get(key)? {
            Node::Real(v) => Ok(*v),
            Node::Int(v) => Ok(*v as f64),
            _ => Err(self.mismatch(key, "a real number")),
        }
    }

    /// Read an integer scalar.
    pub fn int(&self, key: &str) -> Result<i64, FileStorageError> {
        match self.get(key)? {
            Node::Int(v) => Ok(*v),
            _ => Err(self.mismatch(key, "an integer")),
        }
    }

    /// Read a string scalar.
    pub fn string(&self, key: &str) -> Result<&str, FileStorageError> {
        match self.get(key)? {
            Node::Str(v) => Ok(v),
            _ => Err(self.mismatch(key, "a string")),
        }
    }

    /// Read a matrix with the given shape.
    pub fn mat(&self, key: &str, rows: usize, cols: usize) -> Result<&MatNode, FileStorageError> {
        match self.get(key)? {
            Node::Mat(m) if m.rows == rows && m.cols == cols => Ok(m),
            _ => Err(self.mismatch(key, &format!("a {rows}x{cols} matrix"))),
        }
    }
}

fn parse_nodes(lines: &[String]) -> Result<Vec<(String, Node)>, String> {
    let mut lines = lines
        .iter()
        .map(|l| l.trim_end())
        .filter(|l| !l.is_empty() && !l.trim_start().starts_with('#'))
        .peekable();

    match lines.next() {
        Some(header) if header.starts_with("%YAML") => {}
        _ => return Err("missing %YAML header".to_string()),
    }
    if lines.peek() == Some(&"---") {
        lines.next();
    }

    let mut nodes = Vec::new();
    while let Some(line) = lines.next() {
        if line.starts_with(' ') {
            return Err(format!("unexpected indented line: {line}"));
        }
        let (key, value) = split_key_value(line)?;

        let node = if value == MATRIX_TAG {
            // the matrix body is every following indented line
            let mut body = Vec::new();
            while let Some(&next) = lines.peek() {
                if !next.starts_with(' ') {
                    break;
                }
                body.push(next.trim());
                lines.next();
            }
            Node::Mat(parse_matrix(key, &body)?)
        } else {
            parse_scalar(value)?
        };

        nodes.push((key.to_string(), node));
    }

    Ok(nodes)
}

fn split_key_value(line: &str) -> Result<(&str, &str), String> {
    line.split_once(':')
        .map(|(k, v)| (k.trim(), v.trim()))
        .ok_or_else(|| format!("expected `key: value`, got: {line}"))
}

fn parse_scalar(value: &str) -> Result<Node, String> {
    if let Some(inner) = value.strip_prefix('"') {
        let inner = inner
            .strip_suffix('"')
            .ok_or_else(|| format!("unterminated string: {value}"))?;
        return Ok(Node::Str(unescape(inner)));
    }

    if let Ok(v) = value.parse::<i64>() {
        return Ok(Node::Int(v));
    }

    match parse_real(value) {
        Some(v) => Ok(Node::Real(v)),
        None => Ok(Node::Str(value.to_string())),
    }
}

fn parse_real(value: &str) -> Option<f64> {
    match value {
        ".Nan" | ".nan" | ".NaN" => Some(f64::NAN),
        ".Inf" | ".inf" | "+.Inf" => Some(f64::INFINITY),
        "-.Inf" | "-.inf" => Some(f64::NEG_INFINITY),
        _ => value.parse::<f64>().ok(),
    }
}

fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            },
            _ => out.push(c),
        }
    }
    out
}

fn parse_matrix(key: &str, body: &[&str]) -> Result<MatNode, String> {
    let mut rows = None;
    let mut cols = None;
    let mut dt = None;
    let mut data_text = None::<String>;

    let mut body = body.iter();
    while let Some(line) = body.next() {
        let (field, value) = split_key_value(line)?;
        match field {
            "rows" => rows = Some(parse_dim(key, field, value)?),
            "cols" => cols = Some(parse_dim(key, field, value)?),
            "dt" => {
                dt = Some(
                    ElemType::from_code(value)
                        .ok_or_else(|| format!("{key}: unsupported dt `{value}`"))?,
                )
            }
            "data" => {
                // the data list may continue on the following lines
                let mut text = value.to_string();
                while !text.contains(']') {
                    match body.next() {
                        Some(next) => {
                            text.push(' ');
                            text.push_str(next);
                        }
                        None => return Err(format!("{key}: unterminated data list")),
                    }
                }
                data_text = Some(text);
            }
            _ => return Err(format!("{key}: unknown matrix field `{field}`")),
        }
    }

    let (Some(rows), Some(cols), Some(dt), Some(data_text)) = (rows, cols, dt, data_text) else {
        return Err(format!("{key}: incomplete matrix, expected rows, cols, dt and data"));
    };

    let inner = data_text
        .trim()
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| format!("{key}: malformed data list"))?;

    let data = inner
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| parse_real(s).ok_or_else(|| format!("{key}: invalid number `{s}`")))
        .collect::<Result<Vec<_>, _>>()?;

    if data.len() != rows * cols {
        return Err(format!(
            "{key}: expected {} values for a {rows}x{cols} matrix, got {}",
            rows * cols,
            data.len()
        ));
    }

    Ok(MatNode {
        rows,
        cols,
        dt,
        data,
    })
}

fn parse_dim(key: &str, field: &str, value: &str) -> Result<usize, String> {
    value
        .parse()
        .map_err(|e| format!("{key}: invalid {field} `{value}`: {e}"))
}
