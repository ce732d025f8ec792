//! Plain-text extraction from uploaded resume files.

use std::io::{Cursor, Read};
use std::path::Path;

use anyhow::Context;
use bytes::Bytes;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Serialize;
use thiserror::Error;

pub const ALLOWED_EXTENSIONS: [&str; 3] = ["pdf", "docx", "txt"];

/// Main body part of an Office Open XML word-processing package.
const DOCX_BODY_PART: &str = "word/document.xml";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported file format '{0}' (allowed: {allowed})", allowed = ALLOWED_EXTENSIONS.join(", "))]
    UnsupportedFormat(String),

    #[error("failed to read PDF '{file_name}': {message}")]
    Pdf { file_name: String, message: String },

    #[error("failed to read DOCX '{file_name}': {message}")]
    Docx { file_name: String, message: String },

    #[error("no text could be extracted from '{0}'")]
    Empty(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractedResume {
    pub candidate_name: String,
    pub file_name: String,
    pub resume_text: String,
}

/// Lower-cased extension of `file_name`, if it has one.
pub fn file_extension(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}

/// The file stem doubles as the candidate's display name.
pub fn candidate_name(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(file_name)
        .to_string()
}

/// Extracts text by extension. CPU-bound for PDFs; call from a blocking task.
pub fn extract_resume_text(file_name: &str, data: Bytes) -> Result<ExtractedResume, ExtractError> {
    let extension = file_extension(file_name).unwrap_or_default();

    let text = match extension.as_str() {
        "txt" => String::from_utf8_lossy(&data).into_owned(),
        "pdf" => pdf_extract::extract_text_from_mem(&data).map_err(|e| ExtractError::Pdf {
            file_name: file_name.to_string(),
            message: e.to_string(),
        })?,
        "docx" => docx_text(&data).map_err(|e| ExtractError::Docx {
            file_name: file_name.to_string(),
            message: format!("{e:#}"),
        })?,
        _ => return Err(ExtractError::UnsupportedFormat(extension)),
    };

    if text.trim().is_empty() {
        return Err(ExtractError::Empty(file_name.to_string()));
    }

    Ok(ExtractedResume {
        candidate_name: candidate_name(file_name),
        file_name: file_name.to_string(),
        resume_text: text,
    })
}

/// Text of every paragraph in the document body, one per line.
/// Table cells hold their own paragraphs, so each cell lands on its own line.
fn docx_text(data: &[u8]) -> anyhow::Result<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data)).context("not a zip archive")?;
    let mut xml = String::new();
    archive
        .by_name(DOCX_BODY_PART)
        .with_context(|| format!("missing {DOCX_BODY_PART}"))?
        .read_to_string(&mut xml)
        .with_context(|| format!("{DOCX_BODY_PART} is not valid UTF-8"))?;

    let mut reader = Reader::from_str(&xml);
    let mut text = String::new();
    let mut in_text_run = false;
    loop {
        match reader.read_event().context("malformed document XML")? {
            Event::Start(e) if e.name().as_ref() == b"w:t" => in_text_run = true,
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_text_run = false,
                b"w:p" => text.push('\n'),
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:tab" => text.push('\t'),
                b"w:br" | b"w:p" => text.push('\n'),
                _ => {}
            },
            Event::Text(t) if in_text_run => {
                text.push_str(&t.unescape().context("bad XML escape in text run")?)
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(text)
}
