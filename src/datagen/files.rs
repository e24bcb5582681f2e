//! Sample attachment files
//!
//! Each kind produces a structurally valid file so the service's type
//! sniffing accepts it. Images are encoded with `image`, docx/xlsx are
//! OOXML zip containers and the PDF has a correct xref table.

use std::fmt;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use image::{ImageFormat, Rgb, RgbImage};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_xlsxwriter::Workbook;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::common::{fsutil, timestamp, Error, Result};

/// Kinds of sample files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleKind {
    Pdf,
    Docx,
    Xlsx,
    Txt,
    Png,
    Jpg,
    Zip,
}

impl SampleKind {
    pub const ALL: [SampleKind; 7] = [
        SampleKind::Pdf,
        SampleKind::Docx,
        SampleKind::Xlsx,
        SampleKind::Txt,
        SampleKind::Png,
        SampleKind::Jpg,
        SampleKind::Zip,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            SampleKind::Pdf => "pdf",
            SampleKind::Docx => "docx",
            SampleKind::Xlsx => "xlsx",
            SampleKind::Txt => "txt",
            SampleKind::Png => "png",
            SampleKind::Jpg => "jpg",
            SampleKind::Zip => "zip",
        }
    }
}

impl fmt::Display for SampleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for SampleKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let lowered = s.trim_start_matches('.').to_lowercase();
        SampleKind::ALL
            .into_iter()
            .find(|k| k.extension() == lowered)
            .ok_or_else(|| Error::UnsupportedFileType(s.to_string()))
    }
}

/// Generator for sample files
pub struct SampleFiles {
    rng: StdRng,
}

impl Default for SampleFiles {
    fn default() -> Self {
        Self::new()
    }
}

impl SampleFiles {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    pub fn with_rng(rng: StdRng) -> Self {
        Self { rng }
    }

    /// Produce a file of the given kind, roughly `size` bytes where the
    /// format allows it
    pub fn generate(&mut self, kind: SampleKind, size: usize) -> Result<Vec<u8>> {
        match kind {
            SampleKind::Txt => Ok(text_file(size)),
            SampleKind::Png => image_file(size, self.random_colour(), ImageFormat::Png),
            SampleKind::Jpg => image_file(size, self.random_colour(), ImageFormat::Jpeg),
            SampleKind::Pdf => Ok(pdf_file(size)),
            SampleKind::Xlsx => xlsx_file(),
            SampleKind::Docx => docx_file(),
            SampleKind::Zip => zip_file(),
        }
    }

    fn random_colour(&mut self) -> Rgb<u8> {
        Rgb([self.rng.gen(), self.rng.gen(), self.rng.gen()])
    }

    /// Random size in `[min, max]` bytes
    pub fn random_size(&mut self, min: usize, max: usize) -> usize {
        self.rng.gen_range(min..=max)
    }

    /// Write `sample.<ext>` into `dir` at a random size of 10 to 100 KiB
    pub fn write_sample(&mut self, dir: &Path, kind: SampleKind) -> Result<PathBuf> {
        let size = self.random_size(10 * 1024, 100 * 1024);
        let content = self.generate(kind, size)?;
        let path = dir.join(format!("sample.{}", kind.extension()));
        fsutil::save_file(&path, &content)?;
        tracing::debug!(kind = %kind, bytes = content.len(), path = %path.display(), "Sample file written");
        Ok(path)
    }

    /// Write a sample of every kind into `dir`
    pub fn generate_all(&mut self, dir: &Path) -> Result<Vec<(SampleKind, PathBuf)>> {
        self.generate_some(dir, &SampleKind::ALL)
    }

    /// Write a sample of each of `kinds` into `dir`
    pub fn generate_some(
        &mut self,
        dir: &Path,
        kinds: &[SampleKind],
    ) -> Result<Vec<(SampleKind, PathBuf)>> {
        kinds
            .iter()
            .map(|&kind| Ok((kind, self.write_sample(dir, kind)?)))
            .collect()
    }
}

fn text_file(size: usize) -> Vec<u8> {
    let mut content = "测试文本 ".repeat(size / 10 + 1).into_bytes();
    content.truncate(size);
    content
}

/// Solid-colour square image whose side is derived from the requested size
fn image_file(size: usize, colour: Rgb<u8>, format: ImageFormat) -> Result<Vec<u8>> {
    let side = (((size * 8) as f64).sqrt() as u32).max(100);
    let img = RgbImage::from_pixel(side, side, colour);
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, format)?;
    Ok(out.into_inner())
}

/// Single-page PDF with Helvetica text; filler lines are added until the
/// content stream approaches `size`
fn pdf_file(size: usize) -> Vec<u8> {
    let mut stream = String::from("BT /F1 12 Tf 72 750 Td (Sample PDF file) Tj\n");
    stream.push_str(&format!("0 -20 Td (Generated: {}) Tj\n", timestamp()));
    let filler = "0 -14 Td (Test content for upload verification.) Tj\n";
    let budget = size.saturating_sub(600).min(48 * filler.len());
    while stream.len() + filler.len() <= budget {
        stream.push_str(filler);
    }
    stream.push_str("ET");

    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R \
         /Resources << /Font << /F1 5 0 R >> >> >>"
            .to_string(),
        format!("<< /Length {} >>\nstream\n{}\nendstream", stream.len(), stream),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>".to_string(),
    ];

    let mut out = String::from("%PDF-1.4\n");
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.push_str(&format!("{} 0 obj\n{}\nendobj\n", i + 1, body));
    }

    let xref_at = out.len();
    out.push_str(&format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1));
    for offset in offsets {
        out.push_str(&format!("{:010} 00000 n \n", offset));
    }
    out.push_str(&format!(
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        xref_at
    ));
    out.into_bytes()
}

fn xlsx_file() -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("测试")?;
        sheet.write_string(0, 0, "测试 Excel 文件")?;
        sheet.write_string(1, 0, format!("生成时间: {}", timestamp()))?;
        for row in 2..99u32 {
            sheet.write_string(row, 0, format!("测试数据 {}", row + 1))?;
        }
    }
    Ok(workbook.save_to_buffer()?)
}

const DOCX_CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/></Types>"#;

const DOCX_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/></Relationships>"#;

fn docx_paragraph(text: &str) -> String {
    format!("<w:p><w:r><w:t xml:space=\"preserve\">{}</w:t></w:r></w:p>", text)
}

fn docx_file() -> Result<Vec<u8>> {
    let body = [
        docx_paragraph("测试 Word 文件"),
        docx_paragraph(&format!("生成时间: {}", timestamp())),
        docx_paragraph(&format!("测试内容: {}", "测试 ".repeat(100))),
    ]
    .concat();
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{}</w:body></w:document>"#,
        body
    );

    write_zip(&[
        ("[Content_Types].xml", DOCX_CONTENT_TYPES.as_bytes()),
        ("_rels/.rels", DOCX_RELS.as_bytes()),
        ("word/document.xml", document.as_bytes()),
    ])
}

fn zip_file() -> Result<Vec<u8>> {
    let text = "测试内容 ".repeat(100);
    write_zip(&[("test.txt", text.as_bytes())])
}

fn write_zip(entries: &[(&str, &[u8])]) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (name, content) in entries {
        writer.start_file(*name, options)?;
        writer.write_all(content)?;
    }
    Ok(writer.finish()?.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;

    fn files() -> SampleFiles {
        SampleFiles::with_rng(StdRng::seed_from_u64(9))
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("png".parse::<SampleKind>().unwrap(), SampleKind::Png);
        assert_eq!(".PDF".parse::<SampleKind>().unwrap(), SampleKind::Pdf);
        assert!("exe".parse::<SampleKind>().is_err());
    }

    #[test]
    fn test_text_exact_size() {
        let content = files().generate(SampleKind::Txt, 1000).unwrap();
        assert_eq!(content.len(), 1000);
    }

    #[test]
    fn test_png_structure() {
        let content = files().generate(SampleKind::Png, 20 * 1024).unwrap();
        assert!(content.starts_with(b"\x89PNG\r\n\x1a\n"));
        assert_eq!(&content[12..16], b"IHDR");

        let decoded = image::load_from_memory_with_format(&content, ImageFormat::Png).unwrap();
        assert_eq!(decoded.width(), 404);
        assert_eq!(decoded.width(), decoded.height());
    }

    #[test]
    fn test_jpg_is_real_jpeg() {
        let content = files().generate(SampleKind::Jpg, 20 * 1024).unwrap();
        assert!(content.starts_with(&[0xFF, 0xD8, 0xFF]));
        assert!(content.ends_with(&[0xFF, 0xD9]));
        assert_eq!(image::guess_format(&content).unwrap(), ImageFormat::Jpeg);

        let decoded = image::load_from_memory(&content).unwrap();
        assert_eq!(decoded.height(), 404);
    }

    #[test]
    fn test_pdf_structure() {
        let content = files().generate(SampleKind::Pdf, 4096).unwrap();
        let text = String::from_utf8(content).unwrap();
        assert!(text.starts_with("%PDF-1.4"));
        assert!(text.trim_end().ends_with("%%EOF"));
        let xref: usize = text
            .lines()
            .skip_while(|l| *l != "startxref")
            .nth(1)
            .unwrap()
            .parse()
            .unwrap();
        assert!(text[xref..].starts_with("xref"));
    }

    #[test]
    fn test_zip_containers() {
        let mut files = files();
        for kind in [SampleKind::Zip, SampleKind::Docx, SampleKind::Xlsx] {
            let content = files.generate(kind, 1024).unwrap();
            let archive = zip::ZipArchive::new(Cursor::new(content)).unwrap();
            assert!(archive.len() >= 1, "{} should contain entries", kind);
        }
    }

    #[test]
    fn test_generate_some_writes_only_requested() {
        let tmp = tempfile::tempdir().unwrap();
        let written = files()
            .generate_some(tmp.path(), &[SampleKind::Txt, SampleKind::Zip])
            .unwrap();
        assert_eq!(written.len(), 2);
        assert!(tmp.path().join("sample.txt").exists());
        assert!(!tmp.path().join("sample.pdf").exists());
    }

    #[test]
    fn test_generate_all_writes_every_kind() {
        let tmp = tempfile::tempdir().unwrap();
        let written = files().generate_all(tmp.path()).unwrap();
        assert_eq!(written.len(), SampleKind::ALL.len());
        for (kind, path) in written {
            assert!(path.ends_with(format!("sample.{}", kind.extension())));
            assert!(std::fs::metadata(&path).unwrap().len() > 0);
        }
    }
}
