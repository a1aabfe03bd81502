//! Multi-page PDF report assembly with `lopdf`.
//!
//! Layout is a simple top-down flow on A4 pages: every page carries the
//! report title as a header and `Page <n>` as a footer, and content that
//! does not fit on the current page starts a new one.

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use traffic_map_analytics_models::Blackspot;

use crate::ReportError;
use crate::charts::BLACKSPOT_CHART_FILE;

/// Default report file name.
pub const DEFAULT_REPORT_FILE: &str = "West_Yorkshire_Traffic_Analysis_Report.pdf";

const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 40;
const CONTENT_TOP: i64 = PAGE_HEIGHT - 75;
const CONTENT_BOTTOM: i64 = 50;
const CONTENT_WIDTH: i64 = PAGE_WIDTH - 2 * MARGIN;
const BODY_SIZE: i64 = 11;
const BODY_LINE: i64 = 20;

/// Where and how the PDF report is written.
#[derive(Debug, Clone)]
pub struct PdfOptions {
    /// Directory the report is written to.
    pub output_dir: PathBuf,
    /// Report file name.
    pub file_name: String,
    /// Header shown on every page.
    pub title: String,
    /// Logo drawn on the first page, if present.
    pub logo: Option<PathBuf>,
    /// Generation timestamp shown on the first page.
    pub generated_at: NaiveDateTime,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output_charts"),
            file_name: DEFAULT_REPORT_FILE.to_string(),
            title: "West Yorkshire Traffic Analysis Report".to_string(),
            logo: None,
            generated_at: Local::now().naive_local(),
        }
    }
}

/// Writes the report: summary page, blackspot page, then one page per
/// chart image found in `chart_dir`.
///
/// Missing or unreadable images (logo, blackspot chart, charts) are logged
/// and skipped.
///
/// # Errors
///
/// * If the output directory cannot be created
/// * If the PDF cannot be encoded or saved
pub fn generate_pdf_report(
    summary_lines: &[String],
    blackspots: &[Blackspot],
    chart_dir: &Path,
    options: &PdfOptions,
) -> Result<PathBuf, ReportError> {
    let mut report = ReportWriter::new(&options.title);

    if let Some(logo) = &options.logo {
        if let Err(e) = report.image_at(logo, MARGIN, CONTENT_TOP, 140) {
            log::warn!("Skipping logo {}: {e}", logo.display());
        }
    }

    report.text(
        &format!("Generated document on: {}", options.generated_at.format("%d/%m/%Y %H:%M:%S")),
        Font::Italic,
        8,
        Align::Right,
        12,
    );
    report.spacing(50);
    report.text("Traffic Incident Summary", Font::Bold, 20, Align::Left, 26);
    report.spacing(14);

    for line in summary_lines {
        let line = line.trim_end();
        if line.trim().is_empty() {
            report.spacing(BODY_LINE / 2);
        } else if is_emphasised(line) {
            report.text(line.trim(), Font::Bold, BODY_SIZE, Align::Left, BODY_LINE);
        } else {
            report.text(line, Font::Regular, BODY_SIZE, Align::Left, BODY_LINE);
        }
    }

    if !blackspots.is_empty() {
        report.add_page();
        report.spacing(10);
        report.text(
            &format!("Top {} Priority Accident Blackspots", blackspots.len()),
            Font::Bold,
            14,
            Align::Left,
            24,
        );
        for spot in blackspots {
            report.link(
                &format!(
                    "- {} | {} ({} incidents)",
                    spot.site_label, spot.road_type, spot.count
                ),
                &spot.maps_url(),
            );
        }

        let chart = chart_dir.join(BLACKSPOT_CHART_FILE);
        if chart.is_file() {
            report.spacing(10);
            if let Err(e) = report.image(&chart, MARGIN, CONTENT_WIDTH) {
                log::warn!("Skipping {}: {e}", chart.display());
            }
        } else {
            log::warn!("Could not find {BLACKSPOT_CHART_FILE}");
        }
    }

    for chart in chart_images(chart_dir) {
        report.add_page();
        report.text(&caption_for(&chart), Font::Bold, 12, Align::Center, 16);
        report.spacing(20);
        if let Err(e) = report.image(&chart, MARGIN + 20, CONTENT_WIDTH - 40) {
            log::warn!("Skipping {}: {e}", chart.display());
        }
    }

    std::fs::create_dir_all(&options.output_dir)?;
    let path = options.output_dir.join(&options.file_name);
    report.save(&path)?;

    log::info!("PDF report generated: {}", path.display());
    Ok(path)
}

/// Summary headings are lines containing a colon that are not list items.
fn is_emphasised(line: &str) -> bool {
    line.contains(':') && !line.starts_with(" -")
}

/// Chart PNGs in `dir` other than the blackspot chart, in file name order.
fn chart_images(dir: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("No charts read from {}: {e}", dir.display());
            return Vec::new();
        }
    };

    let mut charts: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "png"))
        .filter(|path| {
            path.file_name()
                .is_none_or(|name| name != BLACKSPOT_CHART_FILE)
        })
        .collect();
    charts.sort();
    charts
}

/// Page caption from a chart file name: underscores become spaces and each
/// word is capitalised.
fn caption_for(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    stem.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Restricts text to what the standard Type 1 fonts can show.
fn printable(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_ascii() && !c.is_ascii_control() { c } else { '?' })
        .collect()
}

#[derive(Debug, Clone, Copy)]
enum Font {
    Regular,
    Bold,
    Italic,
}

impl Font {
    const fn resource(self) -> &'static str {
        match self {
            Self::Regular => "F1",
            Self::Bold => "F2",
            Self::Italic => "F3",
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Align {
    Left,
    Center,
    Right,
}

#[derive(Default)]
struct PendingPage {
    operations: Vec<Operation>,
    images: Vec<(String, ObjectId)>,
    annotations: Vec<ObjectId>,
}

struct ReportWriter {
    doc: Document,
    fonts_id: ObjectId,
    header: String,
    finished: Vec<PendingPage>,
    page: PendingPage,
    page_number: usize,
    cursor: i64,
    image_count: usize,
}

impl ReportWriter {
    fn new(header: &str) -> Self {
        let mut doc = Document::with_version("1.5");
        let mut font = |base: &str| {
            doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => base,
                "Encoding" => "WinAnsiEncoding",
            })
        };
        let regular = font("Helvetica");
        let bold = font("Helvetica-Bold");
        let italic = font("Helvetica-Oblique");
        let fonts_id = doc.add_object(dictionary! {
            "F1" => regular,
            "F2" => bold,
            "F3" => italic,
        });

        let mut writer = Self {
            doc,
            fonts_id,
            header: printable(header),
            finished: Vec::new(),
            page: PendingPage::default(),
            page_number: 0,
            cursor: CONTENT_TOP,
            image_count: 0,
        };
        writer.start_page();
        writer
    }

    fn start_page(&mut self) {
        self.page_number += 1;
        self.cursor = CONTENT_TOP;
        let header = self.header.clone();
        self.draw_text(&header, Font::Bold, 12, Align::Center, PAGE_HEIGHT - 40);
        self.draw_text(&format!("Page {}", self.page_number), Font::Italic, 8, Align::Center, 25);
    }

    fn add_page(&mut self) {
        let page = std::mem::take(&mut self.page);
        self.finished.push(page);
        self.start_page();
    }

    fn ensure_space(&mut self, height: i64) {
        if self.cursor - height < CONTENT_BOTTOM {
            self.add_page();
        }
    }

    fn spacing(&mut self, height: i64) {
        if self.cursor - height < CONTENT_BOTTOM {
            self.add_page();
        } else {
            self.cursor -= height;
        }
    }

    #[allow(clippy::cast_possible_wrap)]
    fn text_width(text: &str, size: i64) -> i64 {
        // Helvetica averages roughly half an em per character.
        text.len() as i64 * size / 2
    }

    fn x_for(text: &str, size: i64, align: Align) -> i64 {
        match align {
            Align::Left => MARGIN,
            Align::Center => (PAGE_WIDTH - Self::text_width(text, size)) / 2,
            Align::Right => PAGE_WIDTH - MARGIN - Self::text_width(text, size),
        }
    }

    fn draw_text(&mut self, text: &str, font: Font, size: i64, align: Align, baseline: i64) {
        let text = printable(text);
        let x = Self::x_for(&text, size, align);
        self.page.operations.extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![font.resource().into(), size.into()]),
            Operation::new("Td", vec![x.into(), baseline.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ]);
    }

    fn text(&mut self, text: &str, font: Font, size: i64, align: Align, line_height: i64) {
        self.ensure_space(line_height);
        let baseline = self.cursor - size;
        self.draw_text(text, font, size, align, baseline);
        self.cursor -= line_height;
    }

    /// A blue, underlined line that opens `url` when clicked.
    fn link(&mut self, text: &str, url: &str) {
        self.ensure_space(BODY_LINE);
        let baseline = self.cursor - BODY_SIZE;
        let width = Self::text_width(&printable(text), BODY_SIZE).min(CONTENT_WIDTH);

        self.page.operations.push(Operation::new("rg", vec![0.into(), 0.into(), 1.into()]));
        self.draw_text(text, Font::Regular, BODY_SIZE, Align::Left, baseline);
        self.page.operations.extend([
            Operation::new("RG", vec![0.into(), 0.into(), 1.into()]),
            Operation::new("w", vec![1.into()]),
            Operation::new("m", vec![MARGIN.into(), (baseline - 2).into()]),
            Operation::new("l", vec![(MARGIN + width).into(), (baseline - 2).into()]),
            Operation::new("S", vec![]),
            Operation::new("rg", vec![0.into(), 0.into(), 0.into()]),
            Operation::new("RG", vec![0.into(), 0.into(), 0.into()]),
        ]);

        let annotation = self.doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Link",
            "Rect" => vec![
                MARGIN.into(),
                (baseline - 4).into(),
                (MARGIN + width).into(),
                (baseline + BODY_SIZE).into(),
            ],
            "Border" => vec![0.into(), 0.into(), 0.into()],
            "A" => dictionary! {
                "S" => "URI",
                "URI" => Object::string_literal(url),
            },
        });
        self.page.annotations.push(annotation);
        self.cursor -= BODY_LINE;
    }

    /// Places an image in the flow, starting a new page if it does not fit.
    fn image(&mut self, path: &Path, x: i64, width: i64) -> Result<(), ReportError> {
        let (xobject, pixel_width, pixel_height) = self.load_image(path)?;
        let (width, height) = fit(pixel_width, pixel_height, width, CONTENT_TOP - CONTENT_BOTTOM);
        self.ensure_space(height);
        let top = self.cursor;
        self.place(xobject, x, top - height, width, height);
        self.cursor -= height;
        Ok(())
    }

    /// Places an image with its top-left corner at (`x`, `top`) without
    /// moving the flow.
    fn image_at(&mut self, path: &Path, x: i64, top: i64, width: i64) -> Result<(), ReportError> {
        let (xobject, pixel_width, pixel_height) = self.load_image(path)?;
        let (width, height) = fit(pixel_width, pixel_height, width, top - CONTENT_BOTTOM);
        self.place(xobject, x, top - height, width, height);
        Ok(())
    }

    fn load_image(&mut self, path: &Path) -> Result<(ObjectId, u32, u32), ReportError> {
        let rgb = image::open(path)?.to_rgb8();
        let (width, height) = rgb.dimensions();
        let id = self.doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(width),
                "Height" => i64::from(height),
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            rgb.into_raw(),
        ));
        Ok((id, width, height))
    }

    fn place(&mut self, xobject: ObjectId, x: i64, y: i64, width: i64, height: i64) {
        self.image_count += 1;
        let name = format!("Im{}", self.image_count);
        self.page.operations.extend([
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    width.into(),
                    0.into(),
                    0.into(),
                    height.into(),
                    x.into(),
                    y.into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(name.clone().into_bytes())]),
            Operation::new("Q", vec![]),
        ]);
        self.page.images.push((name, xobject));
    }

    fn save(mut self, path: &Path) -> Result<(), ReportError> {
        let last = std::mem::take(&mut self.page);
        self.finished.push(last);

        let pages_id = self.doc.new_object_id();
        let mut kids: Vec<Object> = Vec::with_capacity(self.finished.len());

        for page in std::mem::take(&mut self.finished) {
            let content = Content {
                operations: page.operations,
            };
            let content_id = self
                .doc
                .add_object(Stream::new(dictionary! {}, content.encode()?));

            let mut xobjects = Dictionary::new();
            for (name, id) in page.images {
                xobjects.set(name, id);
            }

            let mut page_dict = dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => dictionary! {
                    "Font" => self.fonts_id,
                    "XObject" => xobjects,
                },
            };
            if !page.annotations.is_empty() {
                page_dict.set(
                    "Annots",
                    page.annotations
                        .into_iter()
                        .map(Object::Reference)
                        .collect::<Vec<_>>(),
                );
            }
            kids.push(self.doc.add_object(page_dict).into());
        }

        let count = i64::try_from(kids.len()).unwrap_or(i64::MAX);
        self.doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
            }),
        );
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);

        self.doc.compress();
        self.doc.save(path)?;
        Ok(())
    }
}

/// Scales an image to `width` points, shrinking further if it would be
/// taller than `max_height`.
fn fit(pixel_width: u32, pixel_height: u32, width: i64, max_height: i64) -> (i64, i64) {
    let pixel_width = i64::from(pixel_width.max(1));
    let pixel_height = i64::from(pixel_height);
    let height = width * pixel_height / pixel_width;
    if height <= max_height {
        (width, height)
    } else {
        (max_height * pixel_width / pixel_height.max(1), max_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blackspot() -> Blackspot {
        Blackspot {
            latitude: 53.8,
            longitude: -1.55,
            count: 7,
            area: "Leeds".to_string(),
            site_label: "Site @ 53.8, -1.55 (Leeds)".to_string(),
            road_type: "Single carriageway".to_string(),
        }
    }

    fn options(dir: &Path) -> PdfOptions {
        PdfOptions {
            output_dir: dir.to_path_buf(),
            logo: Some(dir.join("missing_logo.png")),
            ..PdfOptions::default()
        }
    }

    #[test]
    fn summary_and_blackspot_without_charts_writes_pdf() {
        let out = tempfile::tempdir().unwrap();
        let charts = tempfile::tempdir().unwrap();
        let lines = vec![
            "Analysis Period: 01, Jan, 2023 to 31, Dec, 2023".to_string(),
            String::new(),
            "TOTAL INCIDENTS ANALYZED: 12".to_string(),
            " - Primary Driver Gender: Male".to_string(),
        ];

        let path = generate_pdf_report(&lines, &[blackspot()], charts.path(), &options(out.path()))
            .unwrap();

        assert_eq!(path, out.path().join(DEFAULT_REPORT_FILE));
        let bytes = std::fs::read(&path).unwrap();
        assert!(!bytes.is_empty());
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn missing_chart_dir_is_not_an_error() {
        let out = tempfile::tempdir().unwrap();
        let lines = vec!["TOTAL INCIDENTS ANALYZED: 0".to_string()];

        let path = generate_pdf_report(&lines, &[], &out.path().join("nope"), &options(out.path()))
            .unwrap();

        assert!(std::fs::metadata(path).unwrap().len() > 0);
    }

    #[test]
    fn chart_images_skip_blackspot_chart_and_sort() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b_chart.png", "a_chart.png", BLACKSPOT_CHART_FILE, "notes.txt"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }

        let names: Vec<String> = chart_images(dir.path())
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect();

        assert_eq!(names, vec!["a_chart.png", "b_chart.png"]);
    }

    #[test]
    fn unreadable_chart_images_are_skipped() {
        let out = tempfile::tempdir().unwrap();
        let charts = tempfile::tempdir().unwrap();
        std::fs::write(charts.path().join("Broken_Chart.png"), b"not a png").unwrap();

        let path = generate_pdf_report(&[], &[], charts.path(), &options(out.path())).unwrap();

        assert!(path.is_file());
    }

    #[test]
    fn captions_come_from_file_names() {
        assert_eq!(
            caption_for(Path::new("charts/Top_10_Vehicle_Makes_in_West_Yorkshire_Collisions.png")),
            "Top 10 Vehicle Makes In West Yorkshire Collisions"
        );
        assert_eq!(caption_for(Path::new("SEVERITY_mix.png")), "Severity Mix");
    }

    #[test]
    fn headings_are_lines_with_colons_that_are_not_items() {
        assert!(is_emphasised("MOTORWAY SCOPE: 3 incidents (1.0% of total)."));
        assert!(!is_emphasised(" - Predominant Weather: Fine (no high winds)"));
        assert!(!is_emphasised("SEVERITY RISK"));
    }

    #[test]
    fn images_fit_the_page() {
        assert_eq!(fit(1200, 1000, 600, 10_000), (600, 500));
        assert_eq!(fit(1000, 4000, 500, 700), (175, 700));
    }

    #[test]
    fn text_is_restricted_to_ascii() {
        assert_eq!(printable("Caf\u{e9} \u{2014} A1"), "Caf? ? A1");
    }
}
