use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use memmap2::Mmap;
use pdf_writer::types::{CidFontType, FontFlags, SystemInfo, UnicodeCmap};
use pdf_writer::{Name, Pdf, Rect, Ref, Str};
use ttf_parser::Face;

use crate::error::Error;
use crate::model::Run;

/// Where a face's glyph widths come from and how its text is encoded.
enum Glyphs {
    /// One of the standard 14 faces, single-byte WinAnsi text.
    Standard(StandardFamily),
    /// A subset TrueType face, two-byte glyph ids in the subset.
    Embedded {
        gids: HashMap<char, u16>,
        widths: HashMap<char, f32>,
    },
}

/// A registered font variant together with the metrics layout needs.
pub(crate) struct FontEntry {
    pub(crate) pdf_name: String,
    pub(crate) font_ref: Ref,
    /// Natural line height over font size; `None` for the standard faces.
    pub(crate) line_h_ratio: Option<f32>,
    pub(crate) ascender_ratio: Option<f32>,
    glyphs: Glyphs,
}

impl FontEntry {
    /// Advance of `ch` in thousandths of the font size.
    fn advance(&self, ch: char) -> f32 {
        match &self.glyphs {
            Glyphs::Standard(family) => match char_to_winansi(ch) {
                Some(byte) => family.advance(byte),
                None => 0.0,
            },
            Glyphs::Embedded { widths, .. } => widths.get(&ch).copied().unwrap_or(0.0),
        }
    }

    /// Width of `text` in points, every character counted including spaces.
    pub(crate) fn text_width(&self, text: &str, font_size: f32) -> f32 {
        text.chars().map(|ch| self.advance(ch)).sum::<f32>() * font_size / 1000.0
    }

    /// Bytes for a `Tj` operand in this font's encoding.
    pub(crate) fn encode(&self, text: &str) -> Vec<u8> {
        match &self.glyphs {
            Glyphs::Standard(_) => to_winansi_bytes(text),
            Glyphs::Embedded { gids, .. } => encode_as_gids(text, gids),
        }
    }
}

/// Registered fonts keyed by `font_key`.
pub(crate) type FontMap = HashMap<String, FontEntry>;

pub(crate) fn lookup<'a>(fonts: &'a FontMap, run: &Run) -> Result<&'a FontEntry, Error> {
    fonts
        .get(&font_key(run))
        .ok_or_else(|| Error::Render(format!("font {} was not registered", font_key(run))))
}

pub(crate) fn font_key(run: &Run) -> String {
    let base = run.font_name.trim();
    match (run.bold, run.italic) {
        (true, true) => format!("{base}/BI"),
        (true, false) => format!("{base}/B"),
        (false, true) => format!("{base}/I"),
        (false, false) => base.to_string(),
    }
}

/// Family name plus style flags, lowercased for matching.
type FaceKey = (String, bool, bool);

/// Font files found on the system, by family and style.
struct FontIndex {
    faces: HashMap<FaceKey, (PathBuf, u32)>,
}

static SYSTEM_FONTS: OnceLock<FontIndex> = OnceLock::new();

impl FontIndex {
    fn system() -> &'static FontIndex {
        SYSTEM_FONTS.get_or_init(|| FontIndex::scan(font_directories()))
    }

    fn scan(roots: Vec<PathBuf>) -> FontIndex {
        let t0 = std::time::Instant::now();
        let mut index = FontIndex {
            faces: HashMap::new(),
        };
        let mut visited = HashSet::new();
        let mut files = 0u32;

        let mut pending = roots;
        while let Some(dir) = pending.pop() {
            if !visited.insert(dir.clone()) {
                continue;
            }
            let Ok(entries) = std::fs::read_dir(&dir) else {
                continue;
            };
            for path in entries.flatten().map(|e| e.path()) {
                if path.is_dir() {
                    pending.push(path);
                } else if let Some(collection) = font_file_kind(&path) {
                    files += 1;
                    index.add_file(&path, collection);
                }
            }
        }

        log::info!(
            "font scan: {files} files, {} faces in {:.1}ms",
            index.faces.len(),
            t0.elapsed().as_secs_f64() * 1000.0
        );
        index
    }

    fn add_file(&mut self, path: &Path, collection: bool) {
        let Ok(file) = std::fs::File::open(path) else {
            return;
        };
        // SAFETY: the mapping is read-only and dropped before this returns
        let Ok(data) = (unsafe { Mmap::map(&file) }) else {
            return;
        };
        let count = if collection {
            ttf_parser::fonts_in_collection(&data).unwrap_or(1)
        } else {
            1
        };
        for face_index in 0..count {
            let Ok(face) = Face::parse(&data, face_index) else {
                continue;
            };
            if let Some(family) = family_name(&face) {
                self.faces
                    .entry((family.to_lowercase(), face.is_bold(), face.is_italic()))
                    .or_insert_with(|| (path.to_path_buf(), face_index));
            }
        }
    }

    /// The requested style, or the regular face of the family.
    fn find(&self, family: &str, bold: bool, italic: bool) -> Option<&(PathBuf, u32)> {
        let family = family.to_lowercase();
        self.faces
            .get(&(family.clone(), bold, italic))
            .or_else(|| self.faces.get(&(family, false, false)))
    }
}

/// Name ID 1 keeps "Arial Narrow" apart from "Arial".
fn family_name(face: &Face) -> Option<String> {
    face.names()
        .into_iter()
        .filter(|n| n.name_id == ttf_parser::name_id::FAMILY && n.is_unicode())
        .find_map(|n| n.to_string())
}

/// `Some(is_collection)` for TrueType/OpenType files.
fn font_file_kind(path: &Path) -> Option<bool> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "ttf" | "otf" => Some(false),
        "ttc" => Some(true),
        _ => None,
    }
}

/// `PDF_CREATE_FONTS` entries first, then the platform font folders.
fn font_directories() -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = std::env::var_os("PDF_CREATE_FONTS")
        .map(|v| std::env::split_paths(&v).filter(|p| !p.as_os_str().is_empty()).collect())
        .unwrap_or_default();
    let home = std::env::var_os("HOME").map(PathBuf::from);

    if cfg!(target_os = "macos") {
        dirs.extend(
            [
                "/Library/Fonts",
                "/System/Library/Fonts",
                "/System/Library/Fonts/Supplemental",
            ]
            .map(PathBuf::from),
        );
        dirs.extend(home.map(|h| h.join("Library/Fonts")));
    } else if cfg!(windows) {
        let windir = std::env::var_os("WINDIR")
            .map_or_else(|| PathBuf::from("C:\\Windows"), PathBuf::from);
        dirs.push(windir.join("Fonts"));
    } else {
        dirs.extend(["/usr/share/fonts", "/usr/local/share/fonts"].map(PathBuf::from));
        dirs.extend(home.map(|h| h.join(".local/share/fonts")));
    }
    dirs
}

/// Windows-1252 code points for bytes 0x80..=0x9F; `None` marks unassigned bytes.
#[rustfmt::skip]
const CP1252_HIGH: [Option<char>; 32] = [
    Some('\u{20AC}'), None, Some('\u{201A}'), Some('\u{0192}'),
    Some('\u{201E}'), Some('\u{2026}'), Some('\u{2020}'), Some('\u{2021}'),
    Some('\u{02C6}'), Some('\u{2030}'), Some('\u{0160}'), Some('\u{2039}'),
    Some('\u{0152}'), None, Some('\u{017D}'), None,
    None, Some('\u{2018}'), Some('\u{2019}'), Some('\u{201C}'),
    Some('\u{201D}'), Some('\u{2022}'), Some('\u{2013}'), Some('\u{2014}'),
    Some('\u{02DC}'), Some('\u{2122}'), Some('\u{0161}'), Some('\u{203A}'),
    Some('\u{0153}'), None, Some('\u{017E}'), Some('\u{0178}'),
];

fn char_to_winansi(ch: char) -> Option<u8> {
    match ch as u32 {
        0x20..=0x7F | 0xA0..=0xFF => Some(ch as u8),
        _ => CP1252_HIGH
            .iter()
            .position(|&c| c == Some(ch))
            .map(|i| 0x80 + i as u8),
    }
}

/// WinAnsi bytes for `text`; characters outside the code page are dropped.
pub(crate) fn to_winansi_bytes(text: &str) -> Vec<u8> {
    text.chars().filter_map(char_to_winansi).collect()
}

/// Big-endian two-byte glyph ids; unmapped characters become glyph 0.
pub(crate) fn encode_as_gids(text: &str, gids: &HashMap<char, u16>) -> Vec<u8> {
    text.chars()
        .flat_map(|ch| gids.get(&ch).copied().unwrap_or(0).to_be_bytes())
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StandardFamily {
    Times,
    Helvetica,
    Courier,
}

impl StandardFamily {
    fn for_name(font_name: &str) -> StandardFamily {
        let lower = font_name.to_lowercase();
        if lower.contains("courier") || lower.contains("mono") {
            StandardFamily::Courier
        } else if lower.contains("times") || (lower.contains("serif") && !lower.contains("sans")) {
            StandardFamily::Times
        } else {
            StandardFamily::Helvetica
        }
    }

    fn base_font(self, bold: bool, italic: bool) -> String {
        let (family, slant) = match self {
            StandardFamily::Times => ("Times", "Italic"),
            StandardFamily::Helvetica => ("Helvetica", "Oblique"),
            StandardFamily::Courier => ("Courier", "Oblique"),
        };
        let style = match (bold, italic) {
            (false, false) => String::new(),
            (true, false) => "Bold".to_string(),
            (false, true) => slant.to_string(),
            (true, true) => format!("Bold{slant}"),
        };
        match (self, style.is_empty()) {
            (StandardFamily::Times, true) => "Times-Roman".to_string(),
            (_, true) => family.to_string(),
            (_, false) => format!("{family}-{style}"),
        }
    }

    /// Approximate advance of a WinAnsi byte in thousandths of an em.
    fn advance(self, byte: u8) -> f32 {
        match self {
            StandardFamily::Courier => 600.0,
            StandardFamily::Helvetica => match byte {
                b' ' | b'I' | b'J' | b'f' | b'i' | b'j' | b'l' | b't' => 278.0,
                b'!'..=b'/' | b':'..=b'@' | b'['..=b'`' => 333.0,
                b'M' | b'm' | b'w' => 833.0,
                b'A'..=b'Z' => 667.0,
                _ => 556.0,
            },
            StandardFamily::Times => match byte {
                b' ' => 250.0,
                b'f' | b'i' | b'j' | b'l' | b't' => 278.0,
                b'I' | b'J' => 333.0,
                b'0'..=b'9' => 500.0,
                b'M' => 889.0,
                b'm' | b'w' => 722.0,
                b'A'..=b'Z' => 667.0,
                b'a'..=b'z' => 444.0,
                _ => 333.0,
            },
        }
    }
}

/// One font variant to register and the characters it must cover.
pub(crate) struct FontRequest<'a> {
    pub(crate) family: &'a str,
    pub(crate) bold: bool,
    pub(crate) italic: bool,
    pub(crate) used_chars: &'a HashSet<char>,
}

/// Metrics of an embedded face, scaled to thousandths of an em.
struct FaceMetrics {
    units: f32,
    ascent: f32,
    descent: f32,
    line_gap: f32,
}

impl FaceMetrics {
    fn of(face: &Face) -> FaceMetrics {
        FaceMetrics {
            units: face.units_per_em() as f32,
            ascent: face.ascender() as f32,
            descent: face.descender() as f32,
            line_gap: face.line_gap() as f32,
        }
    }

    fn scale(&self, v: f32) -> f32 {
        v / self.units * 1000.0
    }
}

/// Write a subset of the face as a Type0 font with Identity-H encoding.
fn embed_face(
    pdf: &mut Pdf,
    font_ref: Ref,
    request: &FontRequest,
    data: &[u8],
    face_index: u32,
    alloc: &mut impl FnMut() -> Ref,
) -> Option<FontEntry> {
    let face = Face::parse(data, face_index).ok()?;
    let m = FaceMetrics::of(&face);

    let mut remapper = subsetter::GlyphRemapper::new();
    let mut gids = HashMap::new();
    let mut widths = HashMap::new();
    for &ch in request.used_chars {
        let Some(gid) = face.glyph_index(ch) else {
            continue;
        };
        gids.insert(ch, remapper.remap(gid.0));
        let advance = face.glyph_hor_advance(gid).unwrap_or(0) as f32;
        widths.insert(ch, m.scale(advance));
    }

    let program = subsetter::subset(data, face_index, &remapper).unwrap_or_else(|e| {
        log::warn!("subsetting {} failed ({e}), embedding the whole face", request.family);
        data.to_vec()
    });
    let program_len = i32::try_from(program.len()).ok()?;
    let program_ref = alloc();
    pdf.stream(program_ref, &program)
        .pair(Name(b"Length1"), program_len);

    let ps_name = request.family.replace(' ', "");
    let bb = face.global_bounding_box();
    let descriptor_ref = alloc();
    pdf.font_descriptor(descriptor_ref)
        .name(Name(ps_name.as_bytes()))
        .flags(FontFlags::NON_SYMBOLIC)
        .bbox(Rect::new(
            m.scale(bb.x_min as f32),
            m.scale(bb.y_min as f32),
            m.scale(bb.x_max as f32),
            m.scale(bb.y_max as f32),
        ))
        .italic_angle(0.0)
        .ascent(m.scale(m.ascent))
        .descent(m.scale(m.descent))
        .cap_height(face.capital_height().map_or(700.0, |h| m.scale(h as f32)))
        .stem_v(80.0)
        .font_file2(program_ref);

    let identity = SystemInfo {
        registry: Str(b"Adobe"),
        ordering: Str(b"Identity"),
        supplement: 0,
    };
    let cid_ref = alloc();
    {
        let mut cid = pdf.cid_font(cid_ref);
        cid.subtype(CidFontType::Type2)
            .base_font(Name(ps_name.as_bytes()))
            .system_info(identity)
            .font_descriptor(descriptor_ref)
            .default_width(0.0)
            .cid_to_gid_map_predefined(Name(b"Identity"));
        let mut by_gid: Vec<(u16, f32)> =
            gids.iter().map(|(ch, &gid)| (gid, widths[ch])).collect();
        by_gid.sort_by_key(|&(gid, _)| gid);
        if !by_gid.is_empty() {
            let mut w = cid.widths();
            for (gid, width) in by_gid {
                w.consecutive(gid, [width]);
            }
        }
    }

    let cmap_name = format!("{ps_name}-UTF16");
    let mut cmap = UnicodeCmap::new(Name(cmap_name.as_bytes()), identity);
    for (&ch, &gid) in &gids {
        cmap.pair(gid, ch);
    }
    let cmap_ref = alloc();
    pdf.stream(cmap_ref, cmap.finish().as_slice());

    pdf.type0_font(font_ref)
        .base_font(Name(ps_name.as_bytes()))
        .encoding_predefined(Name(b"Identity-H"))
        .descendant_font(cid_ref)
        .to_unicode(cmap_ref);

    Some(FontEntry {
        pdf_name: String::new(),
        font_ref,
        line_h_ratio: Some((m.ascent - m.descent + m.line_gap) / m.units),
        ascender_ratio: Some(m.ascent / m.units),
        glyphs: Glyphs::Embedded { gids, widths },
    })
}

fn embed_system_font(
    pdf: &mut Pdf,
    font_ref: Ref,
    request: &FontRequest,
    alloc: &mut impl FnMut() -> Ref,
) -> Option<FontEntry> {
    let (path, face_index) =
        FontIndex::system().find(request.family, request.bold, request.italic)?;
    let data = std::fs::read(path).ok()?;
    embed_face(pdf, font_ref, request, &data, *face_index, alloc)
}

/// Write one font into the PDF and return its layout metrics.
/// With `unicode` the family is embedded from the system fonts when found;
/// otherwise, or when it is missing, a standard face with WinAnsi encoding is used.
pub(crate) fn register_font(
    pdf: &mut Pdf,
    request: &FontRequest,
    pdf_name: String,
    unicode: bool,
    alloc: &mut impl FnMut() -> Ref,
) -> FontEntry {
    let t0 = std::time::Instant::now();
    let font_ref = alloc();

    let embedded = if unicode {
        embed_system_font(pdf, font_ref, request, alloc)
    } else {
        None
    };
    let entry = embedded.unwrap_or_else(|| {
        let family = StandardFamily::for_name(request.family);
        let base = family.base_font(request.bold, request.italic);
        if unicode {
            log::warn!(
                "font {} (bold={}, italic={}) not found, using {base}",
                request.family,
                request.bold,
                request.italic
            );
        }
        pdf.type1_font(font_ref)
            .base_font(Name(base.as_bytes()))
            .encoding_predefined(Name(b"WinAnsiEncoding"));
        FontEntry {
            pdf_name: String::new(),
            font_ref,
            line_h_ratio: None,
            ascender_ratio: None,
            glyphs: Glyphs::Standard(family),
        }
    });

    log::debug!(
        "registered {} as {pdf_name} in {:.1}ms",
        request.family,
        t0.elapsed().as_secs_f64() * 1000.0
    );
    FontEntry { pdf_name, ..entry }
}
