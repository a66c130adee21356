//! Point annotations in the normalized center format.

use crate::common::*;

/// An annotated object location in pixel units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: usize,
    pub y: usize,
    pub class_id: i64,
}

impl Point {
    pub fn new(x: usize, y: usize, class_id: i64) -> Self {
        Self { x, y, class_id }
    }
}

/// One line of an annotation file.
///
/// Box extents are parsed for format compatibility but not used by the
/// density pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnnotationRecord {
    pub class_id: i64,
    pub cx: f64,
    pub cy: f64,
    pub w: f64,
    pub h: f64,
}

impl AnnotationRecord {
    /// Map the record center into the pixel grid of an image. A center on the
    /// right or bottom edge lands on the last column or row.
    pub fn to_point(&self, width: usize, height: usize) -> Point {
        Point {
            x: ((self.cx * width as f64).floor() as usize).min(width.saturating_sub(1)),
            y: ((self.cy * height as f64).floor() as usize).min(height.saturating_sub(1)),
            class_id: self.class_id,
        }
    }
}

/// Read an annotation file and convert the centers to pixel points.
pub fn read_annotations(path: impl AsRef<Path>, width: usize, height: usize) -> Result<Vec<Point>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read annotation file '{}'", path.display()))?;
    parse_annotations(path, &text, width, height)
}

/// Parse annotation text into pixel points. `path` is only used in error reports.
pub fn parse_annotations(
    path: impl AsRef<Path>,
    text: &str,
    width: usize,
    height: usize,
) -> Result<Vec<Point>> {
    let points = parse_records(path.as_ref(), text)?
        .iter()
        .map(|record| record.to_point(width, height))
        .collect();
    Ok(points)
}

/// Parse annotation text into records, skipping blank lines.
pub fn parse_records(path: &Path, text: &str) -> Result<Vec<AnnotationRecord>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| parse_line(line).map_err(|reason| malformed(path, index + 1, reason)))
        .try_collect()
}

fn parse_line(line: &str) -> Result<AnnotationRecord, String> {
    let tokens: Vec<_> = line.split_whitespace().collect();
    let values: Vec<f64> = tokens
        .iter()
        .map(|token| {
            token
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .ok_or_else(|| format!("'{}' is not a number", token))
        })
        .try_collect()?;
    let [class_id, cx, cy, w, h]: [f64; 5] = values
        .try_into()
        .map_err(|_| format!("expect 5 fields, but get {}", tokens.len()))?;

    if class_id.fract() != 0.0 {
        return Err(format!("class id '{}' is not an integer", tokens[0]));
    }
    if cx < 0.0 || cy < 0.0 {
        return Err(format!("negative center ({}, {})", cx, cy));
    }

    Ok(AnnotationRecord {
        class_id: class_id as i64,
        cx,
        cy,
        w,
        h,
    })
}

fn malformed(path: &Path, line: usize, reason: String) -> Error {
    DensityError::MalformedRecord {
        path: path.to_owned(),
        line,
        reason,
    }
    .into()
}
