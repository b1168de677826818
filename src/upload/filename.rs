//! Owning entity keys encoded in uploaded file names.
//!
//! Clients rename a file before uploading it so that its name carries the id
//! of the row it belongs to, e.g. `42.png`, `ex_17.mp4` or `cm_3_9.mp4`.

/// Separator between the segments of a file name stem.
pub const DELIMITER: char = '_';

/// How the stem of a file name (the part before the suffix) is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyShape {
    /// `<id>`
    Id,
    /// `<prefix>_<id>`
    PrefixedId,
    /// `<prefix>_<outer id>_<inner id>`
    PrefixedIdPair,
}

/// A naming convention: required suffix plus stem layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilenameConvention {
    pub suffix: &'static str,
    pub shape: KeyShape,
}

impl FilenameConvention {
    pub const fn new(suffix: &'static str, shape: KeyShape) -> Self {
        Self { suffix, shape }
    }

    pub fn extract(&self, filename: &str) -> Result<OwningEntityKey, FilenameError> {
        extract_key(filename, *self)
    }
}

/// Ids recovered from a file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwningEntityKey {
    pub primary_id: i64,
    pub secondary_id: Option<i64>,
}

impl OwningEntityKey {
    /// The row the upload belongs to: the inner id for nested keys.
    pub fn target_id(&self) -> i64 {
        self.secondary_id.unwrap_or(self.primary_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilenameError {
    MalformedFilename {
        filename: String,
        reason: &'static str,
    },
}

impl std::fmt::Display for FilenameError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilenameError::MalformedFilename { filename, reason } => {
                write!(f, "Malformed file name {:?}: {}", filename, reason)
            }
        }
    }
}

impl std::error::Error for FilenameError {}

/// Parse `filename` according to `convention`.
pub fn extract_key(
    filename: &str,
    convention: FilenameConvention,
) -> Result<OwningEntityKey, FilenameError> {
    let malformed = |reason| FilenameError::MalformedFilename {
        filename: filename.to_string(),
        reason,
    };

    let stem = filename
        .strip_suffix(convention.suffix)
        .ok_or_else(|| malformed("unexpected file extension"))?;
    let segments: Vec<&str> = stem.split(DELIMITER).collect();

    let expected = match convention.shape {
        KeyShape::Id => 1,
        KeyShape::PrefixedId => 2,
        KeyShape::PrefixedIdPair => 3,
    };
    if segments.len() != expected {
        return Err(malformed("wrong number of name segments"));
    }

    let parse = |segment: &str| parse_id(segment).ok_or_else(|| malformed("id is not an integer"));

    match convention.shape {
        KeyShape::Id => Ok(OwningEntityKey {
            primary_id: parse(segments[0])?,
            secondary_id: None,
        }),
        KeyShape::PrefixedId => {
            if segments[0].is_empty() {
                return Err(malformed("missing prefix"));
            }
            Ok(OwningEntityKey {
                primary_id: parse(segments[1])?,
                secondary_id: None,
            })
        }
        KeyShape::PrefixedIdPair => {
            if segments[0].is_empty() {
                return Err(malformed("missing prefix"));
            }
            Ok(OwningEntityKey {
                primary_id: parse(segments[1])?,
                secondary_id: Some(parse(segments[2])?),
            })
        }
    }
}

/// Plain decimal digits only: no sign, no whitespace.
fn parse_id(segment: &str) -> Option<i64> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}
