use std::fmt;
use std::sync::LazyLock;

use derive_more::Display;
use regex::Regex;

use crate::errors::{ConfigError, ConfigResult};

static PATH_DELIMITERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(-?\d+)\]|\.").expect("static regex"));

/// One step into a tree: a mapping key or a sequence index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
pub enum Segment {
    Key(String),
    #[display("[{_0}]")]
    Index(i64),
}

impl From<&str> for Segment {
    fn from(key: &str) -> Self {
        Segment::Key(key.to_string())
    }
}

impl From<String> for Segment {
    fn from(key: String) -> Self {
        Segment::Key(key)
    }
}

impl From<i64> for Segment {
    fn from(index: i64) -> Self {
        Segment::Index(index)
    }
}

fn push_key(key: &str, segments: &mut Vec<Segment>) {
    if !key.is_empty() {
        segments.push(Segment::Key(key.to_string()));
    }
}

impl Segment {
    pub fn as_key(&self) -> Option<&str> {
        match self {
            Segment::Key(key) => Some(key),
            Segment::Index(_) => None,
        }
    }

    pub fn is_index(&self) -> bool {
        matches!(self, Segment::Index(_))
    }
}

/// A location in a tree, e.g. `model.layers[0].units`. The empty path is the root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Path(Vec<Segment>);

impl Path {
    pub fn root() -> Path {
        Path(vec![])
    }

    /// Parse `a.b[0].c` into `[a, b, 0, c]`.
    ///
    /// Text between delimiters is a key verbatim, so `a.*` yields the keys `a` and `*`. Empty
    /// keys (from `a..b` or a leading `.`) are skipped. Nothing is validated against a tree.
    pub fn parse(input: &str) -> ConfigResult<Path> {
        let mut segments = vec![];
        let mut last = 0;

        for caps in PATH_DELIMITERS.captures_iter(input) {
            let Some(delimiter) = caps.get(0) else {
                continue;
            };
            push_key(&input[last..delimiter.start()], &mut segments);
            last = delimiter.end();

            if let Some(index) = caps.get(1) {
                let index = index.as_str().parse::<i64>().map_err(|e| {
                    ConfigError::InvalidPath {
                        path: input.to_string(),
                        reason: e.to_string(),
                    }
                })?;
                segments.push(Segment::Index(index));
            }
        }
        push_key(&input[last..], &mut segments);

        Ok(Path(segments))
    }

    pub fn segments(&self) -> &[Segment] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn last(&self) -> Option<&Segment> {
        self.0.last()
    }

    /// Everything but the last segment, or `None` for the root.
    pub fn parent(&self) -> Option<Path> {
        self.0
            .split_last()
            .map(|(_, parent)| Path(parent.to_vec()))
    }

    pub fn child<S: Into<Segment>>(&self, segment: S) -> Path {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Path(segments)
    }
}

impl From<Vec<Segment>> for Path {
    fn from(segments: Vec<Segment>) -> Self {
        Path(segments)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 && !segment.is_index() {
                f.write_str(".")?;
            }
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

/// Free-function form of [`Path::parse`].
pub fn parse_key_path(input: &str) -> ConfigResult<Path> {
    Path::parse(input)
}
