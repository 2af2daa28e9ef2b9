use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::warn;

/// One entry of the loaded list.
///
/// `original_index` is the 0-based line of the first occurrence of `url`
/// among the non-blank lines. Duplicate lines share the index of the first
/// occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoRef {
    url: Rc<str>,
    original_index: usize,
}

impl VideoRef {
    pub fn new(url: impl Into<Rc<str>>, original_index: usize) -> Self {
        Self {
            url: url.into(),
            original_index,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn original_index(&self) -> usize {
        self.original_index
    }

    /// 1-based line number shown to the user.
    pub fn line(&self) -> usize {
        self.original_index + 1
    }
}

/// A URL that appeared more than once in the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Duplicate {
    /// 1-based line (counting non-blank lines) of the repeated entry.
    pub line: usize,
    /// 1-based line of the first occurrence.
    pub first_line: usize,
    pub url: String,
}

/// The as-loaded list. Never mutated after parsing.
#[derive(Debug, Clone, Default)]
pub struct OriginalOrder {
    videos: Vec<VideoRef>,
    index_by_url: HashMap<Rc<str>, usize>,
    duplicates: Vec<Duplicate>,
    blank_lines: usize,
}

impl OriginalOrder {
    /// Parse newline-delimited list text. Lines are trimmed and blank lines
    /// are skipped.
    pub fn parse(text: &str) -> Self {
        let mut order = Self::default();
        for raw in text.lines() {
            let url = raw.trim();
            if url.is_empty() {
                order.blank_lines += 1;
                continue;
            }
            order.push(url);
        }
        order
    }

    fn push(&mut self, url: &str) {
        let position = self.videos.len();
        let video = match self.index_by_url.get_key_value(url) {
            Some((shared, &first)) => {
                warn!(
                    "Duplicate URL at line {}: {url} (first seen at line {})",
                    position + 1,
                    first + 1
                );
                self.duplicates.push(Duplicate {
                    line: position + 1,
                    first_line: first + 1,
                    url: url.to_string(),
                });
                VideoRef {
                    url: Rc::clone(shared),
                    original_index: first,
                }
            }
            None => {
                let shared: Rc<str> = Rc::from(url);
                self.index_by_url.insert(Rc::clone(&shared), position);
                VideoRef {
                    url: shared,
                    original_index: position,
                }
            }
        };
        self.videos.push(video);
    }

    pub fn len(&self) -> usize {
        self.videos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&VideoRef> {
        self.videos.get(position)
    }

    /// Entry for a 1-based line number.
    pub fn line(&self, line: usize) -> Option<&VideoRef> {
        line.checked_sub(1).and_then(|position| self.get(position))
    }

    /// 0-based original index recorded for `url` (first occurrence wins).
    pub fn original_index_of(&self, url: &str) -> Option<usize> {
        self.index_by_url.get(url).copied()
    }

    pub fn videos(&self) -> &[VideoRef] {
        &self.videos
    }

    pub fn duplicates(&self) -> &[Duplicate] {
        &self.duplicates
    }

    pub fn blank_lines(&self) -> usize {
        self.blank_lines
    }
}

/// Which ordering drives the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayMode {
    #[default]
    Random,
    Sequential,
}

impl PlayMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Random => Self::Sequential,
            Self::Sequential => Self::Random,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "random" | "shuffle" => Some(Self::Random),
            "sequential" | "ordered" => Some(Self::Sequential),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Random => "random",
            Self::Sequential => "sequential",
        }
    }
}

impl fmt::Display for PlayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Position of `video` within `active`, matched by URL.
pub fn position_in(active: &[VideoRef], video: &VideoRef) -> Option<usize> {
    active.iter().position(|candidate| candidate.url() == video.url())
}
