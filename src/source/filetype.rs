// Detecting which format fetched content is in

/// The content formats a source can be loaded from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Filetype {
    Unknown,
    Csv,
    Json,
}

impl Filetype {
    /// Filetype from a file extension or MIME subtype, case-insensitive
    pub fn from_extension(ext: Option<&str>) -> Filetype {
        match ext.unwrap_or("").to_ascii_lowercase().as_str() {
            "csv" => Filetype::Csv,
            "json" | "ndjson" | "jsonl" => Filetype::Json,
            _ => Filetype::Unknown,
        }
    }

    /// Filetype from an HTTP Content-Type header value
    /// e.g. "text/csv; charset=utf-8" -> Csv
    pub fn from_content_type(content_type: &str) -> Filetype {
        let mime = content_type.split(';').next().unwrap_or("").trim();
        Filetype::from_extension(mime.rsplit('/').next())
    }

    /// Filetype from the last segment of a URL or path,
    /// ignoring any query string or fragment
    pub fn from_location(location: &str) -> Filetype {
        let path = location
            .split(['?', '#'])
            .next()
            .unwrap_or(location);
        let last = path.rsplit('/').next().unwrap_or(path);
        match last.rsplit_once('.') {
            Some((_, ext)) => Filetype::from_extension(Some(ext)),
            None => Filetype::Unknown,
        }
    }

    /// Guess from the content itself
    pub fn sniff(content: &str) -> Filetype {
        match content.trim_start().chars().next() {
            Some('[') | Some('{') => Filetype::Json,
            _ => Filetype::Unknown,
        }
    }
}
