//! Export id parsing.
//!
//! An export id is either `"module/id[ExportName]"` or a bare module id, in
//! which case the export name is derived by camel-casing the last path
//! segment. Parses are cached per document rather than in a process-wide
//! table.

/// A parsed export id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportId {
    pub module_id: String,
    pub export_name: String,
}

/// Document-scoped cache of parsed export ids.
#[derive(Debug, Default)]
pub struct ExportIdCache {
    cache: std::collections::HashMap<String, ExportId>,
}

impl ExportIdCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `export_id`, consulting the cache first.
    pub fn parse(&mut self, export_id: &str) -> &ExportId {
        self.cache
            .entry(export_id.to_string())
            .or_insert_with(|| parse_export_id(export_id))
    }

    pub fn module_id(&mut self, export_id: &str) -> String {
        self.parse(export_id).module_id.clone()
    }

    pub fn export_name(&mut self, export_id: &str) -> String {
        self.parse(export_id).export_name.clone()
    }
}

fn parse_export_id(export_id: &str) -> ExportId {
    if let Some(bracket) = export_id.find('[') {
        if bracket > 0 && export_id.ends_with(']') {
            return ExportId {
                module_id: export_id[..bracket].to_string(),
                export_name: export_id[bracket + 1..export_id.len() - 1].to_string(),
            };
        }
    }

    let last_segment = export_id.rsplit('/').next().unwrap_or(export_id);
    let stem = last_segment.strip_suffix(".vlm").unwrap_or(last_segment);

    let mut export_name = String::with_capacity(stem.len());
    let mut upper_next = true;
    for ch in stem.chars() {
        if ch == '-' {
            upper_next = true;
        } else if upper_next {
            export_name.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            export_name.push(ch);
        }
    }

    ExportId {
        module_id: export_id.to_string(),
        export_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bracketed_export_name() {
        let mut cache = ExportIdCache::new();
        let parsed = cache.parse("ui/widgets[FancyButton]");
        assert_eq!(parsed.module_id, "ui/widgets");
        assert_eq!(parsed.export_name, "FancyButton");
    }

    #[test]
    fn derives_export_name_from_last_segment() {
        let mut cache = ExportIdCache::new();
        assert_eq!(cache.export_name("foo/bar/baz"), "Baz");
        assert_eq!(cache.module_id("foo/bar/baz"), "foo/bar/baz");
    }

    #[test]
    fn camel_cases_dashed_segments() {
        let mut cache = ExportIdCache::new();
        assert_eq!(cache.export_name("ui/my-widget.vlm"), "MyWidget");
    }

    #[test]
    fn caches_parses() {
        let mut cache = ExportIdCache::new();
        let first = cache.parse("a/b").clone();
        let second = cache.parse("a/b").clone();
        assert_eq!(first, second);
    }
}
