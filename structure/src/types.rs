use crate::error::StructureError;
use serde::{Deserialize, Serialize};

/// One named item in a parsed file: a function, class, or symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureItem {
    /// Display name (unqualified)
    pub name: String,

    /// Starting line number (1-indexed)
    pub start_line: usize,

    /// Ending line number (1-indexed, inclusive)
    pub end_line: usize,

    /// Names this item calls (functions/methods)
    #[serde(default)]
    pub calls: Vec<String>,

    /// Names this item references without calling (types, constants)
    #[serde(default)]
    pub uses: Vec<String>,
}

impl StructureItem {
    /// Create a new item with an empty dependency list
    pub fn new(name: impl Into<String>, start_line: usize, end_line: usize) -> Self {
        Self {
            name: name.into(),
            start_line,
            end_line,
            calls: Vec::new(),
            uses: Vec::new(),
        }
    }

    /// Set called names
    pub fn with_calls(mut self, calls: Vec<String>) -> Self {
        self.calls = calls;
        self
    }

    /// Set referenced names
    pub fn with_uses(mut self, uses: Vec<String>) -> Self {
        self.uses = uses;
        self
    }

    fn validate(&self, kind: &str) -> Result<(), StructureError> {
        if self.name.trim().is_empty() {
            return Err(StructureError::Malformed(format!("{kind} with empty name")));
        }
        if self.start_line == 0 {
            return Err(StructureError::Malformed(format!(
                "{kind} '{}' has zero start line (lines are 1-indexed)",
                self.name
            )));
        }
        if self.end_line < self.start_line {
            return Err(StructureError::Malformed(format!(
                "{kind} '{}' has inverted line range {}-{}",
                self.name, self.start_line, self.end_line
            )));
        }
        Ok(())
    }
}

/// Parsed structure tree of one source file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileStructure {
    /// Language tag (e.g. "python", "rust")
    #[serde(default)]
    pub language: Option<String>,

    /// Top-level and nested functions
    #[serde(default)]
    pub functions: Vec<StructureItem>,

    /// Classes / types
    #[serde(default)]
    pub classes: Vec<StructureItem>,

    /// Imported module or symbol names
    #[serde(default)]
    pub imports: Vec<String>,

    /// Other named symbols (constants, globals)
    #[serde(default)]
    pub symbols: Vec<StructureItem>,
}

impl FileStructure {
    /// Check required fields. A structure that fails here is rejected
    /// per-file; updates to other files are unaffected.
    pub fn validate(&self) -> Result<(), StructureError> {
        for item in &self.functions {
            item.validate("function")?;
        }
        for item in &self.classes {
            item.validate("class")?;
        }
        for item in &self.symbols {
            item.validate("symbol")?;
        }
        for import in &self.imports {
            if import.trim().is_empty() {
                return Err(StructureError::Malformed("import with empty name".into()));
            }
        }
        Ok(())
    }

    /// Total number of named items
    pub fn item_count(&self) -> usize {
        self.functions.len() + self.classes.len() + self.symbols.len()
    }

    /// True when the file yielded nothing indexable
    pub fn is_empty(&self) -> bool {
        self.item_count() == 0 && self.imports.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_valid_structure() {
        let structure = FileStructure {
            language: Some("python".to_string()),
            functions: vec![StructureItem::new("load_config", 10, 42)],
            classes: vec![StructureItem::new("Config", 1, 8)],
            imports: vec!["os".to_string()],
            symbols: vec![],
        };

        assert!(structure.validate().is_ok());
        assert_eq!(structure.item_count(), 2);
        assert!(!structure.is_empty());
    }

    #[test]
    fn test_empty_name_rejected() {
        let structure = FileStructure {
            functions: vec![StructureItem::new("  ", 1, 5)],
            ..Default::default()
        };

        assert!(matches!(
            structure.validate(),
            Err(StructureError::Malformed(_))
        ));
    }

    #[test]
    fn test_inverted_range_rejected() {
        let structure = FileStructure {
            classes: vec![StructureItem::new("Broken", 20, 10)],
            ..Default::default()
        };

        assert!(structure.validate().is_err());
    }

    #[test]
    fn test_zero_start_line_rejected() {
        let structure = FileStructure {
            functions: vec![StructureItem::new("f", 0, 3)],
            ..Default::default()
        };

        assert!(structure.validate().is_err());
    }

    #[test]
    fn test_empty_import_rejected() {
        let structure = FileStructure {
            imports: vec![String::new()],
            ..Default::default()
        };

        assert!(structure.validate().is_err());
    }
}
