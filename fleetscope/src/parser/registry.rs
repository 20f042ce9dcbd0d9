//! Registry for looking up output parsers by id.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::{
    CdpDetailParser, CiscoLldpDetailParser, EosLldpJsonParser, JunosLldpJsonParser,
    LldpctlKeyValueParser, OutputParser, ParseResult,
};
use crate::error::{ConfigError, ParseError, Result};

/// Registry of output parsers.
#[derive(Default, Clone)]
pub struct ParserRegistry {
    parsers: HashMap<String, Arc<dyn OutputParser>>,
}

impl ParserRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            parsers: HashMap::new(),
        }
    }

    /// Create a registry with the built-in parsers.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register_builtin_parsers();
        registry
    }

    fn register_builtin_parsers(&mut self) {
        let builtin: [Arc<dyn OutputParser>; 5] = [
            Arc::new(LldpctlKeyValueParser),
            Arc::new(EosLldpJsonParser),
            Arc::new(JunosLldpJsonParser),
            Arc::new(CiscoLldpDetailParser),
            Arc::new(CdpDetailParser),
        ];
        for parser in builtin {
            self.parsers.insert(parser.id().to_string(), parser);
        }
    }

    /// Register a parser.
    pub fn register(&mut self, parser: Arc<dyn OutputParser>) -> Result<()> {
        if self.parsers.contains_key(parser.id()) {
            return Err(ConfigError::AlreadyRegistered {
                name: parser.id().to_string(),
            }
            .into());
        }
        self.parsers.insert(parser.id().to_string(), parser);
        Ok(())
    }

    /// Get a parser by id.
    pub fn get(&self, id: &str) -> Option<&Arc<dyn OutputParser>> {
        self.parsers.get(id)
    }

    /// Check if a parser is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.parsers.contains_key(id)
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.parsers.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Parse `raw` with the parser registered under `id`.
    pub fn parse(
        &self,
        id: &str,
        device_key: &str,
        raw: &str,
    ) -> std::result::Result<ParseResult, ParseError> {
        let parser = self.get(id).ok_or_else(|| ParseError::UnknownParser {
            id: id.to_string(),
        })?;
        parser.parse(device_key, raw)
    }
}

impl fmt::Debug for ParserRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<&String> = self.parsers.keys().collect();
        ids.sort();
        f.debug_struct("ParserRegistry").field("parsers", &ids).finish()
    }
}
