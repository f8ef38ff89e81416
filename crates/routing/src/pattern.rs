use regex::Regex;

/// A route pattern compiled into an anchored matcher.
///
/// The configured pattern is wrapped in `^(?:...)$`, so it must account for
/// the entire route string. `chat` matches only `chat`, never `chat/send`.
#[derive(Debug, Clone)]
pub struct RoutePattern {
    raw: String,
    regex: Regex,
}

impl RoutePattern {
    /// Compile a pattern. Regular-expression syntax is allowed, which makes
    /// alternations like `clock/(start|stop)` a single table entry.
    pub fn compile(pattern: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&format!("^(?:{pattern})$"))?;
        Ok(Self {
            raw: pattern.to_string(),
            regex,
        })
    }

    /// The pattern text as written in the configuration.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn matches(&self, route: &str) -> bool {
        self.regex.is_match(route)
    }
}
